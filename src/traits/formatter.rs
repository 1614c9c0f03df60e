use anyhow::Result;

use crate::types::JobRecord;

/// Renders a record as notification text.
pub trait Formatter: Send + Sync {
    fn name(&self) -> &'static str;

    fn format(&self, record: &JobRecord) -> Result<String>;
}
