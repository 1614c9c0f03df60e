use anyhow::Result;
use async_trait::async_trait;

use crate::types::JobRecord;

/// Posts records to the downstream system.
#[async_trait]
pub trait Poster: Send + Sync {
    fn name(&self) -> &'static str;

    async fn post(&self, record: &JobRecord) -> Result<()>;
}
