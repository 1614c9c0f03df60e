use anyhow::Result;
use async_trait::async_trait;

use crate::traits::Poster;
use crate::types::JobRecord;

/// Poster that discards every record.
pub struct NoopPoster;

#[async_trait]
impl Poster for NoopPoster {
    fn name(&self) -> &'static str {
        "noop-poster"
    }

    async fn post(&self, _record: &JobRecord) -> Result<()> {
        Ok(())
    }
}
