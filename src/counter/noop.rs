use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::traits::SubmissionCounter;

/// Counter that reports zero submissions.
pub struct NoopCounter;

#[async_trait]
impl SubmissionCounter for NoopCounter {
    fn name(&self) -> &'static str {
        "noop-counter"
    }

    async fn count(&self, _job_key: &str, _from: NaiveDate, _to: NaiveDate) -> Result<u64> {
        Ok(0)
    }
}
