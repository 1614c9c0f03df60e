use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Counts submissions received for a job over a closed date range.
#[async_trait]
pub trait SubmissionCounter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submissions for `job_key` dated within `[from, to]`.
    async fn count(&self, job_key: &str, from: NaiveDate, to: NaiveDate) -> Result<u64>;
}
