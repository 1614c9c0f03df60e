use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use super::directory::DirectoryCounter;
use super::mock::MockCounter;
use super::noop::NoopCounter;
use crate::traits::SubmissionCounter;

/// Enum representing all possible submission counter implementations.
pub enum CounterVariant {
    Noop(NoopCounter),
    Mock(MockCounter),
    Directory(DirectoryCounter),
}

#[async_trait]
impl SubmissionCounter for CounterVariant {
    fn name(&self) -> &'static str {
        match self {
            CounterVariant::Noop(inner) => inner.name(),
            CounterVariant::Mock(inner) => inner.name(),
            CounterVariant::Directory(inner) => inner.name(),
        }
    }

    async fn count(&self, job_key: &str, from: NaiveDate, to: NaiveDate) -> Result<u64> {
        match self {
            CounterVariant::Noop(inner) => inner.count(job_key, from, to).await,
            CounterVariant::Mock(inner) => inner.count(job_key, from, to).await,
            CounterVariant::Directory(inner) => inner.count(job_key, from, to).await,
        }
    }
}
