use anyhow::Result;
use async_trait::async_trait;

use super::mock::MockPoster;
use super::noop::NoopPoster;
use super::outbox::OutboxPoster;
use crate::traits::Poster;
use crate::types::JobRecord;

/// Enum representing all possible downstream poster implementations.
pub enum PosterVariant {
    Noop(NoopPoster),
    Mock(MockPoster),
    Outbox(OutboxPoster),
}

#[async_trait]
impl Poster for PosterVariant {
    fn name(&self) -> &'static str {
        match self {
            PosterVariant::Noop(inner) => inner.name(),
            PosterVariant::Mock(inner) => inner.name(),
            PosterVariant::Outbox(inner) => inner.name(),
        }
    }

    async fn post(&self, record: &JobRecord) -> Result<()> {
        match self {
            PosterVariant::Noop(inner) => inner.post(record).await,
            PosterVariant::Mock(inner) => inner.post(record).await,
            PosterVariant::Outbox(inner) => inner.post(record).await,
        }
    }
}
