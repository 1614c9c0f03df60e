use anyhow::Result;
use async_trait::async_trait;

use super::directory::DirectorySource;
use super::mock::MockSource;
use super::noop::NoopSource;
use crate::traits::Source;
use crate::types::{ItemDescriptor, RawArtifact};

/// Enum representing all possible source implementations.
pub enum SourceVariant {
    Noop(NoopSource),
    Mock(MockSource),
    Directory(DirectorySource),
}

#[async_trait]
impl Source for SourceVariant {
    fn name(&self) -> &'static str {
        match self {
            SourceVariant::Noop(inner) => inner.name(),
            SourceVariant::Mock(inner) => inner.name(),
            SourceVariant::Directory(inner) => inner.name(),
        }
    }

    async fn list_candidates(&self) -> Result<Vec<ItemDescriptor>> {
        match self {
            SourceVariant::Noop(inner) => inner.list_candidates().await,
            SourceVariant::Mock(inner) => inner.list_candidates().await,
            SourceVariant::Directory(inner) => inner.list_candidates().await,
        }
    }

    async fn fetch(&self, item: &ItemDescriptor) -> Result<RawArtifact> {
        match self {
            SourceVariant::Noop(inner) => inner.fetch(item).await,
            SourceVariant::Mock(inner) => inner.fetch(item).await,
            SourceVariant::Directory(inner) => inner.fetch(item).await,
        }
    }
}
