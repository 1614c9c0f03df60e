use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::traits::Source;
use crate::types::{ItemDescriptor, RawArtifact, SourceId};

/// Inbox directory with one file per item.
///
/// The file stem is the item id and the first non-empty line is its label.
/// Hidden files are ignored.
pub struct DirectorySource {
    source: SourceId,
    inbox: PathBuf,
}

impl DirectorySource {
    pub fn new(source: SourceId, inbox: PathBuf) -> Self {
        Self { source, inbox }
    }
}

#[async_trait]
impl Source for DirectorySource {
    fn name(&self) -> &'static str {
        match self.source {
            SourceId::SourceA => "directory-source-a",
            SourceId::SourceB => "directory-source-b",
        }
    }

    async fn list_candidates(&self) -> Result<Vec<ItemDescriptor>> {
        let mut entries = match tokio::fs::read_dir(&self.inbox).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Inbox {:?} does not exist yet", self.inbox);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).with_context(|| format!("listing inbox {:?}", self.inbox)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if !hidden && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut items = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!("Skipping inbox file with non UTF-8 name: {:?}", path);
                continue;
            };
            let label = tokio::fs::read_to_string(&path)
                .await
                .ok()
                .and_then(|body| body.lines().map(str::trim).find(|l| !l.is_empty()).map(String::from))
                .unwrap_or_default();
            items.push(ItemDescriptor {
                id: id.to_string(),
                source: self.source,
                label,
            });
        }
        Ok(items)
    }

    async fn fetch(&self, item: &ItemDescriptor) -> Result<RawArtifact> {
        let mut entries = tokio::fs::read_dir(&self.inbox)
            .await
            .with_context(|| format!("listing inbox {:?}", self.inbox))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(item.id.as_str()) {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("reading {:?}", path))?;
                return Ok(RawArtifact::new(item.id.clone(), bytes));
            }
        }
        anyhow::bail!("item {} is no longer in {:?}", item.id, self.inbox)
    }
}
