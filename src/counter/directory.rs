use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::traits::SubmissionCounter;

/// Counts files in a submissions directory that mention the job key and were
/// last modified inside the window. Modification dates are taken in `tz`.
pub struct DirectoryCounter {
    directory: PathBuf,
    tz: Tz,
}

impl DirectoryCounter {
    pub fn new(directory: PathBuf, tz: Tz) -> Self {
        Self { directory, tz }
    }
}

#[async_trait]
impl SubmissionCounter for DirectoryCounter {
    fn name(&self) -> &'static str {
        "directory-counter"
    }

    async fn count(&self, job_key: &str, from: NaiveDate, to: NaiveDate) -> Result<u64> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(e).with_context(|| format!("listing {:?}", self.directory));
            }
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified: DateTime<Utc> = metadata.modified()?.into();
            let day = modified.with_timezone(&self.tz).date_naive();
            if day < from || day > to {
                continue;
            }
            let body = tokio::fs::read(entry.path()).await?;
            if String::from_utf8_lossy(&body).contains(job_key) {
                count += 1;
            }
        }
        debug!("{} submissions for {} between {} and {}", count, job_key, from, to);
        Ok(count)
    }
}
