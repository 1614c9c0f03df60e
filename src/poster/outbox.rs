use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::ledger::format_due_date;
use crate::registry::write_atomic;
use crate::traits::Poster;
use crate::types::JobRecord;

/// Writes one JSON document per job key into the downstream outbox.
/// Re-posting a job key overwrites its document.
pub struct OutboxPoster {
    directory: PathBuf,
}

#[derive(Serialize)]
struct PostedJob<'a> {
    #[serde(flatten)]
    record: &'a JobRecord,
    due_date_display: Option<String>,
}

impl OutboxPoster {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn path_for(&self, job_key: &str) -> PathBuf {
        let name: String = job_key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.directory.join(format!("{}.json", name))
    }
}

#[async_trait]
impl Poster for OutboxPoster {
    fn name(&self) -> &'static str {
        "outbox-poster"
    }

    async fn post(&self, record: &JobRecord) -> Result<()> {
        let document = PostedJob {
            record,
            due_date_display: record.due_date.map(format_due_date),
        };
        let json = serde_json::to_vec_pretty(&document)?;
        let path = self.path_for(&record.job_key);
        write_atomic(&path, &json).with_context(|| format!("posting {}", record.job_key))?;
        info!("Posted {} to {:?}", record.job_key, path);
        Ok(())
    }
}
