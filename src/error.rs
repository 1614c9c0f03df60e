use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure classes the monitor distinguishes when deciding what to retry.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A collaborator call failed (network, auth, rate limit). The item stays
    /// unmarked and is retried next cycle.
    #[error("{collaborator} failed for '{item}': {reason}")]
    TransientExternal {
        collaborator: &'static str,
        item: String,
        reason: String,
    },

    /// Persisted state could not be read; the affected category starts empty.
    #[error("corrupt state in {path:?}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    /// The coordinator could not be acquired in time.
    #[error("'{owner}' could not acquire the scraping resource within {waited:?} (held by {holder:?})")]
    LockTimeout {
        owner: String,
        waited: Duration,
        holder: Option<String>,
    },

    /// A required setting is absent or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WatchError {
    pub fn transient(collaborator: &'static str, item: &str, err: &anyhow::Error) -> Self {
        WatchError::TransientExternal {
            collaborator,
            item: item.to_string(),
            reason: format!("{:#}", err),
        }
    }
}
