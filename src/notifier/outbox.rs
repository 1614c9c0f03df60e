use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::registry::write_atomic;
use crate::traits::Notifier;
use crate::types::Notification;

/// Writes each notification as a JSON message file into an outbox
/// directory for a mail relay to pick up.
pub struct OutboxNotifier {
    directory: PathBuf,
}

#[derive(Serialize)]
struct OutboxMessage<'a> {
    id: String,
    created_at: String,
    recipients: &'a [String],
    subject: &'a str,
    body: &'a str,
    attachments: &'a [PathBuf],
}

impl OutboxNotifier {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    fn name(&self) -> &'static str {
        "outbox-notifier"
    }

    async fn notify(&self, notification: &Notification, recipients: &[String]) -> Result<()> {
        if recipients.is_empty() {
            bail!("no recipients for '{}'", notification.subject);
        }
        for attachment in &notification.attachments {
            if !tokio::fs::try_exists(attachment).await.unwrap_or(false) {
                bail!("attachment {:?} is missing", attachment);
            }
        }

        let id = Uuid::new_v4().to_string();
        let message = OutboxMessage {
            id: id.clone(),
            created_at: Utc::now().to_rfc3339(),
            recipients,
            subject: &notification.subject,
            body: &notification.body,
            attachments: &notification.attachments,
        };
        let json = serde_json::to_vec_pretty(&message)?;
        let path = self.directory.join(format!("{}.json", id));
        write_atomic(&path, &json).with_context(|| format!("writing outbox message {:?}", path))?;

        info!(
            "Queued '{}' for {} recipients at {:?}",
            notification.subject,
            recipients.len(),
            path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(attachments: Vec<PathBuf>) -> Notification {
        Notification {
            subject: "Daily report".into(),
            body: "3 active".into(),
            attachments,
        }
    }

    #[tokio::test]
    async fn test_writes_message_file() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(dir.path().join("out"));
        notifier
            .notify(&note(vec![]), &["ops@example.com".into()])
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path().join("out")).unwrap().collect();
        assert_eq!(files.len(), 1);
        let raw = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["subject"], "Daily report");
        assert_eq!(value["recipients"][0], "ops@example.com");
    }

    #[tokio::test]
    async fn test_rejects_missing_attachment_and_no_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(dir.path().to_path_buf());
        assert!(notifier.notify(&note(vec![]), &[]).await.is_err());
        assert!(notifier
            .notify(
                &note(vec![dir.path().join("missing.xlsx")]),
                &["ops@example.com".into()]
            )
            .await
            .is_err());
    }
}
