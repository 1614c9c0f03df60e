use anyhow::Result;
use async_trait::async_trait;

use crate::traits::Notifier;
use crate::types::Notification;

/// Notifier that drops every message.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &'static str {
        "noop-notifier"
    }

    async fn notify(&self, notification: &Notification, _recipients: &[String]) -> Result<()> {
        tracing::debug!("NoopNotifier: dropped '{}'", notification.subject);
        Ok(())
    }
}
