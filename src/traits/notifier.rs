use anyhow::Result;
use async_trait::async_trait;

use crate::types::Notification;

/// Delivers notifications to people.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Human-readable notifier name for logging.
    fn name(&self) -> &'static str;

    /// Send one message; `Ok` means delivery was confirmed.
    async fn notify(&self, notification: &Notification, recipients: &[String]) -> Result<()>;
}
