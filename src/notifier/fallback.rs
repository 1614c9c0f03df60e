use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::warn;

use super::variant::NotifierVariant;
use crate::traits::Notifier;
use crate::types::Notification;

/// Tries each notifier in order until one succeeds.
pub struct FallbackNotifier {
    chain: Vec<NotifierVariant>,
}

impl FallbackNotifier {
    pub fn new(chain: Vec<NotifierVariant>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Notifier for FallbackNotifier {
    fn name(&self) -> &'static str {
        "fallback-notifier"
    }

    async fn notify(&self, notification: &Notification, recipients: &[String]) -> Result<()> {
        let mut last_error = None;
        for notifier in &self.chain {
            match notifier.notify(notification, recipients).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!("{} failed, trying next notifier: {:#}", notifier.name(), e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no notifiers configured")))
    }
}
