use anyhow::Result;
use async_trait::async_trait;

use super::fallback::FallbackNotifier;
use super::mock::MockNotifier;
use super::noop::NoopNotifier;
use super::outbox::OutboxNotifier;
use crate::traits::Notifier;
use crate::types::Notification;

/// Enum representing all possible notifier implementations.
pub enum NotifierVariant {
    Noop(NoopNotifier),
    Mock(MockNotifier),
    Outbox(OutboxNotifier),
    Fallback(FallbackNotifier),
}

#[async_trait]
impl Notifier for NotifierVariant {
    fn name(&self) -> &'static str {
        match self {
            NotifierVariant::Noop(inner) => inner.name(),
            NotifierVariant::Mock(inner) => inner.name(),
            NotifierVariant::Outbox(inner) => inner.name(),
            NotifierVariant::Fallback(inner) => inner.name(),
        }
    }

    async fn notify(&self, notification: &Notification, recipients: &[String]) -> Result<()> {
        match self {
            NotifierVariant::Noop(inner) => inner.notify(notification, recipients).await,
            NotifierVariant::Mock(inner) => inner.notify(notification, recipients).await,
            NotifierVariant::Outbox(inner) => inner.notify(notification, recipients).await,
            NotifierVariant::Fallback(inner) => inner.notify(notification, recipients).await,
        }
    }
}
