use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::Notifier;
use crate::types::Notification;

/// Mock notifier for testing.
/// Stores sent notifications in memory and can be told to fail.
#[derive(Clone, Default)]
pub struct MockNotifier {
    pub sent: Arc<Mutex<Vec<(Notification, Vec<String>)>>>,
    pub attempts: Arc<Mutex<usize>>,
    pub failures_left: Arc<Mutex<usize>>,
    pub always_fail: Arc<Mutex<bool>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` attempts.
    pub fn fail_next(&self, n: usize) {
        *self.failures_left.lock().unwrap() = n;
    }

    pub fn set_always_fail(&self, fail: bool) {
        *self.always_fail.lock().unwrap() = fail;
    }

    pub fn get_sent(&self) -> Vec<(Notification, Vec<String>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_subjects(&self) -> Vec<String> {
        self.get_sent().into_iter().map(|(n, _)| n.subject).collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &'static str {
        "mock-notifier"
    }

    async fn notify(&self, notification: &Notification, recipients: &[String]) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if *self.always_fail.lock().unwrap() {
            return Err(anyhow!("mock notifier failure"));
        }
        {
            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(anyhow!("mock notifier failure"));
            }
        }
        self.sent
            .lock()
            .unwrap()
            .push((notification.clone(), recipients.to_vec()));
        tracing::debug!("MockNotifier: sent '{}'", notification.subject);
        Ok(())
    }
}
