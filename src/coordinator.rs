//! Advisory named-owner lock around the shared scraping resource.
//!
//! Exclusion is advisory: `wait_if_busy` gives up after its bound and lets the
//! caller continue, so a hung cycle on one source cannot starve the other.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::WatchError;

/// Poll interval while waiting for the resource.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Named-owner advisory lock with bounded waits.
#[derive(Debug, Clone)]
pub struct Coordinator {
    holder: Arc<Mutex<Option<String>>>,
    poll_interval: Duration,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_poll_interval(POLL_INTERVAL)
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            holder: Arc::new(Mutex::new(None)),
            poll_interval,
        }
    }

    /// Current owner, if any.
    pub fn holder(&self) -> Option<String> {
        self.holder.lock().unwrap().clone()
    }

    fn try_take(&self, owner: &str) -> bool {
        let mut holder = self.holder.lock().unwrap();
        match holder.as_deref() {
            None => {
                *holder = Some(owner.to_string());
                true
            }
            Some(current) => current == owner,
        }
    }

    /// Poll until `owner` holds the resource or `timeout` elapses.
    pub async fn try_acquire(&self, owner: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_take(owner) {
                info!("Scraping resource acquired by {}", owner);
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Like [`Coordinator::try_acquire`] but hands back a guard that releases
    /// on drop.
    pub async fn acquire(
        &self,
        owner: &str,
        timeout: Duration,
    ) -> Result<CoordinatorGuard, WatchError> {
        if self.try_acquire(owner, timeout).await {
            Ok(CoordinatorGuard {
                coordinator: self.clone(),
                owner: owner.to_string(),
            })
        } else {
            Err(WatchError::LockTimeout {
                owner: owner.to_string(),
                waited: timeout,
                holder: self.holder(),
            })
        }
    }

    /// Release the resource. Returns `false` (with a warning) when `owner`
    /// is not the current holder.
    pub fn release(&self, owner: &str) -> bool {
        let mut holder = self.holder.lock().unwrap();
        match holder.as_deref() {
            Some(current) if current == owner => {
                *holder = None;
                info!("Scraping resource released by {}", owner);
                true
            }
            Some(current) => {
                warn!(
                    "Release by {} ignored: resource is held by {}",
                    owner, current
                );
                false
            }
            None => {
                debug!("Release by {} ignored: resource is free", owner);
                false
            }
        }
    }

    /// Block while another owner holds the resource, at most `max_wait`.
    ///
    /// Returns `true` if the resource became free (or was never busy) and
    /// `false` on timeout. Callers proceed either way.
    pub async fn wait_if_busy(&self, owner: &str, max_wait: Duration) -> bool {
        let busy_with_other = |holder: Option<String>| holder.is_some_and(|h| h != owner);

        if !busy_with_other(self.holder()) {
            return true;
        }
        info!(
            "{} waiting for {:?} to release the scraping resource",
            owner,
            self.holder()
        );

        let deadline = Instant::now() + max_wait;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
            if !busy_with_other(self.holder()) {
                return true;
            }
        }

        warn!(
            "{}",
            WatchError::LockTimeout {
                owner: owner.to_string(),
                waited: max_wait,
                holder: self.holder(),
            }
        );
        warn!("{} proceeding without exclusive access", owner);
        false
    }
}

/// Releases the coordinator when dropped.
#[derive(Debug)]
pub struct CoordinatorGuard {
    coordinator: Coordinator,
    owner: String,
}

impl CoordinatorGuard {
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for CoordinatorGuard {
    fn drop(&mut self) {
        self.coordinator.release(&self.owner);
    }
}
