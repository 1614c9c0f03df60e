//! One polling loop per upstream source.
//!
//! A cycle lists candidates, drops those already in the registry, takes the
//! scraping resource and processes the rest in listing order.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::artifacts::ArtifactStore;
use crate::clock::Clock;
use crate::config::MarkPolicy;
use crate::coordinator::Coordinator;
use crate::error::WatchError;
use crate::notifier::NotifierVariant;
use crate::parser::plain_rendering;
use crate::registry::SharedRegistry;
use crate::source::SourceVariant;
use crate::traits::{Extractor, Formatter, Notifier, Source};
use crate::types::{ItemDescriptor, JobRecord, Notification, PollReport, SourceId};

/// What happened to a single item inside the protected section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Processed(JobRecord),
    NoData,
}

pub struct SourcePoller {
    pub source_id: SourceId,
    pub source: SourceVariant,
    pub extractor: Arc<dyn Extractor>,
    pub formatter: Arc<dyn Formatter>,
    pub notifier: Arc<NotifierVariant>,
    pub registry: SharedRegistry,
    pub coordinator: Coordinator,
    pub clock: Arc<dyn Clock>,
    /// Where raw artifacts of processed items are written.
    pub scratch_dir: PathBuf,
    pub recipients: Vec<String>,
    pub policy: MarkPolicy,
    /// Bound for waiting on another source before listing.
    pub lock_wait: Duration,
    /// Bound for acquiring the resource before processing.
    pub lock_timeout: Duration,
}

impl SourcePoller {
    fn owner(&self) -> &'static str {
        self.source_id.owner()
    }

    /// Run one full cycle. Only a listing failure is returned as an error;
    /// per-item failures are counted in the report.
    pub async fn poll_once(&self) -> Result<PollReport> {
        let owner = self.owner();
        let category = self.source_id.category();
        let mut report = PollReport::default();

        self.coordinator.wait_if_busy(owner, self.lock_wait).await;

        let listed = self.source.list_candidates().await?;
        report.listed = listed.len();

        let fresh: Vec<ItemDescriptor> = {
            let registry = self.registry.lock().await;
            let mut seen = HashSet::new();
            listed
                .into_iter()
                .filter(|item| !registry.contains(category, &item.id))
                .filter(|item| seen.insert(item.id.clone()))
                .collect()
        };
        report.new = fresh.len();

        if fresh.is_empty() {
            debug!("{}: nothing new among {} listed items", owner, report.listed);
            return Ok(report);
        }
        info!("{}: {} new items", owner, fresh.len());

        let guard = match self.coordinator.acquire(owner, self.lock_timeout).await {
            Ok(guard) => guard,
            Err(e) => {
                warn!("{}; deferring {} items to the next cycle", e, fresh.len());
                report.deferred = fresh.len();
                return Ok(report);
            }
        };

        if self.policy == MarkPolicy::Eager {
            let mut registry = self.registry.lock().await;
            for item in &fresh {
                registry.add(category, &item.id);
            }
        }

        for item in &fresh {
            match self.process_item(item).await {
                Ok(outcome) => {
                    match &outcome {
                        ItemOutcome::Processed(record) => {
                            info!("{}: processed {} as {}", owner, item.id, record.job_key);
                            report.processed += 1;
                        }
                        ItemOutcome::NoData => {
                            info!("{}: no job data in {}", owner, item.id);
                            report.no_data += 1;
                        }
                    }
                    if self.policy == MarkPolicy::AfterSuccess {
                        self.registry.lock().await.add(category, &item.id);
                    }
                }
                Err(e) => {
                    error!("{}: {}", owner, e);
                    report.failed += 1;
                }
            }
        }

        drop(guard);
        Ok(report)
    }

    /// Fetch, extract, format, stash the raw artifact and notify.
    pub async fn process_item(&self, item: &ItemDescriptor) -> Result<ItemOutcome, WatchError> {
        let raw = self
            .source
            .fetch(item)
            .await
            .map_err(|e| WatchError::transient("source", &item.id, &e))?;

        let Some(mut record) = self.extractor.extract(&raw, self.clock.today()) else {
            return Ok(ItemOutcome::NoData);
        };
        record.source = Some(self.source_id);

        let body = self.formatter.format(&record).unwrap_or_else(|e| {
            warn!(
                "{} failed for {}, using plain rendering: {:#}",
                self.formatter.name(),
                item.id,
                e
            );
            plain_rendering(&record)
        });

        ArtifactStore::write(&self.scratch_dir, &item.id, &raw.bytes)
            .map_err(|e| WatchError::transient("scratch", &item.id, &e))?;

        if self.recipients.is_empty() {
            debug!("No recipients configured, skipping notification for {}", item.id);
        } else {
            let notification = Notification {
                subject: format!("[{}] {} {}", self.source_id, record.job_key, record.title),
                body,
                attachments: Vec::new(),
            };
            self.notifier
                .notify(&notification, &self.recipients)
                .await
                .map_err(|e| WatchError::transient("notifier", &item.id, &e))?;
        }

        Ok(ItemOutcome::Processed(record))
    }

    /// Poll every `interval` until `shutdown` flips to `true`. Shutdown is
    /// observed between cycles only.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            "{} poller started (source={}, interval={:?}, policy={:?})",
            self.owner(),
            self.source.name(),
            interval,
            self.policy
        );
        loop {
            match self.poll_once().await {
                Ok(report) if report.new > 0 => debug!("{} cycle: {:?}", self.owner(), report),
                Ok(_) => {}
                Err(e) => error!("{} listing failed: {:#}", self.owner(), e),
            }

            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("{} poller stopped", self.owner());
    }
}
