//! Tick logic as testable `*_once` functions, plus task orchestration.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::core::Monitor;
use crate::artifacts::ScannedArtifact;
use crate::ledger::{format_due_date, Ledger};
use crate::traits::{Notifier, Poster};
use crate::types::{Category, ItemKey, Notification, TickReport};

/// Result of one ledger finalization.
#[derive(Debug)]
pub struct FinalizedLedger {
    pub ledger: Ledger,
    /// Job keys this run added to the ledger.
    pub new_keys: Vec<String>,
    /// Scratch artifacts the run read.
    pub scanned: Vec<ScannedArtifact>,
}

impl Monitor {
    /// One orchestrator tick: rollover, downstream posting, then the daily
    /// report.
    ///
    /// Posting runs first so every artifact the report is about to clean up
    /// has been posted.
    pub async fn tick_once(&mut self) -> TickReport {
        let now = self.clock.now();
        let today = now.date_naive();
        let mut report = TickReport::default();

        if self.last_tick_date.is_some_and(|last| last != today) {
            info!("Date rolled over to {}", today);
            self.tracker.on_date(today);
            self.prune_file_registry().await;
            report.rolled_over = true;
        }
        self.last_tick_date = Some(today);

        let (posted, failures) = self.post_new_artifacts_once(today).await;
        report.posted = posted;
        report.post_failures = failures;

        let mut urgent = false;
        while let Ok(Some(())) = self.urgent_rx.try_recv() {
            urgent = true;
        }

        if self.tracker.should_fire(&now, urgent) {
            report.daily_sent = self.daily_action_once(&now).await;
        } else if urgent {
            debug!("Urgent report request ignored: already sent for {}", today);
        }
        report
    }

    /// Forget fingerprints whose artifact is no longer in scratch storage.
    /// Artifacts still on disk keep theirs and are not posted again.
    async fn prune_file_registry(&self) {
        let on_disk: HashSet<ItemKey> = match self.artifacts.scan() {
            Ok(scanned) => scanned.into_iter().map(|a| a.fingerprint).collect(),
            Err(e) => {
                error!("Scratch scan failed, keeping file registry: {:#}", e);
                return;
            }
        };
        let dropped = self
            .file_registry
            .lock()
            .await
            .retain(Category::Files, |key| on_disk.contains(key));
        debug!("Dropped {} stale file fingerprints", dropped);
    }

    /// Finalize the ledger, send it, and on a confirmed send record the date
    /// and clean up scratch storage. Returns whether the report went out.
    ///
    /// Without recipients the ledger is still finalized once per day but
    /// nothing is sent, persisted as sent, or cleared.
    pub async fn daily_action_once(&mut self, now: &DateTime<Tz>) -> bool {
        let today = now.date_naive();
        let finalized = match self.finalize_ledger_once(today).await {
            Ok(done) => done,
            Err(e) => {
                error!("Ledger finalization failed, retrying next tick: {:#}", e);
                return false;
            }
        };
        for key in &finalized.new_keys {
            if !self.pending_new_keys.contains(key) {
                self.pending_new_keys.push(key.clone());
            }
        }

        if self.config.recipients.is_empty() {
            self.tracker.mark_sent(now);
            self.pending_new_keys.clear();
            info!("Ledger finalized for {} (daily report disabled)", today);
            return false;
        }

        let notification = self.daily_notification(today, &finalized.ledger);
        if let Err(e) = self
            .notifier
            .notify(&notification, &self.config.recipients)
            .await
        {
            error!(
                "Daily report via {} failed, retrying next tick: {:#}",
                self.notifier.name(),
                e
            );
            return false;
        }

        let record = self.tracker.mark_sent(now);
        self.email_registry.lock().await.set_daily_record(record);
        self.pending_new_keys.clear();
        info!(
            "Daily report sent for {} at {}",
            record.last_sent_date, record.last_sent_time
        );

        self.clean_up_reported(&finalized.scanned).await;
        true
    }

    /// Remove reported artifacts that were already posted, together with
    /// their fingerprints. Anything newer stays for the next cycle.
    async fn clean_up_reported(&self, scanned: &[ScannedArtifact]) {
        let mut file_registry = self.file_registry.lock().await;
        let posted: Vec<ScannedArtifact> = scanned
            .iter()
            .filter(|a| file_registry.contains(Category::Files, &a.fingerprint))
            .cloned()
            .collect();
        match self.artifacts.remove(&posted) {
            Ok(removed) => {
                file_registry.retain(Category::Files, |key| !removed.iter().any(|r| r == key));
                info!("Removed {} scratch artifacts after daily report", removed.len());
            }
            Err(e) => error!("Failed to clean up scratch storage: {:#}", e),
        }
    }

    /// Load, merge scratch records, reclassify, count, sort and persist.
    pub async fn finalize_ledger_once(&self, today: NaiveDate) -> Result<FinalizedLedger> {
        let mut ledger = self.ledger_store.load(today);

        let scanned = self.artifacts.scan()?;
        let records: Vec<_> = scanned
            .iter()
            .filter_map(|artifact| self.extractor.extract(&artifact.artifact, today))
            .collect();
        debug!("{} records extracted from scratch storage", records.len());

        let new_keys = ledger.merge(&records, today);
        ledger.reclassify(today);
        let counted = ledger
            .compute_submission_counts(&new_keys, &self.counter, today)
            .await;
        ledger.sort();
        self.ledger_store.persist(&ledger)?;

        info!(
            "Ledger finalized: {} new, {} counted, {} active, {} past due",
            new_keys.len(),
            counted,
            ledger.active().len(),
            ledger.past_due().len()
        );
        Ok(FinalizedLedger {
            ledger,
            new_keys,
            scanned,
        })
    }

    fn daily_notification(&self, today: NaiveDate, ledger: &Ledger) -> Notification {
        let mut body = format!(
            "Active jobs: {}\nPast due jobs: {}\n",
            ledger.active().len(),
            ledger.past_due().len()
        );
        if !self.pending_new_keys.is_empty() {
            body.push_str("\nNew since the last report:\n");
            for entry in self.pending_new_keys.iter().filter_map(|key| ledger.get(key)) {
                let due = entry
                    .due_date
                    .map(format_due_date)
                    .unwrap_or_else(|| "Open".to_string());
                body.push_str(&format!("- {} {} (due {})\n", entry.job_key, entry.title, due));
            }
        }
        Notification {
            subject: format!("Daily job report for {}", format_due_date(today)),
            body,
            attachments: vec![self.ledger_store.path().to_path_buf()],
        }
    }

    /// Post every scratch artifact whose fingerprint is not yet recorded.
    ///
    /// The fingerprint is recorded before posting, so a failed post is not
    /// retried. Returns `(posted, failed)`.
    pub async fn post_new_artifacts_once(&self, today: NaiveDate) -> (usize, usize) {
        let scanned = match self.artifacts.scan() {
            Ok(scanned) => scanned,
            Err(e) => {
                error!("Scratch scan failed: {:#}", e);
                return (0, 0);
            }
        };

        let mut posted = 0;
        let mut failed = 0;
        for artifact in scanned {
            {
                let mut registry = self.file_registry.lock().await;
                if !registry.add(Category::Files, &artifact.fingerprint) {
                    continue;
                }
                registry.touch_processing_time(self.clock.now().to_rfc3339());
            }

            let Some(record) = self.extractor.extract(&artifact.artifact, today) else {
                debug!("No job record in {:?}, not posting", artifact.path);
                continue;
            };
            match self.poster.post(&record).await {
                Ok(()) => {
                    info!("Posted {} from {:?}", record.job_key, artifact.path);
                    posted += 1;
                }
                Err(e) => {
                    error!("Posting {} via {} failed: {:#}", record.job_key, self.poster.name(), e);
                    failed += 1;
                }
            }
        }
        (posted, failed)
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Ctrl-C received, shutting down");
        })
        .await
    }

    /// Spawn both pollers and the tick loop, stop them when `shutdown`
    /// resolves and persist every registry before returning.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting monitor (poll_interval={:?}, tick_interval={:?})",
            self.config.poll_interval(),
            self.config.tick_interval()
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let email_registry = Arc::clone(&self.email_registry);
        let file_registry = Arc::clone(&self.file_registry);
        let poll_interval = self.config.poll_interval();
        let tick_interval = self.config.tick_interval();

        let mut handles = Vec::new();

        // === Poller tasks ===
        for poller in &self.pollers {
            let span = info_span!("poller", source = %poller.source_id);
            let poller = Arc::clone(poller);
            let rx = shutdown_rx.clone();
            handles.push(tokio::spawn(
                async move { poller.run(poll_interval, rx).await }.instrument(span),
            ));
        }

        // === Tick task: daily report and downstream posting ===
        {
            let mut monitor = self;
            let mut rx = shutdown_rx.clone();
            handles.push(tokio::spawn(
                async move {
                    info!("Tick loop started");
                    loop {
                        let report = monitor.tick_once().await;
                        if report != TickReport::default() {
                            debug!("Tick: {:?}", report);
                        }
                        if *rx.borrow() {
                            break;
                        }
                        tokio::select! {
                            _ = tokio::time::sleep(tick_interval) => {}
                            changed = rx.changed() => {
                                if changed.is_err() || *rx.borrow() {
                                    break;
                                }
                            }
                        }
                    }
                    info!("Tick loop stopped");
                }
                .instrument(info_span!("tick_loop")),
            ));
        }

        shutdown.await;
        if shutdown_tx.send(true).is_err() {
            warn!("All loops already stopped");
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Loop task panicked: {}", e);
            }
        }

        for (name, registry) in [("email", email_registry), ("file", file_registry)] {
            if let Err(e) = registry.lock().await.persist() {
                error!("Failed to persist {} registry on shutdown: {:#}", name, e);
            }
        }
        info!("Monitor stopped");
        Ok(())
    }
}
