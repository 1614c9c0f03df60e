//! Unit tests for the orchestrator tick.
//!
//! Every test drives `tick_once` with a `ManualClock` and mock collaborators
//! inside a temp directory.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveDate, TimeZone};
use chrono_tz::America::New_York;
use tempfile::TempDir;

use super::core::{Collaborators, Monitor};
use crate::artifacts::ArtifactStore;
use crate::clock::{Clock, ManualClock};
use crate::config::BaseConfig;
use crate::counter::{CounterVariant, MockCounter};
use crate::ledger::LedgerStore;
use crate::notifier::{MockNotifier, NotifierVariant};
use crate::poster::{MockPoster, PosterVariant};
use crate::source::{MockSource, SourceVariant};
use crate::types::{Category, SourceId, TickReport};

// ==================== TEST HELPERS ====================

struct Harness {
    _dir: TempDir,
    config: BaseConfig,
    clock: ManualClock,
    notifier: MockNotifier,
    poster: MockPoster,
    counter: MockCounter,
}

impl Harness {
    fn new(recipients: &[&str]) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = BaseConfig {
            state_dir: dir.path().join("state"),
            source_a_scratch: dir.path().join("a_out"),
            source_b_scratch: dir.path().join("b_out"),
            workbook_path: dir.path().join("report.xlsx"),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            ..BaseConfig::default()
        };
        Ok(Self {
            _dir: dir,
            config,
            clock: ManualClock::at(New_York, 2025, 1, 10, 8, 0).unwrap(),
            notifier: MockNotifier::new(),
            poster: MockPoster::new(),
            counter: MockCounter::new(),
        })
    }

    fn monitor(&self) -> Result<Monitor> {
        Monitor::new(
            self.config.clone(),
            Arc::new(self.clock.clone()),
            Collaborators {
                source_a: SourceVariant::Mock(MockSource::new(SourceId::SourceA)),
                source_b: SourceVariant::Mock(MockSource::new(SourceId::SourceB)),
                notifier: NotifierVariant::Mock(self.notifier.clone()),
                poster: PosterVariant::Mock(self.poster.clone()),
                counter: CounterVariant::Mock(self.counter.clone()),
            },
        )
    }

    fn at(&self, day: u32, hour: u32, minute: u32) {
        let now = New_York
            .with_ymd_and_hms(2025, 1, day, hour, minute, 0)
            .unwrap();
        self.clock.set(now);
    }

    fn write_artifact(&self, name: &str, body: &str) {
        ArtifactStore::write(&self.config.source_a_scratch, name, body.as_bytes()).unwrap();
    }

    fn scratch_files(&self) -> usize {
        ArtifactStore::new(self.config.scratch_dirs())
            .scan()
            .unwrap()
            .len()
    }
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
}

const PAST_DUE_JOB: &str = "Job ID: TX-100\nTitle: Analyst\nDue Date: 2025-01-05\n";
const ACTIVE_JOB: &str = "Job ID: TX-200\nTitle: Engineer\nDue Date: 2025-01-20\n";

// ==================== TESTS: daily report ====================

#[tokio::test]
async fn test_daily_report_fires_once_in_window() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", PAST_DUE_JOB);
    h.write_artifact("m2", ACTIVE_JOB);

    h.at(10, 9, 25);
    let report = monitor.tick_once().await;
    assert!(report.daily_sent);

    h.at(10, 9, 26);
    assert!(!monitor.tick_once().await.daily_sent);
    h.at(10, 9, 39);
    assert!(!monitor.tick_once().await.daily_sent);

    let sent = h.notifier.get_sent();
    assert_eq!(sent.len(), 1);
    let (notification, recipients) = &sent[0];
    assert_eq!(recipients, &vec!["ops@example.com".to_string()]);
    assert_eq!(notification.attachments, vec![h.config.workbook_path.clone()]);
    assert!(notification.body.contains("Active jobs: 1"));

    let record = monitor.email_registry.lock().await.daily_record().unwrap();
    assert_eq!(record.last_sent_date, d(10));

    let ledger = LedgerStore::new(&h.config.workbook_path).load(d(10));
    assert_eq!(ledger.past_due()[0].job_key, "TX-100");
    assert_eq!(ledger.active()[0].job_key, "TX-200");
    Ok(())
}

#[tokio::test]
async fn test_outside_window_does_not_fire() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;

    h.at(10, 9, 24);
    assert!(!monitor.tick_once().await.daily_sent);
    h.at(10, 9, 40);
    assert!(!monitor.tick_once().await.daily_sent);
    assert_eq!(h.notifier.attempts(), 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_send_retries_and_cleans_up_only_after_success() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", PAST_DUE_JOB);
    h.notifier.fail_next(1);

    h.at(10, 9, 25);
    assert!(!monitor.tick_once().await.daily_sent);
    assert_eq!(h.scratch_files(), 1);
    assert!(monitor.email_registry.lock().await.daily_record().is_none());

    h.at(10, 9, 26);
    assert!(monitor.tick_once().await.daily_sent);
    assert_eq!(h.scratch_files(), 0);
    assert!(monitor.file_registry.lock().await.is_empty(Category::Files));
    assert_eq!(h.notifier.attempts(), 2);
    Ok(())
}

#[tokio::test]
async fn test_urgent_request_fires_outside_window_once() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    let urgent = monitor.urgent_sender();

    h.at(10, 7, 0);
    urgent.send(()).await?;
    assert!(monitor.tick_once().await.daily_sent);

    urgent.send(()).await?;
    assert!(!monitor.tick_once().await.daily_sent);
    h.at(10, 9, 30);
    assert!(!monitor.tick_once().await.daily_sent);
    assert_eq!(h.notifier.get_sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_restart_on_same_day_does_not_resend() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    {
        let mut monitor = h.monitor()?;
        h.at(10, 9, 25);
        assert!(monitor.tick_once().await.daily_sent);
    }

    let mut restarted = h.monitor()?;
    h.at(10, 9, 30);
    assert!(!restarted.tick_once().await.daily_sent);

    h.at(11, 9, 30);
    assert!(restarted.tick_once().await.daily_sent);
    assert_eq!(h.notifier.get_sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_submission_counts_computed_once_across_reports() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.counter.set_count("TX-200", 3);
    h.write_artifact("m2", ACTIVE_JOB);

    h.at(10, 9, 25);
    assert!(monitor.tick_once().await.daily_sent);

    // Same job seen again the next day.
    h.write_artifact("m2", ACTIVE_JOB);
    h.at(11, 9, 25);
    assert!(monitor.tick_once().await.daily_sent);

    assert_eq!(h.counter.calls_for("TX-200"), 1);
    assert_eq!(h.counter.get_calls()[0], ("TX-200".to_string(), d(10), d(20)));
    let ledger = LedgerStore::new(&h.config.workbook_path).load(d(11));
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get("TX-200").unwrap().submission_count, Some(3));
    Ok(())
}

#[tokio::test]
async fn test_failed_count_retried_next_report() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.counter.fail("TX-200");
    h.write_artifact("m2", ACTIVE_JOB);

    h.at(10, 9, 25);
    assert!(monitor.tick_once().await.daily_sent);
    let ledger = LedgerStore::new(&h.config.workbook_path).load(d(10));
    assert_eq!(ledger.get("TX-200").unwrap().submission_count, None);

    h.counter.heal("TX-200");
    h.counter.set_count("TX-200", 2);
    h.at(11, 9, 25);
    assert!(monitor.tick_once().await.daily_sent);
    let ledger = LedgerStore::new(&h.config.workbook_path).load(d(11));
    assert_eq!(ledger.get("TX-200").unwrap().submission_count, Some(2));
    assert_eq!(h.counter.calls_for("TX-200"), 2);
    Ok(())
}

#[tokio::test]
async fn test_no_recipients_finalizes_without_sending() -> Result<()> {
    let h = Harness::new(&[])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", ACTIVE_JOB);

    h.at(10, 9, 30);
    assert!(!monitor.tick_once().await.daily_sent);
    h.at(10, 9, 31);
    monitor.tick_once().await;

    assert_eq!(h.notifier.attempts(), 0);
    assert_eq!(h.counter.calls_for("TX-200"), 1);
    assert!(h.config.workbook_path.exists());
    assert_eq!(h.scratch_files(), 1);
    assert!(monitor.email_registry.lock().await.daily_record().is_none());
    Ok(())
}

// ==================== TESTS: downstream posting ====================

#[tokio::test]
async fn test_posts_each_fingerprint_once() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", ACTIVE_JOB);

    assert_eq!(monitor.tick_once().await.posted, 1);
    assert_eq!(monitor.tick_once().await.posted, 0);

    // Same bytes rewritten: same fingerprint.
    h.write_artifact("m1", ACTIVE_JOB);
    assert_eq!(monitor.tick_once().await.posted, 0);

    // Changed bytes: new fingerprint.
    h.write_artifact("m1", PAST_DUE_JOB);
    assert_eq!(monitor.tick_once().await.posted, 1);

    let posted: Vec<_> = h.poster.get_posted().into_iter().map(|r| r.job_key).collect();
    assert_eq!(posted, vec!["TX-200", "TX-100"]);
    assert!(h.notifier.get_sent().is_empty());
    assert!(monitor.file_registry.lock().await.last_processing_time().is_some());
    Ok(())
}

#[tokio::test]
async fn test_failed_post_is_not_retried() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", ACTIVE_JOB);
    h.poster.set_always_fail(true);

    assert_eq!(monitor.tick_once().await.post_failures, 1);
    h.poster.set_always_fail(false);
    let report = monitor.tick_once().await;
    assert_eq!((report.posted, report.post_failures), (0, 0));
    Ok(())
}

#[tokio::test]
async fn test_rollover_keeps_fingerprints_of_artifacts_on_disk() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", ACTIVE_JOB);

    let first = monitor.tick_once().await;
    assert!(!first.rolled_over);
    assert_eq!(first.posted, 1);

    h.clock.advance(Duration::days(1));
    let next = monitor.tick_once().await;
    assert!(next.rolled_over);
    assert_eq!(next.posted, 0);
    assert_eq!(h.poster.get_posted().len(), 1);
    assert_eq!(monitor.file_registry.lock().await.len(Category::Files), 1);
    Ok(())
}

#[tokio::test]
async fn test_rollover_drops_fingerprints_of_removed_artifacts() -> Result<()> {
    let h = Harness::new(&[])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", ACTIVE_JOB);
    assert_eq!(monitor.tick_once().await.posted, 1);

    let store = ArtifactStore::new(h.config.scratch_dirs());
    store.remove(&store.scan()?)?;
    h.clock.advance(Duration::days(1));
    assert!(monitor.tick_once().await.rolled_over);
    assert!(monitor.file_registry.lock().await.is_empty(Category::Files));
    Ok(())
}

#[tokio::test]
async fn test_artifact_after_daily_send_not_reposted_after_midnight() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;

    h.at(10, 9, 25);
    assert!(monitor.tick_once().await.daily_sent);

    h.write_artifact("late", ACTIVE_JOB);
    h.at(10, 11, 0);
    assert_eq!(monitor.tick_once().await.posted, 1);

    h.at(11, 0, 5);
    let report = monitor.tick_once().await;
    assert!(report.rolled_over);
    assert_eq!(report.posted, 0);
    assert_eq!(h.poster.get_posted().len(), 1);
    assert_eq!(h.scratch_files(), 1);
    Ok(())
}

#[tokio::test]
async fn test_without_recipients_artifacts_posted_once_across_days() -> Result<()> {
    let h = Harness::new(&[])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", ACTIVE_JOB);

    for day in 10..14 {
        h.at(day, 9, 30);
        monitor.tick_once().await;
    }
    assert_eq!(h.poster.get_posted().len(), 1);
    assert_eq!(h.scratch_files(), 1);
    Ok(())
}

// ==================== TESTS: daily report and posting ====================

#[tokio::test]
async fn test_artifact_arriving_before_send_is_posted_then_cleaned() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;

    h.at(10, 9, 24);
    assert_eq!(monitor.tick_once().await, TickReport::default());

    h.write_artifact("fresh", ACTIVE_JOB);
    h.at(10, 9, 25);
    let report = monitor.tick_once().await;
    assert!(report.daily_sent);
    assert_eq!(report.posted, 1);

    h.at(10, 9, 26);
    assert_eq!(monitor.tick_once().await.posted, 0);

    let posted: Vec<_> = h.poster.get_posted().into_iter().map(|r| r.job_key).collect();
    assert_eq!(posted, vec!["TX-200"]);
    assert_eq!(h.scratch_files(), 0);
    assert!(monitor.file_registry.lock().await.is_empty(Category::Files));
    let ledger = LedgerStore::new(&h.config.workbook_path).load(d(10));
    assert!(ledger.get("TX-200").is_some());
    Ok(())
}

#[tokio::test]
async fn test_daily_send_keeps_artifacts_not_yet_posted() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("unposted", ACTIVE_JOB);

    h.at(10, 9, 25);
    let now = h.clock.now();
    assert!(monitor.daily_action_once(&now).await);
    assert_eq!(h.scratch_files(), 1);

    h.at(10, 9, 26);
    assert_eq!(monitor.tick_once().await.posted, 1);
    assert_eq!(h.poster.get_posted().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_retried_report_still_lists_new_jobs() -> Result<()> {
    let h = Harness::new(&["ops@example.com"])?;
    let mut monitor = h.monitor()?;
    h.write_artifact("m1", PAST_DUE_JOB);
    h.notifier.fail_next(1);

    h.at(10, 9, 25);
    assert!(!monitor.tick_once().await.daily_sent);
    h.at(10, 9, 26);
    assert!(monitor.tick_once().await.daily_sent);

    let (notification, _) = h.notifier.get_sent().remove(0);
    assert!(notification.body.contains("New since the last report"));
    assert!(notification.body.contains("TX-100"));
    assert!(monitor.pending_new_keys.is_empty());
    Ok(())
}
