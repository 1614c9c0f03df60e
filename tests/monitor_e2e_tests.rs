use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, TimeZone};
use chrono_tz::America::New_York;

use portalwatch::clock::ManualClock;
use portalwatch::counter::MockCounter;
use portalwatch::notifier::MockNotifier;
use portalwatch::poster::MockPoster;
use portalwatch::source::DirectorySource;
use portalwatch::*;

// ===== Test Helper Functions =====

struct World {
    dir: tempfile::TempDir,
    config: BaseConfig,
    clock: ManualClock,
    notifier: MockNotifier,
    poster: MockPoster,
    counter: MockCounter,
}

impl World {
    fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        let config = BaseConfig {
            state_dir: root.join("state"),
            source_a_inbox: root.join("inbox_a"),
            source_b_inbox: root.join("inbox_b"),
            source_a_scratch: root.join("dir_portal_outputs"),
            source_b_scratch: root.join("vms_outputs"),
            workbook_path: root.join("job_tracker_report.xlsx"),
            poll_interval_secs: 1,
            tick_interval_secs: 1,
            lock_wait_secs: 1,
            lock_timeout_secs: 1,
            recipients: vec!["ops@example.com".to_string()],
            ..BaseConfig::default()
        };
        std::fs::create_dir_all(&config.source_a_inbox)?;
        std::fs::create_dir_all(&config.source_b_inbox)?;
        Ok(Self {
            dir,
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
                source_a: SourceVariant::Directory(DirectorySource::new(
                    SourceId::SourceA,
                    self.config.source_a_inbox.clone(),
                )),
                source_b: SourceVariant::Directory(DirectorySource::new(
                    SourceId::SourceB,
                    self.config.source_b_inbox.clone(),
                )),
                notifier: NotifierVariant::Mock(self.notifier.clone()),
                poster: PosterVariant::Mock(self.poster.clone()),
                counter: CounterVariant::Mock(self.counter.clone()),
            },
        )
    }

    async fn run_for(&self, millis: u64) -> Result<()> {
        self.monitor()?
            .run_until(tokio::time::sleep(Duration::from_millis(millis)))
            .await
    }
}

// ===== E2E Tests =====

#[tokio::test]
async fn test_monitor_e2e_poll_post_then_daily_report() -> Result<()> {
    portalwatch::telemetry::try_init();
    let world = World::new()?;
    std::fs::write(
        world.config.source_a_inbox.join("a-1.eml"),
        "Job ID: TX-530001\nTitle: Analyst\nDue Date: 2025-01-05\n",
    )?;
    std::fs::write(
        world.config.source_b_inbox.join("b-1.eml"),
        "Job ID: VA-778812\nTitle: Engineer\nDue Date: 01/20/2025\n",
    )?;

    // Morning: both sources processed and posted, no daily report yet.
    world.run_for(2500).await?;

    let per_item: Vec<_> = world.notifier.sent_subjects();
    assert_eq!(per_item.len(), 2);
    let mut posted: Vec<_> = world.poster.get_posted().into_iter().map(|r| r.job_key).collect();
    posted.sort();
    assert_eq!(posted, vec!["TX-530001", "VA-778812"]);

    let email_state = Registry::load(world.config.email_state_path(), 100);
    assert!(email_state.contains(Category::SourceA, "a-1"));
    assert!(email_state.contains(Category::SourceB, "b-1"));
    assert!(email_state.daily_record().is_none());
    let file_state = Registry::load(world.config.file_state_path(), 100);
    assert_eq!(file_state.len(Category::Files), 2);

    // Inside the window after a restart: report sent once, inboxes not reprocessed.
    world
        .clock
        .set(New_York.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap());
    world.run_for(2500).await?;

    let subjects = world.notifier.sent_subjects();
    assert_eq!(subjects.len(), 3);
    assert!(subjects[2].starts_with("Daily job report"));
    assert_eq!(world.poster.get_posted().len(), 2);

    let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    let ledger = LedgerStore::new(&world.config.workbook_path).load(today);
    assert_eq!(ledger.past_due().len(), 1);
    assert_eq!(ledger.past_due()[0].job_key, "TX-530001");
    assert_eq!(ledger.active()[0].job_key, "VA-778812");

    let email_state = Registry::load(world.config.email_state_path(), 100);
    assert_eq!(email_state.daily_record().unwrap().last_sent_date, today);
    let scratch = std::fs::read_dir(&world.config.source_a_scratch)?.count()
        + std::fs::read_dir(&world.config.source_b_scratch)?.count();
    assert_eq!(scratch, 0);

    // Restart again the same day: nothing is resent.
    world.run_for(1500).await?;
    assert_eq!(world.notifier.sent_subjects().len(), 3);
    assert!(world.dir.path().join("state").exists());
    Ok(())
}
