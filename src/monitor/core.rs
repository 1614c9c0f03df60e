//! Monitor struct and initialization - no loop logic.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use kanal::{unbounded_async, AsyncReceiver, AsyncSender};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::clock::{Clock, SystemClock};
use crate::config::BaseConfig;
use crate::coordinator::Coordinator;
use crate::counter::{CounterVariant, DirectoryCounter};
use crate::error::WatchError;
use crate::ledger::LedgerStore;
use crate::notifier::{FallbackNotifier, NoopNotifier, NotifierVariant, OutboxNotifier};
use crate::parser::{KeyValueExtractor, TemplateFormatter};
use crate::poller::SourcePoller;
use crate::poster::{OutboxPoster, PosterVariant};
use crate::registry::{Registry, SharedRegistry};
use crate::source::{DirectorySource, SourceVariant};
use crate::tracker::DailyTracker;
use crate::traits::{Extractor, Formatter};
use crate::types::SourceId;

/// External collaborators the monitor is wired with.
pub struct Collaborators {
    pub source_a: SourceVariant,
    pub source_b: SourceVariant,
    pub notifier: NotifierVariant,
    pub poster: PosterVariant,
    pub counter: CounterVariant,
}

/// Top-level orchestrator owning the daily tracker and both pollers.
pub struct Monitor {
    pub config: BaseConfig,

    pub clock: Arc<dyn Clock>,

    /// Processed item ids per source, plus the daily send record.
    pub email_registry: SharedRegistry,

    /// Fingerprints of scratch artifacts already posted downstream.
    pub file_registry: SharedRegistry,

    pub coordinator: Coordinator,

    pub pollers: Vec<Arc<SourcePoller>>,

    pub artifacts: ArtifactStore,

    pub ledger_store: LedgerStore,

    pub extractor: Arc<dyn Extractor>,

    pub notifier: Arc<NotifierVariant>,

    pub poster: PosterVariant,

    pub counter: CounterVariant,

    pub tracker: DailyTracker,

    /// Date seen by the previous tick; `None` before the first tick.
    pub last_tick_date: Option<NaiveDate>,

    /// Job keys added since the last confirmed report, listed in the next one.
    pub pending_new_keys: Vec<String>,

    pub(crate) urgent_tx: AsyncSender<()>,
    pub(crate) urgent_rx: AsyncReceiver<()>,
}

impl Monitor {
    /// Wire the monitor from `config` with the given collaborators.
    pub fn new(config: BaseConfig, clock: Arc<dyn Clock>, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let (window_start, window_end) = config.daily_window()?;

        let email_registry = Registry::load(config.email_state_path(), config.registry_cap);
        let file_registry = Registry::load(config.file_state_path(), config.registry_cap);
        let tracker = DailyTracker::restore(
            window_start,
            window_end,
            email_registry.daily_record(),
            clock.today(),
        );
        let email_registry: SharedRegistry = Arc::new(Mutex::new(email_registry));
        let file_registry: SharedRegistry = Arc::new(Mutex::new(file_registry));

        if config.recipients.is_empty() {
            warn!(
                "{}; the daily report is disabled",
                WatchError::Configuration("no recipients configured".into())
            );
        }

        let coordinator = Coordinator::new();
        let extractor: Arc<dyn Extractor> = Arc::new(KeyValueExtractor::new()?);
        let formatter: Arc<dyn Formatter> = Arc::new(TemplateFormatter::default());
        let Collaborators {
            source_a,
            source_b,
            notifier,
            poster,
            counter,
        } = collaborators;
        let notifier = Arc::new(notifier);

        let pollers = [
            (SourceId::SourceA, source_a, config.source_a_scratch.clone(), config.source_a_mark_policy),
            (SourceId::SourceB, source_b, config.source_b_scratch.clone(), config.source_b_mark_policy),
        ]
        .into_iter()
        .map(|(source_id, source, scratch_dir, policy)| {
            Arc::new(SourcePoller {
                source_id,
                source,
                extractor: Arc::clone(&extractor),
                formatter: Arc::clone(&formatter),
                notifier: Arc::clone(&notifier),
                registry: Arc::clone(&email_registry),
                coordinator: coordinator.clone(),
                clock: Arc::clone(&clock),
                scratch_dir,
                recipients: config.recipients.clone(),
                policy,
                lock_wait: config.lock_wait(),
                lock_timeout: config.lock_timeout(),
            })
        })
        .collect();

        let (urgent_tx, urgent_rx) = unbounded_async();

        Ok(Self {
            artifacts: ArtifactStore::new(config.scratch_dirs()),
            ledger_store: LedgerStore::new(config.workbook_path.clone()),
            config,
            clock,
            email_registry,
            file_registry,
            coordinator,
            pollers,
            extractor,
            notifier,
            poster,
            counter,
            tracker,
            last_tick_date: None,
            pending_new_keys: Vec::new(),
            urgent_tx,
            urgent_rx,
        })
    }

    /// Initialize with the local directory-backed collaborators.
    pub fn initialize(config: BaseConfig) -> Result<Self> {
        let tz = config.tz()?;

        let source_a = SourceVariant::Directory(DirectorySource::new(
            SourceId::SourceA,
            config.source_a_inbox.clone(),
        ));
        let source_b = SourceVariant::Directory(DirectorySource::new(
            SourceId::SourceB,
            config.source_b_inbox.clone(),
        ));

        let mut outboxes: Vec<NotifierVariant> = config
            .notify_outboxes
            .iter()
            .map(|dir| NotifierVariant::Outbox(OutboxNotifier::new(dir.clone())))
            .collect();
        let notifier = match outboxes.len() {
            0 => {
                warn!("No notification outbox configured, notifications are dropped");
                NotifierVariant::Noop(NoopNotifier)
            }
            1 => outboxes.remove(0),
            _ => NotifierVariant::Fallback(FallbackNotifier::new(outboxes)),
        };

        let collaborators = Collaborators {
            source_a,
            source_b,
            notifier,
            poster: PosterVariant::Outbox(OutboxPoster::new(config.post_outbox.clone())),
            counter: CounterVariant::Directory(DirectoryCounter::new(
                config.submissions_dir.clone(),
                tz,
            )),
        };

        info!(
            "Monitor initialized (state_dir={:?}, workbook={:?}, timezone={})",
            config.state_dir, config.workbook_path, tz
        );
        Self::new(config, Arc::new(SystemClock::new(tz)), collaborators)
    }

    /// Handle for requesting the daily report outside its window. The request
    /// is consumed by the next tick and still honours once-per-day.
    pub fn urgent_sender(&self) -> AsyncSender<()> {
        self.urgent_tx.clone()
    }
}
