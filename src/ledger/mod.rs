//! Cumulative job ledger split into Active and PastDue buckets.
//!
//! - `dates`: due-date parsing and rendering
//! - `workbook`: two-sheet xlsx persistence

pub mod dates;
pub mod workbook;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::traits::SubmissionCounter;
use crate::types::JobRecord;

pub use dates::{format_due_date, parse_due_date};
pub use workbook::{ACTIVE_SHEET, PAST_DUE_SHEET};

/// Due-date derived classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Active,
    PastDue,
}

impl Bucket {
    /// Text written to the status column.
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Active => "Active",
            Bucket::PastDue => "Past Due",
        }
    }
}

/// One tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub job_key: String,
    pub title: String,
    /// `None` means open-ended.
    pub due_date: Option<NaiveDate>,
    /// `None` until counted; fixed afterwards.
    pub submission_count: Option<u64>,
    pub bucket: Bucket,
    pub first_seen_date: NaiveDate,
}

impl LedgerEntry {
    pub fn new(record: &JobRecord, first_seen_date: NaiveDate) -> Self {
        Self {
            job_key: record.job_key.clone(),
            title: record.title.clone(),
            due_date: record.due_date,
            submission_count: None,
            bucket: Bucket::Active,
            first_seen_date,
        }
    }

    /// Closed window submissions are counted over.
    pub fn counting_window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.due_date.unwrap_or(today);
        if end < self.first_seen_date {
            (end, self.first_seen_date)
        } else {
            (self.first_seen_date, end)
        }
    }
}

/// All entries, partitioned by bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    active: Vec<LedgerEntry>,
    past_due: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-bucketed entries, keeping the first of any
    /// duplicated job key.
    pub fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        let mut ledger = Ledger::new();
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.job_key.clone()) {
                debug!("Dropping duplicate ledger row for {}", entry.job_key);
                continue;
            }
            match entry.bucket {
                Bucket::Active => ledger.active.push(entry),
                Bucket::PastDue => ledger.past_due.push(entry),
            }
        }
        ledger
    }

    pub fn active(&self) -> &[LedgerEntry] {
        &self.active
    }

    pub fn past_due(&self) -> &[LedgerEntry] {
        &self.past_due
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.past_due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.active.iter().chain(self.past_due.iter())
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut LedgerEntry> {
        self.active.iter_mut().chain(self.past_due.iter_mut())
    }

    pub fn get(&self, job_key: &str) -> Option<&LedgerEntry> {
        self.entries().find(|e| e.job_key == job_key)
    }

    /// Add records whose job key is not yet tracked; existing entries keep
    /// their static fields. Returns the newly added keys in input order.
    pub fn merge(&mut self, records: &[JobRecord], today: NaiveDate) -> Vec<String> {
        let mut known: HashSet<String> = self.entries().map(|e| e.job_key.clone()).collect();
        let mut added = Vec::new();

        for record in records {
            if record.job_key.trim().is_empty() {
                continue;
            }
            if !known.insert(record.job_key.clone()) {
                continue;
            }
            self.active.push(LedgerEntry::new(record, today));
            added.push(record.job_key.clone());
        }

        if !added.is_empty() {
            info!("Ledger merge added {} new jobs", added.len());
        }
        added
    }

    /// Move Active entries whose due date is before `today` to PastDue.
    /// PastDue entries never move back.
    pub fn reclassify(&mut self, today: NaiveDate) -> usize {
        let (expired, still_active): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|e| e.due_date.is_some_and(|due| due < today));

        self.active = still_active;
        let moved = expired.len();
        for mut entry in expired {
            entry.bucket = Bucket::PastDue;
            self.past_due.push(entry);
        }
        if moved > 0 {
            debug!("Reclassified {} entries as past due", moved);
        }
        moved
    }

    /// Ascending by due date: open-ended last in Active, first in PastDue.
    pub fn sort(&mut self) {
        self.active
            .sort_by_key(|e| (e.due_date.is_none(), e.due_date));
        self.past_due.sort_by_key(|e| e.due_date);
    }

    /// Count submissions for `new_job_keys` and any entry still uncounted.
    ///
    /// Entries that already carry a count are never passed to `counter`
    /// again. A failed count leaves the entry uncounted for the next run.
    /// Returns how many entries were counted.
    pub async fn compute_submission_counts<C>(
        &mut self,
        new_job_keys: &[String],
        counter: &C,
        today: NaiveDate,
    ) -> usize
    where
        C: SubmissionCounter + ?Sized,
    {
        let mut pending: Vec<String> = Vec::new();
        for key in new_job_keys
            .iter()
            .cloned()
            .chain(self.entries().filter(|e| e.submission_count.is_none()).map(|e| e.job_key.clone()))
        {
            if !pending.contains(&key) {
                pending.push(key);
            }
        }

        let mut counted = 0;
        for key in pending {
            let Some(entry) = self.entries_mut().find(|e| e.job_key == key) else {
                continue;
            };
            if entry.submission_count.is_some() {
                continue;
            }
            let (from, to) = entry.counting_window(today);
            match counter.count(&key, from, to).await {
                Ok(count) => {
                    debug!("{} submissions for {} in [{}, {}]", count, key, from, to);
                    entry.submission_count = Some(count);
                    counted += 1;
                }
                Err(e) => {
                    warn!("Submission count for {} failed, will retry: {:#}", key, e);
                }
            }
        }
        counted
    }
}

/// Ledger persisted as a workbook; the file is the source of truth.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted ledger; missing or unreadable storage yields an
    /// empty ledger.
    pub fn load(&self, today: NaiveDate) -> Ledger {
        workbook::read_workbook(&self.path, today)
    }

    pub fn persist(&self, ledger: &Ledger) -> Result<()> {
        workbook::write_workbook(&self.path, ledger)?;
        info!(
            "Ledger written to {:?}: {} active, {} past due",
            self.path,
            ledger.active().len(),
            ledger.past_due().len()
        );
        Ok(())
    }
}
