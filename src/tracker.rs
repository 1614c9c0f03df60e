use chrono::{DateTime, NaiveDate, NaiveTime, Timelike};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::types::DailyActionRecord;

/// State of today's scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    NotSent,
    Sent(NaiveDate),
}

/// Gate allowing the daily report at most once per calendar date.
#[derive(Debug, Clone)]
pub struct DailyTracker {
    window_start: NaiveTime,
    window_end: NaiveTime,
    state: TrackerState,
}

impl DailyTracker {
    pub fn new(window_start: NaiveTime, window_end: NaiveTime) -> Self {
        Self {
            window_start,
            window_end,
            state: TrackerState::NotSent,
        }
    }

    /// Restore from the persisted record: already sent if the record is
    /// dated `today`.
    pub fn restore(
        window_start: NaiveTime,
        window_end: NaiveTime,
        record: Option<DailyActionRecord>,
        today: NaiveDate,
    ) -> Self {
        let mut tracker = Self::new(window_start, window_end);
        if let Some(record) = record {
            if record.last_sent_date == today {
                info!(
                    "Daily report already sent today at {}",
                    record.last_sent_time
                );
                tracker.state = TrackerState::Sent(today);
            }
        }
        tracker
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn sent_on(&self, date: NaiveDate) -> bool {
        self.state == TrackerState::Sent(date)
    }

    /// Reset to `NotSent` when the date moved past the recorded send.
    pub fn on_date(&mut self, today: NaiveDate) {
        if let TrackerState::Sent(date) = self.state {
            if date != today {
                debug!("Daily tracker reset for {}", today);
                self.state = TrackerState::NotSent;
            }
        }
    }

    /// Whether `now` falls inside `[window_start, window_end)`.
    pub fn in_window(&self, now: &DateTime<Tz>) -> bool {
        let time = now.time();
        time >= self.window_start && time < self.window_end
    }

    /// Whether an attempt should be made at `now`.
    pub fn should_fire(&mut self, now: &DateTime<Tz>, urgent: bool) -> bool {
        let today = now.date_naive();
        self.on_date(today);
        match self.state {
            TrackerState::Sent(_) => false,
            TrackerState::NotSent => urgent || self.in_window(now),
        }
    }

    /// Record a confirmed send and return the record to persist.
    pub fn mark_sent(&mut self, now: &DateTime<Tz>) -> DailyActionRecord {
        let record = DailyActionRecord {
            last_sent_date: now.date_naive(),
            last_sent_time: now.time().with_nanosecond(0).unwrap_or(now.time()),
        };
        self.state = TrackerState::Sent(record.last_sent_date);
        record
    }
}
