//! Wall-clock access in the monitor's fixed time zone.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Source of "now" in a fixed zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Real clock converting `Utc::now()` into the configured zone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Settable clock for tests and replays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Tz>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Build from a local wall time in `tz`. `None` if the wall time is not
    /// unique in the zone (DST gap or overlap).
    pub fn at(tz: Tz, year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
        tz.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .map(Self::new)
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Tz> {
        *self.now.lock().unwrap()
    }
}
