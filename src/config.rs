use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::NaiveTime;
use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::WatchError;

/// When a poller records an item in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MarkPolicy {
    /// Mark once the item's side effects succeeded; transient failures retry.
    AfterSuccess,
    /// Mark every item on entering the protected section.
    Eager,
}

/// Base configuration for the monitor.
///
/// Every field can be given on the command line or through the matching
/// `PORTALWATCH_*` environment variable.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "portalwatch", version, about)]
pub struct BaseConfig {
    /// Directory holding the registry state files.
    #[arg(long, env = "PORTALWATCH_STATE_DIR", default_value = "./state")]
    pub state_dir: PathBuf,

    /// Inbox directory listed by source A.
    #[arg(long, env = "PORTALWATCH_SOURCE_A_INBOX", default_value = "./inbox/source_a")]
    pub source_a_inbox: PathBuf,

    /// Inbox directory listed by source B.
    #[arg(long, env = "PORTALWATCH_SOURCE_B_INBOX", default_value = "./inbox/source_b")]
    pub source_b_inbox: PathBuf,

    /// Scratch directory source A writes raw artifacts into.
    #[arg(long, env = "PORTALWATCH_SOURCE_A_SCRATCH", default_value = "./dir_portal_outputs")]
    pub source_a_scratch: PathBuf,

    /// Scratch directory source B writes raw artifacts into.
    #[arg(long, env = "PORTALWATCH_SOURCE_B_SCRATCH", default_value = "./vms_outputs")]
    pub source_b_scratch: PathBuf,

    /// Outbox directories for notifications, tried in order.
    #[arg(
        long,
        env = "PORTALWATCH_NOTIFY_OUTBOXES",
        value_delimiter = ',',
        default_value = "./outbox/mail"
    )]
    pub notify_outboxes: Vec<PathBuf>,

    /// Outbox directory for downstream postings.
    #[arg(long, env = "PORTALWATCH_POST_OUTBOX", default_value = "./outbox/postings")]
    pub post_outbox: PathBuf,

    /// Directory scanned when counting submissions.
    #[arg(long, env = "PORTALWATCH_SUBMISSIONS_DIR", default_value = "./submissions")]
    pub submissions_dir: PathBuf,

    /// Path of the two-sheet ledger workbook.
    #[arg(long, env = "PORTALWATCH_WORKBOOK", default_value = "./job_tracker_report.xlsx")]
    pub workbook_path: PathBuf,

    /// Seconds between poller cycles.
    #[arg(long, env = "PORTALWATCH_POLL_INTERVAL_SECS", default_value_t = 15)]
    pub poll_interval_secs: u64,

    /// Seconds between orchestrator ticks.
    #[arg(long, env = "PORTALWATCH_TICK_INTERVAL_SECS", default_value_t = 60)]
    pub tick_interval_secs: u64,

    /// Longest a poller waits for the other source before proceeding anyway.
    #[arg(long, env = "PORTALWATCH_LOCK_WAIT_SECS", default_value_t = 30)]
    pub lock_wait_secs: u64,

    /// Longest a poller tries to acquire the scraping resource.
    #[arg(long, env = "PORTALWATCH_LOCK_TIMEOUT_SECS", default_value_t = 5)]
    pub lock_timeout_secs: u64,

    /// Start of the daily report window, `HH:MM` in the fixed zone.
    #[arg(long, env = "PORTALWATCH_DAILY_START", default_value = "09:25")]
    pub daily_window_start: String,

    /// End of the daily report window (exclusive), `HH:MM`.
    #[arg(long, env = "PORTALWATCH_DAILY_END", default_value = "09:40")]
    pub daily_window_end: String,

    /// Recipients of notifications. Empty disables the daily report.
    #[arg(long, env = "PORTALWATCH_RECIPIENTS", value_delimiter = ',')]
    pub recipients: Vec<String>,

    /// Maximum keys kept per registry category.
    #[arg(long, env = "PORTALWATCH_REGISTRY_CAP", default_value_t = 1000)]
    pub registry_cap: usize,

    /// IANA time zone used for every date and time comparison.
    #[arg(long, env = "PORTALWATCH_TIMEZONE", default_value = "America/New_York")]
    pub timezone: String,

    /// Mark policy for source A.
    #[arg(long, env = "PORTALWATCH_SOURCE_A_MARK", value_enum, default_value = "after-success")]
    pub source_a_mark_policy: MarkPolicy,

    /// Mark policy for source B.
    #[arg(long, env = "PORTALWATCH_SOURCE_B_MARK", value_enum, default_value = "eager")]
    pub source_b_mark_policy: MarkPolicy,
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            state_dir: PathBuf::from("./state"),
            source_a_inbox: PathBuf::from("./inbox/source_a"),
            source_b_inbox: PathBuf::from("./inbox/source_b"),
            source_a_scratch: PathBuf::from("./dir_portal_outputs"),
            source_b_scratch: PathBuf::from("./vms_outputs"),
            notify_outboxes: vec![PathBuf::from("./outbox/mail")],
            post_outbox: PathBuf::from("./outbox/postings"),
            submissions_dir: PathBuf::from("./submissions"),
            workbook_path: PathBuf::from("./job_tracker_report.xlsx"),
            poll_interval_secs: 15,
            tick_interval_secs: 60,
            lock_wait_secs: 30,
            lock_timeout_secs: 5,
            daily_window_start: "09:25".to_string(),
            daily_window_end: "09:40".to_string(),
            recipients: Vec::new(),
            registry_cap: 1000,
            timezone: "America/New_York".to_string(),
            source_a_mark_policy: MarkPolicy::AfterSuccess,
            source_b_mark_policy: MarkPolicy::Eager,
        }
    }
}

impl BaseConfig {
    /// Check the fields that cannot be validated by clap alone.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        let (start, end) = self.daily_window()?;
        if start >= end {
            return Err(WatchError::Configuration(format!(
                "daily window start {} must precede end {}",
                start, end
            ))
            .into());
        }
        if self.registry_cap == 0 {
            return Err(WatchError::Configuration("registry_cap must be positive".into()).into());
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            WatchError::Configuration(format!("invalid timezone '{}': {}", self.timezone, e))
                .into()
        })
    }

    pub fn daily_window(&self) -> Result<(NaiveTime, NaiveTime)> {
        Ok((
            parse_hhmm(&self.daily_window_start)?,
            parse_hhmm(&self.daily_window_end)?,
        ))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_secs(self.lock_wait_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn email_state_path(&self) -> PathBuf {
        self.state_dir.join("processed_emails.json")
    }

    pub fn file_state_path(&self) -> PathBuf {
        self.state_dir.join("processed_files.json")
    }

    pub fn scratch_dirs(&self) -> Vec<PathBuf> {
        vec![self.source_b_scratch.clone(), self.source_a_scratch.clone()]
    }
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
        WatchError::Configuration(format!("invalid HH:MM time '{}': {}", raw, e)).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BaseConfig::default();
        assert!(config.validate().is_ok());
        let (start, end) = config.daily_window().unwrap();
        assert_eq!(start, NaiveTime::from_hms_opt(9, 25, 0).unwrap());
        assert_eq!(end, NaiveTime::from_hms_opt(9, 40, 0).unwrap());
    }

    #[test]
    fn test_parse_from_args() {
        let config = BaseConfig::parse_from([
            "portalwatch",
            "--recipients",
            "a@example.com,b@example.com",
            "--poll-interval-secs",
            "20",
            "--source-b-mark-policy",
            "after-success",
        ]);
        assert_eq!(config.recipients.len(), 2);
        assert_eq!(config.poll_interval_secs, 20);
        assert_eq!(config.source_b_mark_policy, MarkPolicy::AfterSuccess);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let config = BaseConfig {
            daily_window_start: "10:00".into(),
            daily_window_end: "09:00".into(),
            ..BaseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_timezone_rejected() {
        let config = BaseConfig {
            timezone: "Mars/Olympus".into(),
            ..BaseConfig::default()
        };
        assert!(config.tz().is_err());
    }
}
