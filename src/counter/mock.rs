use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::traits::SubmissionCounter;

/// Mock counter for testing.
/// Returns preset counts and records every call.
#[derive(Clone, Default)]
pub struct MockCounter {
    pub counts: Arc<Mutex<HashMap<String, u64>>>,
    pub failing: Arc<Mutex<HashSet<String>>>,
    pub calls: Arc<Mutex<Vec<(String, NaiveDate, NaiveDate)>>>,
}

impl MockCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_count(&self, job_key: &str, count: u64) {
        self.counts.lock().unwrap().insert(job_key.to_string(), count);
    }

    pub fn fail(&self, job_key: &str) {
        self.failing.lock().unwrap().insert(job_key.to_string());
    }

    pub fn heal(&self, job_key: &str) {
        self.failing.lock().unwrap().remove(job_key);
    }

    pub fn get_calls(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, job_key: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _, _)| key == job_key)
            .count()
    }
}

#[async_trait]
impl SubmissionCounter for MockCounter {
    fn name(&self) -> &'static str {
        "mock-counter"
    }

    async fn count(&self, job_key: &str, from: NaiveDate, to: NaiveDate) -> Result<u64> {
        self.calls
            .lock()
            .unwrap()
            .push((job_key.to_string(), from, to));
        if self.failing.lock().unwrap().contains(job_key) {
            return Err(anyhow!("mock count failure for {}", job_key));
        }
        Ok(self.counts.lock().unwrap().get(job_key).copied().unwrap_or(0))
    }
}
