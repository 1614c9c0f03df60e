use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::Poster;
use crate::types::JobRecord;

/// Mock poster for testing.
/// Stores posted records in memory.
#[derive(Clone, Default)]
pub struct MockPoster {
    pub posted: Arc<Mutex<Vec<JobRecord>>>,
    pub always_fail: Arc<Mutex<bool>>,
}

impl MockPoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_always_fail(&self, fail: bool) {
        *self.always_fail.lock().unwrap() = fail;
    }

    pub fn get_posted(&self) -> Vec<JobRecord> {
        self.posted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Poster for MockPoster {
    fn name(&self) -> &'static str {
        "mock-poster"
    }

    async fn post(&self, record: &JobRecord) -> Result<()> {
        if *self.always_fail.lock().unwrap() {
            return Err(anyhow!("mock poster failure for {}", record.job_key));
        }
        self.posted.lock().unwrap().push(record.clone());
        tracing::debug!("MockPoster: posted {}", record.job_key);
        Ok(())
    }
}
