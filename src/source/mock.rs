use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::traits::Source;
use crate::types::{ItemDescriptor, RawArtifact, SourceId};

/// Mock source for testing.
/// Serves a fixed listing and records every fetch.
#[derive(Clone)]
pub struct MockSource {
    pub source: SourceId,
    pub items: Arc<Mutex<Vec<(ItemDescriptor, Vec<u8>)>>>,
    pub failing: Arc<Mutex<HashSet<String>>>,
    pub fetched: Arc<Mutex<Vec<String>>>,
    pub fail_listing: Arc<Mutex<bool>>,
}

impl MockSource {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            items: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            fetched: Arc::new(Mutex::new(Vec::new())),
            fail_listing: Arc::new(Mutex::new(false)),
        }
    }

    /// Append an item to the listing.
    pub fn push(&self, id: &str, body: &str) {
        let descriptor = ItemDescriptor {
            id: id.to_string(),
            source: self.source,
            label: format!("item {}", id),
        };
        self.items
            .lock()
            .unwrap()
            .push((descriptor, body.as_bytes().to_vec()));
    }

    /// Make fetches of `id` fail until [`MockSource::heal`] is called.
    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn heal(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn set_fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    /// Ids passed to `fetch`, in call order.
    pub fn get_fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> &'static str {
        "mock-source"
    }

    async fn list_candidates(&self) -> Result<Vec<ItemDescriptor>> {
        if *self.fail_listing.lock().unwrap() {
            return Err(anyhow!("mock listing failure"));
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .map(|(descriptor, _)| descriptor.clone())
            .collect())
    }

    async fn fetch(&self, item: &ItemDescriptor) -> Result<RawArtifact> {
        self.fetched.lock().unwrap().push(item.id.clone());
        if self.failing.lock().unwrap().contains(&item.id) {
            return Err(anyhow!("mock fetch failure for {}", item.id));
        }
        let items = self.items.lock().unwrap();
        let (_, body) = items
            .iter()
            .find(|(descriptor, _)| descriptor.id == item.id)
            .ok_or_else(|| anyhow!("unknown item {}", item.id))?;
        tracing::debug!("MockSource: fetched {}", item.id);
        Ok(RawArtifact::new(item.id.clone(), body.clone()))
    }
}
