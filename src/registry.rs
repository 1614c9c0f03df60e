use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::WatchError;
use crate::types::{Category, DailyActionRecord, ItemKey};

/// Registry shared between the loops.
pub type SharedRegistry = Arc<tokio::sync::Mutex<Registry>>;

const DAILY_DATE_FIELD: &str = "last_daily_sent_date";
const DAILY_TIME_FIELD: &str = "last_daily_sent_time";
const PROCESSING_TIME_FIELD: &str = "last_processing_time";

/// On-disk shape of a registry state file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    categories: BTreeMap<String, Vec<ItemKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_daily_sent_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_daily_sent_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_processing_time: Option<String>,
}

/// Insertion-ordered key set.
#[derive(Debug, Default, Clone)]
struct KeySet {
    order: VecDeque<ItemKey>,
    index: HashSet<ItemKey>,
}

impl KeySet {
    fn from_keys(keys: Vec<ItemKey>) -> Self {
        let mut set = KeySet::default();
        for key in keys {
            if set.index.insert(key.clone()) {
                set.order.push_back(key);
            }
        }
        set
    }

    fn insert(&mut self, key: &str) -> bool {
        if self.index.contains(key) {
            return false;
        }
        self.index.insert(key.to_string());
        self.order.push_back(key.to_string());
        true
    }

    /// Drop oldest keys until at most `cap` remain. Returns the evicted count.
    fn evict_to(&mut self, cap: usize) -> usize {
        let mut evicted = 0;
        while self.order.len() > cap {
            if let Some(oldest) = self.order.pop_front() {
                self.index.remove(&oldest);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Durable, per-category set of processed item keys backed by a JSON file.
///
/// Every mutation is written through immediately. A failed write marks the
/// registry dirty and is retried on the next mutation or [`Registry::flush`].
#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    cap: usize,
    categories: BTreeMap<String, KeySet>,
    daily: Option<DailyActionRecord>,
    last_processing_time: Option<String>,
    dirty: bool,
}

impl Registry {
    /// Empty registry bound to `path`; nothing is read.
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap: cap.max(1),
            categories: BTreeMap::new(),
            daily: None,
            last_processing_time: None,
            dirty: false,
        }
    }

    /// Load the registry at `path`.
    ///
    /// A missing file yields an empty registry. An unparseable file yields an
    /// empty registry with a warning. A malformed category is dropped on its
    /// own while the others survive.
    pub fn load(path: impl Into<PathBuf>, cap: usize) -> Self {
        let mut registry = Self::new(path, cap);

        let raw = match std::fs::read_to_string(&registry.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No registry at {:?}, starting empty", registry.path);
                return registry;
            }
            Err(e) => {
                warn!(
                    "{}",
                    WatchError::CorruptState {
                        path: registry.path.clone(),
                        reason: e.to_string()
                    }
                );
                return registry;
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(_) => {
                registry.warn_corrupt("top level is not an object");
                return registry;
            }
            Err(e) => {
                registry.warn_corrupt(&e.to_string());
                return registry;
            }
        };

        if let Some(categories) = value.get("categories") {
            match categories.as_object() {
                Some(map) => {
                    for (name, keys) in map {
                        match serde_json::from_value::<Vec<ItemKey>>(keys.clone()) {
                            Ok(keys) => {
                                let mut set = KeySet::from_keys(keys);
                                set.evict_to(registry.cap);
                                registry.categories.insert(name.clone(), set);
                            }
                            Err(e) => registry
                                .warn_corrupt(&format!("category '{}' dropped: {}", name, e)),
                        }
                    }
                }
                None => registry.warn_corrupt("'categories' is not an object"),
            }
        }

        let date = registry.field::<NaiveDate>(&value, DAILY_DATE_FIELD);
        let time = registry.field::<NaiveTime>(&value, DAILY_TIME_FIELD);
        registry.daily = match (date, time) {
            (Some(last_sent_date), Some(last_sent_time)) => Some(DailyActionRecord {
                last_sent_date,
                last_sent_time,
            }),
            (Some(last_sent_date), None) => Some(DailyActionRecord {
                last_sent_date,
                last_sent_time: NaiveTime::MIN,
            }),
            _ => None,
        };
        registry.last_processing_time = registry.field::<String>(&value, PROCESSING_TIME_FIELD);

        debug!(
            "Loaded registry {:?} with {} categories",
            registry.path,
            registry.categories.len()
        );
        registry
    }

    fn field<T: serde::de::DeserializeOwned>(&self, value: &Value, name: &str) -> Option<T> {
        let raw = value.get(name)?;
        if raw.is_null() {
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                self.warn_corrupt(&format!("field '{}' dropped: {}", name, e));
                None
            }
        }
    }

    fn warn_corrupt(&self, reason: &str) {
        warn!(
            "{}; falling back to empty",
            WatchError::CorruptState {
                path: self.path.clone(),
                reason: reason.to_string(),
            }
        );
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, category: Category, key: &str) -> bool {
        self.categories
            .get(category.as_str())
            .is_some_and(|set| set.index.contains(key))
    }

    /// Record `key` under `category`. Returns `true` if the key was new.
    pub fn add(&mut self, category: Category, key: &str) -> bool {
        let cap = self.cap;
        let set = self
            .categories
            .entry(category.as_str().to_string())
            .or_default();
        if !set.insert(key) {
            self.flush();
            return false;
        }
        let evicted = set.evict_to(cap);
        if evicted > 0 {
            debug!("Evicted {} oldest keys from category {}", evicted, category);
        }
        self.write_through();
        true
    }

    pub fn len(&self, category: Category) -> usize {
        self.categories
            .get(category.as_str())
            .map_or(0, |set| set.order.len())
    }

    pub fn is_empty(&self, category: Category) -> bool {
        self.len(category) == 0
    }

    /// Keys of `category`, oldest first.
    pub fn keys(&self, category: Category) -> Vec<ItemKey> {
        self.categories
            .get(category.as_str())
            .map(|set| set.order.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keep only the keys of `category` matching `keep`. Returns how many
    /// were dropped.
    pub fn retain<F>(&mut self, category: Category, mut keep: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let Some(set) = self.categories.get_mut(category.as_str()) else {
            return 0;
        };
        let before = set.order.len();
        set.order.retain(|key| keep(key.as_str()));
        let dropped = before - set.order.len();
        if dropped == 0 {
            return 0;
        }
        set.index = set.order.iter().cloned().collect();
        self.write_through();
        dropped
    }

    pub fn daily_record(&self) -> Option<DailyActionRecord> {
        self.daily
    }

    pub fn set_daily_record(&mut self, record: DailyActionRecord) {
        self.daily = Some(record);
        self.write_through();
    }

    pub fn last_processing_time(&self) -> Option<&str> {
        self.last_processing_time.as_deref()
    }

    pub fn touch_processing_time(&mut self, at: impl Into<String>) {
        self.last_processing_time = Some(at.into());
        self.write_through();
    }

    /// Whether the last write failed and is still pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Retry a pending write, if any.
    pub fn flush(&mut self) {
        if self.dirty {
            self.write_through();
        }
    }

    fn write_through(&mut self) {
        match self.persist() {
            Ok(()) => self.dirty = false,
            Err(e) => {
                self.dirty = true;
                error!(
                    "Failed to persist registry {:?}, will retry on next mutation: {:#}",
                    self.path, e
                );
            }
        }
    }

    /// Atomically overwrite the state file.
    pub fn persist(&self) -> Result<()> {
        let file = RegistryFile {
            categories: self
                .categories
                .iter()
                .map(|(name, set)| (name.clone(), set.order.iter().cloned().collect()))
                .collect(),
            last_daily_sent_date: self.daily.map(|d| d.last_sent_date),
            last_daily_sent_time: self.daily.map(|d| d.last_sent_time),
            last_processing_time: self.last_processing_time.clone(),
        };
        let json = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &json)
    }
}

/// Write `bytes` to a temp file next to `path`, then rename it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming into {:?}", path))?;
    Ok(())
}
