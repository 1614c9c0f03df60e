use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::ledger::parse_due_date;
use crate::traits::Extractor;
use crate::types::{JobRecord, RawArtifact};

const MAX_TITLE_CHARS: usize = 200;

/// Extracts `Job ID:` / `Title:` / `Due Date:` labelled lines.
///
/// Without a labelled id the first `XX-NNNN` style token is used. An
/// unparseable due date makes the record open-ended.
pub struct KeyValueExtractor {
    job_id: Regex,
    bare_id: Regex,
    title: Regex,
    due_date: Regex,
}

impl KeyValueExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            job_id: Regex::new(r"(?im)^[ \t]*job[ \t]*id[ \t]*[:.]?[ \t]*([^\s(]+)")?,
            bare_id: Regex::new(r"\b([A-Z]{2}-\d{4,}[A-Za-z0-9]*)\b")?,
            title: Regex::new(r"(?im)^[ \t]*title[ \t]*:[ \t]*(.+?)\s*$")?,
            due_date: Regex::new(r"(?im)^[ \t]*due[ \t]*date[ \t]*:[ \t]*(.+?)\s*$")?,
        })
    }

    fn job_key(&self, body: &str) -> Option<String> {
        self.job_id
            .captures(body)
            .or_else(|| self.bare_id.captures(body))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_uppercase())
            .filter(|k| !k.is_empty())
    }

    fn title(&self, body: &str) -> String {
        let raw = self
            .title
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| {
                body.lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty() && !self.is_labelled(l))
                    .map(String::from)
            })
            .unwrap_or_default();
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        normalized.chars().take(MAX_TITLE_CHARS).collect()
    }

    fn is_labelled(&self, line: &str) -> bool {
        self.job_id.is_match(line) || self.title.is_match(line) || self.due_date.is_match(line)
    }
}

impl Extractor for KeyValueExtractor {
    fn name(&self) -> &'static str {
        "key-value-extractor"
    }

    fn extract(&self, artifact: &RawArtifact, today: NaiveDate) -> Option<JobRecord> {
        let body = artifact.text();
        let Some(job_key) = self.job_key(&body) else {
            debug!("No job id in {}", artifact.origin);
            return None;
        };
        let due_date = self
            .due_date
            .captures(&body)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_due_date(m.as_str(), today));

        Some(JobRecord {
            job_key,
            title: self.title(&body),
            due_date,
            source: None,
        })
    }
}
