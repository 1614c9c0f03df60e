use anyhow::{bail, Result};

use crate::ledger::format_due_date;
use crate::traits::Formatter;
use crate::types::JobRecord;

pub const DEFAULT_TEMPLATE: &str = "Job ID: {job_key}\nTitle: {title}\nDue Date: {due_date}\n";

/// Fills `{job_key}`, `{title}`, `{due_date}` and `{source}` placeholders.
/// Formatting fails on unknown or unterminated placeholders.
pub struct TemplateFormatter {
    template: String,
}

impl TemplateFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl Default for TemplateFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

fn field(record: &JobRecord, name: &str) -> Option<String> {
    match name {
        "job_key" => Some(record.job_key.clone()),
        "title" => Some(record.title.clone()),
        "due_date" => Some(
            record
                .due_date
                .map(format_due_date)
                .unwrap_or_else(|| "Open".to_string()),
        ),
        "source" => Some(
            record
                .source
                .map(|s| s.to_string())
                .unwrap_or_default(),
        ),
        _ => None,
    }
}

impl Formatter for TemplateFormatter {
    fn name(&self) -> &'static str {
        "template-formatter"
    }

    fn format(&self, record: &JobRecord) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                bail!("unterminated placeholder in template");
            };
            let name = &after[..close];
            match field(record, name) {
                Some(value) => out.push_str(&value),
                None => bail!("unknown placeholder '{{{}}}'", name),
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Rendering used when the configured formatter fails.
pub fn plain_rendering(record: &JobRecord) -> String {
    let due = record
        .due_date
        .map(format_due_date)
        .unwrap_or_else(|| "Open".to_string());
    format!(
        "Job ID: {}\nTitle: {}\nDue Date: {}\n",
        record.job_key, record.title, due
    )
}
