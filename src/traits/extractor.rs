use chrono::NaiveDate;

use crate::types::{JobRecord, RawArtifact};

/// Turns a raw artifact into a structured record.
///
/// Returns `None` when the artifact carries no usable record; extraction
/// never fails.
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// `today` resolves year-less dates.
    fn extract(&self, artifact: &RawArtifact, today: NaiveDate) -> Option<JobRecord>;
}
