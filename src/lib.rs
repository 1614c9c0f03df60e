// Library exports for testing and external use

pub mod artifacts;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod counter;
pub mod error;
pub mod ledger;
pub mod monitor;
pub mod notifier;
pub mod parser;
pub mod poller;
pub mod poster;
pub mod registry;
pub mod source;
pub mod telemetry;
pub mod tracker;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use config::{BaseConfig, MarkPolicy};
pub use coordinator::Coordinator;
pub use error::WatchError;
pub use ledger::{Bucket, Ledger, LedgerEntry, LedgerStore};
pub use monitor::{Collaborators, FinalizedLedger, Monitor};
pub use poller::SourcePoller;
pub use registry::{Registry, SharedRegistry};
pub use tracker::{DailyTracker, TrackerState};
pub use traits::{Extractor, Formatter, Notifier, Poster, Source, SubmissionCounter};
pub use types::{Category, DailyActionRecord, ItemKey, JobRecord, PollReport, SourceId, TickReport};

// Re-export variant enums for convenience
pub use counter::CounterVariant;
pub use notifier::NotifierVariant;
pub use poster::PosterVariant;
pub use source::SourceVariant;
