pub mod counter;
pub mod extractor;
pub mod formatter;
pub mod notifier;
pub mod poster;
pub mod source;

pub use counter::SubmissionCounter;
pub use extractor::Extractor;
pub use formatter::Formatter;
pub use notifier::Notifier;
pub use poster::Poster;
pub use source::Source;
