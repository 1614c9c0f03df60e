pub mod directory;
pub mod mock;
pub mod noop;
pub mod variant;

pub use directory::DirectorySource;
pub use mock::MockSource;
pub use noop::NoopSource;
pub use variant::SourceVariant;
