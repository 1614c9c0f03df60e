pub mod directory;
pub mod mock;
pub mod noop;
pub mod variant;

pub use directory::DirectoryCounter;
pub use mock::MockCounter;
pub use noop::NoopCounter;
pub use variant::CounterVariant;
