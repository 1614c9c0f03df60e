pub mod mock;
pub mod noop;
pub mod outbox;
pub mod variant;

pub use mock::MockPoster;
pub use noop::NoopPoster;
pub use outbox::OutboxPoster;
pub use variant::PosterVariant;
