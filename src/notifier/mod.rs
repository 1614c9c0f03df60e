pub mod fallback;
pub mod mock;
pub mod noop;
pub mod outbox;
pub mod variant;

pub use fallback::FallbackNotifier;
pub use mock::MockNotifier;
pub use noop::NoopNotifier;
pub use outbox::OutboxNotifier;
pub use variant::NotifierVariant;
