//! Turning raw artifacts into job records and records into text.

pub mod key_value;
pub mod template;

pub use key_value::KeyValueExtractor;
pub use template::{plain_rendering, TemplateFormatter};
