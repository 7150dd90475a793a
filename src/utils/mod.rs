pub mod panic;
pub use panic::{catch_panic, extract_panic_message};
pub mod url_redaction;
pub use url_redaction::redact_url;
