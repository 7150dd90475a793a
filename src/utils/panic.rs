//! Panic isolation for background tasks.
//!
//! A panic inside a session's receive loop must not take the host process
//! down with it. The loop body is polled under `catch_unwind` and a panic is
//! turned into its message so it can be delivered like any other error.
//!
//! `catch_unwind` only catches unwinding panics; builds with
//! `panic = "abort"` lose this protection.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

/// Await `future`, converting a panic during polling into `Err(message)`.
pub async fn catch_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => Ok(value),
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Background task panicked");
            Err(msg)
        }
    }
}

/// Extract a readable message from a panic payload.
pub fn extract_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic (non-string payload)".to_string()
    }
}
