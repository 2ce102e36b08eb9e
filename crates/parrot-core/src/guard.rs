//! Fault isolation for handler code.
//!
//! Every call into a command or a scheduled callback goes through
//! [`isolate`]: errors and panics are logged and turned into `None`, so a
//! single bad handler can never take down the dispatch loop.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::Result;

/// Run `f`, logging and swallowing both `Err` and panics.
///
/// `what` names the operation in the log ("invoke", "pulse", …) and
/// `who` the handler or callback.
pub fn isolate<T>(what: &str, who: &str, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::error!("❌ {what} failed in {who}: {e}");
            None
        }
        Err(payload) => {
            tracing::error!("💥 {what} panicked in {who}: {}", panic_message(payload.as_ref()));
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParrotError;

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(isolate("invoke", "t", || Ok(7)), Some(7));
    }

    #[test]
    fn test_err_becomes_none() {
        let out: Option<bool> = isolate("invoke", "t", || Err(ParrotError::Command("nope".into())));
        assert!(out.is_none());
    }

    #[test]
    fn test_panic_becomes_none() {
        let out: Option<bool> = isolate("invoke", "t", || panic!("boom"));
        assert!(out.is_none());
    }
}
