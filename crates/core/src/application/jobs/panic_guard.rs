// Panic isolation for job runs (a panicking job must not kill the daemon)
use std::any::Any;
use tokio::task::JoinError;

/// Human-readable payload of a caught panic
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Panic message of a failed spawned task, `None` if it was cancelled
pub fn join_panic_message(err: JoinError) -> Option<String> {
    if !err.is_panic() {
        return None;
    }
    let payload = err.into_panic();
    Some(panic_message(payload.as_ref()))
}
