use anyhow::Result;

/// Places the actual phone call.
///
/// The escalation protocol attempts the call exactly once; a returned error
/// is surfaced for logging but does not retry or reopen the escalation.
pub trait CallDispatcher: Send + Sync {
    fn place_call(&self, number: &str) -> Result<()>;
}
