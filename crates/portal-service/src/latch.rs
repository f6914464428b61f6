use std::sync::{Mutex, PoisonError};

/// One-shot gate-open latch: a linearizable single-slot mailbox.
///
/// The decision handler writes on an authorized match; the poll handler
/// drains with a single indivisible read-and-clear. A second authorized
/// decision before the first poll replaces the pending identifier; there is
/// only one physical gate, so no queueing. Unauthorized decisions never
/// touch the slot.
#[derive(Debug, Default)]
pub struct GateLatch {
    slot: Mutex<Option<String>>,
}

impl GateLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an authorized identifier, replacing any pending one.
    pub fn set_pending(&self, number: impl Into<String>) {
        *self.lock() = Some(number.into());
    }

    /// Atomically consume the pending identifier, if any. At most one
    /// caller can observe a given pending value.
    pub fn take_if_pending(&self) -> Option<String> {
        self.lock().take()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
