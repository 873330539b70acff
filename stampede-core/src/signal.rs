use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop flag. Raised once, observed by workers between
/// iterations only, so an in-flight action always completes and records
/// its outcome before the worker exits.
#[derive(Debug, Default)]
pub struct StopSignal {
    raised: AtomicBool,
}

impl StopSignal {
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
