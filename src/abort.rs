//! Cooperative cancellation. Every public operation accepts an optional
//! [`AbortSignal`]; the core checks it at the same suspension points the
//! source awaits (adapter I/O, stream boundaries, turn acquisition) and
//! surfaces an `Aborted` result rather than leaving partially-written
//! adapter state pretending to be final (spec §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::CoreError;

#[derive(Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> (Self, AbortHandle) {
        let flag = Arc::new(AtomicBool::new(false));
        (Self(flag.clone()), AbortHandle(flag))
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<(), CoreError> {
        if self.is_aborted() {
            Err(CoreError::Aborted("cancelled by caller".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Checks an optional signal, treating `None` as "never aborted".
pub(crate) fn check(signal: Option<&AbortSignal>) -> Result<(), CoreError> {
    match signal {
        Some(s) => s.check(),
        None => Ok(()),
    }
}
