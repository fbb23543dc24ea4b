//! Cooperative shutdown.
//!
//! The signal handler only flips an atomic flag. The capture loop polls it
//! once per iteration, so an in-flight read or send always completes first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Route SIGINT and SIGTERM to this flag. Can only be installed once per
    /// process.
    pub fn install_signal_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.request())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_flag() {
        let flag = ShutdownFlag::new();
        let handler_side = flag.clone();
        assert!(!flag.is_requested());

        handler_side.request();
        assert!(flag.is_requested());
    }
}
