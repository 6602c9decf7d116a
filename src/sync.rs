//! Small atomic wrappers shared by the search workers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A clonable stop signal observed by every search worker.
#[derive(Clone)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> StopFlag {
        StopFlag(Arc::new(AtomicBool::new(false)))
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn as_arc(&self) -> Arc<AtomicBool> {
        self.0.clone()
    }
}

impl Default for StopFlag {
    fn default() -> StopFlag {
        StopFlag::new()
    }
}

impl From<Arc<AtomicBool>> for StopFlag {
    fn from(flag: Arc<AtomicBool>) -> StopFlag {
        StopFlag(flag)
    }
}

/// A shared node counter. Contention is acceptable: every worker increments
/// it roughly once per visited node.
#[derive(Clone)]
pub struct NodeCounter(Arc<AtomicU64>);

impl NodeCounter {
    pub fn new() -> NodeCounter {
        NodeCounter(Arc::new(AtomicU64::new(0)))
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl Default for NodeCounter {
    fn default() -> NodeCounter {
        NodeCounter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_lifecycle() {
        let flag = StopFlag::new();
        assert!(!flag.is_stopped());
        flag.stop();
        assert!(flag.is_stopped());
        flag.reset();
        assert!(!flag.is_stopped());
    }

    #[test]
    fn stop_flag_clone_shares_state() {
        let flag = StopFlag::new();
        let clone = flag.clone();
        clone.stop();
        assert!(flag.is_stopped());
    }

    #[test]
    fn node_counter_accumulates() {
        let counter = NodeCounter::new();
        counter.add(5);
        counter.add(7);
        assert_eq!(counter.get(), 12);
    }
}
