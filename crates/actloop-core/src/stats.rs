use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::ids::LoopId;

/// Point-in-time view of a loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStats {
    pub loop_id: LoopId,
    pub name: Option<String>,
    pub capacity: usize,
    /// Items sitting in the submission queue right now.
    pub queued: usize,
    pub submitted: u64,
    pub executed: u64,
    /// Fire-and-forget errors, counted whether or not an error handler is set.
    pub failed: u64,
    pub shutting_down: bool,
    pub stopped: bool,
}

/// Counters shared by submitters and the worker.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    submitted: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_executed(&self, failed: bool) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub(crate) fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_failures_separately() {
        let c = Counters::default();
        c.record_submitted();
        c.record_submitted();
        c.record_executed(false);
        c.record_executed(true);
        assert_eq!((c.submitted(), c.executed(), c.failed()), (2, 2, 1));
    }

    #[test]
    fn stats_serialize_to_json() {
        let stats = LoopStats {
            loop_id: LoopId::new(),
            name: Some("kv".into()),
            capacity: 4,
            queued: 0,
            submitted: 3,
            executed: 3,
            failed: 0,
            shutting_down: false,
            stopped: false,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["capacity"], 4);
        assert_eq!(json["name"], "kv");
        assert!(json["loop_id"].is_string());
    }
}
