//! Incident Log
//!
//! Append-only trigger history held in a ring. Once full, the oldest
//! record is dropped and counted.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;

use super::types::IncidentRecord;

struct LogInner {
    records: VecDeque<IncidentRecord>,
    total: u64,
    dropped: u64,
}

/// Summary counters for the admin surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncidentStats {
    pub retained: usize,
    pub total: u64,
    pub dropped: u64,
}

pub struct IncidentLog {
    capacity: usize,
    inner: Mutex<LogInner>,
}

impl IncidentLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(LogInner {
                records: VecDeque::with_capacity(capacity.min(1024)),
                total: 0,
                dropped: 0,
            }),
        }
    }

    pub fn record(&self, entry: IncidentRecord) {
        let mut inner = self.inner.lock();
        if inner.records.len() >= self.capacity {
            inner.records.pop_front();
            inner.dropped += 1;
        }
        inner.records.push_back(entry);
        inner.total += 1;
    }

    /// Last `n` records, oldest first
    pub fn recent(&self, n: usize) -> Vec<IncidentRecord> {
        let inner = self.inner.lock();
        let skip = inner.records.len().saturating_sub(n);
        inner.records.iter().skip(skip).cloned().collect()
    }

    /// Every retained record exactly once, in append order
    pub fn export_all(&self) -> Vec<IncidentRecord> {
        self.inner.lock().records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> IncidentStats {
        let inner = self.inner.lock();
        IncidentStats {
            retained: inner.records.len(),
            total: inner.total,
            dropped: inner.dropped,
        }
    }
}
