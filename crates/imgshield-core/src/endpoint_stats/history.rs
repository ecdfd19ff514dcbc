//! Bounded latency history for one endpoint.

use std::collections::VecDeque;

/// Recent successful-call latencies (ms) for an endpoint, oldest first.
#[derive(Debug, Clone)]
pub struct EndpointHistory {
    pub endpoint: String,
    samples: VecDeque<u64>,
    capacity: usize,
    /// Unix ms of the most recent sample.
    pub last_recorded_at: u64,
}

impl EndpointHistory {
    pub(super) fn new(endpoint: &str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            endpoint: endpoint.to_string(),
            samples: VecDeque::with_capacity(capacity),
            capacity,
            last_recorded_at: 0,
        }
    }

    /// Append a sample, dropping the oldest past capacity.
    pub(super) fn push(&mut self, latency_ms: u64, now_ms: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);
        self.last_recorded_at = now_ms;
    }

    pub fn samples(&self) -> &VecDeque<u64> {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
