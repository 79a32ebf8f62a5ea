use std::time::Duration;

/// Bookkeeping of a query object across its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryCounters {
    /// Number of times the query was (re)configured
    pub query_count: u64,
    /// Number of objects returned
    pub result_count: u64,
    /// Time spent walking the tree
    pub elapsed: Duration,
}

impl QueryCounters {
    pub fn reset(&mut self) {
        *self = QueryCounters::default();
    }

    /// Mean time per configured query, zero before the first one.
    pub fn average_time(&self) -> Duration {
        if self.query_count == 0 {
            return Duration::ZERO;
        }
        self.elapsed / self.query_count.min(u32::MAX as u64) as u32
    }
}
