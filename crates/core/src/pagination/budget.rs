//! Row accounting shared by both batching strategies

/// Counts yielded rows against the caller's limit and the collection total.
///
/// The limit is enforced by counting rows actually handed out, never by
/// arithmetic on the reported total.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RowBudget {
    limit: Option<usize>,
    total: Option<usize>,
    yielded: usize,
}

impl RowBudget {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self { limit, total: None, yielded: 0 }
    }

    pub(crate) fn set_total(&mut self, total: Option<usize>) {
        self.total = total;
    }

    pub(crate) fn total(&self) -> Option<usize> {
        self.total
    }

    pub(crate) fn yielded(&self) -> usize {
        self.yielded
    }

    pub(crate) fn record(&mut self) {
        self.yielded += 1;
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }

    pub(crate) fn total_reached(&self) -> bool {
        self.total.is_some_and(|total| self.yielded >= total)
    }

    /// Rows still wanted, when either bound is known.
    pub(crate) fn remaining(&self) -> Option<usize> {
        let by_limit = self.limit.map(|limit| limit.saturating_sub(self.yielded));
        let by_total = self.total.map(|total| total.saturating_sub(self.yielded));
        match (by_limit, by_total) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Rows the caller's limit still allows, if a limit was given.
    pub(crate) fn limit_remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.yielded))
    }

    /// Commands worth registering in the next group: enough full pages to
    /// cover the remaining rows, at least one, at most `cap`.
    pub(crate) fn pages_wanted(&self, page_size: usize, cap: usize) -> usize {
        let cap = cap.max(1);
        match self.remaining() {
            Some(rows) => rows.div_ceil(page_size.max(1)).clamp(1, cap),
            None => cap,
        }
    }
}
