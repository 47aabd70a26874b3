//! Summary statistics over a parsed run.

use std::num::NonZeroUsize;

use super::types::{Record, SummaryStats};

impl SummaryStats {
    /// Compute run-level statistics.
    ///
    /// The "recent" figures cover the last `min(window_size, records.len())`
    /// records. An empty slice returns [`SummaryStats::default`].
    pub fn compute(records: &[Record], window_size: NonZeroUsize) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let recent_start = records.len().saturating_sub(window_size.get());
        let recent = &records[recent_start..];

        let recent_sum: f64 = recent.iter().map(|r| r.loss).sum();

        Self {
            recent_mean: recent_sum / recent.len() as f64,
            recent_min: min_loss(recent),
            global_min: min_loss(records),
            total_steps: records.len(),
        }
    }
}

fn min_loss(records: &[Record]) -> f64 {
    records.iter().map(|r| r.loss).reduce(f64::min).unwrap_or_default()
}
