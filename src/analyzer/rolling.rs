//! Trailing moving averages over the ordered record sequence.
//!
//! For record `i` the window is `[max(0, i - W + 1), i]`: the first `W - 1`
//! records are averaged over a shorter warm-up window, there is no padding
//! and no look-ahead.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use super::types::{EnrichedRecord, Record};

/// Running mean over the most recent `capacity` values.
///
/// Keeps a running sum with add/evict, so each push is O(1). The sum carries a
/// Neumaier compensation term, so a huge value entering and later leaving the
/// window does not wipe out the small values added alongside it. The sum is
/// also rebuilt from the buffered values once per `capacity` evictions.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: VecDeque<f64>,
    capacity: usize,
    sum: CompensatedSum,
    evictions: usize,
}

/// Neumaier summation: `total()` is `sum + compensation`.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl RollingMean {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            // Grows on demand; `capacity` may be far larger than the input
            window: VecDeque::new(),
            capacity: capacity.get(),
            sum: CompensatedSum::default(),
            evictions: 0,
        }
    }

    /// Add a value and return the mean of the window including it.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.window.len() == self.capacity {
            if let Some(oldest) = self.window.pop_front() {
                self.sum.add(-oldest);
                self.evictions += 1;
            }
        }
        self.window.push_back(value);
        self.sum.add(value);

        if self.evictions >= self.capacity {
            let mut resummed = CompensatedSum::default();
            self.window.iter().for_each(|v| resummed.add(*v));
            self.sum = resummed;
            self.evictions = 0;
        }

        self.sum.total() / self.window.len() as f64
    }
}

/// Attach `moving_avg_loss` and `moving_avg_grad_norm` to every record.
///
/// The output has the same length and order as the input.
pub fn enrich(records: Vec<Record>, window_size: NonZeroUsize) -> Vec<EnrichedRecord> {
    let mut loss = RollingMean::new(window_size);
    let mut grad_norm = RollingMean::new(window_size);

    records
        .into_iter()
        .map(|record| {
            let moving_avg_loss = loss.push(record.loss);
            let moving_avg_grad_norm = grad_norm.push(record.grad_norm);
            EnrichedRecord {
                record,
                moving_avg_loss,
                moving_avg_grad_norm,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    const TOLERANCE: f64 = 1e-9;

    fn record(epoch: f64, loss: f64, grad_norm: f64) -> Record {
        Record {
            epoch: Some(epoch),
            loss,
            grad_norm,
            extra: Map::new(),
        }
    }

    fn window(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// Re-slice-and-average reference.
    fn naive_means(values: &[f64], w: usize) -> Vec<f64> {
        (0..values.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(w);
                let slice = &values[start..=i];
                slice.iter().sum::<f64>() / slice.len() as f64
            })
            .collect()
    }

    #[test]
    fn test_window_grows_then_saturates() {
        let mut mean = RollingMean::new(window(3));
        let sizes: Vec<usize> = (0..6)
            .map(|i| {
                mean.push(i as f64);
                mean.window.len()
            })
            .collect();
        assert_eq!(sizes, vec![1, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn test_rolling_mean_values() {
        let mut mean = RollingMean::new(window(3));
        let out: Vec<f64> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|v| mean.push(*v)).collect();
        assert_eq!(out, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_enrich_example_from_three_records() {
        let records = vec![record(1.0, 1.0, 2.0), record(2.0, 0.5, 1.0), record(3.0, 0.8, 1.5)];
        let enriched = enrich(records, window(20));

        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].moving_avg_loss, 1.0);
        assert_eq!(enriched[0].moving_avg_grad_norm, 2.0);
        assert!((enriched[1].moving_avg_loss - 0.75).abs() < TOLERANCE);
        assert!((enriched[2].moving_avg_loss - (1.0 + 0.5 + 0.8) / 3.0).abs() < TOLERANCE);
        assert!((enriched[2].moving_avg_grad_norm - 1.5).abs() < TOLERANCE);
        assert_eq!(enriched[2].record.epoch, Some(3.0));
    }

    #[test]
    fn test_enrich_matches_naive_definition() {
        let losses: Vec<f64> = (0..250).map(|i| ((i * 37) % 101) as f64 / 13.0 + 1e6 * ((i % 7) as f64)).collect();
        let grads: Vec<f64> = (0..250).map(|i| 1.0 / (i as f64 + 1.0)).collect();
        let records: Vec<Record> = losses
            .iter()
            .zip(&grads)
            .enumerate()
            .map(|(i, (l, g))| record(i as f64, *l, *g))
            .collect();

        for w in [1, 2, 7, 20, 300] {
            let enriched = enrich(records.clone(), window(w));
            let expected_loss = naive_means(&losses, w);
            let expected_grad = naive_means(&grads, w);
            for (i, e) in enriched.iter().enumerate() {
                let scale = expected_loss[i].abs().max(1.0);
                assert!((e.moving_avg_loss - expected_loss[i]).abs() / scale < TOLERANCE, "loss w={} i={}", w, i);
                assert!((e.moving_avg_grad_norm - expected_grad[i]).abs() < TOLERANCE, "grad w={} i={}", w, i);
            }
        }
    }

    #[test]
    fn test_spike_leaving_window_does_not_skew_mean() {
        let mut grads = vec![1e17];
        grads.extend(std::iter::repeat_n(1.0, 45));
        let records: Vec<Record> = grads.iter().enumerate().map(|(i, g)| record(i as f64, 1.0, *g)).collect();

        let enriched = enrich(records, window(20));
        let expected = naive_means(&grads, 20);
        for i in 20..grads.len() {
            assert!((enriched[i].moving_avg_grad_norm - expected[i]).abs() < TOLERANCE, "i={} got {}", i, enriched[i].moving_avg_grad_norm);
        }
        assert_eq!(enriched[20].moving_avg_grad_norm, 1.0);
    }

    #[test]
    fn test_huge_window_does_not_preallocate() {
        let mut mean = RollingMean::new(window(1 << 62));
        assert_eq!(mean.push(2.0), 2.0);
        assert_eq!(mean.push(4.0), 3.0);

        let enriched = enrich(vec![record(0.0, 1.0, 1.0)], window(usize::MAX));
        assert_eq!(enriched[0].moving_avg_loss, 1.0);
    }

    #[test]
    fn test_enrich_preserves_order_and_fields() {
        let mut extra = Map::new();
        extra.insert("learning_rate".to_string(), serde_json::Value::from(3e-4));
        let mut first = record(5.0, 1.0, 1.0);
        first.extra = extra.clone();
        let records = vec![first, record(1.0, 2.0, 2.0), record(3.0, 3.0, 3.0)];

        let enriched = enrich(records, window(2));
        let epochs: Vec<Option<f64>> = enriched.iter().map(|e| e.record.epoch).collect();
        assert_eq!(epochs, vec![Some(5.0), Some(1.0), Some(3.0)]);
        assert_eq!(enriched[0].record.extra, extra);
        assert_eq!(enriched[2].moving_avg_loss, 2.5);
    }

    #[test]
    fn test_enrich_empty() {
        assert!(enrich(Vec::new(), window(20)).is_empty());
    }
}
