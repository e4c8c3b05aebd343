use std::collections::VecDeque;

use chrono::NaiveDateTime;

use crate::model::bar::Bar;

/// Immutable (timestamp, value) series handed to fit/predict. Only a
/// [`RollingWindow`] produces one, so timestamps are strictly increasing and
/// values are positive prices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Everything except the newest `n` points.
    pub fn values_without_last(&self, n: usize) -> &[f64] {
        &self.values[..self.values.len().saturating_sub(n)]
    }
}

/// Live window of bars, oldest first, deduplicated by timestamp and bounded
/// to `capacity` bars.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            bars: VecDeque::with_capacity(capacity.min(8_192)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Merge a provider snapshot in any order. A bar whose timestamp is
    /// already held replaces the stored one (the in-progress period keeps
    /// moving) without counting as a new observation. Returns the number of
    /// new observations.
    pub fn merge<I>(&mut self, bars: I) -> usize
    where
        I: IntoIterator<Item = Bar>,
    {
        let mut incoming: Vec<Bar> = bars
            .into_iter()
            .filter(|b| {
                let ok = b.close.is_finite() && b.close > 0.0;
                if !ok {
                    tracing::warn!(
                        timestamp = %b.timestamp,
                        close = b.close,
                        "Dropping bar with invalid close"
                    );
                }
                ok
            })
            .collect();
        incoming.sort_by_key(|b| b.timestamp);

        let mut added = 0;
        for bar in incoming {
            let newer = self
                .bars
                .back()
                .map(|last| bar.timestamp > last.timestamp)
                .unwrap_or(true);
            if newer {
                self.bars.push_back(bar);
                added += 1;
                continue;
            }
            match self.bars.binary_search_by_key(&bar.timestamp, |b| b.timestamp) {
                Ok(idx) => self.bars[idx] = bar,
                Err(0) if self.bars.len() >= self.capacity => {}
                Err(idx) => {
                    self.bars.insert(idx, bar);
                    added += 1;
                }
            }
        }

        while self.bars.len() > self.capacity {
            let _ = self.bars.pop_front();
        }
        added
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.back().map(|b| b.timestamp)
    }

    pub fn get(&self, idx: usize) -> Option<&Bar> {
        self.bars.get(idx)
    }

    pub fn position(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.bars
            .binary_search_by_key(&timestamp, |b| b.timestamp)
            .ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    /// `from_end(0)` is the newest bar.
    pub fn from_end(&self, k: usize) -> Option<&Bar> {
        self.bars.len().checked_sub(k + 1).and_then(|i| self.bars.get(i))
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn snapshot(&self) -> TimeSeries {
        TimeSeries {
            timestamps: self.bars.iter().map(|b| b.timestamp).collect(),
            values: self.closes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn ts(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap()
            + Duration::minutes(minute)
    }

    #[test]
    fn merge_orders_and_deduplicates_by_timestamp() {
        let mut w = RollingWindow::new(10);
        let added = w.merge(vec![
            Bar::from_close(ts(2), 102.0),
            Bar::from_close(ts(0), 100.0),
            Bar::from_close(ts(1), 101.0),
        ]);
        assert_eq!(added, 3);
        assert_eq!(w.closes(), vec![100.0, 101.0, 102.0]);

        let added = w.merge(vec![
            Bar::from_close(ts(2), 102.5),
            Bar::from_close(ts(3), 103.0),
        ]);
        assert_eq!(added, 1);
        assert_eq!(w.closes(), vec![100.0, 101.0, 102.5, 103.0]);
        assert_eq!(w.from_end(1).map(|b| b.close), Some(102.5));
    }

    #[test]
    fn merge_evicts_oldest_beyond_capacity() {
        let mut w = RollingWindow::new(3);
        w.merge((0..5).map(|i| Bar::from_close(ts(i), 100.0 + i as f64)));
        assert_eq!(w.len(), 3);
        assert_eq!(w.closes(), vec![102.0, 103.0, 104.0]);
        // Too old to matter once the window is full.
        assert_eq!(w.merge(vec![Bar::from_close(ts(0), 1.0)]), 0);
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn merge_drops_non_positive_prices() {
        let mut w = RollingWindow::new(5);
        w.merge(vec![Bar::from_close(ts(0), 0.0), Bar::from_close(ts(1), 5.0)]);
        assert_eq!(w.closes(), vec![5.0]);
    }

    #[test]
    fn snapshot_holds_out_in_progress_bar() {
        let mut w = RollingWindow::new(5);
        w.merge((0..3).map(|i| Bar::from_close(ts(i), 10.0 + i as f64)));
        let series = w.snapshot();
        assert_eq!(series.len(), 3);
        assert_eq!(series.values_without_last(1), &[10.0, 11.0]);
        assert_eq!(series.timestamps()[2], ts(2));
        assert!(RollingWindow::new(3).snapshot().is_empty());
    }
}
