//! Date ordering and duplicate resolution.
//!
//! Sorting is stable, so among equal dates the input order survives and
//! "keep last" means last in the caller's sequence.

use chrono::NaiveDate;
use finsight_core::config::DuplicatePolicy;
use finsight_core::{DailyBar, Error, PriceObservation, Result};

/// Counters from one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationStats {
    /// Items received.
    pub input: usize,
    /// Items discarded because a later item had the same date.
    pub duplicates_dropped: usize,
}

impl NormalizationStats {
    /// Number of distinct dates kept.
    pub fn output(&self) -> usize {
        self.input - self.duplicates_dropped
    }
}

/// Observations sorted ascending by date with unique dates.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSeries {
    pub observations: Vec<PriceObservation>,
    pub stats: NormalizationStats,
}

impl NormalizedSeries {
    /// Close prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Sort by date and resolve repeated dates according to `policy`.
pub fn normalize_by_date<T, F>(
    items: &[T],
    date_of: F,
    policy: DuplicatePolicy,
) -> Result<(Vec<T>, NormalizationStats)>
where
    T: Clone,
    F: Fn(&T) -> NaiveDate,
{
    let mut sorted: Vec<T> = items.to_vec();
    sorted.sort_by_key(|item| date_of(item));

    let mut out: Vec<T> = Vec::with_capacity(sorted.len());
    let mut dropped = 0usize;
    for item in sorted {
        if let Some(prev) = out.last_mut() {
            if date_of(&*prev) == date_of(&item) {
                if policy == DuplicatePolicy::Reject {
                    return Err(Error::invalid_input(format!(
                        "duplicate date {}",
                        date_of(&item)
                    )));
                }
                *prev = item;
                dropped += 1;
                continue;
            }
        }
        out.push(item);
    }

    if dropped > 0 {
        tracing::warn!(dropped, "duplicate dates resolved by keeping the last occurrence");
    }

    let stats = NormalizationStats {
        input: items.len(),
        duplicates_dropped: dropped,
    };
    Ok((out, stats))
}

/// Normalize engine observations.
pub fn normalize(
    observations: &[PriceObservation],
    policy: DuplicatePolicy,
) -> Result<NormalizedSeries> {
    let (observations, stats) = normalize_by_date(observations, |o| o.date, policy)?;
    Ok(NormalizedSeries {
        observations,
        stats,
    })
}

/// Normalize stored bars with the same rules as observations.
pub fn normalize_bars(bars: &[DailyBar], policy: DuplicatePolicy) -> Result<Vec<DailyBar>> {
    normalize_by_date(bars, |b| b.date, policy).map(|(bars, _)| bars)
}
