//! Property tests for metric engine invariants.
//!
//! Uses proptest to verify:
//! 1. Order independence: any permutation of the input yields the same rows
//! 2. Length law: N distinct dates yield max(0, N - 60) rows
//! 3. No missing values: every emitted field is finite
//! 4. No look-ahead: rows never depend on later observations
//! 5. Flat windows: a stalled price reports exactly zero volatility

use chrono::NaiveDate;
use finsight_core::config::{MetricsConfig, ZeroVolatilityPolicy};
use finsight_core::PriceObservation;
use finsight_features::{compute_metrics, MetricEngine, MIN_HISTORY};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + chrono::Duration::days(i as i64)
}

/// A random-walk close series that stays strictly positive.
fn arb_closes(min: usize, max: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.04..0.04_f64, min..max).prop_map(|steps| {
        let mut price = 100.0;
        steps
            .into_iter()
            .map(|s| {
                price *= 1.0 + s;
                (price * 100.0).round() / 100.0
            })
            .collect()
    })
}

fn to_series(closes: &[f64]) -> Vec<PriceObservation> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceObservation::new(day(i), c))
        .collect()
}

fn sentinel_engine() -> MetricEngine {
    MetricEngine::new(&MetricsConfig {
        zero_volatility: ZeroVolatilityPolicy::ZeroSentinel,
        ..Default::default()
    })
}

// ── 1. Order Independence ────────────────────────────────────────────

proptest! {
    #[test]
    fn permutation_does_not_change_output(
        closes in arb_closes(0, 140),
        seed in any::<u64>(),
    ) {
        let obs = to_series(&closes);
        let expected = compute_metrics(&obs).unwrap();

        // Deterministic shuffle driven by the seed.
        let mut shuffled = obs.clone();
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }

        prop_assert_eq!(compute_metrics(&shuffled).unwrap(), expected);
    }
}

// ── 2. Length Law / 3. No Missing Values ─────────────────────────────

proptest! {
    #[test]
    fn length_law_holds(closes in arb_closes(0, 160)) {
        // The sentinel policy keeps flat windows, so every admissible row survives.
        let rows = sentinel_engine().compute(&to_series(&closes)).unwrap();
        prop_assert_eq!(rows.len(), closes.len().saturating_sub(MIN_HISTORY));
    }

    #[test]
    fn emitted_rows_are_complete_and_ordered(closes in arb_closes(0, 160)) {
        let rows = compute_metrics(&to_series(&closes)).unwrap();
        prop_assert!(rows.len() <= closes.len().saturating_sub(MIN_HISTORY));
        for row in &rows {
            prop_assert!(row.is_finite());
            prop_assert!(row.vol20 >= 0.0 && row.vol60 >= 0.0);
        }
        for pair in rows.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
    }
}

// ── 4. No Look-Ahead ─────────────────────────────────────────────────

proptest! {
    /// Truncating the series after any date leaves earlier rows unchanged.
    #[test]
    fn rows_ignore_future_observations(
        closes in arb_closes(61, 150),
        cut in 0.0..1.0_f64,
    ) {
        let obs = to_series(&closes);
        let full = compute_metrics(&obs).unwrap();

        let keep = MIN_HISTORY + 1 + ((closes.len() - MIN_HISTORY - 1) as f64 * cut) as usize;
        let prefix = compute_metrics(&obs[..keep]).unwrap();

        let expected: Vec<_> = full
            .iter()
            .filter(|r| r.date <= day(keep - 1))
            .copied()
            .collect();
        prop_assert_eq!(prefix, expected);
    }

    /// Rewriting the close at date t changes only that row's own return
    /// among the fields of row t.
    #[test]
    fn aggregates_ignore_current_close(
        closes in arb_closes(61, 150),
        pick in 0.0..1.0_f64,
        factor in 0.5..1.5_f64,
    ) {
        let engine = sentinel_engine();
        let obs = to_series(&closes);
        let t = MIN_HISTORY + ((closes.len() - MIN_HISTORY - 1) as f64 * pick) as usize;

        let mut perturbed = obs.clone();
        for o in perturbed.iter_mut().skip(t) {
            o.close *= factor;
        }

        let before = engine.compute(&obs).unwrap();
        let after = engine.compute(&perturbed).unwrap();
        let a = before.iter().find(|r| r.date == day(t)).unwrap();
        let b = after.iter().find(|r| r.date == day(t)).unwrap();

        prop_assert_eq!(a.vol20, b.vol20);
        prop_assert_eq!(a.vol60, b.vol60);
        prop_assert_eq!(a.sma20, b.sma20);
        prop_assert_eq!(a.sma50, b.sma50);
        prop_assert_eq!(a.sharpe20, b.sharpe20);
        prop_assert_eq!(a.sharpe60, b.sharpe60);
    }
}

// ── 5. Flat Windows ──────────────────────────────────────────────────

proptest! {
    /// Once a 20-row return window lies inside a constant tail its
    /// volatility is exactly zero, whatever came before.
    #[test]
    fn stalled_price_has_zero_volatility(
        walk in arb_closes(61, 120),
        tail in 25usize..80,
    ) {
        let k = walk.len();
        let mut closes = walk.clone();
        closes.extend(std::iter::repeat(walk[k - 1]).take(tail));
        let obs = to_series(&closes);

        // Returns are zero from position k, so windows are flat from k + 20.
        let flat_from = day(k + 20);
        let rows = sentinel_engine().compute(&obs).unwrap();
        for row in rows.iter().filter(|r| r.date >= flat_from) {
            prop_assert_eq!(row.vol20, 0.0);
            prop_assert_eq!(row.sharpe20, 0.0);
        }

        let default_rows = compute_metrics(&obs).unwrap();
        prop_assert!(default_rows.iter().all(|r| r.date < flat_from));
    }
}
