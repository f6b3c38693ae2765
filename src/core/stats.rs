use super::types::{Histogram, SimulationError, SummaryStatistics, TrajectoryTable, YearBand};

pub const DEFAULT_HISTOGRAM_BINS: usize = 100;

/// Median and 10th/90th percentiles of the terminal values. Input order does
/// not matter.
pub fn summarize(terminal_values: &[f64]) -> Result<SummaryStatistics, SimulationError> {
    if terminal_values.is_empty() {
        return Err(SimulationError::EmptyInput);
    }
    let sorted = sorted_copy(terminal_values);
    Ok(SummaryStatistics {
        median: median_of_sorted(&sorted),
        p10: percentile_of_sorted(&sorted, 10.0),
        p90: percentile_of_sorted(&sorted, 90.0),
    })
}

/// Linear-interpolation percentile (rank = p/100 * (n-1)).
pub fn percentile(values: &[f64], p: f64) -> Result<f64, SimulationError> {
    if !(0.0..=100.0).contains(&p) {
        return Err(SimulationError::invalid("percentile", "must be between 0 and 100"));
    }
    if values.is_empty() {
        return Err(SimulationError::EmptyInput);
    }
    Ok(percentile_of_sorted(&sorted_copy(values), p))
}

pub fn median(values: &[f64]) -> Result<f64, SimulationError> {
    if values.is_empty() {
        return Err(SimulationError::EmptyInput);
    }
    Ok(median_of_sorted(&sorted_copy(values)))
}

/// p10/median/p90 across paths for every year of the table.
pub fn summarize_by_year(table: &TrajectoryTable) -> Vec<YearBand> {
    let mut column = Vec::with_capacity(table.rows());
    (0..table.columns())
        .map(|year| {
            column.clear();
            column.extend(table.iter_rows().map(|row| row[year]));
            column.sort_by(|a, b| a.total_cmp(b));
            YearBand {
                year: year as u32,
                p10: percentile_of_sorted(&column, 10.0),
                median: median_of_sorted(&column),
                p90: percentile_of_sorted(&column, 90.0),
            }
        })
        .collect()
}

/// Equal-width histogram over the finite values.
pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram, SimulationError> {
    if bins == 0 {
        return Err(SimulationError::invalid("bins", "must be >= 1"));
    }
    let (min, max) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or(SimulationError::EmptyInput)?;

    let span = max - min;
    let bin_width = if span > 0.0 { span / bins as f64 } else { 0.0 };
    let mut counts = vec![0_u64; bins];

    for v in values.iter().copied().filter(|v| v.is_finite()) {
        let idx = if bin_width > 0.0 {
            (((v - min) / bin_width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }

    Ok(Histogram {
        min,
        max,
        bin_width,
        counts,
    })
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    let mid = n / 2;
    if n % 2 == 1 {
        sorted[mid]
    } else {
        // halves first so two large finite values do not overflow
        sorted[mid - 1] / 2.0 + sorted[mid] / 2.0
    }
}

fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        let (a, b) = (sorted[lower], sorted[upper]);
        if a == b {
            return a;
        }
        a * (1.0 - w) + b * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SimulationParameters, generate};
    use proptest::prelude::{Just, prop_assert, prop_assert_eq, proptest};
    use proptest::{collection::vec, strategy::Strategy};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn single_value_is_every_statistic() {
        let s = summarize(&[1234.5]).expect("non-empty");
        assert_eq!(s.median, 1234.5);
        assert_eq!(s.p10, 1234.5);
        assert_eq!(s.p90, 1234.5);
    }

    #[test]
    fn even_length_median_averages_central_values() {
        let s = summarize(&[10.0, 20.0, 30.0, 40.0]).expect("non-empty");
        assert_approx(s.median, 25.0);
        assert_approx(s.p10, 13.0);
        assert_approx(s.p90, 37.0);
    }

    #[test]
    fn odd_length_median_is_central_value() {
        let s = summarize(&[5.0, 1.0, 3.0]).expect("non-empty");
        assert_eq!(s.median, 3.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(summarize(&[]), Err(SimulationError::EmptyInput));
        assert_eq!(median(&[]), Err(SimulationError::EmptyInput));
        assert_eq!(percentile(&[], 50.0), Err(SimulationError::EmptyInput));
    }

    #[test]
    fn percentile_interpolates_between_points() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_approx(percentile(&values, 25.0).expect("valid"), 1.75);
        assert_approx(percentile(&values, 0.0).expect("valid"), 1.0);
        assert_approx(percentile(&values, 100.0).expect("valid"), 4.0);
    }

    #[test]
    fn percentile_on_exact_rank_returns_order_statistic() {
        // 11 values: rank for p10 is exactly 1.0
        let values: Vec<f64> = (0..11).map(|i| (i * 10) as f64).collect();
        assert_eq!(percentile(&values, 10.0).expect("valid"), 10.0);
        assert_eq!(percentile(&values, 90.0).expect("valid"), 90.0);
    }

    #[test]
    fn percentile_rejects_out_of_range_rank() {
        assert!(matches!(
            percentile(&[1.0], 101.0),
            Err(SimulationError::InvalidParameter { name: "percentile", .. })
        ));
        assert!(percentile(&[1.0], -0.5).is_err());
    }

    #[test]
    fn infinite_values_give_defined_results() {
        let s = summarize(&[1.0, f64::INFINITY, f64::INFINITY, f64::INFINITY]).expect("non-empty");
        assert_eq!(s.median, f64::INFINITY);
        assert_eq!(s.p90, f64::INFINITY);
        assert!(!s.p10.is_nan());

        let huge = summarize(&[f64::MAX, f64::MAX]).expect("non-empty");
        assert_eq!(huge.median, f64::MAX);
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let h = histogram(&values, 10).expect("valid");
        assert_eq!(h.counts.len(), 10);
        assert_eq!(h.total(), 1000);
        assert!(h.counts.iter().all(|c| *c == 100));
        assert_approx(h.bin_width, 99.9);
        assert_approx(h.bin_start(1), 99.9);
    }

    #[test]
    fn histogram_of_constant_values_uses_first_bin() {
        let h = histogram(&[5.0; 7], 4).expect("valid");
        assert_eq!(h.bin_width, 0.0);
        assert_eq!(h.counts, vec![7, 0, 0, 0]);
    }

    #[test]
    fn histogram_skips_non_finite_values() {
        let h = histogram(&[1.0, f64::INFINITY, 3.0], 2).expect("valid");
        assert_eq!(h.total(), 2);
        assert_eq!(h.max, 3.0);
        assert_eq!(histogram(&[f64::INFINITY], 2), Err(SimulationError::EmptyInput));
        assert_eq!(histogram(&[], 2), Err(SimulationError::EmptyInput));
        assert!(histogram(&[1.0], 0).is_err());
    }

    #[test]
    fn year_bands_cover_every_column() {
        let params = SimulationParameters {
            initial_investment: 10_000.0,
            years: 12,
            mu: 0.05,
            sigma: 0.2,
            simulation_count: 300,
        };
        let table = generate(&params, Some(5)).expect("valid params");
        let bands = summarize_by_year(&table);
        assert_eq!(bands.len(), 13);
        assert_eq!(bands[0].median, 10_000.0);
        assert_eq!(bands[0].p10, 10_000.0);
        for (year, band) in bands.iter().enumerate() {
            assert_eq!(band.year as usize, year);
            assert!(band.p10 <= band.median && band.median <= band.p90);
        }
        let terminal = summarize(&table.terminal_values()).expect("non-empty");
        assert_eq!(bands[12].median, terminal.median);
        assert_eq!(bands[12].p90, terminal.p90);
    }

    #[test]
    fn long_horizon_median_is_under_mean_growth_bound_and_near_log_growth() {
        let params = SimulationParameters {
            initial_investment: 10_000.0,
            years: 30,
            mu: 0.07,
            sigma: 0.15,
            simulation_count: 10_000,
        };
        let table = generate(&params, Some(2024)).expect("valid params");
        let s = summarize(&table.terminal_values()).expect("non-empty");
        let years = params.years as f64;
        let log_growth = params.initial_investment * (params.mu * years).exp();
        // compounding the expected annual growth factor exp(mu + sigma^2 / 2)
        let mean_growth =
            params.initial_investment * ((params.mu + 0.5 * params.sigma.powi(2)) * years).exp();

        assert!(s.median > params.initial_investment, "median {}", s.median);
        assert!(s.median < mean_growth, "median {} vs {mean_growth}", s.median);
        assert!(
            (s.median / log_growth - 1.0).abs() < 0.05,
            "median {} vs {log_growth}",
            s.median
        );
        assert!(s.p10 < s.median && s.median < s.p90);
    }

    fn values_and_shuffle() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        vec(0.0f64..1e7, 1..64).prop_flat_map(|values| {
            let shuffled = Just(values.clone()).prop_shuffle();
            (Just(values), shuffled)
        })
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_summary_is_permutation_invariant((values, shuffled) in values_and_shuffle()) {
            let a = summarize(&values).expect("non-empty");
            let b = summarize(&shuffled).expect("non-empty");
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_summary_is_ordered_and_bounded(values in vec(0.0f64..1e9, 1..128)) {
            let s = summarize(&values).expect("non-empty");
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(lo <= s.p10 && s.p10 <= s.median && s.median <= s.p90 && s.p90 <= hi);
        }
    }
}
