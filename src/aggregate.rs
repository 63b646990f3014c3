use crate::samples::SampleSet;
use serde::Serialize;

/// Sample sets at or below this size are averaged without outlier filtering.
pub const SMALL_SAMPLE_LIMIT: usize = 5;

/// Samples further than this many standard deviations from the mean are dropped.
pub const OUTLIER_SIGMAS: f64 = 2.0;

/// Whether a value came from real measurements or stands in for missing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Measured,
    Absent,
}

/// One summary number per (platform, implementation, metric).
///
/// An absent value is always zero; only the provenance tells it apart from a
/// measured zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepresentativeValue {
    value: f64,
    provenance: Provenance,
}

impl RepresentativeValue {
    pub const ABSENT: Self = Self {
        value: 0.0,
        provenance: Provenance::Absent,
    };

    pub fn measured(value: f64) -> Self {
        Self {
            value,
            provenance: Provenance::Measured,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_absent(&self) -> bool {
        self.provenance == Provenance::Absent
    }
}

/// Reduce a sample set to its representative value.
pub fn aggregate(samples: &SampleSet) -> RepresentativeValue {
    aggregate_values(samples.values())
}

/// Mean of the samples, ignoring those more than two standard deviations
/// from the mean once there are more than [`SMALL_SAMPLE_LIMIT`] of them.
///
/// Sums run over a sorted copy so the result does not depend on input order.
pub fn aggregate_values(values: &[f64]) -> RepresentativeValue {
    if values.is_empty() {
        return RepresentativeValue::ABSENT;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = mean(&sorted);
    if sorted.len() <= SMALL_SAMPLE_LIMIT {
        return RepresentativeValue::measured(mean);
    }

    let std_dev = population_std_dev(&sorted, mean);
    let kept: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| (v - mean).abs() < OUTLIER_SIGMAS * std_dev)
        .collect();

    // Zero spread keeps nothing; the plain mean is the answer then.
    if kept.is_empty() {
        RepresentativeValue::measured(mean)
    } else {
        RepresentativeValue::measured(self::mean(&kept))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec as prop_vec;
    use proptest::prelude::*;

    fn naive_mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_empty_is_absent() {
        let result = aggregate(&SampleSet::default());
        assert_eq!(result, RepresentativeValue::ABSENT);
        assert_eq!(result.value(), 0.0);
        assert!(result.is_absent());
    }

    #[test]
    fn test_small_sets_use_plain_mean() {
        // 100.0 would be filtered in a larger set
        let result = aggregate_values(&[1.0, 1.0, 1.0, 1.0, 100.0]);
        assert_eq!(result.provenance(), Provenance::Measured);
        assert!(close(result.value(), 20.8));
    }

    #[test]
    fn test_outlier_dropped_from_large_set() {
        let result = aggregate_values(&[1.0, 1.0, 1.05, 1.0, 20.0, 1.02]);
        assert_eq!(result.provenance(), Provenance::Measured);
        assert!(close(result.value(), 1.014), "got {}", result.value());
    }

    #[test]
    fn test_identical_samples_fall_back_to_mean() {
        let result = aggregate_values(&[3.0; 8]);
        assert_eq!(result, RepresentativeValue::measured(3.0));
    }

    #[test]
    fn test_measured_zero_is_not_absent() {
        let result = aggregate_values(&[0.0, 0.0]);
        assert_eq!(result.value(), 0.0);
        assert!(!result.is_absent());
    }

    proptest! {
        #[test]
        fn prop_small_sets_equal_mean(values in prop_vec(-1.0e6f64..1.0e6, 1..=5)) {
            let result = aggregate_values(&values);
            prop_assert_eq!(result.provenance(), Provenance::Measured);
            prop_assert!(close(result.value(), naive_mean(&values)));
        }

        #[test]
        fn prop_two_point_sets_keep_everything(
            a in -1.0e3f64..1.0e3,
            b in -1.0e3f64..1.0e3,
            copies in 3usize..10,
        ) {
            // Every sample sits exactly one standard deviation from the mean
            let mut values = vec![a; copies];
            values.extend(std::iter::repeat(b).take(copies));
            let result = aggregate_values(&values);
            prop_assert!(close(result.value(), naive_mean(&values)));
        }

        #[test]
        fn prop_permutation_invariant(
            (original, shuffled) in prop_vec(-1.0e6f64..1.0e6, 0..40)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            prop_assert_eq!(aggregate_values(&original), aggregate_values(&shuffled));
        }

        #[test]
        fn prop_result_within_sample_range(values in prop_vec(-1.0e6f64..1.0e6, 1..40)) {
            let result = aggregate_values(&values).value();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(result >= min - 1e-6 && result <= max + 1e-6);
        }
    }
}
