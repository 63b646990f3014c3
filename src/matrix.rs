use crate::aggregate::{aggregate, RepresentativeValue};
use crate::error::DataResult;
use crate::platform::Platform;
use crate::samples::SampleSet;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Representative values of one metric for every (implementation, platform) pair.
///
/// Implementations keep the caller's order, which usually encodes release
/// history. Missing data stays in the matrix as an absent entry.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonMatrix {
    metric: String,
    unit: Option<String>,
    implementations: Vec<String>,
    platforms: Vec<Platform>,
    /// Row-major: implementation, then platform
    values: Vec<RepresentativeValue>,
}

impl ComparisonMatrix {
    /// Aggregate the samples returned by `lookup` for every pair.
    ///
    /// Lookups run in parallel; the first error aborts the whole build.
    pub fn build<F>(
        metric: &str,
        implementations: &[String],
        platforms: &[Platform],
        lookup: F,
    ) -> DataResult<Self>
    where
        F: Fn(&str, Platform) -> DataResult<SampleSet> + Sync,
    {
        let mut unique_platforms: Vec<Platform> = Vec::with_capacity(platforms.len());
        for platform in platforms {
            if !unique_platforms.contains(platform) {
                unique_platforms.push(*platform);
            }
        }

        let pairs: Vec<(&str, Platform)> = implementations
            .iter()
            .flat_map(|name| unique_platforms.iter().map(move |p| (name.as_str(), *p)))
            .collect();

        let results: Vec<(RepresentativeValue, Option<String>)> = pairs
            .par_iter()
            .map(|&(name, platform)| -> DataResult<_> {
                let samples = lookup(name, platform)?;
                let value = aggregate(&samples);
                tracing::debug!(
                    metric,
                    implementation = name,
                    %platform,
                    samples = samples.len(),
                    value = value.value(),
                    "aggregated"
                );
                Ok((value, samples.unit().map(str::to_string)))
            })
            .collect::<DataResult<_>>()?;

        let unit = results.iter().find_map(|(_, unit)| unit.clone());
        let values = results.into_iter().map(|(value, _)| value).collect();

        Ok(Self {
            metric: metric.to_string(),
            unit,
            implementations: implementations.to_vec(),
            platforms: unique_platforms,
            values,
        })
    }

    /// Build from the `log` files under a results directory.
    pub fn from_logs(
        metric: &str,
        implementations: &[String],
        platforms: &[Platform],
        results_dir: &Path,
    ) -> DataResult<Self> {
        Self::build(metric, implementations, platforms, |name, platform| {
            SampleSet::from_log(&platform.log_path(results_dir, name), metric)
        })
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn implementations(&self) -> &[String] {
        &self.implementations
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn get(&self, impl_idx: usize, platform_idx: usize) -> Option<RepresentativeValue> {
        if impl_idx >= self.implementations.len() || platform_idx >= self.platforms.len() {
            return None;
        }
        self.values
            .get(impl_idx * self.platforms.len() + platform_idx)
            .copied()
    }

    pub fn value(&self, implementation: &str, platform: Platform) -> Option<RepresentativeValue> {
        let i = self.implementations.iter().position(|n| n == implementation)?;
        let p = self.platforms.iter().position(|x| *x == platform)?;
        self.get(i, p)
    }

    /// One platform's values in implementation order.
    pub fn series(&self, platform: Platform) -> Vec<f64> {
        let Some(p) = self.platforms.iter().position(|x| *x == platform) else {
            return Vec::new();
        };
        (0..self.implementations.len())
            .filter_map(|i| self.get(i, p))
            .map(|v| v.value())
            .collect()
    }

    /// Every entry in row-major order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Platform, RepresentativeValue)> + '_ {
        let width = self.platforms.len();
        self.values.iter().enumerate().map(move |(idx, value)| {
            (
                self.implementations[idx / width].as_str(),
                self.platforms[idx % width],
                *value,
            )
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
