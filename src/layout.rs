//! Y-axis layout for comparison bar charts.
//!
//! When a few bars are far taller than the rest, the axis is broken in two: a
//! lower segment that shows the normal values at full resolution and a short
//! upper segment that shows the outliers.

use serde::Serialize;

/// Default threshold is this factor times the baseline.
pub const THRESHOLD_FACTOR: f64 = 1.1;

/// Default padding around the upper segment, as a fraction of the baseline.
pub const DEFAULT_MARGIN_FRAC: f64 = 0.1;

/// Size of the diagonal break markers, in axes fractions.
pub const BREAK_MARKER_SIZE: f64 = 0.015;

/// Relative heights of the upper and lower segments.
pub const SEGMENT_HEIGHT_RATIO: (u32, u32) = (1, 5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitOptions {
    pub enabled: bool,
    pub margin_frac: f64,
    pub threshold_override: Option<f64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            margin_frac: DEFAULT_MARGIN_FRAC,
            threshold_override: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Segment {
    Upper,
    Lower,
}

/// A diagonal stroke marking where the axis is broken.
///
/// Coordinates are fractions of the segment's plotting area, origin at the
/// bottom left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakMarker {
    pub segment: Segment,
    pub from: (f64, f64),
    pub to: (f64, f64),
}

/// Value ranges of a chart's y-axis.
///
/// Without an upper range the chart is drawn on `lower` alone. With one,
/// `lower.max <= threshold <= upper.min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisLayout {
    pub lower: AxisRange,
    pub upper: Option<AxisRange>,
    pub threshold: f64,
}

impl AxisLayout {
    fn single(max: f64, threshold: f64) -> Self {
        Self {
            lower: AxisRange::new(0.0, max),
            upper: None,
            threshold,
        }
    }

    pub fn is_split(&self) -> bool {
        self.upper.is_some()
    }

    /// Break markers for both edges of both segments; empty when not split.
    pub fn break_markers(&self) -> Vec<BreakMarker> {
        if !self.is_split() {
            return Vec::new();
        }

        let d = BREAK_MARKER_SIZE;
        let r = f64::from(SEGMENT_HEIGHT_RATIO.1) / f64::from(SEGMENT_HEIGHT_RATIO.0);
        let mut markers = Vec::with_capacity(4);
        for x in [0.0, 1.0] {
            markers.push(BreakMarker {
                segment: Segment::Upper,
                from: (x - d, -d * r),
                to: (x + d, d * r),
            });
            markers.push(BreakMarker {
                segment: Segment::Lower,
                from: (x - d, 1.0 - d),
                to: (x + d, 1.0 + d),
            });
        }
        markers
    }
}

/// Lay out one sequence of values.
///
/// The baseline is the first non-zero value in sequence order, so the order
/// of `values` matters.
pub fn layout(values: &[f64], options: &SplitOptions) -> AxisLayout {
    layout_grouped(&[values], options)
}

/// Lay out several series drawn side by side, e.g. one per platform.
///
/// The baseline is the largest of the series' first non-zero values. Series
/// without any non-zero value do not contribute a baseline. Non-finite values
/// are skipped, as if absent.
pub fn layout_grouped(series: &[&[f64]], options: &SplitOptions) -> AxisLayout {
    let max = series.iter().flat_map(finite_values).fold(0.0_f64, f64::max);

    let baseline = series
        .iter()
        .filter_map(|s| finite_values(s).find(|v| *v != 0.0))
        .reduce(f64::max);

    let Some(baseline) = baseline else {
        return AxisLayout::single(max, max);
    };

    let threshold = options
        .threshold_override
        .unwrap_or(baseline * THRESHOLD_FACTOR);

    if !options.enabled {
        return AxisLayout::single(max, threshold);
    }

    let min_outlier = series
        .iter()
        .flat_map(finite_values)
        .filter(|v| *v > threshold)
        .reduce(f64::min);

    let Some(min_outlier) = min_outlier else {
        return AxisLayout::single(max, threshold);
    };

    let margin = options.margin_frac * baseline;
    AxisLayout {
        lower: AxisRange::new(0.0, threshold),
        upper: Some(AxisRange::new(
            (min_outlier - margin).max(threshold),
            max + margin,
        )),
        threshold,
    }
}

fn finite_values<'a>(series: &&'a [f64]) -> impl Iterator<Item = f64> + 'a {
    series.iter().copied().filter(|v| v.is_finite())
}
