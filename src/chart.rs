use crate::layout::{layout, AxisLayout, AxisRange, Segment, SplitOptions, SEGMENT_HEIGHT_RATIO};
use crate::matrix::ComparisonMatrix;
use crate::platform::use_long_labels;
use crate::request::{ChartOptions, LegendPosition};
use crate::resources::{ResourceBreakdown, ResourceKind};
use anyhow::{bail, Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

// Font sizes
const TITLE_FONT_SIZE: u32 = 32;
const AXIS_LABEL_FONT_SIZE: u32 = 22;
const TICK_LABEL_FONT_SIZE: u32 = 18;
const LEGEND_FONT_SIZE: u32 = 18;

// Layout tuning
const DEFAULT_SIZE: (u32, u32) = (1000, 600);
const PIXELS_PER_INCH: f64 = 100.0;
const X_LABEL_AREA_SIZE: u32 = 60;
const Y_LABEL_AREA_SIZE: u32 = 90;

/// Share of each implementation slot covered by its bars.
const GROUP_WIDTH: f64 = 0.8;

/// Past this many implementations the figure grows with the bar count.
const WIDE_CHART_IMPLEMENTATIONS: usize = 10;

/// One bar rectangle in data coordinates. The x axis runs over implementation
/// slots, slot `i` centred on `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

/// Bars sharing a colour and legend entry (a platform or a resource kind).
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub label: String,
    pub colour: RGBColor,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFormat {
    Plain,
    Percent,
}

/// Draw instructions for one chart, independent of the image backend.
#[derive(Debug, Clone)]
pub struct ChartPlan {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub x_labels: Vec<String>,
    pub series: Vec<BarSeries>,
    pub layout: AxisLayout,
    pub legend: LegendPosition,
    pub y_format: TickFormat,
    pub size: (u32, u32),
}

/// Grouped bars of one metric, one series per platform.
pub fn plan_metric_chart(
    matrix: &ComparisonMatrix,
    labels: &[String],
    layout: AxisLayout,
    frame_rate: bool,
    options: &ChartOptions,
) -> ChartPlan {
    let platforms = matrix.platforms();
    let long_labels = use_long_labels(platforms);
    let num_impls = matrix.implementations().len();

    let series = platforms
        .iter()
        .enumerate()
        .map(|(p_idx, platform)| BarSeries {
            label: platform.label(long_labels).to_string(),
            colour: platform.colour(),
            bars: (0..num_impls)
                .map(|i| {
                    let (left, right) = bar_extent(i, p_idx, platforms.len());
                    let top = matrix.get(i, p_idx).map(|v| v.value()).unwrap_or_default();
                    Bar {
                        left,
                        right,
                        bottom: 0.0,
                        top,
                    }
                })
                .collect(),
        })
        .collect();

    let (title, y_desc, default_legend) = if frame_rate {
        (
            "Performance comparison between implementations".to_string(),
            "Execution speed / frames per second",
            LegendPosition::UpperLeft,
        )
    } else {
        (
            format!(
                "Comparison of {} between implementations",
                title_case(matrix.metric())
            ),
            "Execution time / seconds",
            LegendPosition::UpperRight,
        )
    };

    ChartPlan {
        title,
        x_desc: "Implementation".to_string(),
        y_desc: y_desc.to_string(),
        x_labels: slot_labels(labels, matrix.implementations()),
        series,
        layout,
        legend: options.legend.unwrap_or(default_legend),
        y_format: TickFormat::Plain,
        size: figure_size(num_impls, options.width),
    }
}

/// Stacked utilisation bars, one layer per resource kind in [`ResourceKind::all`] order.
pub fn plan_resource_chart(
    breakdown: &ResourceBreakdown,
    labels: &[String],
    options: &ChartOptions,
) -> ChartPlan {
    let num_impls = breakdown.implementations().len();
    let mut bottoms = vec![0.0; num_impls];
    let mut series = Vec::with_capacity(ResourceKind::all().len());

    for kind in ResourceKind::all() {
        let values = breakdown.series(*kind);
        let mut bars = Vec::with_capacity(num_impls);
        for (i, bottom) in bottoms.iter_mut().enumerate() {
            let (left, right) = bar_extent(i, 0, 1);
            let top = *bottom + values[i].value();
            bars.push(Bar {
                left,
                right,
                bottom: *bottom,
                top,
            });
            *bottom = top;
        }
        series.push(BarSeries {
            label: kind.label().to_string(),
            colour: kind.colour(),
            bars,
        });
    }

    let no_split = SplitOptions {
        enabled: false,
        ..SplitOptions::default()
    };

    ChartPlan {
        title: "FPGA Resource Utilisation of OpenCL Kernels".to_string(),
        x_desc: "Implementation".to_string(),
        y_desc: "Percentage of resource used".to_string(),
        x_labels: slot_labels(labels, breakdown.implementations()),
        series,
        layout: layout(&bottoms, &no_split),
        legend: options.legend.unwrap_or(LegendPosition::LowerLeft),
        y_format: TickFormat::Percent,
        size: figure_size(num_impls, options.width),
    }
}

/// Horizontal extent of bar `series_idx` of `num_series` in slot `slot`.
fn bar_extent(slot: usize, series_idx: usize, num_series: usize) -> (f64, f64) {
    let bar_width = GROUP_WIDTH / num_series.max(1) as f64;
    let x_center = slot as f64;
    let x_offset = (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * bar_width;
    (
        x_center + x_offset - bar_width / 2.0,
        x_center + x_offset + bar_width / 2.0,
    )
}

fn slot_labels(labels: &[String], ids: &[String]) -> Vec<String> {
    if labels.len() == ids.len() {
        labels.to_vec()
    } else {
        ids.to_vec()
    }
}

fn figure_size(num_impls: usize, width_inches: Option<f64>) -> (u32, u32) {
    let (default_w, h) = DEFAULT_SIZE;
    match width_inches {
        Some(w) => ((w * PIXELS_PER_INCH).round().max(1.0) as u32, h),
        None if num_impls > WIDE_CHART_IMPLEMENTATIONS => {
            let w = (num_impls as f64 / 2.0 * PIXELS_PER_INCH) as u32;
            (w.max(default_w), h)
        }
        None => DEFAULT_SIZE,
    }
}

/// Capitalise the first letter of every word, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn format_tick(value: f64, format: TickFormat) -> String {
    match format {
        TickFormat::Percent => format!("{:.0}%", value),
        TickFormat::Plain if value == 0.0 => "0".to_string(),
        TickFormat::Plain if value.abs() >= 100.0 => format!("{:.0}", value),
        TickFormat::Plain if value.abs() >= 1.0 => format!("{:.1}", value),
        TickFormat::Plain => format!("{:.3}", value),
    }
}

fn slot_label(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() >= 0.3 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn series_label_position(position: LegendPosition) -> SeriesLabelPosition {
    match position {
        LegendPosition::UpperLeft => SeriesLabelPosition::UpperLeft,
        LegendPosition::UpperCenter => SeriesLabelPosition::UpperMiddle,
        LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
        LegendPosition::CenterLeft => SeriesLabelPosition::MiddleLeft,
        LegendPosition::Center => SeriesLabelPosition::MiddleMiddle,
        LegendPosition::CenterRight => SeriesLabelPosition::MiddleRight,
        LegendPosition::LowerLeft => SeriesLabelPosition::LowerLeft,
        LegendPosition::LowerCenter => SeriesLabelPosition::LowerMiddle,
        LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
    }
}

/// Part of `bar` visible within `range`, if any.
fn clip_bar(bar: &Bar, range: AxisRange) -> Option<Bar> {
    let bottom = bar.bottom.max(range.min);
    let top = bar.top.min(range.max);
    (top > bottom).then_some(Bar {
        bottom,
        top,
        ..*bar
    })
}

/// Write the chart to `path`; `.svg` selects the SVG backend, anything else PNG.
pub fn render(plan: &ChartPlan, path: &Path) -> Result<()> {
    check_finite(plan)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => {
            let root = SVGBackend::new(path, plan.size).into_drawing_area();
            draw_chart(&root, plan)?;
        }
        _ => {
            let root = BitMapBackend::new(path, plan.size).into_drawing_area();
            draw_chart(&root, plan)?;
        }
    }

    tracing::info!("Generated: {}", path.display());
    Ok(())
}

/// Plotters cannot lay out a mesh or bar over infinite or NaN coordinates.
fn check_finite(plan: &ChartPlan) -> Result<()> {
    let layout = &plan.layout;
    for range in std::iter::once(layout.lower).chain(layout.upper) {
        check_range(range)?;
    }
    let bad_bar = plan
        .series
        .iter()
        .flat_map(|s| s.bars.iter().map(move |bar| (s, bar)))
        .find(|(_, bar)| !(bar.bottom.is_finite() && bar.top.is_finite()));
    if let Some((series, bar)) = bad_bar {
        bail!(
            "bar of {} spans non-finite values [{}, {}]",
            series.label,
            bar.bottom,
            bar.top
        );
    }
    Ok(())
}

fn check_range(range: AxisRange) -> Result<()> {
    if !(range.min.is_finite() && range.max.is_finite()) {
        bail!("axis range [{}, {}] is not finite", range.min, range.max);
    }
    Ok(())
}

struct SegmentStyle {
    x_axis: bool,
    legend: bool,
    y_labels: usize,
}

fn draw_chart<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, plan: &ChartPlan) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let body = root.titled(&plan.title, ("sans-serif", TITLE_FONT_SIZE))?;

    match plan.layout.upper {
        None => {
            let range = AxisRange::new(0.0, headroom(plan.layout.lower.max));
            let style = SegmentStyle {
                x_axis: true,
                legend: true,
                y_labels: 10,
            };
            draw_segment(&body, plan, range, style)?;
        }
        Some(upper) => {
            let (_, height) = body.dim_in_pixel();
            let (top_share, bottom_share) = SEGMENT_HEIGHT_RATIO;
            let split_at = (height * top_share / (top_share + bottom_share)) as i32;
            let (upper_area, lower_area) = body.split_vertically(split_at);

            let upper_style = SegmentStyle {
                x_axis: false,
                legend: true,
                y_labels: 5,
            };
            let lower_style = SegmentStyle {
                x_axis: true,
                legend: false,
                y_labels: 10,
            };
            let upper_px = draw_segment(&upper_area, plan, drawable(upper), upper_style)?;
            let lower_px = draw_segment(&lower_area, plan, drawable(plan.layout.lower), lower_style)?;

            for marker in plan.layout.break_markers() {
                let (xs, ys) = match marker.segment {
                    Segment::Upper => &upper_px,
                    Segment::Lower => &lower_px,
                };
                let from = to_pixel(marker.from, xs, ys);
                let to = to_pixel(marker.to, xs, ys);
                root.draw(&PathElement::new(vec![from, to], BLACK.stroke_width(1)))?;
            }
        }
    }

    root.present()?;
    Ok(())
}

/// Draw one axis segment; returns its plotting area in backend pixels.
fn draw_segment<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    plan: &ChartPlan,
    range: AxisRange,
    style: SegmentStyle,
) -> Result<(Range<i32>, Range<i32>)>
where
    DB::ErrorType: 'static,
{
    check_range(range)?;
    let num_slots = plan.x_labels.len().max(1);
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(if style.x_axis { X_LABEL_AREA_SIZE } else { 0 })
        .y_label_area_size(Y_LABEL_AREA_SIZE)
        .build_cartesian_2d(-0.5..(num_slots as f64 - 0.5), range.min..range.max)?;

    let x_formatter = |x: &f64| slot_label(&plan.x_labels, *x);
    let y_formatter = |y: &f64| format_tick(*y, plan.y_format);

    {
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(if style.x_axis { num_slots } else { 0 })
            .x_label_formatter(&x_formatter)
            .y_labels(style.y_labels)
            .y_label_formatter(&y_formatter)
            .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
            .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE));
        if style.x_axis {
            mesh.x_desc(plan.x_desc.as_str()).y_desc(plan.y_desc.as_str());
        }
        mesh.draw()?;
    }

    for series in &plan.series {
        let colour = series.colour;
        let rects = series
            .bars
            .iter()
            .filter_map(|bar| clip_bar(bar, range))
            .map(|bar| Rectangle::new([(bar.left, bar.bottom), (bar.right, bar.top)], colour.filled()));
        let anno = chart.draw_series(rects)?;
        if style.legend {
            anno.label(series.label.as_str()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 20, y + 5)], colour.filled())
            });
        }
    }

    if style.legend {
        chart
            .configure_series_labels()
            .position(series_label_position(plan.legend))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", LEGEND_FONT_SIZE))
            .draw()?;
    }

    Ok(chart.plotting_area().get_pixel_range())
}

/// Top of a single-range axis, padded so the tallest bar does not touch the frame.
fn headroom(max: f64) -> f64 {
    if max > 0.0 {
        max * 1.05
    } else {
        1.0
    }
}

fn drawable(range: AxisRange) -> AxisRange {
    if range.max > range.min {
        range
    } else {
        AxisRange::new(range.min, range.min + 1.0)
    }
}

/// Map a plotting-area fraction (origin bottom left) to backend pixels.
fn to_pixel(point: (f64, f64), xs: &Range<i32>, ys: &Range<i32>) -> (i32, i32) {
    let width = f64::from(xs.end - xs.start);
    let height = f64::from(ys.end - ys.start);
    (
        xs.start + (point.0 * width).round() as i32,
        ys.end - (point.1 * height).round() as i32,
    )
}
