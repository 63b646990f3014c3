use crate::chart::{plan_metric_chart, plan_resource_chart, render, ChartPlan};
use crate::layout::{layout_grouped, AxisLayout};
use crate::matrix::ComparisonMatrix;
use crate::request::{ChartKind, ChartRequest};
use crate::resources::{ResourceBreakdown, ResourceKind};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Numbers behind a chart, as written to the JSON summary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartData {
    Metric {
        matrix: ComparisonMatrix,
        layout: AxisLayout,
    },
    Resources {
        breakdown: ResourceBreakdown,
    },
}

/// A chart whose data has been read and laid out but not yet drawn.
#[derive(Debug, Clone)]
pub struct PreparedChart {
    pub data: ChartData,
    pub plan: ChartPlan,
}

/// Read all inputs of a request and lay out its chart.
///
/// Returns `None` for requests that produce no chart, such as a resource
/// chart for a platform without an FPGA. Malformed input fails the request.
pub fn prepare_chart(request: &ChartRequest, results_dir: &Path) -> Result<Option<PreparedChart>> {
    let ids = request.implementation_ids();
    let labels = request.labels();

    match request.kind() {
        ChartKind::FpgaArea => {
            let platform = match request.platforms.as_slice() {
                [single] if single.has_fpga() => *single,
                _ => {
                    tracing::warn!(
                        platforms = ?request.platforms,
                        "resource charts need a single FPGA platform, skipping"
                    );
                    return Ok(None);
                }
            };

            let breakdown = ResourceBreakdown::collect(&ids, platform, results_dir)
                .with_context(|| format!("Failed to read resource reports for {platform}"))?;
            for (i, name) in breakdown.implementations().iter().enumerate() {
                let missing = ResourceKind::all()
                    .iter()
                    .all(|kind| breakdown.series(*kind)[i].is_absent());
                if missing {
                    tracing::warn!(implementation = %name, %platform, "no resource report");
                }
            }

            let plan = plan_resource_chart(&breakdown, &labels, &request.options);
            Ok(Some(PreparedChart {
                data: ChartData::Resources { breakdown },
                plan,
            }))
        }
        ChartKind::Metric { frame_rate } => {
            let matrix =
                ComparisonMatrix::from_logs(&request.metric, &ids, &request.platforms, results_dir)
                    .with_context(|| format!("Failed to read {} logs", request.metric))?;
            for (name, platform, value) in matrix.entries() {
                if value.is_absent() {
                    tracing::warn!(implementation = name, %platform, metric = %request.metric, "no data");
                }
            }

            let series: Vec<Vec<f64>> = matrix
                .platforms()
                .iter()
                .map(|p| matrix.series(*p))
                .collect();
            let series_refs: Vec<&[f64]> = series.iter().map(Vec::as_slice).collect();
            let layout = layout_grouped(&series_refs, &request.split_options());

            tracing::info!(
                metric = %request.metric,
                implementations = ids.len(),
                split = layout.is_split(),
                threshold = layout.threshold,
                "laid out chart"
            );

            let plan = plan_metric_chart(&matrix, &labels, layout, frame_rate, &request.options);
            Ok(Some(PreparedChart {
                data: ChartData::Metric { matrix, layout },
                plan,
            }))
        }
    }
}

/// Prepare and render a request to its output path.
pub fn generate_chart(request: &ChartRequest, results_dir: &Path) -> Result<Option<ChartData>> {
    let Some(prepared) = prepare_chart(request, results_dir)? else {
        return Ok(None);
    };
    render(&prepared.plan, &request.output)
        .with_context(|| format!("Failed to render {}", request.output.display()))?;
    Ok(Some(prepared.data))
}

pub fn write_summary(data: &ChartData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write summary {}", path.display()))?;
    tracing::info!("Summary: {}", path.display());
    Ok(())
}
