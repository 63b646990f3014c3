use anyhow::{Context, Result};
use bench_charts::pipeline::{generate_chart, write_summary};
use bench_charts::request::{
    discover_implementations, ChartOptions, ChartRequest, ImageFormat, LegendPosition,
};
use bench_charts::DEFAULT_MARGIN_FRAC;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bench-charts")]
#[command(about = "Comparative bar charts from benchmark logs and FPGA resource reports")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chart one metric across every tagged release of a source repository
    Metric {
        /// Source repository whose git tags name the implementations
        src_dir: PathBuf,

        /// Directory holding per-platform benchmark results
        results_dir: PathBuf,

        /// Platform selector: x86, arm, intel, both or intelandx86
        platforms: String,

        /// Log label to chart, or fpga_area for resource utilisation
        metric: String,

        #[command(flatten)]
        chart: ChartArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Chart the implementations listed in a chart spec file
    Spec {
        /// Directory holding per-platform benchmark results
        results_dir: PathBuf,

        /// Spec file; its name ends in _<platform selector>
        spec_file: PathBuf,

        /// Directory to write the chart to
        out_dir: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct ChartArgs {
    /// Never break the y-axis for outliers
    #[arg(long, default_value = "false")]
    no_outliers: bool,

    /// Padding around the outlier segment, as a fraction of the baseline
    #[arg(long, default_value_t = DEFAULT_MARGIN_FRAC)]
    outlier_margin: f64,

    /// Fixed threshold between normal values and outliers
    #[arg(long)]
    outlier_threshold: Option<f64>,

    /// Legend position, e.g. "upper left"
    #[arg(long)]
    legend: Option<LegendPosition>,

    /// Figure width in inches
    #[arg(long)]
    width: Option<f64>,
}

impl From<ChartArgs> for ChartOptions {
    fn from(args: ChartArgs) -> Self {
        ChartOptions {
            outliers: !args.no_outliers,
            outlier_margin: args.outlier_margin,
            outlier_threshold: args.outlier_threshold,
            legend: args.legend,
            width: args.width,
        }
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Image format of the chart
    #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
    format: ImageFormat,

    /// Also write the chart's data as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Metric {
            src_dir,
            results_dir,
            platforms,
            metric,
            chart,
            output,
        } => {
            let implementations = discover_implementations(&src_dir)
                .context("Failed to list git tags. Is the source directory a git checkout?")?;
            let request = ChartRequest::for_metric(
                &metric,
                implementations,
                &platforms,
                &results_dir,
                chart.into(),
                output.format,
            )?;
            run(&request, &results_dir, output.summary.as_deref())?;
        }
        Commands::Spec {
            results_dir,
            spec_file,
            out_dir,
            output,
        } => {
            let request = ChartRequest::from_spec_file(&spec_file, &out_dir, output.format)
                .with_context(|| format!("Failed to load chart spec {}", spec_file.display()))?;
            run(&request, &results_dir, output.summary.as_deref())?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(request: &ChartRequest, results_dir: &Path, summary: Option<&Path>) -> Result<()> {
    tracing::info!(
        metric = %request.metric,
        implementations = request.implementations.len(),
        platforms = ?request.platforms,
        "Generating chart"
    );

    match generate_chart(request, results_dir)? {
        Some(data) => {
            if let Some(path) = summary {
                write_summary(&data, path)?;
            }
        }
        None => tracing::info!("No chart produced for {}", request.metric),
    }
    Ok(())
}
