use crate::error::{DataError, DataResult};
use crate::layout::{SplitOptions, DEFAULT_MARGIN_FRAC};
use crate::platform::{parse_selection, Platform};
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Metric name that selects the FPGA resource chart instead of a timing chart.
pub const FPGA_AREA_METRIC: &str = "fpga_area";

/// Name given to the working-tree build, listed after all tagged releases.
pub const CURRENT_IMPLEMENTATION: &str = "current";

/// Image encoding of a rendered chart.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    UpperLeft,
    UpperCenter,
    UpperRight,
    CenterLeft,
    Center,
    CenterRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl FromStr for LegendPosition {
    type Err = DataError;

    /// Accepts `upper left`, `upper_left`, `center`, `right`, ...
    fn from_str(s: &str) -> DataResult<Self> {
        let normalized = s.trim().replace('_', " ").to_lowercase();
        let position = match normalized.as_str() {
            "upper left" => LegendPosition::UpperLeft,
            "upper center" => LegendPosition::UpperCenter,
            "upper right" => LegendPosition::UpperRight,
            "center left" => LegendPosition::CenterLeft,
            "center" => LegendPosition::Center,
            "center right" | "right" => LegendPosition::CenterRight,
            "lower left" => LegendPosition::LowerLeft,
            "lower center" => LegendPosition::LowerCenter,
            "lower right" => LegendPosition::LowerRight,
            _ => {
                return Err(DataError::InvalidRequest(format!(
                    "unknown legend position: {s:?}"
                )))
            }
        };
        Ok(position)
    }
}

/// Legend side of a chart spec file. `best` leaves the choice to the chart.
fn parse_legend_side(raw: &str) -> DataResult<Option<LegendPosition>> {
    if raw.eq_ignore_ascii_case("best") {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

/// Presentation and outlier settings of one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    /// Allow a broken y-axis when some bars are outliers
    pub outliers: bool,
    /// Padding around the outlier segment, as a fraction of the baseline
    pub outlier_margin: f64,
    /// Fixed threshold between normal values and outliers
    pub outlier_threshold: Option<f64>,
    pub legend: Option<LegendPosition>,
    /// Figure width in inches
    pub width: Option<f64>,
}

/// Widest figure accepted, in inches.
pub const MAX_WIDTH_INCHES: f64 = 200.0;

impl ChartOptions {
    /// Reject settings that would give an inverted axis or an unusable figure.
    pub fn validate(&self) -> DataResult<()> {
        let invalid = |what: &str, value: f64| {
            Err(DataError::InvalidRequest(format!("invalid {what}: {value}")))
        };

        if !(self.outlier_margin.is_finite() && self.outlier_margin >= 0.0) {
            return invalid("outlier margin", self.outlier_margin);
        }
        if let Some(threshold) = self.outlier_threshold {
            if !(threshold.is_finite() && threshold >= 0.0) {
                return invalid("outlier threshold", threshold);
            }
        }
        if let Some(width) = self.width {
            if !(width.is_finite() && width > 0.0 && width <= MAX_WIDTH_INCHES) {
                return invalid("figure width", width);
            }
        }
        Ok(())
    }
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            outliers: true,
            outlier_margin: DEFAULT_MARGIN_FRAC,
            outlier_threshold: None,
            legend: None,
            width: None,
        }
    }
}

/// What kind of chart a metric produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Timing or frame-rate bars, one per platform
    Metric { frame_rate: bool },
    /// Stacked FPGA resource utilisation
    FpgaArea,
}

impl ChartKind {
    pub fn of(metric: &str) -> Self {
        if metric == FPGA_AREA_METRIC {
            ChartKind::FpgaArea
        } else {
            ChartKind::Metric {
                frame_rate: metric.to_lowercase().contains("fps"),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Implementation {
    pub id: String,
    pub label: String,
}

impl Implementation {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
        }
    }
}

/// Everything needed to produce one chart image.
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub metric: String,
    pub implementations: Vec<Implementation>,
    pub platforms: Vec<Platform>,
    pub options: ChartOptions,
    pub output: PathBuf,
}

impl ChartRequest {
    /// Chart of one metric over discovered implementations.
    ///
    /// Single-platform charts go to `<results>/<platform>/`, others to the
    /// results root.
    pub fn for_metric(
        metric: &str,
        implementations: Vec<String>,
        platform_selector: &str,
        results_dir: &Path,
        options: ChartOptions,
        format: ImageFormat,
    ) -> DataResult<Self> {
        options.validate()?;
        let platforms = parse_selection(platform_selector)?;
        let out_dir = match platforms.as_slice() {
            [single] => results_dir.join(single.id()),
            _ => results_dir.to_path_buf(),
        };
        let output = out_dir.join(format!("{}.{}", metric.to_lowercase(), format.extension()));

        Ok(Self {
            metric: metric.to_string(),
            implementations: implementations.into_iter().map(Implementation::new).collect(),
            platforms,
            options,
            output,
        })
    }

    /// Chart described by a spec file; see [`ChartSpec`].
    pub fn from_spec_file(spec_path: &Path, out_dir: &Path, format: ImageFormat) -> DataResult<Self> {
        let spec = ChartSpec::from_file(spec_path)?;
        let platforms = parse_selection(spec_platform_selector(spec_path)?)?;

        let file_name = spec_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = out_dir.join(format!("{}.{}", file_name, format.extension()));

        Ok(Self {
            metric: spec.metric,
            implementations: spec.implementations,
            platforms,
            options: spec.options,
            output,
        })
    }

    pub fn kind(&self) -> ChartKind {
        ChartKind::of(&self.metric)
    }

    pub fn implementation_ids(&self) -> Vec<String> {
        self.implementations.iter().map(|i| i.id.clone()).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.implementations.iter().map(|i| i.label.clone()).collect()
    }

    /// Frame-rate comparisons never use a broken axis.
    pub fn split_options(&self) -> SplitOptions {
        let frame_rate = matches!(self.kind(), ChartKind::Metric { frame_rate: true });
        SplitOptions {
            enabled: self.options.outliers && !frame_rate,
            margin_frac: self.options.outlier_margin,
            threshold_override: self.options.outlier_threshold,
        }
    }
}

/// Parsed chart spec file.
///
/// ```text
/// Runtime
/// outlier on
/// outliermargin 0.2
/// legside upper_left
/// width 12
/// outlierthresh 4.5
/// ---
/// v1.0 First_release
/// v2.0
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub metric: String,
    pub options: ChartOptions,
    pub implementations: Vec<Implementation>,
}

impl ChartSpec {
    pub fn parse(text: &str, source: &Path) -> DataResult<Self> {
        let mut lines = text.lines().enumerate();
        let metric = lines
            .next()
            .map(|(_, line)| line.trim_end().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                DataError::InvalidRequest(format!("{}: missing metric line", source.display()))
            })?;

        let mut options = ChartOptions::default();
        let mut implementations = Vec::new();
        let mut in_preamble = true;

        for (idx, line) in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "---" {
                in_preamble = false;
                continue;
            }

            let words: Vec<&str> = line.split_whitespace().collect();
            if in_preamble {
                apply_option(&mut options, &words, source, idx + 1)?;
            } else {
                let mut implementation = Implementation::new(words[0]);
                if let Some(label) = words.get(1) {
                    implementation.label = label.replace('_', " ");
                }
                implementations.push(implementation);
            }
        }

        options.validate()?;

        Ok(Self {
            metric,
            options,
            implementations,
        })
    }

    pub fn from_file(path: &Path) -> DataResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }
}

fn apply_option(
    options: &mut ChartOptions,
    words: &[&str],
    source: &Path,
    line: usize,
) -> DataResult<()> {
    let key = words[0];
    let value = || {
        words.get(1).copied().ok_or_else(|| {
            DataError::InvalidRequest(format!("{}:{line}: {key} needs a value", source.display()))
        })
    };
    let number = |raw: &str| {
        raw.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .ok_or_else(|| {
                DataError::InvalidRequest(format!(
                    "{}:{line}: {key} expects a non-negative number, got {raw:?}",
                    source.display()
                ))
            })
    };

    match key {
        "outlier" => options.outliers = value()? == "on",
        "outliermargin" => options.outlier_margin = number(value()?)?,
        "legside" => options.legend = parse_legend_side(value()?)?,
        "width" => options.width = Some(number(value()?)?),
        "outlierthresh" => options.outlier_threshold = Some(number(value()?)?),
        other => tracing::debug!(key = other, line, "ignoring unknown chart option"),
    }
    Ok(())
}

/// Platform selector encoded as the last `_`-separated part of a spec file name.
pub fn spec_platform_selector(spec_path: &Path) -> DataResult<&str> {
    spec_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.rsplit('_').next())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            DataError::InvalidRequest(format!(
                "cannot derive platform from {}",
                spec_path.display()
            ))
        })
}

/// Tags of the git repository at `src_dir`, oldest first, then `current`.
pub fn discover_implementations(src_dir: &Path) -> DataResult<Vec<String>> {
    let tag_dir = src_dir.join(".git").join("refs").join("tags");
    let io_err = |source| DataError::Io {
        path: tag_dir.clone(),
        source,
    };

    let mut tags = Vec::new();
    for entry in std::fs::read_dir(&tag_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let modified = entry.metadata().and_then(|m| m.modified()).map_err(io_err)?;
        tags.push((modified, entry.file_name().to_string_lossy().into_owned()));
    }
    tags.sort();

    let mut names: Vec<String> = tags.into_iter().map(|(_, name)| name).collect();
    names.push(CURRENT_IMPLEMENTATION.to_string());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_parse_spec_file() {
        let text = "\
Runtime
outlier off
outliermargin 0.25
legside upper_left
width 12
outlierthresh 4.5

---
v1.0 First_release
v2.0
";
        let spec = ChartSpec::parse(text, Path::new("runtime_x86")).unwrap();

        assert_eq!(spec.metric, "Runtime");
        assert!(!spec.options.outliers);
        assert_eq!(spec.options.outlier_margin, 0.25);
        assert_eq!(spec.options.legend, Some(LegendPosition::UpperLeft));
        assert_eq!(spec.options.width, Some(12.0));
        assert_eq!(spec.options.outlier_threshold, Some(4.5));
        assert_eq!(
            spec.implementations,
            vec![
                Implementation {
                    id: "v1.0".into(),
                    label: "First release".into()
                },
                Implementation::new("v2.0"),
            ]
        );
    }

    #[test]
    fn test_parse_spec_defaults() {
        let spec = ChartSpec::parse("FPS\n---\na\n", Path::new("fps_both")).unwrap();
        assert_eq!(spec.options, ChartOptions::default());
        assert_eq!(spec.implementations.len(), 1);
    }

    #[test]
    fn test_parse_spec_rejects_bad_number() {
        let err = ChartSpec::parse("Runtime\nwidth wide\n---\n", Path::new("s")).unwrap_err();
        assert!(matches!(err, DataError::InvalidRequest(_)));

        let err = ChartSpec::parse("Runtime\noutliermargin\n", Path::new("s")).unwrap_err();
        assert!(matches!(err, DataError::InvalidRequest(_)));
    }

    #[test]
    fn test_legside_best_keeps_chart_default() {
        let spec = ChartSpec::parse("Runtime\nlegside best\n---\nv1\n", Path::new("s")).unwrap();
        assert_eq!(spec.options.legend, None);

        let err = ChartSpec::parse("Runtime\nlegside nowhere\n", Path::new("s")).unwrap_err();
        assert!(matches!(err, DataError::InvalidRequest(_)));
    }

    #[test]
    fn test_parse_spec_rejects_out_of_range_numbers() {
        for line in ["outlierthresh -5", "outliermargin nan", "width inf", "width 0", "width 1e12"] {
            let text = format!("Runtime\n{line}\n---\nv1\n");
            let err = ChartSpec::parse(&text, Path::new("s")).unwrap_err();
            assert!(matches!(err, DataError::InvalidRequest(_)), "{line}");
        }
    }

    #[test]
    fn test_metric_request_validates_options() {
        let options = ChartOptions {
            outlier_threshold: Some(-5.0),
            ..ChartOptions::default()
        };
        let err = ChartRequest::for_metric(
            "Runtime",
            vec![],
            "x86",
            Path::new("r"),
            options,
            ImageFormat::Png,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidRequest(_)));

        let options = ChartOptions {
            outlier_margin: f64::NAN,
            ..ChartOptions::default()
        };
        assert!(options.validate().is_err());
        assert!(ChartOptions::default().validate().is_ok());
    }

    #[test]
    fn test_parse_spec_requires_metric() {
        assert!(ChartSpec::parse("", Path::new("s")).is_err());
    }

    #[test]
    fn test_spec_platform_selector() {
        let selector = spec_platform_selector(Path::new("specs/kernel_time_intelandx86")).unwrap();
        assert_eq!(selector, "intelandx86");
    }

    #[test]
    fn test_request_from_spec_file() {
        let dir = TempDir::new().unwrap();
        let spec_path = dir.path().join("runtime_both");
        std::fs::write(&spec_path, "Runtime\n---\nv1\nv2 Second\n").unwrap();

        let request = ChartRequest::from_spec_file(&spec_path, Path::new("out"), ImageFormat::Png).unwrap();
        assert_eq!(request.platforms, vec![Platform::X86, Platform::Arm]);
        assert_eq!(request.output, Path::new("out/runtime_both.png"));
        assert_eq!(request.labels(), vec!["v1".to_string(), "Second".to_string()]);
    }

    #[test]
    fn test_metric_request_output_path() {
        let single = ChartRequest::for_metric(
            "Runtime",
            vec!["v1".into()],
            "arm",
            Path::new("results"),
            ChartOptions::default(),
            ImageFormat::Png,
        )
        .unwrap();
        assert_eq!(single.output, Path::new("results/arm/runtime.png"));

        let both = ChartRequest::for_metric(
            "Runtime",
            vec!["v1".into()],
            "both",
            Path::new("results"),
            ChartOptions::default(),
            ImageFormat::Svg,
        )
        .unwrap();
        assert_eq!(both.output, Path::new("results/runtime.svg"));
    }

    #[test]
    fn test_fps_metrics_never_split() {
        let request = ChartRequest::for_metric(
            "Average FPS",
            vec![],
            "x86",
            Path::new("r"),
            ChartOptions::default(),
            ImageFormat::Png,
        )
        .unwrap();
        assert_eq!(request.kind(), ChartKind::Metric { frame_rate: true });
        assert!(!request.split_options().enabled);

        assert_eq!(ChartKind::of("fpga_area"), ChartKind::FpgaArea);
        assert_eq!(ChartKind::of("Runtime"), ChartKind::Metric { frame_rate: false });
    }

    #[test]
    fn test_legend_position_parsing() {
        assert_eq!("lower_right".parse::<LegendPosition>().unwrap(), LegendPosition::LowerRight);
        assert_eq!("right".parse::<LegendPosition>().unwrap(), LegendPosition::CenterRight);
        assert!("sideways".parse::<LegendPosition>().is_err());
    }

    #[test]
    fn test_discover_implementations_orders_by_mtime() {
        let dir = TempDir::new().unwrap();
        let tag_dir = dir.path().join(".git/refs/tags");
        std::fs::create_dir_all(&tag_dir).unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        for (name, offset) in [("v2.0", 200), ("v1.0", 100), ("v3.0", 300)] {
            let file = std::fs::File::create(tag_dir.join(name)).unwrap();
            file.set_modified(base + Duration::from_secs(offset)).unwrap();
        }

        let names = discover_implementations(dir.path()).unwrap();
        assert_eq!(names, vec!["v1.0", "v2.0", "v3.0", "current"]);
    }

    #[test]
    fn test_discover_implementations_without_repo() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_implementations(dir.path()),
            Err(DataError::Io { .. })
        ));
    }
}
