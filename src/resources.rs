use crate::aggregate::RepresentativeValue;
use crate::error::{DataError, DataResult};
use crate::platform::Platform;
use crate::samples::{match_label, read_optional};
use plotters::style::RGBColor;
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// FPGA resource categories, in stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Logic,
    MemoryBlocks,
    Dsp,
}

impl ResourceKind {
    pub fn all() -> &'static [ResourceKind] {
        &[ResourceKind::Logic, ResourceKind::MemoryBlocks, ResourceKind::Dsp]
    }

    /// Line label in the Quartus report, also used in chart legends.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Logic => "Logic utilization",
            ResourceKind::MemoryBlocks => "M10K blocks",
            ResourceKind::Dsp => "DSP blocks",
        }
    }

    pub fn colour(&self) -> RGBColor {
        match self {
            ResourceKind::Logic => RGBColor(0, 0, 255),
            ResourceKind::MemoryBlocks => RGBColor(0, 128, 0),
            ResourceKind::Dsp => RGBColor(255, 0, 0),
        }
    }
}

/// Percentage utilisation from the first `<label>: <count> [/ <total>]` line.
///
/// A report without the label yields an absent value. Counts may contain
/// thousands separators; a missing total means the count is already a ratio.
pub fn extract(report: &str, label: &str, source: &Path) -> DataResult<RepresentativeValue> {
    let Some((idx, rest)) = report
        .lines()
        .enumerate()
        .find_map(|(idx, line)| match_label(line, label).map(|rest| (idx, rest)))
    else {
        return Ok(RepresentativeValue::ABSENT);
    };
    let line = idx + 1;

    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let numerator = match tokens.first() {
        Some(token) => parse_count(token, source, line)?,
        None => return Err(DataError::malformed(source, line, "missing count")),
    };
    let denominator = match tokens.as_slice() {
        [_, "/", total, ..] => parse_count(total, source, line)?,
        _ => 1,
    };
    if denominator == 0 {
        return Err(DataError::malformed(source, line, "zero total"));
    }

    Ok(RepresentativeValue::measured(
        100.0 * numerator as f64 / denominator as f64,
    ))
}

fn parse_count(token: &str, source: &Path, line: usize) -> DataResult<u64> {
    token
        .replace(',', "")
        .parse()
        .map_err(|_| DataError::malformed(source, line, format!("not an integer: {token:?}")))
}

/// Utilisation of every resource kind for each implementation on one FPGA platform.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceBreakdown {
    platform: Platform,
    implementations: Vec<String>,
    /// Indexed by `ResourceKind::all()` position, then implementation
    values: Vec<Vec<RepresentativeValue>>,
}

impl ResourceBreakdown {
    /// Read each implementation's report under `results_dir`.
    pub fn collect(
        implementations: &[String],
        platform: Platform,
        results_dir: &Path,
    ) -> DataResult<Self> {
        if !platform.has_fpga() {
            return Err(DataError::InvalidRequest(format!(
                "platform {platform} has no FPGA resource reports"
            )));
        }

        let per_impl: Vec<Vec<RepresentativeValue>> = implementations
            .par_iter()
            .map(|name| -> DataResult<Vec<RepresentativeValue>> {
                let path = platform.report_path(results_dir, name);
                let text = read_optional(&path)?;
                ResourceKind::all()
                    .iter()
                    .map(|kind| match &text {
                        Some(text) => extract(text, kind.label(), &path),
                        None => Ok(RepresentativeValue::ABSENT),
                    })
                    .collect()
            })
            .collect::<DataResult<_>>()?;

        let values = (0..ResourceKind::all().len())
            .map(|k| per_impl.iter().map(|row| row[k]).collect())
            .collect();

        Ok(Self {
            platform,
            implementations: implementations.to_vec(),
            values,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn implementations(&self) -> &[String] {
        &self.implementations
    }

    /// Values of one resource kind, in implementation order.
    pub fn series(&self, kind: ResourceKind) -> &[RepresentativeValue] {
        let idx = ResourceKind::all()
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        &self.values[idx]
    }

    /// Stacked height of each implementation's bar.
    pub fn totals(&self) -> Vec<f64> {
        (0..self.implementations.len())
            .map(|i| self.values.iter().map(|series| series[i].value()).sum())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Provenance;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const REPORT: &str = "\
+--------------------------------------------------------------------+
; Estimated Resource Usage Summary                                   ;
Logic utilization: 12,345 / 41,910 ( 29 % )
M10K blocks: 100 / 553 ( 18 % )
DSP blocks: 40 / 80 ( 50 % )
";

    fn src() -> PathBuf {
        PathBuf::from("acl_quartus_report.txt")
    }

    #[test]
    fn test_extract_ratio() {
        let value = extract("DSP blocks: 40 / 80\n", "DSP blocks", &src()).unwrap();
        assert_eq!(value, RepresentativeValue::measured(50.0));
    }

    #[test]
    fn test_extract_without_denominator() {
        let value = extract("Logic utilization: 1,234\n", "Logic utilization", &src()).unwrap();
        assert_eq!(value.value(), 1234.0);
        assert_eq!(value.provenance(), Provenance::Measured);
    }

    #[test]
    fn test_extract_uses_first_match() {
        let text = "DSP blocks: 1 / 4\nDSP blocks: 3 / 4\n";
        let value = extract(text, "DSP blocks", &src()).unwrap();
        assert_eq!(value.value(), 25.0);
    }

    #[test]
    fn test_extract_missing_label_is_absent() {
        let value = extract(REPORT, "RAM blocks", &src()).unwrap();
        assert!(value.is_absent());
    }

    #[test]
    fn test_extract_separator_must_be_slash() {
        let value = extract("DSP blocks: 40 of 80\n", "DSP blocks", &src()).unwrap();
        assert_eq!(value.value(), 4000.0);
    }

    #[test]
    fn test_extract_malformed_count() {
        let err = extract("M10K blocks: lots / 553\n", "M10K blocks", &src()).unwrap_err();
        assert!(matches!(err, DataError::Malformed { line: 1, .. }));

        let err = extract("M10K blocks: 1 / many\n", "M10K blocks", &src()).unwrap_err();
        assert!(matches!(err, DataError::Malformed { .. }));
    }

    #[test]
    fn test_extract_zero_total() {
        let err = extract("DSP blocks: 0 / 0\n", "DSP blocks", &src()).unwrap_err();
        assert!(matches!(err, DataError::Malformed { .. }));
    }

    #[test]
    fn test_breakdown_stacks_in_kind_order() {
        let dir = TempDir::new().unwrap();
        let report = Platform::Arm.report_path(dir.path(), "v1");
        std::fs::create_dir_all(report.parent().unwrap()).unwrap();
        std::fs::write(&report, REPORT).unwrap();

        let impls = vec!["v1".to_string(), "v2".to_string()];
        let breakdown = ResourceBreakdown::collect(&impls, Platform::Arm, dir.path()).unwrap();

        let dsp = breakdown.series(ResourceKind::Dsp);
        assert_eq!(dsp[0].value(), 50.0);
        assert!(dsp[1].is_absent());

        let totals = breakdown.totals();
        let logic = 100.0 * 12345.0 / 41910.0;
        let m10k = 100.0 * 100.0 / 553.0;
        assert!((totals[0] - (logic + m10k + 50.0)).abs() < 1e-9);
        assert_eq!(totals[1], 0.0);
    }

    #[test]
    fn test_breakdown_rejects_non_fpga_platform() {
        let dir = TempDir::new().unwrap();
        let err = ResourceBreakdown::collect(&["v1".to_string()], Platform::X86, dir.path());
        assert!(matches!(err, Err(DataError::InvalidRequest(_))));
    }
}
