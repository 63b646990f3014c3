use crate::error::{DataError, DataResult};
use plotters::style::RGBColor;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Target platforms that benchmark results are collected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// GPU OpenCL on x86
    X86,
    /// ARM SoC with an attached FPGA
    Arm,
    /// Intel CPU OpenCL; results live next to the x86 ones
    Intel,
}

/// Static display and layout metadata for a platform.
#[derive(Debug)]
pub struct PlatformProps {
    pub id: &'static str,
    pub colour: RGBColor,
    pub long_name: Option<&'static str>,
    /// Directory under the results root holding this platform's logs
    pub results_dir: &'static str,
    /// Appended to the implementation name when locating logs
    pub impl_suffix: &'static str,
    pub has_fpga: bool,
}

static X86_PROPS: PlatformProps = PlatformProps {
    id: "x86",
    colour: RGBColor(0, 0, 255),
    long_name: Some("x86 (GPU OpenCL)"),
    results_dir: "x86",
    impl_suffix: "",
    has_fpga: false,
};

static ARM_PROPS: PlatformProps = PlatformProps {
    id: "arm",
    colour: RGBColor(255, 0, 0),
    long_name: None,
    results_dir: "arm",
    impl_suffix: "",
    has_fpga: true,
};

static INTEL_PROPS: PlatformProps = PlatformProps {
    id: "intel",
    colour: RGBColor(191, 191, 0),
    long_name: Some("x86 (Intel CPU OpenCL)"),
    results_dir: "x86",
    impl_suffix: "_intel",
    has_fpga: false,
};

impl Platform {
    pub fn all() -> &'static [Platform] {
        &[Platform::X86, Platform::Arm, Platform::Intel]
    }

    pub fn props(&self) -> &'static PlatformProps {
        match self {
            Platform::X86 => &X86_PROPS,
            Platform::Arm => &ARM_PROPS,
            Platform::Intel => &INTEL_PROPS,
        }
    }

    pub fn id(&self) -> &'static str {
        self.props().id
    }

    pub fn colour(&self) -> RGBColor {
        self.props().colour
    }

    pub fn has_fpga(&self) -> bool {
        self.props().has_fpga
    }

    /// Legend label; the long form falls back to the id when a platform has none.
    pub fn label(&self, long: bool) -> &'static str {
        match self.props().long_name {
            Some(name) if long => name,
            _ => self.id(),
        }
    }

    /// `<results>/<platform dir>/<impl><suffix>/log`
    pub fn log_path(&self, results_dir: &Path, impl_name: &str) -> PathBuf {
        let props = self.props();
        results_dir
            .join(props.results_dir)
            .join(format!("{}{}", impl_name, props.impl_suffix))
            .join("log")
    }

    /// `<results>/<platform>/<impl>/aoc/acl_quartus_report.txt`
    pub fn report_path(&self, results_dir: &Path, impl_name: &str) -> PathBuf {
        results_dir
            .join(self.id())
            .join(impl_name)
            .join("aoc")
            .join("acl_quartus_report.txt")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = DataError;

    fn from_str(s: &str) -> DataResult<Self> {
        Platform::all()
            .iter()
            .copied()
            .find(|p| p.id() == s)
            .ok_or_else(|| DataError::UnknownPlatform(s.to_string()))
    }
}

/// Expand a platform selector into the ordered platforms of one chart.
///
/// `both` is x86 and arm, `intelandx86` is x86 and intel, anything else names
/// a single platform.
pub fn parse_selection(selector: &str) -> DataResult<Vec<Platform>> {
    match selector {
        "both" => Ok(vec![Platform::X86, Platform::Arm]),
        "intelandx86" => Ok(vec![Platform::X86, Platform::Intel]),
        other => Ok(vec![other.parse()?]),
    }
}

/// Charts that include the Intel CPU results need the long names to tell the
/// two x86 series apart.
pub fn use_long_labels(platforms: &[Platform]) -> bool {
    platforms.contains(&Platform::Intel)
}
