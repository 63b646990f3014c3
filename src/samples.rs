use crate::error::{DataError, DataResult};
use std::io;
use std::path::Path;

/// Raw measurements of one metric for one implementation on one platform.
///
/// An empty set is valid and means "no data".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    values: Vec<f64>,
    unit: Option<String>,
}

impl SampleSet {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, unit: None }
    }

    pub fn with_unit(values: Vec<f64>, unit: impl Into<String>) -> Self {
        Self {
            values,
            unit: Some(unit.into()),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Unit tag taken from the first matching log line, e.g. `s`.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Collect every `<label>: <value> [unit]` line of a log.
    ///
    /// `source` only names the log in error messages.
    pub fn parse(text: &str, label: &str, source: &Path) -> DataResult<Self> {
        let mut values = Vec::new();
        let mut unit = None;

        for (idx, line) in text.lines().enumerate() {
            let Some(rest) = match_label(line, label) else {
                continue;
            };

            let tokens: Vec<&str> = rest.split_whitespace().collect();
            let Some(first) = tokens.first() else {
                return Err(DataError::malformed(source, idx + 1, "missing value"));
            };
            let value: f64 = first.parse().map_err(|_| {
                DataError::malformed(source, idx + 1, format!("not a number: {first:?}"))
            })?;
            if !value.is_finite() {
                return Err(DataError::malformed(
                    source,
                    idx + 1,
                    format!("not a finite number: {first:?}"),
                ));
            }

            if values.is_empty() && tokens.len() > 1 {
                unit = tokens.last().map(|u| u.to_string());
            }
            values.push(value);
        }

        Ok(Self { values, unit })
    }

    /// Read a log file. A log that does not exist yields an empty set.
    pub fn from_log(path: &Path, label: &str) -> DataResult<Self> {
        match read_optional(path)? {
            Some(text) => Self::parse(&text, label, path),
            None => Ok(Self::default()),
        }
    }
}

/// Returns the text after the last `:` of `line` if it starts with `label:`.
pub(crate) fn match_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.strip_prefix(label)?.strip_prefix(':')?;
    line.rsplit_once(':').map(|(_, value)| value)
}

/// Read a file to a string, mapping "not found" to `None`.
pub(crate) fn read_optional(path: &Path) -> DataResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(DataError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn src() -> PathBuf {
        PathBuf::from("log")
    }

    #[test]
    fn test_parse_repeated_samples() {
        let text = "Runtime: 1.5 s\nFrames: 30 fps\nRuntime: 1.7 s\n";
        let samples = SampleSet::parse(text, "Runtime", &src()).unwrap();

        assert_eq!(samples.values(), &[1.5, 1.7]);
        assert_eq!(samples.unit(), Some("s"));
    }

    #[test]
    fn test_parse_requires_colon_after_label() {
        let text = "Runtime total: 9.0 s\nRuntimeX: 8.0 s\nRuntime: 1.0 s\n";
        let samples = SampleSet::parse(text, "Runtime", &src()).unwrap();

        assert_eq!(samples.values(), &[1.0]);
    }

    #[test]
    fn test_parse_label_is_case_sensitive() {
        let samples = SampleSet::parse("runtime: 1.0 s\n", "Runtime", &src()).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_parse_value_without_unit() {
        let samples = SampleSet::parse("FPS: 59.9\n", "FPS", &src()).unwrap();
        assert_eq!(samples.values(), &[59.9]);
        assert_eq!(samples.unit(), None);
    }

    #[test]
    fn test_parse_malformed_value_reports_line() {
        let text = "Runtime: 1.0 s\nRuntime: fast s\n";
        let err = SampleSet::parse(text, "Runtime", &src()).unwrap_err();

        match err {
            DataError::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_non_finite_value_is_malformed() {
        for bad in ["nan", "NaN", "inf", "-infinity"] {
            let text = format!("Runtime: 1.0 s\nRuntime: 2.0 s\nRuntime: {bad} s\n");
            let err = SampleSet::parse(&text, "Runtime", &src()).unwrap_err();
            assert!(
                matches!(err, DataError::Malformed { line: 3, .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn test_parse_missing_value_is_malformed() {
        let err = SampleSet::parse("Runtime:\n", "Runtime", &src()).unwrap_err();
        assert!(matches!(err, DataError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let samples = SampleSet::from_log(&dir.path().join("nope").join("log"), "Runtime").unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_from_log_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log");
        std::fs::write(&path, "Runtime: 2.0 s\nRuntime: 4.0 s\n").unwrap();

        let samples = SampleSet::from_log(&path, "Runtime").unwrap();
        assert_eq!(samples.len(), 2);
    }
}
