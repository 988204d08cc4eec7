//! Parsing of tool output: the coverage report JSON and the test
//! harness summary.

use super::error::{ExecError, ExecResult};
use crate::coverage::LlvmCoverage;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Marker printed by the test harness when at least one test failed
pub const FAILED_MARKER: &str = "test result: FAILED";

const LINES_POINTER: &str = "/data/0/totals/lines/percent";
const REGIONS_POINTER: &str = "/data/0/totals/regions/percent";

/// `test rusty_tests::case_7 ... FAILED`
static FAILED_TEST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^test\s+\S*_(\d+)\s+\.\.\.\s+FAILED$").unwrap());

/// Outcome of a traced run
#[derive(Debug)]
pub enum RunStatus<C> {
    /// Tests ran; `failed` holds the chromosomes whose test failed, already
    /// removed from the container and flagged
    Ok { failed: Vec<C> },
    /// The generated tests did not compile; no fitness was attached
    CompilationError,
}

impl<C> RunStatus<C> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn failed(&self) -> &[C] {
        match self {
            Self::Ok { failed } => failed,
            Self::CompilationError => &[],
        }
    }
}

/// Extract line and region percentages from the report script's output.
pub fn parse_coverage_report(stdout: &str) -> ExecResult<LlvmCoverage> {
    let report: Value = serde_json::from_str(stdout)?;
    Ok(LlvmCoverage {
        line_coverage: percent(&report, LINES_POINTER, "lines")?,
        region_coverage: percent(&report, REGIONS_POINTER, "regions")?,
    })
}

/// Accepts a fractional JSON number or a decimal string.
fn percent(report: &Value, pointer: &str, field: &'static str) -> ExecResult<f64> {
    let value = report
        .pointer(pointer)
        .ok_or(ExecError::ReportMissing { field })?;
    let parsed = match value {
        // integers are not a fractional encoding
        Value::Number(n) if n.is_f64() => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|p| p.is_finite())
        .ok_or_else(|| ExecError::ReportFormat {
            field,
            value: value.to_string(),
        })
}

/// Ids of failed tests, taken from the trailing `_<id>` of each
/// `test <name> ... FAILED` line.
pub fn parse_failed_tests(output: &str) -> Vec<u64> {
    output
        .lines()
        .filter_map(|line| FAILED_TEST_PATTERN.captures(line.trim_end()))
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_report() {
        let json = r#"{"data":[{"totals":{"lines":{"percent":87.5},"regions":{"percent":60.0}}}]}"#;
        let cov = parse_coverage_report(json).unwrap();
        assert_eq!(cov.line_coverage, 87.5);
        assert_eq!(cov.region_coverage, 60.0);
    }

    #[test]
    fn test_parse_string_encoded_report() {
        let json = r#"{"data":[{"totals":{"lines":{"percent":"12.25"},"regions":{"percent":100.0}}}]}"#;
        let cov = parse_coverage_report(json).unwrap();
        assert_eq!(cov.line_coverage, 12.25);
        assert_eq!(cov.region_coverage, 100.0);
    }

    #[test]
    fn test_unsupported_encoding() {
        let json = r#"{"data":[{"totals":{"lines":{"percent":true},"regions":{"percent":1.0}}}]}"#;
        let err = parse_coverage_report(json).unwrap_err();
        assert!(matches!(err, ExecError::ReportFormat { field: "lines", .. }));
    }

    #[test]
    fn test_integer_percent_is_rejected() {
        let json = r#"{"data":[{"totals":{"lines":{"percent":100},"regions":{"percent":1.0}}}]}"#;
        let err = parse_coverage_report(json).unwrap_err();
        assert!(matches!(
            err,
            ExecError::ReportFormat { field: "lines", ref value } if value == "100"
        ));
    }

    #[test]
    fn test_missing_field() {
        let json = r#"{"data":[{"totals":{"lines":{"percent":1.0}}}]}"#;
        let err = parse_coverage_report(json).unwrap_err();
        assert!(matches!(err, ExecError::ReportMissing { field: "regions" }));
        assert!(matches!(parse_coverage_report("not json"), Err(ExecError::Json(_))));
    }

    #[test]
    fn test_parse_failed_tests() {
        let output = "\
running 3 tests
test rusty_tests::case_3 ... ok
test rusty_tests::case_7 ... FAILED
test rusty_tests::case_12 ... FAILED\r

failures:
    rusty_tests::case_7

test result: FAILED. 1 passed; 2 failed; 0 ignored
";
        assert_eq!(parse_failed_tests(output), vec![7, 12]);
        assert!(output.contains(FAILED_MARKER));
    }

    #[test]
    fn test_no_failures() {
        assert!(parse_failed_tests("test rusty_tests::case_1 ... ok\n").is_empty());
    }
}
