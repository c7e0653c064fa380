use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single input/expected-output pair for a candidate solution.
/// `inputs` is always a positional argument list (possibly empty); the
/// arity of a case never changes after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub inputs: Vec<Value>,
    pub expected: Value,
}

/// Outcome of judging one test case against one candidate solution.
/// `input`, `expected_output` and `output` hold serialized JSON so the
/// record is stable regardless of how the values were produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub input: String,
    pub expected_output: String,
    pub output: Option<String>,
    pub passed: bool,
    pub error: Option<String>,
    pub runtime_ms: u64,
}

/// One generation step of the solve loop: the first attempt is labeled
/// "generated", every reflection attempt after it "revised".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    pub label: String,
    pub code: String,
}

impl TrajectoryEntry {
    pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }
}

/// The complete, immutable result of running one candidate solution
/// against a test suite. Born from exactly one TestRunner call and handed
/// to the store unchanged; never partially written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub problem_text: String,
    pub solution_code: String,
    pub test_cases: Vec<CaseResult>,
    pub score: f64,
    #[serde(rename = "error")]
    pub fatal_error: Option<String>,
    #[serde(rename = "llm_trajectory")]
    pub generation_trajectory: Vec<TrajectoryEntry>,
}

impl RunRecord {
    /// Millisecond timestamp plus a short random suffix. Sorts
    /// most-recent-first under the store's descending ordering while
    /// staying unique across concurrent runs in the same millisecond.
    pub fn fresh_run_id() -> String {
        let millis = Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", millis, &suffix[..4])
    }

    /// Record for a run that was aborted before any case executed
    /// (safety violation or harness build failure): empty cases, score
    /// forced to zero.
    pub fn fatal(
        problem_text: impl Into<String>,
        solution_code: impl Into<String>,
        reason: impl Into<String>,
        generation_trajectory: Vec<TrajectoryEntry>,
    ) -> Self {
        Self {
            run_id: Self::fresh_run_id(),
            timestamp: Utc::now(),
            problem_text: problem_text.into(),
            solution_code: solution_code.into(),
            test_cases: Vec::new(),
            score: 0.0,
            fatal_error: Some(reason.into()),
            generation_trajectory,
        }
    }

    pub fn passed_count(&self) -> usize {
        self.test_cases.iter().filter(|c| c.passed).count()
    }
}

/// Listing row for stored runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub problem_preview: String,
}

const PROBLEM_PREVIEW_CHARS: usize = 100;

impl RunSummary {
    pub fn of(record: &RunRecord) -> Self {
        let mut preview: String = record
            .problem_text
            .chars()
            .take(PROBLEM_PREVIEW_CHARS)
            .collect();
        if record.problem_text.chars().count() > PROBLEM_PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self {
            run_id: record.run_id.clone(),
            timestamp: record.timestamp,
            score: record.score,
            problem_preview: preview,
        }
    }
}

/// Parse the wire shape `[[args...], expected]` into typed test cases.
pub fn parse_test_cases(raw: &[Value]) -> Result<Vec<TestCase>> {
    let mut parsed = Vec::with_capacity(raw.len());
    for item in raw {
        let pair = match item.as_array() {
            Some(pair) if pair.len() == 2 => pair,
            _ => bail!("Each test case must be [ [args...], expected ]"),
        };
        let inputs = match pair[0].as_array() {
            Some(inputs) => inputs.clone(),
            None => bail!("Inputs must be a list of args"),
        };
        parsed.push(TestCase {
            inputs,
            expected: pair[1].clone(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_test_cases_valid() {
        let raw = vec![json!([[1, 2], 3]), json!([["hello"], "olleh"])];
        let cases = parse_test_cases(&raw).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].inputs, vec![json!(1), json!(2)]);
        assert_eq!(cases[0].expected, json!(3));
        assert_eq!(cases[1].inputs, vec![json!("hello")]);
    }

    #[test]
    fn test_parse_test_cases_rejects_non_pair() {
        let raw = vec![json!([[1, 2], 3, 4])];
        let err = parse_test_cases(&raw).unwrap_err();
        assert!(err.to_string().contains("[ [args...], expected ]"));
    }

    #[test]
    fn test_parse_test_cases_rejects_non_list_inputs() {
        let raw = vec![json!([5, 10])];
        let err = parse_test_cases(&raw).unwrap_err();
        assert!(err.to_string().contains("Inputs must be a list"));
    }

    #[test]
    fn test_parse_test_cases_allows_empty_inputs() {
        let raw = vec![json!([[], 42])];
        let cases = parse_test_cases(&raw).unwrap();
        assert!(cases[0].inputs.is_empty());
    }

    #[test]
    fn test_fresh_run_ids_are_unique() {
        let a = RunRecord::fresh_run_id();
        let b = RunRecord::fresh_run_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fatal_record_shape() {
        let record = RunRecord::fatal("problem", "code", "blocked", Vec::new());
        assert!(record.test_cases.is_empty());
        assert_eq!(record.score, 0.0);
        assert_eq!(record.fatal_error.as_deref(), Some("blocked"));
    }

    #[test]
    fn test_run_summary_preview_truncation() {
        let mut record = RunRecord::fatal("p".repeat(150), "code", "x", Vec::new());
        record.fatal_error = None;
        let summary = RunSummary::of(&record);
        assert_eq!(summary.problem_preview.len(), 103);
        assert!(summary.problem_preview.ends_with("..."));

        let short = RunRecord::fatal("short problem", "code", "x", Vec::new());
        let summary = RunSummary::of(&short);
        assert_eq!(summary.problem_preview, "short problem");
    }

    #[test]
    fn test_record_wire_field_names() {
        let record = RunRecord::fatal("p", "c", "boom", vec![TrajectoryEntry::new("generated", "x")]);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("error").is_some());
        assert!(value.get("llm_trajectory").is_some());
        assert!(value.get("fatal_error").is_none());
    }
}
