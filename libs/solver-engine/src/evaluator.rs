/// Case Evaluator - Output Judgment and Scoring
///
/// **Core Responsibility:**
/// Turn raw execution outcomes into per-case verdicts and aggregate them
/// into a score.
///
/// **Critical Properties:**
/// - Knows nothing about processes or harnesses
/// - Pure functions: (outcome, expected) -> verdict
/// - Deterministic regardless of execution mechanism
///
/// **Equivalence Rules:**
/// - Structural JSON equality first
/// - Canonical serialization with sorted object keys as the fallback, so
///   mapping outputs compare key-order-insensitively
/// - Otherwise exact: no numeric tolerance, no type coercion (a returned
///   string "3" is not equal to the integer 3)
/// - Stdout that does not decode as JSON is treated as a literal string
///   output, not as an error

use crate::engine::ExecutionOutcome;
use serde_json::{Map, Value};
use solver_common::types::{CaseResult, TestCase};

/// Decide whether an actual output satisfies the expected value.
pub fn outputs_equivalent(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (canonical_json(actual), canonical_json(expected)) {
        (Ok(a), Ok(b)) => a == b,
        // canonicalization failed, the direct comparison verdict stands
        _ => false,
    }
}

/// Serialize with object keys recursively sorted, independent of any map
/// ordering the decoder happened to use.
fn canonical_json(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string(&canonicalize(value))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(key, _)| key.as_str());
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

// Value serialization has no failure mode for plain JSON trees; the
// fallback keeps the record well-formed if that ever changes.
fn encode(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Judge a single case from its raw execution outcome.
///
/// Decision order:
/// 1. Child never completed or timed out -> stderr becomes the error
///    ("Execution failed" when stderr is empty)
/// 2. Stdout decodes to an object with an "error" key -> that message is
///    the case error (harness-reported fault or signature mismatch)
/// 3. Stdout decodes to any other JSON value -> compared structurally
/// 4. Stdout does not decode -> the raw text is the literal output value
///    and is compared as a string
pub fn judge_case(case: &TestCase, outcome: &ExecutionOutcome) -> CaseResult {
    let mut output: Option<Value> = None;
    let mut error: Option<String> = None;

    if outcome.timed_out || !outcome.exit_ok {
        error = Some(if outcome.stderr.is_empty() {
            "Execution failed".to_string()
        } else {
            outcome.stderr.clone()
        });
    } else {
        match serde_json::from_str::<Value>(&outcome.stdout) {
            Ok(Value::Object(map)) if map.contains_key("error") => {
                error = Some(match &map["error"] {
                    Value::String(message) => message.clone(),
                    other => other.to_string(),
                });
            }
            Ok(value) => output = Some(value),
            Err(_) => output = Some(Value::String(outcome.stdout.clone())),
        }
    }

    let passed = error.is_none()
        && output
            .as_ref()
            .map(|value| outputs_equivalent(value, &case.expected))
            .unwrap_or(false);

    CaseResult {
        input: encode(&Value::Array(case.inputs.clone())),
        expected_output: encode(&case.expected),
        output: output.as_ref().map(encode),
        passed,
        error,
        runtime_ms: outcome.runtime_ms,
    }
}

/// score = passed / total, 0.0 for an empty suite.
pub fn aggregate_score(results: &[CaseResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    passed as f64 / results.len() as f64
}
