/// Reflection Loop - Feedback-Driven Solve Cycle
///
/// **State Machine:**
/// Generate -> Execute -> Evaluate -> (Generate | Done)
///
/// Generate asks the code generator for a candidate; Execute runs it
/// through the TestRunner and appends the attempt to the trajectory;
/// Evaluate either stops (reflection disabled, retry budget exhausted,
/// perfect score, fatal error) or folds the first failing cases back into
/// the prompt and loops. The loop performs at most `1 + max_retries`
/// generate/execute cycles; `max_retries = 0` degenerates to a single
/// attempt with no feedback.
///
/// The trajectory is append-only: every generation is recorded in order
/// and the final record carries all of them.

use crate::llm::CodeGenerator;
use crate::runner::TestRunner;
use anyhow::Result;
use serde_json::json;
use solver_common::types::{CaseResult, RunRecord, TestCase, TrajectoryEntry};
use tracing::{debug, info};

/// Example cases shown to the generator alongside the problem.
const PROMPT_EXAMPLE_CASES: usize = 3;

/// Failing cases folded back into the prompt on each reflection step.
const FEEDBACK_FAILURE_LIMIT: usize = 3;

const FEEDBACK_INSTRUCTION: &str =
    "The previous solution failed these cases. Fix the logic and return corrected code only.";

#[derive(Debug, Clone, Copy)]
pub struct ReflectionOptions {
    pub enabled: bool,
    pub max_retries: u32,
}

enum LoopState {
    Generate,
    Execute(String),
    Evaluate(RunRecord),
    Done(RunRecord),
}

pub struct ReflectionLoop<'a> {
    generator: &'a dyn CodeGenerator,
    runner: &'a TestRunner,
    options: ReflectionOptions,
}

impl<'a> ReflectionLoop<'a> {
    pub fn new(
        generator: &'a dyn CodeGenerator,
        runner: &'a TestRunner,
        options: ReflectionOptions,
    ) -> Self {
        Self {
            generator,
            runner,
            options,
        }
    }

    /// Drive the loop to completion and return the most recent RunRecord.
    /// Generator failures are fatal and propagate to the caller.
    pub async fn solve(&self, problem_text: &str, test_cases: &[TestCase]) -> Result<RunRecord> {
        // examples stay fixed across iterations; only the prompt grows
        let examples = &test_cases[..test_cases.len().min(PROMPT_EXAMPLE_CASES)];
        let mut prompt = problem_text.to_string();
        let mut trajectory: Vec<TrajectoryEntry> = Vec::new();
        let mut retries = 0u32;
        let mut state = LoopState::Generate;

        loop {
            state = match state {
                LoopState::Generate => {
                    debug!(attempt = retries + 1, "requesting candidate solution");
                    let code = self.generator.generate(&prompt, examples).await?;
                    LoopState::Execute(code)
                }
                LoopState::Execute(code) => {
                    let label = if retries == 0 { "generated" } else { "revised" };
                    trajectory.push(TrajectoryEntry::new(label, &code));
                    let record = self
                        .runner
                        .run(problem_text, &code, test_cases, trajectory.clone())
                        .await;
                    LoopState::Evaluate(record)
                }
                LoopState::Evaluate(record) => {
                    let budget_spent = retries >= self.options.max_retries;
                    let solved = record.score >= 1.0;
                    if !self.options.enabled
                        || budget_spent
                        || solved
                        || record.fatal_error.is_some()
                    {
                        LoopState::Done(record)
                    } else {
                        info!(
                            score = record.score,
                            retry = retries + 1,
                            "reflecting on failing cases"
                        );
                        prompt = augment_prompt(problem_text, &record.test_cases);
                        retries += 1;
                        LoopState::Generate
                    }
                }
                LoopState::Done(record) => {
                    info!(
                        run_id = %record.run_id,
                        score = record.score,
                        attempts = record.generation_trajectory.len(),
                        "solve loop finished"
                    );
                    return Ok(record);
                }
            };
        }
    }
}

/// First `FEEDBACK_FAILURE_LIMIT` failing cases, in suite order.
fn select_failures(results: &[CaseResult]) -> Vec<&CaseResult> {
    results
        .iter()
        .filter(|r| !r.passed)
        .take(FEEDBACK_FAILURE_LIMIT)
        .collect()
}

fn build_feedback(results: &[CaseResult]) -> serde_json::Value {
    json!({
        "instruction": FEEDBACK_INSTRUCTION,
        "failing": select_failures(results),
    })
}

/// The revised prompt is always built from the original problem text plus
/// the latest feedback; feedback never accumulates across iterations.
fn augment_prompt(problem_text: &str, results: &[CaseResult]) -> String {
    format!(
        "{}\n\nNotes from tests:\n{}",
        problem_text,
        build_feedback(results)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver_common::config::SolverConfig;
    use std::sync::Mutex;

    /// Generator that replays a fixed script of responses.
    struct ScriptedGenerator {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<&str>) -> Self {
            let mut responses: Vec<String> =
                responses.into_iter().map(String::from).collect();
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait::async_trait]
    impl CodeGenerator for ScriptedGenerator {
        async fn generate(&self, _problem: &str, _examples: &[TestCase]) -> Result<String> {
            let mut responses = self.responses.lock().unwrap();
            responses.pop().ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    fn make_result(passed: bool, input: &str) -> CaseResult {
        CaseResult {
            input: input.to_string(),
            expected_output: "1".to_string(),
            output: Some("0".to_string()),
            passed,
            error: None,
            runtime_ms: 1,
        }
    }

    fn suite() -> Vec<TestCase> {
        solver_common::types::parse_test_cases(&[serde_json::json!([["ab"], "ba"])]).unwrap()
    }

    #[test]
    fn test_select_failures_takes_first_three() {
        let results = vec![
            make_result(true, "[1]"),
            make_result(false, "[2]"),
            make_result(false, "[3]"),
            make_result(false, "[4]"),
            make_result(false, "[5]"),
        ];
        let failures = select_failures(&results);
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].input, "[2]");
        assert_eq!(failures[2].input, "[4]");
    }

    #[test]
    fn test_augment_prompt_shape() {
        let results = vec![make_result(false, "[2]")];
        let prompt = augment_prompt("reverse a string", &results);
        assert!(prompt.starts_with("reverse a string\n\nNotes from tests:\n"));
        assert!(prompt.contains(FEEDBACK_INSTRUCTION));
        assert!(prompt.contains("\"failing\""));
    }

    #[tokio::test]
    async fn test_fatal_record_stops_the_loop_early() {
        // unsafe code trips the screener, so no interpreter is needed and
        // the loop must stop after one cycle despite the retry budget
        let generator = ScriptedGenerator::new(vec!["import os\ndef solve(s): return s"]);
        let config = SolverConfig::default();
        let runner = TestRunner::new(&config);
        let reflection = ReflectionLoop::new(
            &generator,
            &runner,
            ReflectionOptions {
                enabled: true,
                max_retries: 3,
            },
        );

        let record = reflection.solve("reverse a string", &suite()).await.unwrap();
        assert!(record.fatal_error.is_some());
        assert_eq!(record.generation_trajectory.len(), 1);
        assert_eq!(record.generation_trajectory[0].label, "generated");
    }

    #[tokio::test]
    async fn test_reflection_disabled_is_a_single_attempt() {
        let generator = ScriptedGenerator::new(vec!["eval('x')"]);
        let config = SolverConfig::default();
        let runner = TestRunner::new(&config);
        let reflection = ReflectionLoop::new(
            &generator,
            &runner,
            ReflectionOptions {
                enabled: false,
                max_retries: 5,
            },
        );

        let record = reflection.solve("anything", &suite()).await.unwrap();
        assert_eq!(record.generation_trajectory.len(), 1);
    }

    #[tokio::test]
    async fn test_generator_failure_propagates() {
        let generator = ScriptedGenerator::new(vec![]);
        let config = SolverConfig::default();
        let runner = TestRunner::new(&config);
        let reflection = ReflectionLoop::new(
            &generator,
            &runner,
            ReflectionOptions {
                enabled: false,
                max_retries: 0,
            },
        );

        let err = reflection.solve("anything", &suite()).await.unwrap_err();
        assert!(err.to_string().contains("script exhausted"));
    }
}
