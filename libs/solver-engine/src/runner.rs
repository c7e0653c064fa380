/// Test Runner - Per-Run Orchestration
///
/// **Responsibility:**
/// Coordinate screener, harness builder, executor, and evaluator to
/// produce one RunRecord.
///
/// This module is the glue layer - it knows nothing about:
/// - How screening decides (screener's job)
/// - How code executes (engine's job)
/// - How outputs are judged (evaluator's job)
///
/// A safety violation is fatal to the whole run and nothing is ever
/// spawned for it; every other failure is per-case and the remaining
/// cases still execute. The harness is built once per run and reused for
/// every case.

use crate::engine::{ExecutionOutcome, IsolatedExecutor};
use crate::screener::{self, Screen};
use crate::{evaluator, harness};
use chrono::Utc;
use serde_json::json;
use solver_common::config::SolverConfig;
use solver_common::types::{RunRecord, TestCase, TrajectoryEntry};
use tracing::{debug, info, warn};

pub struct TestRunner {
    executor: IsolatedExecutor,
}

impl TestRunner {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            executor: IsolatedExecutor::new(&config.python_bin, config.case_timeout),
        }
    }

    /// Run one candidate solution against the full suite, in order.
    /// Persistence is the caller's concern; the record is returned, not
    /// stored.
    pub async fn run(
        &self,
        problem_text: &str,
        source: &str,
        test_cases: &[TestCase],
        generation_trajectory: Vec<TrajectoryEntry>,
    ) -> RunRecord {
        if let Screen::Violation(reason) = screener::screen(source) {
            warn!(reason = %reason, "source rejected by safety screener");
            return RunRecord::fatal(problem_text, source, reason, generation_trajectory);
        }

        // one build amortized over every case of the run
        let artifact = match harness::build(source) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(error = %e, "failed to build harness");
                return RunRecord::fatal(
                    problem_text,
                    source,
                    format!("Failed to build harness: {}", e),
                    generation_trajectory,
                );
            }
        };

        info!(
            cases = test_cases.len(),
            timeout_ms = self.executor.timeout().as_millis() as u64,
            "executing test cases"
        );

        let mut results = Vec::with_capacity(test_cases.len());
        for (idx, case) in test_cases.iter().enumerate() {
            let payload = json!({ "args": case.inputs });
            let outcome = match self.executor.execute(artifact.path(), &payload).await {
                Ok(outcome) => outcome,
                Err(e) => ExecutionOutcome {
                    stdout: String::new(),
                    stderr: e.to_string(),
                    timed_out: false,
                    exit_ok: false,
                    runtime_ms: 0,
                },
            };

            debug!(
                case = idx + 1,
                runtime_ms = outcome.runtime_ms,
                timed_out = outcome.timed_out,
                "case executed"
            );

            results.push(evaluator::judge_case(case, &outcome));
        }

        let score = evaluator::aggregate_score(&results);
        let passed = results.iter().filter(|r| r.passed).count();
        info!(score = score, passed = passed, total = results.len(), "run complete");

        RunRecord {
            run_id: RunRecord::fresh_run_id(),
            timestamp: Utc::now(),
            problem_text: problem_text.to_string(),
            solution_code: source.to_string(),
            test_cases: results,
            score,
            fatal_error: None,
            generation_trajectory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solver_common::types::parse_test_cases;

    fn test_config() -> SolverConfig {
        SolverConfig::default()
    }

    fn suite() -> Vec<TestCase> {
        parse_test_cases(&[json!([[1, 2], 3]), json!([[2, 3], 5])]).unwrap()
    }

    #[tokio::test]
    async fn test_safety_violation_is_fatal_and_spawns_nothing() {
        let config = test_config();
        let runner = TestRunner::new(&config);
        let record = runner
            .run(
                "add two numbers",
                "import subprocess\n\ndef solve(a, b):\n    return a + b",
                &suite(),
                Vec::new(),
            )
            .await;

        assert!(record.test_cases.is_empty());
        assert_eq!(record.score, 0.0);
        assert!(record
            .fatal_error
            .as_deref()
            .unwrap()
            .contains("import subprocess"));
    }

    #[tokio::test]
    async fn test_fatal_record_regardless_of_case_content() {
        let config = test_config();
        let runner = TestRunner::new(&config);
        let record = runner
            .run("anything", "eval('1')", &[], Vec::new())
            .await;
        assert!(record.fatal_error.is_some());
        assert_eq!(record.score, 0.0);
    }

    #[tokio::test]
    async fn test_trajectory_is_carried_through() {
        let config = test_config();
        let runner = TestRunner::new(&config);
        let trajectory = vec![TrajectoryEntry::new("generated", "eval('1')")];
        let record = runner
            .run("anything", "eval('1')", &suite(), trajectory)
            .await;
        assert_eq!(record.generation_trajectory.len(), 1);
        assert_eq!(record.generation_trajectory[0].label, "generated");
    }
}
