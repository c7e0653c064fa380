use anyhow::{Context, Result};
use serde_json::Value;
use solver_common::config::SolverConfig;
use solver_common::store::RunStore;
use solver_common::types::parse_test_cases;
use solver_engine::agent::{ReflectionLoop, ReflectionOptions};
use solver_engine::llm::OpenAiGenerator;
use solver_engine::runner::TestRunner;
use std::time::Duration;

/// Run the full generate/score loop for one problem and print the record.
/// Exits non-zero when the run was fatal or the score fell short of 1.0,
/// so shell pipelines can gate on success.
pub async fn solve(
    problem: &str,
    test_cases_json: &str,
    reflection: bool,
    retries: u32,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let raw: Vec<Value> =
        serde_json::from_str(test_cases_json).context("Invalid JSON in test cases")?;
    let test_cases = parse_test_cases(&raw)?;

    let mut config = SolverConfig::from_env();
    if let Some(secs) = timeout_secs {
        config.case_timeout = Duration::from_secs(secs);
    }

    println!("Running Code-Solver Agent...");
    println!("Problem: {}", problem);
    println!("Test cases: {}", test_cases.len());
    println!();

    let generator = OpenAiGenerator::new(config.generator.clone())?;
    let runner = TestRunner::new(&config);
    let loop_options = ReflectionOptions {
        enabled: reflection,
        max_retries: retries,
    };

    let record = ReflectionLoop::new(&generator, &runner, loop_options)
        .solve(problem, &test_cases)
        .await?;

    let store = RunStore::new(&config.runs_dir)?;
    store.save(&record)?;

    println!("{}", "=".repeat(80));
    println!("RESULT");
    println!("{}", "=".repeat(80));
    println!("{}", serde_json::to_string_pretty(&record)?);
    println!();
    println!("Run ID: {}", record.run_id);
    println!("Score: {:.2}%", record.score * 100.0);
    println!(
        "Passed: {}/{}",
        record.passed_count(),
        record.test_cases.len()
    );

    if let Some(reason) = &record.fatal_error {
        eprintln!("Error: {}", reason);
        std::process::exit(1);
    }
    if record.score < 1.0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Print summaries of stored runs, most recent first.
pub fn runs(limit: usize) -> Result<()> {
    let config = SolverConfig::from_env();
    let store = RunStore::new(&config.runs_dir)?;
    let summaries = store.summaries(limit)?;

    if summaries.is_empty() {
        println!("No stored runs.");
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{}  {}  score {:.2}  {}",
            summary.run_id,
            summary.timestamp.format("%Y-%m-%d %H:%M:%S"),
            summary.score,
            summary.problem_preview
        );
    }

    Ok(())
}

/// Print one stored run record as pretty JSON.
pub fn show(run_id: &str) -> Result<()> {
    let config = SolverConfig::from_env();
    let store = RunStore::new(&config.runs_dir)?;
    let record = store.load(run_id)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
