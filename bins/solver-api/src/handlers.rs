// HTTP route handlers for the Solver API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solver_common::types::{parse_test_cases, CaseResult, RunSummary};
use solver_engine::agent::{ReflectionLoop, ReflectionOptions};
use solver_engine::runner::TestRunner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub problem: String,
    /// Wire shape: [[[args...], expected], ...]
    pub test_cases: Vec<Value>,
    #[serde(default)]
    pub reflection: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-case execution timeout override, in seconds.
    pub timeout_secs: Option<u64>,
}

fn default_max_retries() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub id: String,
    pub solution_code: String,
    pub results: Vec<CaseResult>,
    pub score: f64,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// GET / - Health/status route
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Code-Solver Agent API",
        "status": "running"
    }))
}

/// POST /generate_solution - Generate a solution and score it
pub async fn generate_solution(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> impl IntoResponse {
    let test_cases = match parse_test_cases(&payload.test_cases) {
        Ok(test_cases) => test_cases,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "detail": format!("Invalid test cases format: {}", e)
                })),
            )
                .into_response();
        }
    };

    let mut config = state.config.clone();
    if let Some(secs) = payload.timeout_secs {
        config.case_timeout = Duration::from_secs(secs);
    }

    let runner = TestRunner::new(&config);
    let reflection = ReflectionLoop::new(
        &state.generator,
        &runner,
        ReflectionOptions {
            enabled: payload.reflection,
            max_retries: payload.max_retries,
        },
    );

    match reflection.solve(&payload.problem, &test_cases).await {
        Ok(record) => {
            // persistence failure is logged, not surfaced - the caller
            // still gets the completed record
            if let Err(e) = state.store.save(&record) {
                error!(run_id = %record.run_id, error = %e, "Failed to persist run");
            } else {
                info!(run_id = %record.run_id, score = record.score, "Run persisted");
            }

            (
                StatusCode::OK,
                Json(GenerateResponse {
                    id: record.run_id,
                    solution_code: record.solution_code,
                    results: record.test_cases,
                    score: record.score,
                    error: record.fatal_error,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Solution generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "detail": format!("Error generating solution: {}", e)
                })),
            )
                .into_response()
        }
    }
}

/// GET /results/{run_id} - Fetch one stored run record
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> impl IntoResponse {
    match state.store.load(&run_id) {
        Ok(record) => {
            info!(run_id = %run_id, score = record.score, "Run record retrieved");
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => {
            info!(run_id = %run_id, "Run not found");
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "detail": format!("Run {} not found", run_id),
                    "reason": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// GET /runs?limit=20 - List stored runs, most recent first
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunsQuery>,
) -> impl IntoResponse {
    match state.store.summaries(query.limit) {
        Ok(summaries) => (StatusCode::OK, Json::<Vec<RunSummary>>(summaries)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list runs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}
