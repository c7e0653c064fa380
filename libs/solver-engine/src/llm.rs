/// Code Generator - Chat-Completions Client
///
/// The generator is a capability, not a service locator: the trait is what
/// the reflection loop depends on, and `OpenAiGenerator` is the production
/// implementation built once from configuration and passed by reference.
/// Generator failures are fatal to the solve operation and propagate
/// uncaught to its caller.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solver_common::config::GeneratorConfig;
use solver_common::types::TestCase;
use tracing::{debug, warn};

/// Examples rendered into the user prompt are capped at this many cases.
pub const MAX_PROMPT_EXAMPLES: usize = 5;

const MAX_RETRIES: u32 = 3;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a careful Python assistant. Return ONLY valid Python code for a single file.\n\
The code must define a top-level function named `solve` that directly matches the test case inputs.\n\
Examples:\n\
- For [[[1,2],3]] use: def solve(a, b): ...\n\
- For [[['hello'],'olleh']] use: def solve(s): ...\n\
Do NOT define def solve(inputs) or take a list as one argument unless the input itself is a list.\n\
Return results directly, not via print().\n\
Use only Python standard library. Avoid side effects or dangerous operations.\n\
Do not include explanations, markdown, or text—return pure Python code.";

/// Capability that turns a problem statement and example cases into
/// candidate source text.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, problem_text: &str, examples: &[TestCase]) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl OpenAiGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            bail!("No API key configured (set OPENAI_API_KEY)");
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, config })
    }

    fn system_prompt(&self) -> String {
        if let Some(path) = &self.config.prompt_template {
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    debug!(path = %path.display(), "using system prompt template");
                    return text.trim().to_string();
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "prompt template unreadable, using built-in prompt");
                }
            }
        }
        DEFAULT_SYSTEM_PROMPT.to_string()
    }

    async fn send(&self, request: &ChatRequest) -> Result<String> {
        let mut retry_count = 0u32;
        loop {
            let response = match self
                .client
                .post(self.config.base_url.as_str())
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .json(request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    if retry_count < MAX_RETRIES {
                        retry_count += 1;
                        backoff(retry_count).await;
                        continue;
                    }
                    return Err(anyhow!("Model request failed: {}", e));
                }
            };

            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read model response body")?;

            if status.is_success() {
                return Ok(body);
            }

            // rate limits and server errors are worth a bounded retry
            if (status.as_u16() == 429 || status.is_server_error()) && retry_count < MAX_RETRIES {
                retry_count += 1;
                warn!(status = status.as_u16(), retry = retry_count, "model request retrying");
                backoff(retry_count).await;
                continue;
            }

            bail!(
                "Model request failed with status {}: {}",
                status,
                truncate(&body, 200)
            );
        }
    }
}

#[async_trait]
impl CodeGenerator for OpenAiGenerator {
    async fn generate(&self, problem_text: &str, examples: &[TestCase]) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: build_user_prompt(problem_text, examples),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let body = self.send(&request).await?;
        let response: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse model response")?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| anyhow!("Model response contained no content"))?;

        Ok(strip_code_fences(content))
    }
}

/// Render the user prompt: the problem, fixed calling-convention
/// guidelines, and up to `MAX_PROMPT_EXAMPLES` example cases.
pub fn build_user_prompt(problem_text: &str, examples: &[TestCase]) -> String {
    let mut prompt = format!(
        "Problem:\n{}\n\nGuidelines:\n\
        - Write a function named `solve` whose parameters exactly match the inputs of each test case.\n\
        - For test case input like [\"hello\"], treat the argument as a single string, not a list of strings.\n\
        - Do NOT index into parameters unless the problem explicitly requires it.\n\
        - Return the result directly (no prints).\n\
        - The runner will call your function as solve(*args).\n\
        - Use only Python stdlib and avoid any external dependencies.\n",
        problem_text
    );

    if !examples.is_empty() {
        prompt.push_str("\nTest Cases (examples):\n");
        for example in examples.iter().take(MAX_PROMPT_EXAMPLES) {
            prompt.push_str(&format!(
                "- inputs={}, expected={}\n",
                encode(&Value::Array(example.inputs.clone())),
                encode(&example.expected)
            ));
        }
    }

    prompt
}

fn encode(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Strip markdown code fences from model output. The first fenced block
/// wins; a leading `python` language tag on the fence is dropped. Text
/// without fences is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }

    for (idx, part) in trimmed.split("```").enumerate() {
        // odd indices are inside a fence
        if idx % 2 == 1 {
            let block = part.trim();
            let mut lines = block.lines();
            if let Some(first) = lines.next() {
                if first.trim().to_lowercase().starts_with("python") {
                    return lines.collect::<Vec<_>>().join("\n").trim().to_string();
                }
            }
            return block.to_string();
        }
    }

    trimmed.to_string()
}

async fn backoff(retry_count: u32) {
    let secs = 1u64 << retry_count.min(4);
    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
