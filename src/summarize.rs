//! Optional free-text diagnosis from an OpenAI-compatible chat API.
//!
//! Failures here never abort a run; the caller drops the summary instead.

use std::fmt::Write;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::auth::Token;
use crate::error::{CIDoctorError, Result};
use crate::model::Report;

const SYSTEM_PROMPT: &str =
    "You are a CI/CD expert helping diagnose build failures. Be concise and actionable.";
const RECENT_LOG_LINES: usize = 100;
const RECENT_ERROR_LINES: usize = 20;
const MAX_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.3;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Case-sensitive fragments marking a line for the prompt's error block.
const PROMPT_ERROR_MARKERS: [&str; 15] = [
    "error",
    "Error",
    "ERROR",
    "failed",
    "Failed",
    "FAILED",
    "fatal",
    "Fatal",
    "FATAL",
    "Exception",
    "Traceback",
    "assertion",
    "AssertionError",
    "exit code",
    "exit status",
];

/// Lines that look like error output, in order.
pub fn extract_error_lines(lines: &[String]) -> Vec<&str> {
    lines
        .iter()
        .map(String::as_str)
        .filter(|line| PROMPT_ERROR_MARKERS.iter().any(|marker| line.contains(marker)))
        .collect()
}

fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Builds the diagnosis prompt from the report's failing jobs and excerpts.
pub fn build_prompt(report: &Report) -> String {
    let log_lines: Vec<String> = report
        .failing_jobs
        .iter()
        .filter_map(|job| job.log_lines.clone())
        .flatten()
        .collect();
    let error_lines = extract_error_lines(&log_lines);

    let mut prompt = String::new();
    let _ = writeln!(prompt, "Analyze this CI/CD failure and provide a concise diagnosis.\n");
    let _ = writeln!(prompt, "Workflow: {}\n", report.workflow_name);
    let _ = writeln!(prompt, "Failed Jobs:");
    for job in &report.failing_jobs {
        let _ = writeln!(
            prompt,
            "- {}: {}",
            job.name,
            job.conclusion.as_deref().unwrap_or("unknown")
        );
    }
    let _ = writeln!(
        prompt,
        "\nRecent Logs (last {RECENT_LOG_LINES} lines):\n```\n{}\n```\n",
        tail(&log_lines, RECENT_LOG_LINES).join("\n")
    );
    let _ = writeln!(
        prompt,
        "Key Error Messages (last {RECENT_ERROR_LINES} lines):\n```\n{}\n```\n",
        tail(&error_lines, RECENT_ERROR_LINES).join("\n")
    );
    prompt.push_str(
        "Please provide:\n\
         1. A 1-2 sentence diagnosis of what went wrong\n\
         2. A brief suggested fix (1-2 sentences)\n\
         3. If applicable, the likely cause (code change, dependency, configuration, etc.)\n\n\
         Keep the response under 150 words total. Be specific and actionable.",
    );
    prompt
}

/// Client for the summarization service.
pub struct Summarizer {
    client: reqwest::Client,
    api_base: String,
    api_key: Token,
    model: String,
}

impl Summarizer {
    pub fn new(api_base: &str, api_key: Token, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CIDoctorError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    /// Asks the service for a short diagnosis of `report`.
    pub async fn summarize(&self, report: &Report) -> Result<String> {
        let prompt = build_prompt(report);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        info!("Requesting summary from {}", self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(self.api_key.as_str())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CIDoctorError::Summary(format!("{status}: {text}")));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CIDoctorError::Summary("empty response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{job, run_at};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn failed_report() -> Report {
        let mut failing = job("test", Some("failure"));
        failing.log_lines = Some(vec![
            "running 2 tests".to_string(),
            "thread 'main' panicked".to_string(),
            "Error: process exited".to_string(),
        ]);
        Report {
            run: run_at("9", "2024-05-01T12:00:00Z", 60),
            workflow_name: "CI".to_string(),
            cancellation_reason: None,
            failing_jobs: vec![failing],
            baseline_p50_ms: None,
            last_success: None,
            compare: None,
            suspects: vec![],
            logs_path: None,
            ai_analysis: None,
        }
    }

    #[test]
    fn error_lines_include_capitalized_markers() {
        let lines = vec![
            "ok".to_string(),
            "TypeError in module".to_string(),
            "exit status 2".to_string(),
        ];
        assert_eq!(extract_error_lines(&lines), vec!["TypeError in module", "exit status 2"]);
    }

    #[test]
    fn error_lines_match_bare_markers() {
        let lines = vec![
            "error[E0308]: mismatched types".to_string(),
            "build failed".to_string(),
            "Compiling widgets v0.1.0".to_string(),
            "FATAL: out of memory".to_string(),
        ];
        assert_eq!(
            extract_error_lines(&lines),
            vec!["error[E0308]: mismatched types", "build failed", "FATAL: out of memory"]
        );
    }

    #[test]
    fn prompt_lists_jobs_logs_and_errors() {
        let prompt = build_prompt(&failed_report());
        assert!(prompt.contains("Workflow: CI"));
        assert!(prompt.contains("- test: failure"));
        assert!(prompt.contains("thread 'main' panicked"));
        assert!(prompt.contains("Key Error Messages (last 20 lines):\n```\nError: process exited\n```"));
    }

    #[tokio::test]
    async fn returns_trimmed_reply() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({ "model": "gpt-4o-mini", "max_tokens": 200 })))
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": { "role": "assistant", "content": "  Flaky test.  " } }] })
                    .to_string(),
            )
            .create_async()
            .await;

        let summarizer = Summarizer::new(
            &server.url(),
            Token::from("sk-test"),
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .unwrap();

        let summary = tokio_test::assert_ok!(summarizer.summarize(&failed_report()).await);
        mock.assert_async().await;
        assert_eq!(summary, "Flaky test.");
    }

    #[tokio::test]
    async fn service_errors_surface_as_summary_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let summarizer = Summarizer::new(
            &server.url(),
            Token::from("sk-test"),
            "gpt-4o-mini",
            Duration::from_secs(5),
        )
        .unwrap();

        let err = summarizer.summarize(&failed_report()).await.unwrap_err();
        assert!(matches!(err, CIDoctorError::Summary(_)));
    }
}
