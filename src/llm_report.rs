//! LLM-generated HTML analysis report.
//!
//! Sends the report prompt to an OpenAI-compatible chat completions endpoint
//! and saves the reply as a standalone HTML page.

use crate::analysis::{load_records, Statistics};
use crate::error::{CnkiError, Result};
use crate::prompts::report::build_report_prompt;
use chrono::Local;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://yunwu.ai/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Request timeout in seconds; full-page generations are slow
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LlmConfig {
    /// Config for the default endpoint and model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.7,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Send `prompt` and return the model's reply.
///
/// # Errors
///
/// Returns error if no API key is configured, the request fails, or the
/// response carries no content.
pub async fn generate_report(config: &LlmConfig, prompt: &str) -> Result<String> {
    if config.api_key.trim().is_empty() {
        return Err(CnkiError::Config(
            "No API key set; pass --api-key or set GEMINI_API_KEY".to_string(),
        ));
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| CnkiError::Config(format!("Failed to build HTTP client: {}", e)))?;

    let request_body = serde_json::json!({
        "model": config.model,
        "messages": [
            {"role": "user", "content": prompt}
        ],
        "temperature": config.temperature,
        "max_tokens": config.max_tokens
    });

    info!(
        model = %config.model,
        prompt_chars = prompt.chars().count(),
        "Requesting analysis report"
    );

    let response = client
        .post(config.completions_url())
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {}", config.api_key))
        .json(&request_body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(CnkiError::Api {
            code: status.as_u16() as i32,
            message: format!("LLM API error: {} - {}", status, error_text),
        });
    }

    let body = response.text().await?;
    extract_content(&body)
}

/// Message content of the first choice
fn extract_content(body: &str) -> Result<String> {
    let api_response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| CnkiError::Parse(format!("Failed to parse LLM response: {}", e)))?;

    let content = api_response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(CnkiError::Parse("LLM response has no content".to_string()));
    }
    debug!(chars = content.chars().count(), "Report received");
    Ok(content)
}

/// Timestamped default report name
pub fn default_report_name() -> String {
    format!("analysis_report_{}.html", Local::now().format("%Y%m%d_%H%M%S"))
}

fn is_html_document(content: &str) -> bool {
    let head = content.trim_start();
    head.starts_with("<!DOCTYPE html")
        || head.starts_with("<!doctype html")
        || head.starts_with("<html")
}

/// Strip a surrounding markdown code fence, as models often add one
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Page shell for replies that are not a complete HTML document
fn wrap_in_page(content: &str, model: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>文献数据分析报告</title>
<style>
  body {{ font-family: "Microsoft YaHei", sans-serif; line-height: 1.6; max-width: 1200px; margin: 0 auto; padding: 20px; background: #f5f5f5; }}
  .container {{ background: #fff; padding: 30px; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,.1); }}
  h1 {{ color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }}
  .meta {{ background: #ecf0f1; padding: 15px; border-radius: 5px; margin-bottom: 20px; }}
  pre {{ background: #f8f9fa; padding: 15px; border-radius: 5px; white-space: pre-wrap; }}
</style>
</head>
<body>
<div class="container">
  <h1>文献数据分析报告</h1>
  <div class="meta">
    <p><strong>生成时间:</strong> {generated}</p>
    <p><strong>分析模型:</strong> {model}</p>
  </div>
  <pre>{content}</pre>
</div>
</body>
</html>
"#,
        generated = Local::now().format("%Y-%m-%d %H:%M:%S"),
        model = escape_html(model),
        content = escape_html(content),
    )
}

/// Write the report, wrapping non-HTML replies in a page shell.
///
/// Returns the path written to.
pub fn save_report(content: &str, output: Option<&Path>, model: &str) -> Result<PathBuf> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_report_name()));

    let content = strip_code_fence(content);
    let html = if is_html_document(content) {
        content.to_string()
    } else {
        wrap_in_page(content, model)
    };

    std::fs::write(&path, html)?;
    info!(path = %path.display(), "Report saved");
    Ok(path)
}

/// Load `input`, compute statistics, ask the model for a report and save it.
///
/// # Errors
///
/// Returns error if the CSV cannot be read or holds no records, or if report
/// generation or saving fails.
pub async fn analyze_file(
    config: &LlmConfig,
    input: &Path,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let records = load_records(input)?;
    if records.is_empty() {
        return Err(CnkiError::Validation(format!(
            "No records in {}",
            input.display()
        )));
    }

    let stats = Statistics::compute(&records)?;
    let prompt = build_report_prompt(&records, &stats);
    let report = generate_report(config, &prompt).await?;
    save_report(&report, output, &config.model)
}
