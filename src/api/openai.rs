use crate::api::body_snippet;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::subtitle::WordTiming;
use crate::{logi, logw};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::fs;

const SERVICE: &str = "OpenAI";
const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionReply {
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<WordTiming>,
}

fn describe_error(err: &ApiError) -> String {
    let mut parts = Vec::new();
    if let Some(msg) = &err.message {
        parts.push(msg.clone());
    }
    if let Some(kind) = &err.kind {
        parts.push(format!("type={}", kind));
    }
    if let Some(code) = &err.code {
        parts.push(format!("code={}", code));
    }
    if parts.is_empty() {
        "unspecified error".to_string()
    } else {
        parts.join(", ")
    }
}

fn extract_output_text(resp_json: &str) -> Result<String> {
    let reply: ResponsesReply = serde_json::from_str(resp_json)
        .map_err(|e| PipelineError::external(SERVICE, format!("malformed response: {}", e)))?;

    if let Some(err) = &reply.error {
        return Err(PipelineError::external(SERVICE, describe_error(err)));
    }

    reply
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter(|part| part.kind == "output_text")
        .filter_map(|part| part.text.as_deref())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::external(SERVICE, "response carried no output text"))
}

fn narration_request(cfg: &Config) -> serde_json::Value {
    let system = format!(
        "{} Use at least {} sentences. Reply with the message text only.",
        cfg.narration_prompt.trim(),
        cfg.min_sentences
    );
    json!({
        "model": cfg.openai_model,
        "input": [
            {"role": "system", "content": system},
            {"role": "user", "content": "Please give me a motivational message."},
        ],
    })
}

/// Asks the language model for the narration text.
pub async fn openai_generate_narration(client: &Client, cfg: &Config) -> Result<String> {
    let resp = client
        .post(RESPONSES_URL)
        .bearer_auth(&cfg.openai_key)
        .json(&narration_request(cfg))
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        if !raw.is_empty() {
            logw(format!("OpenAI raw body: {}", body_snippet(&raw)));
        }
        return Err(PipelineError::external(
            SERVICE,
            format!("HTTP {}", status.as_u16()),
        ));
    }

    let text = extract_output_text(&raw)?;
    logi(format!("OpenAI narration received: {} chars", text.len()));
    Ok(text)
}

fn parse_transcription(resp_json: &str) -> Result<Vec<WordTiming>> {
    let reply: TranscriptionReply = serde_json::from_str(resp_json)
        .map_err(|e| PipelineError::external(SERVICE, format!("malformed transcription: {}", e)))?;
    if reply.words.is_empty() && !reply.text.trim().is_empty() {
        logw("Transcription has text but no word timings.");
    }
    Ok(reply.words)
}

/// Transcribes the narration with word-level timestamps.
pub async fn openai_transcribe_words(
    client: &Client,
    cfg: &Config,
    audio_path: &Path,
) -> Result<Vec<WordTiming>> {
    let bytes = fs::read(audio_path).await?;
    let file_name = audio_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("audio.mp3")
        .to_string();

    let part = Part::bytes(bytes).file_name(file_name).mime_str("audio/mpeg")?;
    let form = Form::new()
        .part("file", part)
        .text("model", cfg.transcribe_model.clone())
        .text("response_format", "verbose_json")
        .text("timestamp_granularities[]", "word");

    let resp = client
        .post(TRANSCRIPTIONS_URL)
        .bearer_auth(&cfg.openai_key)
        .multipart(form)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        if !raw.is_empty() {
            logw(format!("OpenAI transcription body: {}", body_snippet(&raw)));
        }
        return Err(PipelineError::external(
            SERVICE,
            format!("transcription HTTP {}", status.as_u16()),
        ));
    }

    parse_transcription(&raw)
}
