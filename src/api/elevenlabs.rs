use crate::api::body_snippet;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::logw;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

const SERVICE: &str = "ElevenLabs";

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.50,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

fn tts_url(voice_id: &str) -> String {
    format!(
        "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
        voice_id
    )
}

/// Synthesizes `text` and writes the MP3 to `out_mp3_path`.
pub async fn elevenlabs_tts_to_mp3(
    client: &Client,
    cfg: &Config,
    text: &str,
    out_mp3_path: &Path,
) -> Result<()> {
    let body = SpeechRequest {
        text,
        model_id: &cfg.eleven_model_id,
        voice_settings: VoiceSettings::default(),
    };

    let resp = client
        .post(tts_url(&cfg.eleven_voice_id))
        .header("xi-api-key", &cfg.elevenlabs_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let raw = resp.text().await.unwrap_or_default();
        if !raw.is_empty() {
            logw(format!("ElevenLabs raw body: {}", body_snippet(&raw)));
        }
        return Err(PipelineError::external(
            SERVICE,
            format!("TTS failed HTTP {}", status.as_u16()),
        ));
    }

    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Err(PipelineError::external(SERVICE, "TTS returned no audio"));
    }
    if let Some(parent) = out_mp3_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(out_mp3_path, &bytes).await?;
    Ok(())
}
