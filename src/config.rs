use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ELEVENLABS_KEY_ENV: &str = "ELEVENLABS_API_KEY";
pub const PEXELS_KEY_ENV: &str = "PEXELS_API_KEY";

/// Settings for one run. Secrets come from the environment unless the
/// config file carries them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "openai_api_key", default)]
    pub openai_key: String,
    #[serde(rename = "elevenlabs_api_key", default)]
    pub elevenlabs_key: String,
    #[serde(rename = "pexels_api_key", default)]
    pub pexels_key: String,

    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(default = "default_eleven_model_id")]
    pub eleven_model_id: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_transcribe_model")]
    pub transcribe_model: String,

    #[serde(default = "default_narration_prompt")]
    pub narration_prompt: String,
    #[serde(default = "default_min_sentences")]
    pub min_sentences: u32,

    #[serde(default = "default_footage_query")]
    pub footage_query: String,
    #[serde(default = "default_footage_count")]
    pub footage_count: u32,

    /// Seconds of footage before the narration starts.
    #[serde(default = "default_lead_in")]
    pub lead_in_secs: f64,
    /// Extra seconds of footage after the narration ends.
    #[serde(default)]
    pub tail_padding_secs: f64,

    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_background_opacity")]
    pub background_opacity: f64,
    #[serde(default = "default_subtitle_font_size")]
    pub subtitle_font_size: u32,
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_eleven_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_transcribe_model() -> String {
    "whisper-1".to_string()
}

fn default_narration_prompt() -> String {
    "You are a motivational assistant. Write a motivational message for people who want to become millionaires.".to_string()
}

fn default_min_sentences() -> u32 {
    8
}

fn default_footage_query() -> String {
    "motivational landscape".to_string()
}

fn default_footage_count() -> u32 {
    5
}

fn default_lead_in() -> f64 {
    2.0
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

fn default_frame_width() -> u32 {
    608
}

fn default_frame_height() -> u32 {
    1080
}

fn default_fps() -> u32 {
    24
}

fn default_background_opacity() -> f64 {
    0.5
}

fn default_subtitle_font_size() -> u32 {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_key: String::new(),
            elevenlabs_key: String::new(),
            pexels_key: String::new(),
            eleven_voice_id: default_voice_id(),
            eleven_model_id: default_eleven_model_id(),
            openai_model: default_openai_model(),
            transcribe_model: default_transcribe_model(),
            narration_prompt: default_narration_prompt(),
            min_sentences: default_min_sentences(),
            footage_query: default_footage_query(),
            footage_count: default_footage_count(),
            lead_in_secs: default_lead_in(),
            tail_padding_secs: 0.0,
            output_root: default_output_root(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            fps: default_fps(),
            background_opacity: default_background_opacity(),
            subtitle_font_size: default_subtitle_font_size(),
        }
    }
}

impl Config {
    /// Reads the optional JSON settings file and fills secrets from the process
    /// environment. Callers validate once their own overrides are applied.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).await.map_err(|e| {
                    PipelineError::Config(format!("failed to read {}: {}", path.display(), e))
                })?;
                Self::from_json(&content)?
            }
            None => Self::default(),
        };

        config.fill_secrets(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| PipelineError::Config(format!("invalid config JSON: {}", e)))
    }

    /// Fills empty secrets through `lookup` (usually the environment).
    pub fn fill_secrets<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (slot, name) in [
            (&mut self.openai_key, OPENAI_KEY_ENV),
            (&mut self.elevenlabs_key, ELEVENLABS_KEY_ENV),
            (&mut self.pexels_key, PEXELS_KEY_ENV),
        ] {
            *slot = slot.trim().to_string();
            if slot.is_empty() {
                if let Some(value) = lookup(name) {
                    *slot = value.trim().to_string();
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (value, name) in [
            (&self.openai_key, OPENAI_KEY_ENV),
            (&self.elevenlabs_key, ELEVENLABS_KEY_ENV),
            (&self.pexels_key, PEXELS_KEY_ENV),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::Config(format!("{} missing", name)));
            }
        }

        if self.footage_count == 0 {
            return Err(PipelineError::Config("footage_count must be at least 1".into()));
        }
        if !(self.lead_in_secs.is_finite() && self.lead_in_secs >= 0.0) {
            return Err(PipelineError::Config("lead_in_secs must be >= 0".into()));
        }
        if !(self.tail_padding_secs.is_finite() && self.tail_padding_secs >= 0.0) {
            return Err(PipelineError::Config("tail_padding_secs must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(PipelineError::Config(
                "background_opacity must be within 0..=1".into(),
            ));
        }
        // libx264 with yuv420p needs even dimensions.
        if self.frame_width == 0
            || self.frame_height == 0
            || self.frame_width % 2 != 0
            || self.frame_height % 2 != 0
        {
            return Err(PipelineError::Config(
                "frame_width/frame_height must be even and non-zero".into(),
            ));
        }
        if self.fps == 0 {
            return Err(PipelineError::Config("fps must be at least 1".into()));
        }
        Ok(())
    }

    /// Footage length needed to cover a narration of `narration_secs`.
    pub fn required_duration(&self, narration_secs: f64) -> f64 {
        narration_secs + self.lead_in_secs + self.tail_padding_secs
    }
}
