use crate::api::{elevenlabs, openai, pexels};
use crate::compositor::{self, CompositionPlan};
use crate::config::Config;
use crate::error::Result;
use crate::ffmpeg;
use crate::init::{self, RunDirs};
use crate::reconcile::{self, FootageAsset, Reconciliation, format_duration};
use crate::subtitle::{self, SubtitleCue};
use crate::{logi, logok, logw};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs;

async fn produce_narration(client: &Client, cfg: &Config, dirs: &RunDirs) -> Result<String> {
    logi("Requesting narration text...");
    let message = openai::openai_generate_narration(client, cfg).await?;
    logi(format!("Narration: {}", message));

    let text_path = dirs.narration_text();
    fs::write(&text_path, message.as_bytes()).await?;
    logok(format!("Saved narration text: {}", text_path.display()));
    Ok(message)
}

async fn produce_audio(client: &Client, cfg: &Config, dirs: &RunDirs, message: &str) -> Result<(PathBuf, f64)> {
    let audio_path = dirs.narration_audio();
    logi(format!("Synthesizing speech -> {}", audio_path.display()));
    elevenlabs::elevenlabs_tts_to_mp3(client, cfg, message, &audio_path).await?;

    let duration = ffmpeg::ffprobe_duration_seconds(&audio_path).await?;
    logok(format!(
        "Narration audio {} lasts {}",
        audio_path.display(),
        format_duration(duration)
    ));
    Ok((audio_path, duration))
}

async fn gather_footage(client: &Client, cfg: &Config, dirs: &RunDirs) -> Vec<FootageAsset> {
    match pexels::fetch_footage(client, cfg, dirs).await {
        Ok(assets) => assets,
        Err(err) => {
            logw(format!("Footage download failed: {}", err));
            Vec::new()
        }
    }
}

async fn gather_cues(client: &Client, cfg: &Config, audio_path: &Path) -> Vec<SubtitleCue> {
    logi("Transcribing narration for subtitles...");
    match openai::openai_transcribe_words(client, cfg, audio_path).await {
        Ok(words) => {
            let cues = subtitle::cues_from_words(&words);
            logok(format!("Transcript: {} words -> {} cues", words.len(), cues.len()));
            cues
        }
        Err(err) => {
            logw(format!("Transcription failed, continuing without subtitles: {}", err));
            Vec::new()
        }
    }
}

/// Progress lines for a selection. The per-clip average is only reported
/// once the footage covers the target.
fn selection_lines(rec: &Reconciliation) -> Vec<String> {
    let mut lines = vec![format!("Total footage duration: {}", format_duration(rec.total))];
    if rec.is_feasible() {
        if let Some(share) = rec.participation_secs() {
            lines.push(format!("Each clip averages {}", format_duration(share)));
        }
    }
    for entry in &rec.entries {
        lines.push(format!(
            "Clip: {}, using {} of {:.2}s",
            entry.asset.path.display(),
            format_duration(entry.effective_duration),
            entry.asset.duration
        ));
    }
    lines
}

fn report_selection(rec: &Reconciliation) {
    for line in selection_lines(rec) {
        logi(line);
    }
}

/// Runs the whole pipeline once and returns the rendered video path.
pub async fn run_generation(cfg: &Config) -> Result<PathBuf> {
    let client = Client::builder().cookie_store(true).build()?;

    let dirs = init::create_run_dirs(&cfg.output_root).await?;

    let message = produce_narration(&client, cfg, &dirs).await?;
    let (audio_path, narration_secs) = produce_audio(&client, cfg, &dirs, &message).await?;

    let footage = gather_footage(&client, cfg, &dirs).await;
    let required = cfg.required_duration(narration_secs);
    logi(format!(
        "Need {} of footage from {} clips",
        format_duration(required),
        footage.len()
    ));

    let rec = reconcile::reconcile(&footage, required);
    report_selection(&rec);
    let rec = match rec.into_feasible() {
        Ok(rec) => rec,
        Err(err) => {
            logw("More footage is needed to cover the narration.");
            return Err(err);
        }
    };

    let cues = gather_cues(&client, cfg, &audio_path).await;

    let plan = CompositionPlan::from_reconciliation(&rec, &dirs, cfg.fps)?;
    let out = compositor::compose(cfg, &dirs, &plan, &audio_path, &cues).await?;

    logok(format!("Final video saved: {}", out.display()));
    logi(format!(
        "Narration plays from {:.2}s to {:.2}s.",
        cfg.lead_in_secs,
        cfg.lead_in_secs + narration_secs
    ));
    Ok(out)
}

/// Runs the pipeline and maps the outcome to a process exit code.
pub async fn run(cfg: &Config) -> i32 {
    match run_generation(cfg).await {
        Ok(_) => 0,
        Err(err) => {
            tracing::error!("{}", err);
            err.exit_code()
        }
    }
}
