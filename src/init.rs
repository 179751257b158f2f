use crate::error::Result;
use crate::logi;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Artifact locations for a single run, all under one timestamped folder.
#[derive(Debug, Clone)]
pub struct RunDirs {
    root: PathBuf,
}

impl RunDirs {
    pub fn for_time(output_root: &Path, now: DateTime<Local>) -> Self {
        Self {
            root: output_root.join(now.format("%Y%m%d_%H%M%S").to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn narration_text(&self) -> PathBuf {
        self.root.join("message.txt")
    }

    pub fn narration_audio(&self) -> PathBuf {
        self.root.join("message.mp3")
    }

    pub fn footage(&self, index: usize) -> PathBuf {
        self.root.join(format!("background_{}.mp4", index))
    }

    pub fn segment(&self, index: usize) -> PathBuf {
        self.root.join(format!("segment_{}.mp4", index))
    }

    pub fn concat_list(&self) -> PathBuf {
        self.root.join("concat_list.txt")
    }

    pub fn concat_video(&self) -> PathBuf {
        self.root.join("background_concat.mp4")
    }

    pub fn subtitles(&self) -> PathBuf {
        self.root.join("subtitles.srt")
    }

    pub fn final_video(&self) -> PathBuf {
        self.root.join("background_combined.mp4")
    }
}

/// Creates the output root and a fresh run folder named after the current time.
pub async fn create_run_dirs(output_root: &Path) -> Result<RunDirs> {
    let dirs = RunDirs::for_time(output_root, Local::now());
    if !dirs.root().exists() {
        fs::create_dir_all(dirs.root()).await?;
        logi(format!("Created run directory: {}", dirs.root().display()));
    }
    Ok(dirs)
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
