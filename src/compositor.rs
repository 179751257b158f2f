//! Turns a reconciliation into the final video.
//!
//! [`CompositionPlan`] is computed from duration metadata alone; [`compose`]
//! then applies it with ffmpeg: cut and fit each clip, concatenate, lay the
//! narration in after the lead-in and burn the word cues on top.

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::ffmpeg::{self, FinalRender, FrameSpec};
use crate::init::RunDirs;
use crate::reconcile::Reconciliation;
use crate::srt;
use crate::subtitle::SubtitleCue;
use crate::{logi, logok, logw};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Allowed gap between the planned segment total and the target.
pub const PLAN_TOLERANCE_SECS: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSegment {
    pub source: PathBuf,
    pub keep_secs: f64,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    pub segments: Vec<PlannedSegment>,
    pub required: f64,
    /// Seconds from selections too short to encode as a single frame. They are
    /// left out of the cut and made up by holding the last frame instead.
    pub held_secs: f64,
}

impl CompositionPlan {
    /// One segment per selected clip, in reconciliation order. Selections
    /// shorter than one frame at `fps` are folded into `held_secs`.
    pub fn from_reconciliation(rec: &Reconciliation, dirs: &RunDirs, fps: u32) -> Result<Self> {
        if !rec.is_feasible() {
            return Err(PipelineError::media(format!(
                "cannot compose {:.2}s from {:.2}s of footage",
                rec.required, rec.total
            )));
        }
        if rec.entries.is_empty() {
            return Err(PipelineError::media("no footage selected"));
        }

        let frame_secs = 1.0 / f64::from(fps.max(1));
        let mut segments = Vec::with_capacity(rec.entries.len());
        let mut held_secs = 0.0;
        for entry in &rec.entries {
            if entry.effective_duration < frame_secs {
                held_secs += entry.effective_duration;
                continue;
            }
            segments.push(PlannedSegment {
                source: entry.asset.path.clone(),
                keep_secs: entry.effective_duration,
                output: dirs.segment(segments.len()),
            });
        }
        if segments.is_empty() {
            return Err(PipelineError::media(
                "no selected footage is long enough for a single frame",
            ));
        }

        let plan = Self {
            segments,
            required: rec.required,
            held_secs,
        };
        let total = plan.total_secs() + plan.held_secs;
        if (total - plan.required).abs() > PLAN_TOLERANCE_SECS {
            return Err(PipelineError::media(format!(
                "segment total {:.3}s does not match required {:.3}s",
                total, plan.required
            )));
        }
        Ok(plan)
    }

    pub fn total_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.keep_secs).sum()
    }

    /// Concat demuxer list; entries are relative to the list's own folder.
    pub fn concat_list(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            let name = segment
                .output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| segment.output.display().to_string());
            out.push_str(&format!("file '{}'\n", name.replace('\'', "'\\''")));
        }
        out
    }
}

/// Extra seconds to hold the last frame so the encoded background reaches
/// `required`. Encoding rounds each segment to whole frames, so a shortfall of
/// up to one frame per segment (plus one) on top of the planned `held_secs`
/// is absorbed; anything larger fails.
pub fn coerce_padding(actual: f64, required: f64, segments: usize, fps: u32, held_secs: f64) -> Result<f64> {
    let gap = required - actual;
    if gap <= 0.0 {
        return Ok(0.0);
    }
    let tolerance = (segments as f64 + 1.0) / f64::from(fps.max(1)) + held_secs.max(0.0);
    if gap > tolerance {
        return Err(PipelineError::media(format!(
            "concatenated footage is {:.3}s, cannot stretch to {:.3}s",
            actual, required
        )));
    }
    Ok(gap)
}

fn frame_spec(cfg: &Config) -> FrameSpec {
    FrameSpec {
        width: cfg.frame_width,
        height: cfg.frame_height,
        fps: cfg.fps,
        opacity: cfg.background_opacity,
    }
}

/// Renders the plan into `dirs.final_video()` and returns that path.
pub async fn compose(
    cfg: &Config,
    dirs: &RunDirs,
    plan: &CompositionPlan,
    narration_audio: &Path,
    cues: &[SubtitleCue],
) -> Result<PathBuf> {
    let frame = frame_spec(cfg);

    for (i, segment) in plan.segments.iter().enumerate() {
        logi(format!(
            "Preparing segment {}/{}: {} ({:.2}s)",
            i + 1,
            plan.segments.len(),
            segment.source.display(),
            segment.keep_secs
        ));
        if !ffmpeg::ffmpeg_prepare_segment(&segment.source, segment.keep_secs, &frame, &segment.output)
            .await?
        {
            return Err(PipelineError::media(format!(
                "segment not produced: {}",
                segment.output.display()
            )));
        }
    }

    let list_path = dirs.concat_list();
    fs::write(&list_path, plan.concat_list()).await?;

    let concat = dirs.concat_video();
    logi(format!("Concatenating {} segments -> {}", plan.segments.len(), concat.display()));
    if !ffmpeg::ffmpeg_concat_videos(&list_path, &concat).await? {
        return Err(PipelineError::media("concat produced no output"));
    }

    let actual = ffmpeg::ffprobe_duration_seconds(&concat).await?;
    let pad_secs = coerce_padding(
        actual,
        plan.required,
        plan.segments.len(),
        cfg.fps,
        plan.held_secs,
    )?;
    logok(format!(
        "Background track {:.3}s (target {:.3}s, hold last frame {:.3}s)",
        actual, plan.required, pad_secs
    ));

    let srt_path = dirs.subtitles();
    let subtitles = if cues.is_empty() {
        logw("No subtitle cues; rendering without subtitles.");
        None
    } else {
        srt::write_srt(cues, cfg.lead_in_secs, &srt_path).await?;
        logok(format!("Wrote {} subtitle cues: {}", cues.len(), srt_path.display()));
        Some(srt_path.as_path())
    };

    let out = dirs.final_video();
    let render = FinalRender {
        background: &concat,
        narration: narration_audio,
        subtitles,
        lead_in_secs: cfg.lead_in_secs,
        pad_secs,
        duration_secs: plan.required,
        font_size: cfg.subtitle_font_size,
        fps: cfg.fps,
        out_mp4: &out,
    };
    if !ffmpeg::ffmpeg_render_final(&render).await? {
        return Err(PipelineError::media("final render produced no output"));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{FootageAsset, reconcile};
    use chrono::{Local, TimeZone};

    fn dirs() -> RunDirs {
        let when = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        RunDirs::for_time(Path::new("output"), when)
    }

    fn assets(durations: &[f64]) -> Vec<FootageAsset> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| FootageAsset::new(dirs().footage(i), format!("https://v/{i}"), *d))
            .collect()
    }

    #[test]
    fn test_plan_follows_reconciliation_order() {
        let rec = reconcile(&assets(&[6.0, 10.0, 3.0]), 12.0);
        let plan = CompositionPlan::from_reconciliation(&rec, &dirs(), 24).unwrap();

        let summary: Vec<(String, f64)> = plan
            .segments
            .iter()
            .map(|s| (s.source.file_name().unwrap().to_string_lossy().into_owned(), s.keep_secs))
            .collect();
        // 6 + 10 = 16, 4s comes off the 10s clip which now leads.
        assert_eq!(
            summary,
            vec![
                ("background_1.mp4".to_string(), 6.0),
                ("background_0.mp4".to_string(), 6.0),
            ]
        );
        assert_eq!(plan.segments[0].output, dirs().segment(0));
        assert!((plan.total_secs() - 12.0).abs() < PLAN_TOLERANCE_SECS);
    }

    #[test]
    fn test_plan_rejects_infeasible_reconciliation() {
        let rec = reconcile(&assets(&[5.0, 5.0]), 20.0);
        let err = CompositionPlan::from_reconciliation(&rec, &dirs(), 24).unwrap_err();
        assert!(matches!(err, PipelineError::MediaProcessing(_)));
    }

    #[test]
    fn test_plan_rejects_mismatched_total() {
        let mut rec = reconcile(&assets(&[10.0, 8.0]), 15.0);
        rec.entries[0].effective_duration += 1.0;
        assert!(CompositionPlan::from_reconciliation(&rec, &dirs(), 24).is_err());
    }

    #[test]
    fn test_concat_list_uses_segment_names() {
        let rec = reconcile(&assets(&[10.0, 5.0]), 15.0);
        let plan = CompositionPlan::from_reconciliation(&rec, &dirs(), 24).unwrap();
        assert_eq!(plan.concat_list(), "file 'segment_0.mp4'\nfile 'segment_1.mp4'\n");
    }

    #[test]
    fn test_coerce_padding() {
        assert_eq!(coerce_padding(15.2, 15.0, 2, 24, 0.0).unwrap(), 0.0);
        let pad = coerce_padding(14.96, 15.0, 2, 24, 0.0).unwrap();
        assert!((pad - 0.04).abs() < 1e-9);
        assert!(coerce_padding(14.0, 15.0, 2, 24, 0.0).is_err());
    }

    #[test]
    fn test_coerce_padding_covers_held_time() {
        // One 24fps frame of rounding plus a 0.5s planned hold.
        let pad = coerce_padding(14.48, 15.0, 1, 24, 0.5).unwrap();
        assert!((pad - 0.52).abs() < 1e-9);
        assert!(coerce_padding(14.0, 15.0, 1, 24, 0.5).is_err());
    }

    #[test]
    fn test_sub_frame_trim_is_held_not_cut() {
        // 5 + 10 overshoots 5.0003 by 9.9997, leaving 0.0003s of the 10s clip.
        let rec = reconcile(&assets(&[5.0, 10.0]), 5.0003);
        assert_eq!(rec.entries.len(), 2);

        let plan = CompositionPlan::from_reconciliation(&rec, &dirs(), 24).unwrap();
        assert_eq!(plan.segments.len(), 1);
        assert_eq!(plan.segments[0].source, dirs().footage(0));
        assert_eq!(plan.segments[0].keep_secs, 5.0);
        assert_eq!(plan.segments[0].output, dirs().segment(0));
        assert!((plan.held_secs - 0.0003).abs() < 1e-9);
        assert!((plan.total_secs() + plan.held_secs - 5.0003).abs() < PLAN_TOLERANCE_SECS);
        assert!(plan.segments.iter().all(|s| format!("{:.3}", s.keep_secs) != "0.000"));

        // The encoded 5s background still reaches the target.
        let pad = coerce_padding(5.0, plan.required, plan.segments.len(), 24, plan.held_secs).unwrap();
        assert!((pad - 0.0003).abs() < 1e-9);
    }

    #[test]
    fn test_plan_rejects_footage_shorter_than_a_frame() {
        let rec = reconcile(&assets(&[0.01, 0.02]), 0.03);
        let err = CompositionPlan::from_reconciliation(&rec, &dirs(), 24).unwrap_err();
        assert!(matches!(err, PipelineError::MediaProcessing(_)));
    }
}
