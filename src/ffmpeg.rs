use crate::error::{PipelineError, Result};
use crate::logi;
use std::path::Path;
use tokio::process::Command;

/// Output geometry and look shared by every background segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub opacity: f64,
}

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd
        .status()
        .await
        .map_err(|e| PipelineError::media(format!("failed to start {}: {}", args[0], e)))?;
    if !status.success() {
        return Err(PipelineError::media(format!(
            "{} exited with {}: {:?}",
            args[0], status, args
        )));
    }

    Ok(())
}

fn ffmpeg_base() -> Vec<String> {
    ["ffmpeg", "-y", "-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| PipelineError::media(format!("ffprobe execution failed: {}", e)))?;

    if !output.status.success() {
        return Err(PipelineError::media(format!(
            "ffprobe failed for {}",
            path.display()
        )));
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| PipelineError::media(format!("invalid duration for {}", path.display())))
}

fn parse_probe_duration(text: &str) -> Option<f64> {
    let duration = text.trim().parse::<f64>().ok()?;
    if duration.is_finite() && duration > 0.1 {
        Some(duration)
    } else {
        None
    }
}

fn segment_filter(frame: &FrameSpec) -> String {
    let (w, h) = (frame.width, frame.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,\
         colorchannelmixer=rr={o:.3}:gg={o:.3}:bb={o:.3},fps={fps},format=yuv420p",
        o = frame.opacity,
        fps = frame.fps,
    )
}

fn segment_args(input: &Path, keep_secs: f64, frame: &FrameSpec, out_mp4: &Path) -> Vec<String> {
    let mut args = ffmpeg_base();
    args.extend([
        "-i".to_string(),
        input.display().to_string(),
        "-t".to_string(),
        format!("{:.3}", keep_secs),
        "-vf".to_string(),
        segment_filter(frame),
        "-an".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        out_mp4.display().to_string(),
    ]);
    args
}

/// Cuts the first `keep_secs` of a clip, fitted to the vertical frame and dimmed.
pub async fn ffmpeg_prepare_segment(
    input: &Path,
    keep_secs: f64,
    frame: &FrameSpec,
    out_mp4: &Path,
) -> Result<bool> {
    if keep_secs <= 0.0 {
        return Ok(false);
    }
    run_cmd(&segment_args(input, keep_secs, frame, out_mp4)).await?;
    Ok(out_mp4.exists())
}

pub async fn ffmpeg_concat_videos(list_txt: &Path, out_mp4: &Path) -> Result<bool> {
    let mut args = ffmpeg_base();
    args.extend([
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-an".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        out_mp4.display().to_string(),
    ]);
    run_cmd(&args).await?;
    Ok(out_mp4.exists())
}

/// Escapes a path for use as a filter option value inside `-filter_complex`.
fn escape_filter_path(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace(':', "\\\\:")
        .replace('\'', "\\\\'")
}

/// Inputs for the last render step.
#[derive(Debug, Clone)]
pub struct FinalRender<'a> {
    pub background: &'a Path,
    pub narration: &'a Path,
    pub subtitles: Option<&'a Path>,
    pub lead_in_secs: f64,
    pub pad_secs: f64,
    pub duration_secs: f64,
    pub font_size: u32,
    pub fps: u32,
    pub out_mp4: &'a Path,
}

fn final_filter(render: &FinalRender<'_>) -> String {
    let mut video = String::from("[0:v]");
    if render.pad_secs > 0.0 {
        video.push_str(&format!(
            "tpad=stop_mode=clone:stop_duration={:.3},",
            render.pad_secs
        ));
    }
    match render.subtitles {
        Some(srt) => video.push_str(&format!(
            "subtitles={}:force_style='FontName=Arial,FontSize={},PrimaryColour=&H00FFFFFF,Alignment=2'",
            escape_filter_path(srt),
            render.font_size
        )),
        None => video.push_str("null"),
    }
    video.push_str("[v]");

    let delay_ms = (render.lead_in_secs * 1000.0).round() as u64;
    format!("{};[1:a]adelay={}:all=1[a]", video, delay_ms)
}

fn final_args(render: &FinalRender<'_>) -> Vec<String> {
    let mut args = ffmpeg_base();
    args.extend([
        "-i".to_string(),
        render.background.display().to_string(),
        "-i".to_string(),
        render.narration.display().to_string(),
        "-filter_complex".to_string(),
        final_filter(render),
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "[a]".to_string(),
        "-t".to_string(),
        format!("{:.3}", render.duration_secs),
        "-r".to_string(),
        render.fps.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "22".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        render.out_mp4.display().to_string(),
    ]);
    args
}

/// Lays the delayed narration and burned-in subtitles over the background.
pub async fn ffmpeg_render_final(render: &FinalRender<'_>) -> Result<bool> {
    logi(format!(
        "Rendering {:.2}s (narration at +{:.2}s, pad {:.3}s) -> {}",
        render.duration_secs,
        render.lead_in_secs,
        render.pad_secs,
        render.out_mp4.display()
    ));
    run_cmd(&final_args(render)).await?;
    Ok(render.out_mp4.exists())
}
