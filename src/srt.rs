use crate::error::Result;
use crate::subtitle::SubtitleCue;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let ss = total_s % 60;
    let mm = (total_s / 60) % 60;
    let hh = total_s / 3600;
    format!("{:02}:{:02}:{:02},{:03}", hh, mm, ss, ms)
}

/// Renders cues as SRT, each shifted by `offset_secs` on the video timeline.
pub fn render_srt(cues: &[SubtitleCue], offset_secs: f64) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(cue.start + offset_secs),
            format_srt_timestamp(cue.end + offset_secs),
            cue.word
        ));
    }
    out
}

pub async fn write_srt(cues: &[SubtitleCue], offset_secs: f64, out_srt: &Path) -> Result<()> {
    let mut out = fs::File::create(out_srt).await?;
    out.write_all(render_srt(cues, offset_secs).as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(word: &str, start: f64, end: f64) -> SubtitleCue {
        SubtitleCue {
            word: word.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(2.5), "00:00:02,500");
        assert_eq!(format_srt_timestamp(3725.0424), "01:02:05,042");
        assert_eq!(format_srt_timestamp(-1.0), "00:00:00,000");
    }

    #[test]
    fn test_render_shifts_by_lead_in() {
        let text = render_srt(&[cue("Never", 0.0, 0.42), cue("quit", 0.5, 0.9)], 2.0);
        assert_eq!(
            text,
            "1\n00:00:02,000 --> 00:00:02,420\nNever\n\n2\n00:00:02,500 --> 00:00:02,900\nquit\n\n"
        );
    }

    #[tokio::test]
    async fn test_write_srt_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("subtitles.srt");

        write_srt(&[cue("Go", 1.0, 1.25)], 0.0, &path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.starts_with("1\n00:00:01,000 --> 00:00:01,250\nGo\n"));
    }

    #[tokio::test]
    async fn test_empty_cues_write_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.srt");
        write_srt(&[], 2.0, &path).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "");
    }
}
