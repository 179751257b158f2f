use crate::api::body_snippet;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::ffmpeg;
use crate::init::RunDirs;
use crate::reconcile::FootageAsset;
use crate::{logi, logok, logw};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

const SERVICE: &str = "Pexels";
const SEARCH_URL: &str = "https://api.pexels.com/videos/search";

#[derive(Debug, Deserialize)]
struct SearchReply {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    id: u64,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    link: String,
    quality: Option<String>,
}

/// Prefers the first HD rendition, falling back to whatever is listed first.
fn pick_video_link(video: &PexelsVideo) -> Option<&str> {
    video
        .video_files
        .iter()
        .find(|f| f.quality.as_deref() == Some("hd"))
        .or_else(|| video.video_files.first())
        .map(|f| f.link.as_str())
        .filter(|link| !link.is_empty())
}

fn parse_search(resp_json: &str) -> Result<Vec<String>> {
    let reply: SearchReply = serde_json::from_str(resp_json)
        .map_err(|e| PipelineError::external(SERVICE, format!("malformed search reply: {}", e)))?;

    let mut links = Vec::new();
    for video in &reply.videos {
        match pick_video_link(video) {
            Some(link) => links.push(link.to_string()),
            None => logw(format!("Pexels video {} has no downloadable file", video.id)),
        }
    }
    Ok(links)
}

/// Searches stock videos and returns one download link per result, in order.
pub async fn pexels_search(client: &Client, cfg: &Config, query: &str, count: u32) -> Result<Vec<String>> {
    let per_page = count.to_string();
    let resp = client
        .get(SEARCH_URL)
        .header("Authorization", &cfg.pexels_key)
        .query(&[("query", query), ("per_page", per_page.as_str())])
        .timeout(std::time::Duration::from_secs(60))
        .send()
        .await?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        if !raw.is_empty() {
            logw(format!("Pexels raw body: {}", body_snippet(&raw)));
        }
        return Err(PipelineError::external(
            SERVICE,
            format!("search HTTP {}", status.as_u16()),
        ));
    }

    parse_search(&raw)
}

async fn download_to(client: &Client, url: &str, out_path: &Path) -> Result<()> {
    let resp = client
        .get(url)
        .timeout(std::time::Duration::from_secs(600))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(PipelineError::external(
            SERVICE,
            format!("download HTTP {} for {}", resp.status().as_u16(), url),
        ));
    }
    let bytes = resp.bytes().await?;
    fs::write(out_path, &bytes).await?;
    Ok(())
}

/// Searches, downloads and probes footage. Clips that fail to download or
/// probe are skipped; the order of the search results is kept.
pub async fn fetch_footage(client: &Client, cfg: &Config, dirs: &RunDirs) -> Result<Vec<FootageAsset>> {
    let links = pexels_search(client, cfg, &cfg.footage_query, cfg.footage_count).await?;
    logi(format!(
        "Pexels returned {} videos for \"{}\"",
        links.len(),
        cfg.footage_query
    ));

    let mut assets = Vec::with_capacity(links.len());
    for (i, link) in links.iter().enumerate() {
        let out = dirs.footage(i);
        if let Err(err) = download_to(client, link, &out).await {
            logw(format!("Skipping video {}: {}", i, err));
            continue;
        }
        let duration = match ffmpeg::ffprobe_duration_seconds(&out).await {
            Ok(v) => v,
            Err(err) => {
                logw(format!("Skipping video {}: {}", i, err));
                continue;
            }
        };
        logok(format!("Downloaded {} ({:.2}s)", out.display(), duration));
        assets.push(FootageAsset::new(out, link.clone(), duration));
    }

    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_prefers_hd_files() {
        let raw = r#"{
            "page": 1,
            "videos": [
                {"id": 1, "duration": 12, "video_files": [
                    {"link": "https://p/1-sd.mp4", "quality": "sd", "width": 640},
                    {"link": "https://p/1-hd.mp4", "quality": "hd", "width": 1920}
                ]},
                {"id": 2, "video_files": [
                    {"link": "https://p/2.mp4", "quality": null}
                ]},
                {"id": 3, "video_files": []}
            ]
        }"#;
        let links = parse_search(raw).unwrap();
        assert_eq!(links, vec!["https://p/1-hd.mp4", "https://p/2.mp4"]);
    }

    #[test]
    fn test_parse_search_without_videos_is_empty() {
        assert!(parse_search(r#"{"total_results": 0}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_rejects_garbage() {
        let err = parse_search("<html>").unwrap_err();
        assert!(matches!(err, PipelineError::ExternalService { service: "Pexels", .. }));
    }
}
