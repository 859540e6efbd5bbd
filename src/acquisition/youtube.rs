use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use url::Url;

use super::{CaptionRequest, CaptionSource, MediaPlatform, VideoDetails};
use crate::config::YoutubeConfig;
use crate::process::{self, ProcessError};
use crate::{PipelineError, Result};

const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Staged caption files at or below this size carry no cues.
const MIN_TRACK_BYTES: u64 = 100;

/// Pull the video id out of a YouTube URL (watch, short link, shorts, embed, live)
/// or accept a bare 11-character id.
pub fn extract_video_id(input: &str) -> std::result::Result<String, PipelineError> {
    let input = input.trim();
    let invalid = || PipelineError::InvalidInput(format!("Invalid YouTube URL: {}", input));

    let url = match Url::parse(input) {
        Ok(url) => url,
        Err(_) if is_video_id(input) => return Ok(input.to_string()),
        Err(_) => return Err(invalid()),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    let host = url.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut segments = url.path_segments().into_iter().flatten().filter(|s| !s.is_empty());

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        h if h == "youtube.com" || h.ends_with(".youtube.com") => {
            match url.query_pairs().find(|(key, _)| key == "v") {
                Some((_, id)) => Some(id.into_owned()),
                None => match (segments.next(), segments.next()) {
                    (Some("shorts" | "embed" | "live" | "v"), Some(id)) => Some(id.to_string()),
                    _ => None,
                },
            }
        }
        _ => None,
    };

    candidate
        .map(|id| id.trim().to_string())
        .filter(|id| is_video_id(id))
        .ok_or_else(invalid)
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// YouTube access: Data API (when a key is configured) or yt-dlp for metadata,
/// yt-dlp for caption tracks.
pub struct YoutubeClient {
    http: reqwest::Client,
    api_key: Option<String>,
    yt_dlp_path: String,
    preferred_language: String,
    subtitle_timeout: Duration,
    metadata_timeout: Duration,
}

impl YoutubeClient {
    pub fn new(config: &YoutubeConfig) -> Result<Self> {
        let metadata_timeout = Duration::from_secs(config.metadata_timeout_secs);
        let http = reqwest::Client::builder()
            .connect_timeout(metadata_timeout)
            .timeout(metadata_timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            yt_dlp_path: config.yt_dlp_path.clone(),
            preferred_language: config.preferred_language.clone(),
            subtitle_timeout: Duration::from_secs(config.subtitle_timeout_secs),
            metadata_timeout,
        })
    }

    /// Metadata through the YouTube Data API v3
    async fn details_from_api(&self, video_id: &str, api_key: &str) -> Result<VideoDetails> {
        tracing::debug!("Requesting Data API details for {}", video_id);

        let response = self
            .http
            .get(DATA_API_URL)
            .query(&[("id", video_id), ("key", api_key), ("part", "snippet,contentDetails")])
            .send()
            .await
            .context("YouTube Data API request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("YouTube Data API returned HTTP {}", response.status());
        }

        let listing: VideoListResponse = response
            .json()
            .await
            .context("Failed to parse YouTube Data API response")?;

        let item = listing
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::VideoUnavailable(video_id.to_string()))?;

        Ok(item.snippet.into_details())
    }

    /// Metadata through `yt-dlp --dump-json`
    async fn details_from_yt_dlp(&self, video_id: &str) -> Result<VideoDetails> {
        tracing::debug!("Extracting video info with yt-dlp for {}", video_id);

        let mut command = Command::new(&self.yt_dlp_path);
        command.args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings"]);
        command.arg(watch_url(video_id));

        let output = match process::run_bounded(command, "yt-dlp", self.metadata_timeout).await {
            Ok(output) => output,
            Err(ProcessError::Failed { stderr_tail, .. })
                if stderr_tail.contains("Private video") || stderr_tail.contains("Video unavailable") =>
            {
                return Err(PipelineError::VideoUnavailable(video_id.to_string()).into());
            }
            Err(e) => return Err(e.into()),
        };

        let info: Value = serde_json::from_str(&output.stdout).context("Failed to parse yt-dlp metadata")?;
        Ok(details_from_info(&info))
    }

    /// Run yt-dlp once for `request`, staging tracks in a private temp directory.
    async fn fetch_tracks(&self, video_id: &str, request: &CaptionRequest, staging: &Path) -> Result<Vec<String>> {
        let template = staging.join("captions");

        let mut command = Command::new(&self.yt_dlp_path);
        match request.source {
            CaptionSource::Automatic => {
                command.arg("--write-auto-sub");
            }
            CaptionSource::Uploaded => {
                command.arg("--write-sub");
            }
            CaptionSource::Any => {
                command.args(["--write-auto-sub", "--write-sub"]);
            }
        }
        command
            .args(["--skip-download", "--sub-format", "vtt", "--sub-langs"])
            .arg(request.languages.as_arg())
            .args(["--no-warnings", "--quiet", "--no-playlist", "-o"])
            .arg(&template)
            .arg(watch_url(video_id));

        match process::run_bounded(command, "yt-dlp", self.subtitle_timeout).await {
            Ok(_) => {}
            // yt-dlp exits non-zero when some requested languages are missing,
            // but whatever it managed to write is still worth reading
            Err(e @ ProcessError::Failed { .. }) => {
                tracing::debug!("yt-dlp reported a failure, checking staged files anyway: {}", e);
            }
            Err(e) => return Err(e.into()),
        }

        let mut files = staged_tracks(staging)?;
        files.sort_by_key(|path| track_rank(path, &self.preferred_language));

        let mut tracks = Vec::with_capacity(files.len());
        for path in files {
            match fs_err::read_to_string(&path) {
                Ok(markup) => tracks.push(markup),
                Err(e) => tracing::debug!("Skipping unreadable caption file: {}", e),
            }
        }

        tracing::debug!("{} caption track(s) staged for {}", tracks.len(), video_id);
        Ok(tracks)
    }
}

#[async_trait]
impl MediaPlatform for YoutubeClient {
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails> {
        match &self.api_key {
            Some(key) => self.details_from_api(video_id, key).await,
            None => self.details_from_yt_dlp(video_id).await,
        }
    }

    async fn caption_tracks(&self, video_id: &str, request: CaptionRequest) -> Result<Vec<String>> {
        let staging = tempfile::Builder::new()
            .prefix("vtp_subs_")
            .tempdir()
            .context("Failed to create caption staging directory")?;

        let result = self.fetch_tracks(video_id, &request, staging.path()).await;
        close_staging(staging);
        result
    }
}

/// Remove a staging directory, logging rather than failing.
fn close_staging(staging: TempDir) {
    let path = staging.path().to_path_buf();
    if let Err(e) = staging.close() {
        tracing::warn!("Failed to remove staging directory {}: {}", path.display(), e);
    }
}

fn staged_tracks(staging: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs_err::read_dir(staging)? {
        let entry = entry?;
        let path = entry.path();
        let is_vtt = path.extension().and_then(|ext| ext.to_str()) == Some("vtt");
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if is_vtt && size > MIN_TRACK_BYTES {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Lower ranks first: exact preferred language, its regional variants, then the rest.
fn track_rank(path: &Path, preferred: &str) -> u8 {
    let language = path
        .file_stem()
        .and_then(|stem| Path::new(stem).extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    if language.eq_ignore_ascii_case(preferred) {
        0
    } else if language
        .to_lowercase()
        .starts_with(&format!("{}-", preferred.to_lowercase()))
    {
        1
    } else {
        2
    }
}

fn details_from_info(info: &Value) -> VideoDetails {
    let text = |key: &str| info[key].as_str().map(str::to_string);

    let published_at = text("upload_date")
        .and_then(|raw| chrono::NaiveDate::parse_from_str(&raw, "%Y%m%d").ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    VideoDetails {
        title: text("title").unwrap_or_default(),
        channel: text("channel").or_else(|| text("uploader")).unwrap_or_default(),
        description: text("description").unwrap_or_default(),
        thumbnail_url: text("thumbnail"),
        language: text("language").unwrap_or_else(|| "en".to_string()),
        published_at,
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
    default_audio_language: Option<String>,
    default_language: Option<String>,
    published_at: String,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    high: Option<ThumbnailRef>,
    medium: Option<ThumbnailRef>,
    #[serde(rename = "default")]
    fallback: Option<ThumbnailRef>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailRef {
    url: String,
}

impl Snippet {
    fn into_details(self) -> VideoDetails {
        let thumbnail_url = self
            .thumbnails
            .high
            .or(self.thumbnails.medium)
            .or(self.thumbnails.fallback)
            .map(|thumb| thumb.url);

        VideoDetails {
            title: self.title,
            channel: self.channel_title,
            description: self.description,
            thumbnail_url,
            language: self
                .default_audio_language
                .or(self.default_language)
                .unwrap_or_else(|| "en".to_string()),
            published_at: self.published_at,
        }
    }
}
