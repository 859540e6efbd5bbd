//! Transcript acquisition for platform-hosted videos.
//!
//! Retrieval strategies are tried in a fixed order and the chain stops at the
//! first one that produces usable text. Every strategy failure (timeout,
//! transport error, empty or too-short captions) is a [`RetrievalOutcome`]
//! value rather than an error, so it simply advances the chain. The chain
//! always ends with [`DescriptionFallback`], which cannot fail.

use std::sync::Arc;

use async_trait::async_trait;

pub mod service;
pub mod youtube;

use crate::captions;
use crate::Result;

/// Metadata for a single video as reported by the media platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoDetails {
    pub title: String,
    pub channel: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    /// Language code, e.g. `en` or `pt-BR`
    pub language: String,
    /// ISO-8601 timestamp; may be a bare date
    pub published_at: String,
}

/// Which caption tracks to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionSource {
    /// Auto-generated (speech recognition) tracks
    Automatic,
    /// Tracks uploaded by the video owner
    Uploaded,
    /// Whatever exists
    Any,
}

/// Language constraint for a caption request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageFilter {
    Only(String),
    All,
}

impl LanguageFilter {
    pub fn as_arg(&self) -> &str {
        match self {
            LanguageFilter::Only(code) => code,
            LanguageFilter::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionRequest {
    pub source: CaptionSource,
    pub languages: LanguageFilter,
}

/// Media platform collaborator: video metadata and raw caption tracks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Fetch title, channel, description and friends for a video
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails>;

    /// Fetch caption markup documents matching `request`, best candidate first.
    async fn caption_tracks(&self, video_id: &str, request: CaptionRequest) -> Result<Vec<String>>;
}

/// Result of one retrieval attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Success(String),
    Failure(String),
}

/// One way of obtaining a transcript.
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn attempt(&self, video_id: &str) -> RetrievalOutcome;
}

/// Caption-track strategy: fetch tracks, keep the first that parses to usable text.
pub struct CaptionStrategy {
    name: &'static str,
    platform: Arc<dyn MediaPlatform>,
    request: CaptionRequest,
}

impl CaptionStrategy {
    pub fn new(name: &'static str, platform: Arc<dyn MediaPlatform>, request: CaptionRequest) -> Self {
        Self { name, platform, request }
    }
}

#[async_trait]
impl TranscriptStrategy for CaptionStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(&self, video_id: &str) -> RetrievalOutcome {
        let tracks = match self.platform.caption_tracks(video_id, self.request.clone()).await {
            Ok(tracks) => tracks,
            Err(e) => return RetrievalOutcome::Failure(format!("{:#}", e)),
        };

        if tracks.is_empty() {
            return RetrievalOutcome::Failure("no caption tracks".to_string());
        }

        tracks
            .iter()
            .find_map(|markup| captions::parse(markup))
            .map(RetrievalOutcome::Success)
            .unwrap_or_else(|| {
                RetrievalOutcome::Failure(format!("{} track(s) without usable cues", tracks.len()))
            })
    }
}

/// Terminal step: build a transcript stand-in from the video description.
pub struct DescriptionFallback {
    platform: Arc<dyn MediaPlatform>,
}

pub const NO_SUBTITLES_TEXT: &str = "Subtitles not available for this video.";

impl DescriptionFallback {
    pub fn new(platform: Arc<dyn MediaPlatform>) -> Self {
        Self { platform }
    }

    pub async fn compose(&self, video_id: &str) -> String {
        match self.platform.video_details(video_id).await {
            Ok(details) => describe(&details),
            Err(e) => {
                tracing::warn!("Description fallback could not load metadata: {:#}", e);
                NO_SUBTITLES_TEXT.to_string()
            }
        }
    }
}

/// Render the description-fallback text for a video.
pub fn describe(details: &VideoDetails) -> String {
    let mut text = format!(
        "VIDEO TITLE: {}\n\nNOTE: This video does not have subtitles available.\nThe following is the video description:\n\n",
        details.title
    );
    for line in details.description.lines().map(str::trim).filter(|l| !l.is_empty()) {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Transcript produced by the acquisition chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// Name of the strategy that produced the text
    pub strategy: &'static str,
}

/// Ordered strategy chain ending in the description fallback.
pub struct TranscriptAcquisition {
    strategies: Vec<Box<dyn TranscriptStrategy>>,
    fallback: DescriptionFallback,
}

impl TranscriptAcquisition {
    /// Empty chain: only the fallback runs.
    pub fn new(fallback: DescriptionFallback) -> Self {
        Self {
            strategies: Vec::new(),
            fallback,
        }
    }

    /// Standard caption chain against `platform`.
    ///
    /// Auto-generated then uploaded captions in `preferred_language`, then
    /// any track in any language.
    pub fn with_caption_strategies(platform: Arc<dyn MediaPlatform>, preferred_language: &str) -> Self {
        let mut chain = Self::new(DescriptionFallback::new(platform.clone()));

        chain.register(Box::new(CaptionStrategy::new(
            "auto-captions",
            platform.clone(),
            CaptionRequest {
                source: CaptionSource::Automatic,
                languages: LanguageFilter::Only(preferred_language.to_string()),
            },
        )));
        chain.register(Box::new(CaptionStrategy::new(
            "uploaded-captions",
            platform.clone(),
            CaptionRequest {
                source: CaptionSource::Uploaded,
                languages: LanguageFilter::Only(preferred_language.to_string()),
            },
        )));
        chain.register(Box::new(CaptionStrategy::new(
            "any-language-captions",
            platform,
            CaptionRequest {
                source: CaptionSource::Any,
                languages: LanguageFilter::All,
            },
        )));

        chain
    }

    /// Append a strategy; it runs after those already registered.
    pub fn register(&mut self, strategy: Box<dyn TranscriptStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain for `video_id`. Always yields text.
    pub async fn fetch(&self, video_id: &str) -> Transcript {
        self.fetch_with_details(video_id, None).await
    }

    /// Like [`fetch`](Self::fetch), reusing `details` for the description
    /// fallback instead of looking them up again.
    pub async fn fetch_with_details(&self, video_id: &str, details: Option<&VideoDetails>) -> Transcript {
        tracing::info!("Fetching transcript for video {}", video_id);

        for strategy in &self.strategies {
            match strategy.attempt(video_id).await {
                RetrievalOutcome::Success(text) => {
                    tracing::info!(strategy = strategy.name(), "Transcript acquired ({} chars)", text.len());
                    return Transcript {
                        text,
                        strategy: strategy.name(),
                    };
                }
                RetrievalOutcome::Failure(reason) => {
                    tracing::warn!(strategy = strategy.name(), "Strategy failed: {}", reason);
                }
            }
        }

        tracing::info!("Using description fallback");
        let text = match details {
            Some(details) => describe(details),
            None => self.fallback.compose(video_id).await,
        };
        Transcript {
            text,
            strategy: "description-fallback",
        }
    }
}
