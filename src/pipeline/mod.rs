//! End-to-end conversions: YouTube link or uploaded file in, PDF bytes out.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::service::ExternalServiceStrategy;
use crate::acquisition::youtube::{extract_video_id, YoutubeClient};
use crate::acquisition::{MediaPlatform, TranscriptAcquisition, VideoDetails};
use crate::config::Config;
use crate::delivery::DocumentDelivery;
use crate::render::{DocumentMetadata, DocumentRenderer, RenderSettings};
use crate::transcribe::{ScriptTranscriber, SpeechTranscriber, UploadedMedia};
use crate::translate::{language_name, MyMemoryTranslator, TranslationChunker, Translator};
use crate::{utils, PipelineError, Result};

/// Source label shown on covers of uploaded media
pub const UPLOAD_SOURCE_LABEL: &str = "Uploaded File";
/// Language label shown on covers of uploaded media
pub const UPLOAD_LANGUAGE_LABEL: &str = "Audio/Video";

/// A finished document.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub title: String,
    /// Suggested download name, always ending in `.pdf`
    pub file_name: String,
    pub document: Vec<u8>,
}

impl Conversion {
    fn new(title: String, document: Vec<u8>) -> Self {
        Self {
            file_name: utils::pdf_file_name(&title),
            title,
            document,
        }
    }

    /// Mail the document to `recipient`.
    pub async fn send_to(&self, delivery: &dyn DocumentDelivery, recipient: &str) -> std::result::Result<(), PipelineError> {
        delivery
            .deliver(recipient, &self.title, &self.file_name, &self.document)
            .await
    }
}

/// Optional translation step: a collaborator plus the chunker feeding it.
struct Translation {
    translator: Box<dyn Translator>,
    chunker: TranslationChunker,
    target_language: String,
}

pub struct ConversionPipeline {
    platform: Arc<dyn MediaPlatform>,
    acquisition: TranscriptAcquisition,
    transcriber: Box<dyn SpeechTranscriber>,
    translation: Option<Translation>,
    renderer: DocumentRenderer,
    show_progress: bool,
}

impl ConversionPipeline {
    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let platform: Arc<dyn MediaPlatform> = Arc::new(YoutubeClient::new(&config.youtube)?);

        let mut acquisition =
            TranscriptAcquisition::with_caption_strategies(platform.clone(), &config.youtube.preferred_language);
        if let Some(script) = &config.youtube.transcript_script {
            acquisition.register(Box::new(ExternalServiceStrategy::new(
                config.transcription.python_path.clone(),
                script.clone(),
                Duration::from_secs(config.youtube.subtitle_timeout_secs),
            )));
        }

        let mut pipeline = Self::new(
            platform,
            acquisition,
            Box::new(ScriptTranscriber::new(&config.transcription)),
            DocumentRenderer::new(RenderSettings::from_config(
                &config.render,
                &config.translation.target_language,
            )),
        );

        if config.translation.enabled {
            pipeline = pipeline.with_translator(
                Box::new(MyMemoryTranslator::new(&config.translation)?),
                TranslationChunker::new(config.translation.chunk_size),
                &config.translation.target_language,
            );
        }

        Ok(pipeline)
    }

    /// Pipeline without translation.
    pub fn new(
        platform: Arc<dyn MediaPlatform>,
        acquisition: TranscriptAcquisition,
        transcriber: Box<dyn SpeechTranscriber>,
        renderer: DocumentRenderer,
    ) -> Self {
        Self {
            platform,
            acquisition,
            transcriber,
            translation: None,
            renderer,
            show_progress: false,
        }
    }

    pub fn with_translator(
        mut self,
        translator: Box<dyn Translator>,
        chunker: TranslationChunker,
        target_language: &str,
    ) -> Self {
        self.translation = Some(Translation {
            translator,
            chunker,
            target_language: target_language.to_string(),
        });
        self
    }

    pub fn without_translation(mut self) -> Self {
        self.translation = None;
        self
    }

    /// Show spinners on the terminal while steps run.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.acquisition.strategy_names()
    }

    /// Convert a YouTube link (or bare video id) into a PDF.
    pub async fn convert_youtube(&self, url: &str) -> Result<Conversion> {
        let video_id = extract_video_id(url)?;
        tracing::info!("Converting YouTube video {}", video_id);

        let progress = self.spinner("Fetching video details...");
        let fetched = match self.video_details(&video_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                progress.finish_and_clear();
                return Err(e);
            }
        };

        progress.set_message("Fetching transcript...");
        let transcript = self.acquisition.fetch_with_details(&video_id, fetched.as_ref()).await;
        let details = fetched.unwrap_or_else(|| placeholder_details(&video_id));

        progress.set_message("Translating...");
        let (text, translated) = self.translate(&transcript.text, &details.language).await;

        progress.set_message("Rendering PDF...");
        let metadata = DocumentMetadata {
            title: details.title.clone(),
            source_label: details.channel.clone(),
            published_at: details.published_at.clone(),
            thumbnail_url: details.thumbnail_url.clone(),
            source_language: language_name(&details.language),
            translated,
        };
        let document = self.renderer.render(&metadata, &text).await;
        progress.finish_and_clear();

        let conversion = Conversion::new(details.title, document?);
        tracing::info!(
            strategy = transcript.strategy,
            "Rendered {} ({})",
            conversion.file_name,
            utils::format_file_size(conversion.document.len() as u64)
        );
        Ok(conversion)
    }

    /// Transcribe an uploaded mp3/mp4 file into a PDF.
    pub async fn convert_upload(&self, path: &Path) -> Result<Conversion> {
        let media = UploadedMedia::stage(path).await?;
        let title = media.title().to_string();

        let progress = self.spinner("Transcribing audio...");
        let transcribed = self.transcriber.transcribe(media.path()).await;
        media.close();

        let text = match transcribed {
            Ok(Some(text)) => text,
            Ok(None) => {
                progress.finish_and_clear();
                return Err(PipelineError::NoSpeech(path.display().to_string()).into());
            }
            Err(e) => {
                progress.finish_and_clear();
                return Err(e);
            }
        };

        progress.set_message("Translating...");
        let (text, translated) = self.translate(&text, "auto").await;

        progress.set_message("Rendering PDF...");
        let metadata = DocumentMetadata {
            title: title.clone(),
            source_label: UPLOAD_SOURCE_LABEL.to_string(),
            published_at: format!("{}T00:00:00Z", chrono::Local::now().format("%Y-%m-%d")),
            thumbnail_url: None,
            source_language: UPLOAD_LANGUAGE_LABEL.to_string(),
            translated,
        };
        let document = self.renderer.render(&metadata, &text).await;
        progress.finish_and_clear();

        Ok(Conversion::new(title, document?))
    }

    /// Details for the cover. Unavailable videos are fatal; other lookup
    /// failures yield `None` and the cover uses placeholder details.
    async fn video_details(&self, video_id: &str) -> Result<Option<VideoDetails>> {
        match self.platform.video_details(video_id).await {
            Ok(details) => Ok(Some(details)),
            Err(e) => match e.downcast::<PipelineError>() {
                Ok(err) => Err(err.into()),
                Err(e) => {
                    tracing::warn!("Video details unavailable for {}: {:#}", video_id, e);
                    Ok(None)
                }
            },
        }
    }

    /// Returns the text to render and whether it was sent for translation.
    async fn translate(&self, text: &str, source_language: &str) -> (String, bool) {
        match &self.translation {
            Some(translation) if !crate::translate::is_same_language(source_language, &translation.target_language) => {
                let translated = translation
                    .chunker
                    .translate(
                        translation.translator.as_ref(),
                        text,
                        source_language,
                        &translation.target_language,
                    )
                    .await;
                (translated, true)
            }
            _ => (text.to_string(), false),
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            progress.set_style(style);
        }
        progress.set_message(message.to_string());
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}

fn placeholder_details(video_id: &str) -> VideoDetails {
    VideoDetails {
        title: format!("YouTube Video {}", video_id),
        channel: "YouTube".to_string(),
        language: "en".to_string(),
        published_at: chrono::Local::now().format("%Y-%m-%d").to_string(),
        ..VideoDetails::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{DescriptionFallback, MockMediaPlatform};
    use crate::delivery::MockDocumentDelivery;
    use crate::transcribe::MockSpeechTranscriber;
    use crate::translate::MockTranslator;
    use tempfile::TempDir;

    const CAPTIONS: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nBonjour et bienvenue dans cette vid\u{e9}o\n\n00:00:03.000 --> 00:00:05.000\nnous allons parler de Rust aujourd'hui\n";

    fn details(language: &str) -> VideoDetails {
        VideoDetails {
            title: "Parlons de Rust".to_string(),
            channel: "Chaine Rust".to_string(),
            description: "Une description".to_string(),
            thumbnail_url: None,
            language: language.to_string(),
            published_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    fn platform(language: &'static str) -> Arc<dyn MediaPlatform> {
        let mut platform = MockMediaPlatform::new();
        platform
            .expect_video_details()
            .returning(move |_| Ok(details(language)));
        platform
            .expect_caption_tracks()
            .returning(|_, _| Ok(vec![CAPTIONS.to_string()]));
        Arc::new(platform)
    }

    fn pipeline(platform: Arc<dyn MediaPlatform>, transcriber: MockSpeechTranscriber) -> ConversionPipeline {
        let acquisition = TranscriptAcquisition::with_caption_strategies(platform.clone(), "en");
        ConversionPipeline::new(
            platform,
            acquisition,
            Box::new(transcriber),
            DocumentRenderer::new(RenderSettings::default()),
        )
    }

    #[tokio::test]
    async fn test_convert_youtube_translates_foreign_captions() {
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .withf(|_, source, target| source == "fr" && target == "en")
            .times(1)
            .returning(|_, _, _| Ok("Hello and welcome\nwe will talk about Rust today\n".to_string()));

        let pipeline = pipeline(platform("fr"), MockSpeechTranscriber::new()).with_translator(
            Box::new(translator),
            TranslationChunker::new(400),
            "en",
        );

        let conversion = pipeline
            .convert_youtube("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(conversion.title, "Parlons de Rust");
        assert_eq!(conversion.file_name, "Parlons_de_Rust.pdf");
        assert!(conversion.document.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_convert_youtube_english_skips_translator() {
        let mut translator = MockTranslator::new();
        translator.expect_translate().never();

        let pipeline = pipeline(platform("en-US"), MockSpeechTranscriber::new()).with_translator(
            Box::new(translator),
            TranslationChunker::new(400),
            "en",
        );

        assert!(pipeline.convert_youtube("dQw4w9WgXcQ").await.is_ok());
    }

    #[tokio::test]
    async fn test_convert_youtube_rejects_bad_link() {
        let pipeline = pipeline(Arc::new(MockMediaPlatform::new()), MockSpeechTranscriber::new());
        let err = pipeline.convert_youtube("https://example.com/video").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_convert_youtube_unavailable_video() {
        let mut platform = MockMediaPlatform::new();
        platform
            .expect_video_details()
            .returning(|id| Err(PipelineError::VideoUnavailable(id.to_string()).into()));
        let platform: Arc<dyn MediaPlatform> = Arc::new(platform);

        let pipeline = ConversionPipeline::new(
            platform.clone(),
            TranscriptAcquisition::new(DescriptionFallback::new(platform)),
            Box::new(MockSpeechTranscriber::new()),
            DocumentRenderer::new(RenderSettings::default()),
        );

        let err = pipeline.convert_youtube("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::VideoUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_convert_youtube_details_outage_uses_placeholder() {
        let mut platform = MockMediaPlatform::new();
        platform
            .expect_video_details()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        platform
            .expect_caption_tracks()
            .returning(|_, _| Ok(vec![CAPTIONS.to_string()]));

        let pipeline = pipeline(Arc::new(platform), MockSpeechTranscriber::new());
        let conversion = pipeline.convert_youtube("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(conversion.title, "YouTube Video dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_description_fallback_reuses_cover_details() {
        let mut platform = MockMediaPlatform::new();
        platform
            .expect_video_details()
            .times(1)
            .returning(|_| Ok(details("en")));
        platform
            .expect_caption_tracks()
            .returning(|_, _| Ok(vec!["WEBVTT\n".to_string()]));

        let pipeline = pipeline(Arc::new(platform), MockSpeechTranscriber::new());
        let conversion = pipeline.convert_youtube("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(conversion.title, "Parlons de Rust");
    }

    #[tokio::test]
    async fn test_convert_upload() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("Team Sync.mp3");
        std::fs::write(&source, b"ID3").unwrap();

        let mut transcriber = MockSpeechTranscriber::new();
        transcriber
            .expect_transcribe()
            .times(1)
            .returning(|path| {
                assert!(path.exists());
                Ok(Some("we shipped the release on time".to_string()))
            });

        let pipeline = pipeline(Arc::new(MockMediaPlatform::new()), transcriber);
        let conversion = pipeline.convert_upload(&source).await.unwrap();

        assert_eq!(conversion.title, "Team Sync");
        assert_eq!(conversion.file_name, "Team_Sync.pdf");
        assert!(conversion.document.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_convert_upload_without_speech() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("silence.mp4");
        std::fs::write(&source, b"ftyp").unwrap();

        let mut transcriber = MockSpeechTranscriber::new();
        transcriber.expect_transcribe().returning(|_| Ok(None));

        let pipeline = pipeline(Arc::new(MockMediaPlatform::new()), transcriber);
        let err = pipeline.convert_upload(&source).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoSpeech(_))
        ));
    }

    #[tokio::test]
    async fn test_convert_upload_rejects_other_types() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("slides.pdf");
        std::fs::write(&source, b"%PDF").unwrap();

        let mut transcriber = MockSpeechTranscriber::new();
        transcriber.expect_transcribe().never();

        let pipeline = pipeline(Arc::new(MockMediaPlatform::new()), transcriber);
        let err = pipeline.convert_upload(&source).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnsupportedUpload(_))
        ));
    }

    #[tokio::test]
    async fn test_send_to_passes_download_name() {
        let conversion = Conversion::new("Q3 Review: Numbers!".to_string(), b"%PDF-1.7".to_vec());

        let mut delivery = MockDocumentDelivery::new();
        delivery
            .expect_deliver()
            .withf(|to, title, name, pdf| {
                to == "boss@example.com" && title == "Q3 Review: Numbers!" && name == "Q3_Review_Numbers.pdf" && pdf == b"%PDF-1.7"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        conversion.send_to(&delivery, "boss@example.com").await.unwrap();
    }
}
