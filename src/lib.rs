//! Transcript PDF - turn spoken-word media into readable PDF transcripts
//!
//! The library acquires a transcript for a YouTube video (captions first, the
//! video description as a last resort) or for an uploaded audio/video file,
//! optionally translates it to English, and lays it out as a paginated PDF
//! with a cover page.

pub mod acquisition;
pub mod captions;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod layout;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod transcribe;
pub mod translate;
pub mod utils;

pub use acquisition::{RetrievalOutcome, Transcript, TranscriptAcquisition};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use pipeline::{Conversion, ConversionPipeline};
pub use render::{DocumentMetadata, DocumentRenderer};
pub use translate::TranslationChunker;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failures that reach the caller of the conversion pipeline
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported upload type: {0} (only MP4 and MP3 files are supported)")]
    UnsupportedUpload(String),

    #[error("Video not found or is private: {0}")]
    VideoUnavailable(String),

    #[error("Could not detect speech in {0}")]
    NoSpeech(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}
