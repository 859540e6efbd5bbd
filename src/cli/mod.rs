use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript-pdf",
    about = "Transcript PDF - turn YouTube videos and audio/video files into readable PDF transcripts",
    version,
    long_about = "Fetches captions for a YouTube video (or transcribes an uploaded MP3/MP4 file), optionally translates them to English, and renders a paginated PDF with a cover page. The document can be saved locally or e-mailed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a YouTube video into a PDF transcript
    Youtube {
        /// YouTube link (watch, youtu.be, shorts, embed, live) or bare video id
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        delivery: DeliveryArgs,
    },

    /// Transcribe a local MP3/MP4 file into a PDF transcript
    File {
        /// Audio or video file to transcribe
        #[arg(value_name = "PATH")]
        path: PathBuf,

        #[command(flatten)]
        delivery: DeliveryArgs,
    },

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long, conflicts_with = "init")]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,
    },

    /// Check that external tools and scripts are available
    Check,
}

/// Where the finished document goes.
#[derive(clap::Args, Debug, Clone)]
pub struct DeliveryArgs {
    /// Output file path (defaults to a name derived from the title)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also e-mail the PDF to this address
    #[arg(long, value_name = "ADDR")]
    pub email: Option<String>,

    /// Keep the transcript in its original language
    #[arg(long)]
    pub no_translate: bool,
}
