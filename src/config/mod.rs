use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video metadata and caption retrieval
    pub youtube: YoutubeConfig,

    /// Speech-to-text for uploaded files
    pub transcription: TranscriptionConfig,

    /// Machine translation of non-English transcripts
    pub translation: TranslationConfig,

    /// Cover and header branding
    pub render: RenderConfig,

    /// Optional e-mail delivery
    pub mail: MailConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// YouTube Data API key; metadata comes from yt-dlp when unset
    pub api_key: Option<String>,

    pub yt_dlp_path: String,

    /// Caption language tried before falling back to any language
    pub preferred_language: String,

    pub subtitle_timeout_secs: u64,

    pub metadata_timeout_secs: u64,

    /// Optional transcript-service script run as `<python> <script> <video id>`
    pub transcript_script: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Interpreter for the transcription scripts
    pub python_path: String,

    /// Script run as `<python> <script> <media file>`
    pub script_path: PathBuf,

    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,

    /// MyMemory-compatible GET endpoint
    pub endpoint: String,

    pub target_language: String,

    /// Maximum characters per translation request
    pub chunk_size: usize,

    /// Per-chunk request timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub product_label: String,

    pub tagline: String,

    pub thumbnail_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: Option<String>,

    pub smtp_port: u16,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Sender address
    pub from: Option<String>,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            yt_dlp_path: "yt-dlp".to_string(),
            preferred_language: "en".to_string(),
            subtitle_timeout_secs: 90,
            metadata_timeout_secs: 15,
            transcript_script: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            python_path: "python3".to_string(),
            script_path: PathBuf::from("scripts").join(TRANSCRIBE_SCRIPT),
            timeout_secs: 600,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.mymemory.translated.net/get".to_string(),
            target_language: "en".to_string(),
            chunk_size: 400,
            timeout_secs: 10,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            product_label: "VideoToPdf".to_string(),
            tagline: "Your Video, Now a Document".to_string(),
            thumbnail_timeout_secs: 15,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            username: None,
            password: None,
            from: None,
        }
    }
}

/// Script names looked up inside `SCRIPTS_PATH`
const TRANSCRIBE_SCRIPT: &str = "transcribe.py";
const TRANSCRIPT_SERVICE_SCRIPT: &str = "get_transcript.py";

impl Config {
    /// Load configuration from file (defaults when none exists), then apply
    /// environment overrides.
    pub async fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-pdf").join("config.yaml"))
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(key);
        }
        if let Some(path) = get("YTDLP_PATH") {
            self.youtube.yt_dlp_path = path;
        }
        if let Some(python) = get("PYTHON_PATH") {
            self.transcription.python_path = python;
        }
        if let Some(dir) = get("SCRIPTS_PATH") {
            let dir = PathBuf::from(dir);
            self.transcription.script_path = dir.join(TRANSCRIBE_SCRIPT);
            self.youtube.transcript_script = Some(dir.join(TRANSCRIPT_SERVICE_SCRIPT));
        }
        if let Some(host) = get("SMTP_HOST") {
            self.mail.smtp_host = Some(host);
        }
        if let Some(user) = get("SMTP_USERNAME") {
            self.mail.username = Some(user);
        }
        if let Some(password) = get("SMTP_PASSWORD") {
            self.mail.password = Some(password);
        }
        if let Some(from) = get("MAIL_FROM") {
            self.mail.from = Some(from);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.translation.chunk_size == 0 {
            anyhow::bail!("translation.chunk_size must be greater than zero");
        }

        let timeouts = [
            ("youtube.subtitle_timeout_secs", self.youtube.subtitle_timeout_secs),
            ("youtube.metadata_timeout_secs", self.youtube.metadata_timeout_secs),
            ("transcription.timeout_secs", self.transcription.timeout_secs),
            ("translation.timeout_secs", self.translation.timeout_secs),
            ("render.thumbnail_timeout_secs", self.render.thumbnail_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            anyhow::bail!("{} must be greater than zero", name);
        }

        if self.translation.target_language.trim().is_empty() {
            anyhow::bail!("translation.target_language must be set");
        }

        Ok(())
    }

    /// Whether enough mail settings exist to send documents
    pub fn mail_configured(&self) -> bool {
        self.mail.smtp_host.is_some() && self.mail.from.is_some()
    }

    /// Display current configuration
    pub fn display(&self) {
        let secret = |value: &Option<String>| if value.is_some() { "(set)" } else { "(not set)" };

        println!("Current Configuration:");
        println!("  YouTube API Key: {}", secret(&self.youtube.api_key));
        println!("  yt-dlp: {}", self.youtube.yt_dlp_path);
        println!("  Preferred Captions: {}", self.youtube.preferred_language);
        if let Some(script) = &self.youtube.transcript_script {
            println!("  Transcript Service: {}", script.display());
        }
        println!(
            "  Transcription: {} {}",
            self.transcription.python_path,
            self.transcription.script_path.display()
        );
        println!(
            "  Translation: {} (target {}, {} chars per request)",
            if self.translation.enabled { "enabled" } else { "disabled" },
            self.translation.target_language,
            self.translation.chunk_size
        );
        println!("  Product Label: {}", self.render.product_label);
        match &self.mail.smtp_host {
            Some(host) => println!("  SMTP: {}:{} (password {})", host, self.mail.smtp_port, secret(&self.mail.password)),
            None => println!("  SMTP: (not configured)"),
        }
    }
}
