use crate::config::Config;

/// Longest download name stem, before `.pdf`
const MAX_FILE_STEM_CHARS: usize = 50;

/// Download file name for a document titled `title`.
///
/// Keeps ASCII letters, digits, `-`, `_` and spaces, turns whitespace runs
/// into `_` and caps the stem at 50 characters.
pub fn pdf_file_name(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect();

    let stem: String = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_FILE_STEM_CHARS)
        .collect();

    if stem.is_empty() {
        "transcript.pdf".to_string()
    } else {
        format!("{}.pdf", stem)
    }
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Problems with the external tools and scripts `config` points at.
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&config.youtube.yt_dlp_path).await {
        missing.push(format!(
            "{} - required for YouTube captions",
            config.youtube.yt_dlp_path
        ));
    }

    if !check_command_available(&config.transcription.python_path).await {
        missing.push(format!(
            "{} - required for uploaded file transcription",
            config.transcription.python_path
        ));
    }

    if !config.transcription.script_path.is_file() {
        missing.push(format!(
            "{} - transcription script not found",
            config.transcription.script_path.display()
        ));
    }

    if let Some(script) = config.youtube.transcript_script.as_deref().filter(|s| !s.is_file()) {
        missing.push(format!("{} - transcript service script not found", script.display()));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
