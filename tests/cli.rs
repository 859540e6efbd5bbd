use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary, isolated from the user's config directory and environment.
fn transcript_pdf(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("transcript-pdf").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("YOUTUBE_API_KEY")
        .env_remove("SCRIPTS_PATH")
        .env_remove("SMTP_HOST")
        .env_remove("MAIL_FROM");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    transcript_pdf(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("youtube"))
        .stdout(predicate::str::contains("file"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_bad_youtube_link_is_rejected() {
    let home = TempDir::new().unwrap();
    transcript_pdf(&home)
        .args(["youtube", "https://example.com/not-a-video", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn test_unsupported_upload_is_rejected() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("notes.txt"), "just text").unwrap();

    transcript_pdf(&home)
        .args(["file", "notes.txt", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported upload type"));

    assert!(!home.path().join("notes.pdf").exists());
}

#[test]
fn test_email_requires_mail_settings() {
    let home = TempDir::new().unwrap();
    transcript_pdf(&home)
        .args(["youtube", "dQw4w9WgXcQ", "--email", "me@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--email needs"));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();

    transcript_pdf(&home)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default configuration written to"));

    assert!(home
        .path()
        .join(".config")
        .join("transcript-pdf")
        .join("config.yaml")
        .exists());

    transcript_pdf(&home)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VideoToPdf"))
        .stdout(predicate::str::contains("chars per request"));
}

#[test]
fn test_invalid_local_config_is_reported() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.yaml"), "translation:\n  chunk_size: 0\n").unwrap();

    transcript_pdf(&home)
        .args(["config", "--show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size"));
}
