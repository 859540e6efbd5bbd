use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_pdf::cli::{Cli, Commands, DeliveryArgs};
use transcript_pdf::config::Config;
use transcript_pdf::delivery::SmtpMailer;
use transcript_pdf::pipeline::{Conversion, ConversionPipeline};
use transcript_pdf::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "transcript_pdf=debug"
    } else {
        "transcript_pdf=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Youtube { url, delivery } => {
            let config = Config::load().await?;
            let pipeline = build_pipeline(&config, &delivery, cli.quiet)?;

            tracing::info!("Starting conversion for URL: {}", url);
            let conversion = pipeline.convert_youtube(&url).await?;
            finish(&config, conversion, delivery).await?;
        }
        Commands::File { path, delivery } => {
            let config = Config::load().await?;
            let pipeline = build_pipeline(&config, &delivery, cli.quiet)?;

            tracing::info!("Starting conversion for file: {}", path.display());
            let conversion = pipeline.convert_upload(&path).await?;
            finish(&config, conversion, delivery).await?;
        }
        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save().await?;
                println!("Default configuration written to: {}", path.display());
            } else if show {
                Config::load().await?.display();
            } else {
                println!("Edit the configuration file to change settings:");
                println!("  {}", Config::config_path()?.display());
                println!("Run `transcript-pdf config --init` to create it with defaults.");
            }
        }
        Commands::Check => {
            let config = Config::load().await?;
            let missing = utils::check_dependencies(&config).await;
            if missing.is_empty() {
                println!("{} All external tools are available", style("✓").green());
            } else {
                eprintln!("{} Missing dependencies:", style("⚠️").yellow());
                for dep in &missing {
                    eprintln!("   • {}", dep);
                }
                anyhow::bail!("{} dependency check(s) failed", missing.len());
            }
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config, delivery: &DeliveryArgs, quiet: bool) -> Result<ConversionPipeline> {
    if delivery.email.is_some() && !config.mail_configured() {
        anyhow::bail!("--email needs mail.smtp_host and mail.from (or SMTP_HOST and MAIL_FROM)");
    }

    let mut pipeline = ConversionPipeline::from_config(config)?.with_progress(!quiet);
    if delivery.no_translate {
        pipeline = pipeline.without_translation();
    }
    tracing::debug!("Transcript strategies: {}", pipeline.strategy_names().join(", "));

    Ok(pipeline)
}

/// Save the document, then mail it if requested.
async fn finish(config: &Config, conversion: Conversion, delivery: DeliveryArgs) -> Result<()> {
    let path = delivery
        .output
        .unwrap_or_else(|| PathBuf::from(&conversion.file_name));

    fs_err::write(&path, &conversion.document).context("Failed to write PDF")?;
    println!(
        "{} \"{}\" saved to: {} ({})",
        style("✓").green(),
        conversion.title,
        path.display(),
        utils::format_file_size(conversion.document.len() as u64)
    );

    if let Some(recipient) = delivery.email {
        let mailer = SmtpMailer::new(&config.mail)?;
        conversion.send_to(&mailer, &recipient).await?;
        println!("{} Sent to {}", style("✓").green(), recipient);
    }

    Ok(())
}
