use anyhow::Context;
use std::time::Duration;

use crate::Result;

/// Decoded cover image, ready to embed as a Flate-compressed RGB XObject.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Thumbnail {
    /// Decode JPEG/PNG/WebP bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let rgb = image::load_from_memory(bytes)
            .context("Unrecognised thumbnail image")?
            .to_rgb8();
        let (width, height) = rgb.dimensions();
        let data = miniz_oxide::deflate::compress_to_vec_zlib(rgb.as_raw(), 6);

        Ok(Self { width, height, data })
    }
}

/// Download and decode a thumbnail. Any failure yields `None`.
pub async fn fetch(url: &str, timeout: Duration) -> Option<Thumbnail> {
    match try_fetch(url, timeout).await {
        Ok(thumbnail) => Some(thumbnail),
        Err(e) => {
            tracing::debug!("Skipping thumbnail {}: {:#}", url, e);
            None
        }
    }
}

async fn try_fetch(url: &str, timeout: Duration) -> Result<Thumbnail> {
    let client = reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("HTTP {}", response.status());
    }

    let bytes = response.bytes().await?;
    Thumbnail::decode(&bytes)
}
