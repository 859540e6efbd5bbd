//! Translation of transcripts through a size-limited external service.
//!
//! The service accepts only short requests, so text is cut into chunks of
//! whole lines ([`TranslationChunker::chunk`]), each chunk is translated on
//! its own and the results are glued back together in order
//! ([`TranslationChunker::reassemble`]). A failed chunk keeps its original
//! text; translation never fails the conversion.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::TranslationConfig;
use crate::Result;

/// Translation collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` into `target_lang`.
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String>;
}

/// Splits text into line-aligned chunks no longer than `limit` characters.
#[derive(Debug, Clone, Copy)]
pub struct TranslationChunker {
    limit: usize,
}

impl TranslationChunker {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cut `text` into chunks of whole lines, each line followed by `\n`.
    ///
    /// A line that alone exceeds the limit becomes its own oversized chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buffer = String::new();

        for line in text.lines() {
            if !buffer.is_empty() && buffer.chars().count() + line.chars().count() > self.limit {
                chunks.push(std::mem::take(&mut buffer));
            }
            buffer.push_str(line);
            buffer.push('\n');
        }

        if !buffer.is_empty() {
            chunks.push(buffer);
        }

        chunks
    }

    /// Join translated chunks in their original order.
    pub fn reassemble<S: AsRef<str>>(translated: &[S]) -> String {
        translated.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n")
    }

    /// Translate `text` chunk by chunk.
    ///
    /// Returns `text` untouched when the source already is the target
    /// language. Whitespace-only chunks and failed chunks pass through as-is.
    pub async fn translate(
        &self,
        translator: &dyn Translator,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> String {
        if is_same_language(source_lang, target_lang) {
            return text.to_string();
        }

        let chunks = self.chunk(text);
        tracing::info!(
            "Translating {} chunk(s) from {} to {}",
            chunks.len(),
            source_lang,
            target_lang
        );

        let mut translated = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            if chunk.trim().is_empty() {
                translated.push(chunk);
                continue;
            }
            match translator.translate(&chunk, source_lang, target_lang).await {
                Ok(result) => translated.push(result),
                Err(e) => {
                    tracing::warn!("Chunk {} left untranslated: {:#}", index + 1, e);
                    translated.push(chunk);
                }
            }
        }

        Self::reassemble(&translated)
    }
}

/// Whether `source` (e.g. `en-GB`) already is `target` (e.g. `en`).
pub fn is_same_language(source: &str, target: &str) -> bool {
    let source = source.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    !target.is_empty() && source.starts_with(&target)
}

/// English display name for a language code, e.g. `ar` -> `Arabic`.
///
/// Unknown codes come back upper-cased; an empty code is `Unknown`.
pub fn language_name(code: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        return "Unknown".to_string();
    }

    let primary: String = code.chars().take(2).collect::<String>().to_lowercase();
    isolang::Language::from_639_1(&primary)
        .map(|language| language.to_name().to_string())
        .unwrap_or_else(|| code.to_uppercase())
}

/// MyMemory (`api.mymemory.translated.net`) client.
pub struct MyMemoryTranslator {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    #[serde(default)]
    response_status: Value,
    response_data: Option<MyMemoryData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: String,
}

impl MyMemoryTranslator {
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let pair = format!("{}|{}", source_lang, target_lang);
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", text), ("langpair", pair.as_str())])
            .send()
            .await
            .context("Translation request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Translation service returned HTTP {}", response.status());
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        extract_translation(body)
    }
}

fn extract_translation(body: MyMemoryResponse) -> Result<String> {
    // responseStatus is a number on success and sometimes a string on errors
    let status = match &body.response_status {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    };

    match body.response_data {
        Some(data) if status == 200 => Ok(data.translated_text),
        _ => anyhow::bail!("Translation service reported status {}", body.response_status),
    }
}
