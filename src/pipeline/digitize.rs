//! Remote digitization client: upload one chunk, bounded retry, persist raw.
//!
//! ## Retry Strategy
//!
//! The provider sheds load with 5xx responses and the occasional reset
//! connection; both clear within seconds. Every failed attempt (non-200
//! status or transport error) is followed by a fixed delay, and the chunk
//! is retried up to `max_attempts` times in total. After the final attempt
//! the chunk is recorded as a permanent [`ChunkError::UploadFailed`] and
//! the pipeline moves on — partial output beats no output.
//!
//! Successful results are persisted immediately, before the next chunk is
//! touched, so an interrupted run keeps everything it already paid for.
//! Rewriting a fragment file is safe: content for a given chunk index is
//! deterministic per run.

use crate::config::PipelineConfig;
use crate::error::{ChunkError, ScanpressError};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Client for the document-digitization API.
///
/// Cheap to construct; holds a connection-pooling [`reqwest::Client`].
#[derive(Debug)]
pub struct DigitizeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl DigitizeClient {
    /// Build a client from the pipeline configuration.
    ///
    /// The API key comes from the config or, failing that, the
    /// `UPSTAGE_API_KEY` environment variable.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ScanpressError> {
        let api_key = match &config.ocr_api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => std::env::var("UPSTAGE_API_KEY").ok().filter(|k| !k.is_empty()).ok_or_else(
                || ScanpressError::OcrNotConfigured {
                    hint: "Set UPSTAGE_API_KEY or pass the key via configuration.".to_string(),
                },
            )?,
        };

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.upload_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ScanpressError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.ocr_base_url.clone(),
            api_key,
            model: config.ocr_model.clone(),
            max_attempts: config.max_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Upload one chunk and return the provider's raw JSON result together
    /// with the number of attempts that were needed.
    ///
    /// Retries on any failure up to the attempt bound, sleeping the fixed
    /// delay between attempts. The returned error carries the attempt
    /// count and the last failure's detail.
    pub async fn digitize(
        &self,
        index: usize,
        pdf_bytes: &[u8],
        file_name: &str,
    ) -> Result<(serde_json::Value, u32), ChunkError> {
        let mut last_err = String::new();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                warn!(
                    "Chunk {}: retry {}/{} after {}ms",
                    index,
                    attempt,
                    self.max_attempts,
                    self.retry_delay.as_millis()
                );
                sleep(self.retry_delay).await;
            }

            match self.try_upload(pdf_bytes, file_name).await {
                Ok(value) => {
                    debug!("Chunk {}: digitized on attempt {}", index, attempt);
                    return Ok((value, attempt));
                }
                Err(detail) => {
                    warn!("Chunk {}: attempt {} failed — {}", index, attempt, detail);
                    last_err = detail;
                }
            }
        }

        Err(ChunkError::UploadFailed {
            index,
            attempts: self.max_attempts,
            detail: last_err,
        })
    }

    /// One upload attempt. Any non-200 status or transport error is a
    /// retryable failure, reported as a human-readable detail string.
    async fn try_upload(&self, pdf_bytes: &[u8], file_name: &str) -> Result<serde_json::Value, String> {
        // multipart::Form is consumed by send(), so it is rebuilt per attempt.
        let document = Part::bytes(pdf_bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| format!("multipart: {e}"))?;
        let form = Form::new()
            .part("document", document)
            .text("ocr", "force")
            .text("base64_encoding", "['table']")
            .text("model", self.model.clone());

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("transport: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {}", truncate(&body, 200)));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| format!("invalid JSON body: {e}"))
    }
}

/// Persist a raw digitization result for a chunk, pretty-printed UTF-8.
///
/// The file is `split_{index+1}.json` — the 1-based twin of the chunk PDF
/// name — and rewriting it is idempotent.
pub async fn persist_fragment(
    fragments_dir: &Path,
    index: usize,
    result: &serde_json::Value,
) -> Result<std::path::PathBuf, ScanpressError> {
    let path = fragments_dir.join(format!("split_{}.json", index + 1));
    let body = serde_json::to_vec_pretty(result)
        .map_err(|e| ScanpressError::Internal(format!("serialize fragment: {e}")))?;
    tokio::fs::write(&path, body)
        .await
        .map_err(|source| ScanpressError::OutputWriteFailed {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
