//! Configuration types for a digitization run.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs, serialise them for logging, and diff two runs
//! to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::catalog::SectionCatalog;
use crate::error::ScanpressError;
use crate::progress::RunProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default endpoint of the document-digitization API.
pub const DEFAULT_OCR_URL: &str = "https://api.upstage.ai/v1/document-digitization";

/// Default OCR model identifier sent with every upload.
pub const DEFAULT_OCR_MODEL: &str = "document-parse";

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use scanpress::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .work_dir("./work")
///     .parts(8)
///     .subject("Computer Applications")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Root directory for all run artifacts. Default: `./scanpress-work`.
    ///
    /// Three subdirectories are created under it: `splits/` (chunk PDFs),
    /// `fragments/` (raw per-chunk digitization JSON) and `results/`
    /// (merged envelope, per-section JSON, plain-text exports). The
    /// directories double as the inter-stage queue: a crashed run can be
    /// resumed by re-running — fragment writes are idempotent.
    pub work_dir: PathBuf,

    /// Number of chunks to split the document into. Default: `None`.
    ///
    /// `None` means "use [`crate::plan::recommend_parts`]". An explicit
    /// value is clamped to the document's page count before splitting, the
    /// same clamp the recommender applies.
    pub parts: Option<usize>,

    /// Digitization API endpoint. Default: [`DEFAULT_OCR_URL`].
    pub ocr_base_url: String,

    /// OCR model identifier sent with every upload. Default: [`DEFAULT_OCR_MODEL`].
    pub ocr_model: String,

    /// Digitization API bearer token. Default: `None` (read from the
    /// `UPSTAGE_API_KEY` environment variable when the client is built).
    pub ocr_api_key: Option<String>,

    /// Upload attempts per chunk before recording a permanent failure.
    /// Default: 5.
    ///
    /// Document digitization backends shed load with 5xx responses under
    /// burst traffic; a handful of spaced attempts rides that out. After
    /// the final attempt the chunk is marked failed and the run continues —
    /// one unreadable chunk should not cost the other nineteen.
    pub max_attempts: u32,

    /// Fixed delay between upload attempts, in milliseconds. Default: 2000.
    ///
    /// A fixed (not exponential) delay: uploads are sequential, so there is
    /// no thundering herd to dampen, and the provider's transient errors
    /// clear on the order of seconds.
    pub retry_delay_ms: u64,

    /// Optional per-upload timeout in seconds. Default: `None`.
    ///
    /// `None` leaves the HTTP client's default in place. Set it for
    /// unattended runs where a dead connection must not hang the pipeline.
    pub upload_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Ordered section-title markers. Default: `None`.
    ///
    /// `None` stops the pipeline after the merge stage; segmentation and
    /// summarisation need a catalog to know where sections begin.
    pub catalog: Option<SectionCatalog>,

    /// Generate summaries and refined prose for extracted sections.
    /// Default: true. Ignored when no catalog is set.
    pub summarize: bool,

    /// Subject label injected verbatim into the generation prompts,
    /// e.g. "컴퓨터활용능력 1급" or "Linear Algebra". Default: `None`.
    pub subject: Option<String>,

    /// Chapter label injected verbatim into the generation prompts.
    /// Default: `None`.
    pub chapter: Option<String>,

    /// LLM model identifier, e.g. "gpt-4.1-nano". If `None`, uses the
    /// provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If `None` along with `provider`, auto-detects from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for generation. Default: 0.3.
    ///
    /// Low enough to stay faithful to the section text, high enough that
    /// the refinement pass can rephrase rather than parrot.
    pub temperature: f32,

    /// Maximum tokens per generative call. Default: 4096.
    pub max_tokens: usize,

    /// Progress callback for chunk/section events. Default: `None`.
    pub progress_callback: Option<Arc<dyn RunProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./scanpress-work"),
            parts: None,
            ocr_base_url: DEFAULT_OCR_URL.to_string(),
            ocr_model: DEFAULT_OCR_MODEL.to_string(),
            ocr_api_key: None,
            max_attempts: 5,
            retry_delay_ms: 2000,
            upload_timeout_secs: None,
            download_timeout_secs: 120,
            catalog: None,
            summarize: true,
            subject: None,
            chapter: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 4096,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("work_dir", &self.work_dir)
            .field("parts", &self.parts)
            .field("ocr_base_url", &self.ocr_base_url)
            .field("ocr_model", &self.ocr_model)
            .field("ocr_api_key", &self.ocr_api_key.as_ref().map(|_| "<redacted>"))
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("catalog_markers", &self.catalog.as_ref().map(SectionCatalog::len))
            .field("summarize", &self.summarize)
            .field("subject", &self.subject)
            .field("chapter", &self.chapter)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory holding per-chunk PDF files (`split_N.pdf`).
    pub fn splits_dir(&self) -> PathBuf {
        self.work_dir.join("splits")
    }

    /// Directory holding raw per-chunk digitization JSON (`split_N.json`).
    pub fn fragments_dir(&self) -> PathBuf {
        self.work_dir.join("fragments")
    }

    /// Directory holding merged and generated artifacts.
    pub fn results_dir(&self) -> PathBuf {
        self.work_dir.join("results")
    }

    /// Directory holding per-section JSON artifacts.
    pub fn sections_dir(&self) -> PathBuf {
        self.results_dir().join("sections")
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn parts(mut self, n: usize) -> Self {
        self.config.parts = Some(n.max(1));
        self
    }

    pub fn ocr_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_base_url = url.into();
        self
    }

    pub fn ocr_model(mut self, model: impl Into<String>) -> Self {
        self.config.ocr_model = model.into();
        self
    }

    pub fn ocr_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ocr_api_key = Some(key.into());
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn catalog(mut self, catalog: SectionCatalog) -> Self {
        self.config.catalog = Some(catalog);
        self
    }

    pub fn summarize(mut self, v: bool) -> Self {
        self.config.summarize = v;
        self
    }

    pub fn subject(mut self, s: impl Into<String>) -> Self {
        self.config.subject = Some(s.into());
        self
    }

    pub fn chapter(mut self, s: impl Into<String>) -> Self {
        self.config.chapter = Some(s.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn RunProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ScanpressError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(ScanpressError::InvalidConfig(
                "max_attempts must be >= 1".into(),
            ));
        }
        if let Some(0) = c.parts {
            return Err(ScanpressError::InvalidConfig("parts must be >= 1".into()));
        }
        if c.ocr_base_url.is_empty() {
            return Err(ScanpressError::InvalidConfig(
                "ocr_base_url must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PipelineConfig::default();
        assert_eq!(c.max_attempts, 5);
        assert_eq!(c.retry_delay_ms, 2000);
        assert_eq!(c.ocr_base_url, DEFAULT_OCR_URL);
        assert_eq!(c.ocr_model, "document-parse");
        assert!(c.parts.is_none());
        assert!(c.upload_timeout_secs.is_none());
        assert!(c.summarize);
    }

    #[test]
    fn builder_clamps_degenerate_values() {
        let c = PipelineConfig::builder()
            .parts(0)
            .max_attempts(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.parts, Some(1));
        assert_eq!(c.max_attempts, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn build_rejects_empty_endpoint() {
        let err = PipelineConfig::builder().ocr_base_url("").build().unwrap_err();
        assert!(err.to_string().contains("ocr_base_url"));
    }

    #[test]
    fn work_dir_layout() {
        let c = PipelineConfig::builder().work_dir("/tmp/w").build().unwrap();
        assert_eq!(c.splits_dir(), PathBuf::from("/tmp/w/splits"));
        assert_eq!(c.fragments_dir(), PathBuf::from("/tmp/w/fragments"));
        assert_eq!(c.sections_dir(), PathBuf::from("/tmp/w/results/sections"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = PipelineConfig::builder().ocr_api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("redacted"));
    }
}
