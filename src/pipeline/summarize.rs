//! Generative passes: section text → study summary → publication prose.
//!
//! This module is intentionally thin — all prompt engineering lives in
//! [`crate::prompts`] so it can change without touching call or
//! error-handling logic here. There is no retry loop: generation failures
//! surface as per-section diagnostics and skip that section only, unlike
//! the digitization stage where a chunk loss would leave a hole in the
//! book.

use crate::config::PipelineConfig;
use crate::error::{GenerationStage, ScanpressError, SectionError};
use crate::output::{Section, SectionOutput};
use crate::prompts::{
    refine_user_prompt, summary_user_prompt, REFINE_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT,
};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured the provider; used as-is. Useful in tests or when the
///    caller needs custom middleware.
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    corresponding API key from the environment.
/// 3. **Full auto-detection** — the factory scans known API key variables
///    and picks the first available provider.
pub fn resolve_provider(config: &PipelineConfig) -> Result<Arc<dyn LLMProvider>, ScanpressError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            ScanpressError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        });
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ScanpressError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                 Error: {e}"
            ),
        })?;
    Ok(provider)
}

/// Run both generative passes over one section.
///
/// The refinement pass consumes the summary, so a summary failure skips
/// the section entirely; a refinement failure still keeps the summary.
pub async fn generate_section(
    provider: &Arc<dyn LLMProvider>,
    section: &Section,
    config: &PipelineConfig,
) -> SectionOutput {
    let subject = config.subject.as_deref();
    let chapter = config.chapter.as_deref();
    let options = build_options(config);

    let summary = match chat(
        provider,
        SUMMARY_SYSTEM_PROMPT,
        summary_user_prompt(subject, chapter, &section.title, &section.body),
        &options,
    )
    .await
    {
        Ok(text) => text,
        Err(detail) => {
            warn!("Section {:?}: summary failed — {}", section.title, detail);
            return SectionOutput {
                title: section.title.clone(),
                summary: None,
                refined: None,
                error: Some(SectionError::GenerationFailed {
                    title: section.title.clone(),
                    stage: GenerationStage::Summary,
                    detail,
                }),
            };
        }
    };
    debug!(
        "Section {:?}: summary of {} chars",
        section.title,
        summary.len()
    );

    match chat(
        provider,
        REFINE_SYSTEM_PROMPT,
        refine_user_prompt(subject, chapter, &section.title, &summary),
        &options,
    )
    .await
    {
        Ok(refined) => SectionOutput {
            title: section.title.clone(),
            summary: Some(summary),
            refined: Some(refined),
            error: None,
        },
        Err(detail) => {
            warn!("Section {:?}: refinement failed — {}", section.title, detail);
            SectionOutput {
                title: section.title.clone(),
                summary: Some(summary),
                refined: None,
                error: Some(SectionError::GenerationFailed {
                    title: section.title.clone(),
                    stage: GenerationStage::Refine,
                    detail,
                }),
            }
        }
    }
}

async fn chat(
    provider: &Arc<dyn LLMProvider>,
    system_prompt: &str,
    user_prompt: String,
    options: &CompletionOptions,
) -> Result<String, String> {
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt),
    ];
    provider
        .chat(&messages, Some(options))
        .await
        .map(|response| response.content)
        .map_err(|e| format!("{e}"))
}

fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_carries_config_values() {
        let config = PipelineConfig::builder()
            .temperature(0.5)
            .max_tokens(1024)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.5));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn defaults_flow_into_options() {
        let opts = build_options(&PipelineConfig::default());
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(4096));
    }
}
