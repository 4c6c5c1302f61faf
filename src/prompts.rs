//! Prompts for the two generative passes over each section.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how summaries or refinements
//!    behave requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the assembled prompts
//!    directly without calling a real model, so prompt regressions are easy
//!    to catch.
//!
//! Subject and chapter labels from the configuration are injected verbatim
//! — they are free text chosen by the user and flow straight into the
//! prompt, exactly as typed.

/// System prompt for the first pass: section text → study summary.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an expert exam-preparation writer. You will receive one section of a digitized study guide as raw HTML-flavoured text.

Follow these rules precisely:

1. COVERAGE
   - Summarise every concept, definition, and rule that appears in the section
   - Keep all concrete facts: shortcut keys, menu paths, formulas, numeric limits
   - Never invent material that is not in the section

2. STRUCTURE
   - Organise the summary by the section's own sub-topics, in source order
   - Use short headed blocks and bullet lists, not continuous prose

3. INPUT HANDLING
   - The text comes from OCR: ignore broken markup, page numbers, and
     repeated headers/footers
   - Tables may arrive as HTML; summarise their content, do not reproduce markup

4. OUTPUT
   - Output only the summary, in the language of the source text
   - No commentary, no preamble"#;

/// System prompt for the second pass: study summary → publication prose.
pub const REFINE_SYSTEM_PROMPT: &str = r#"You are an editor preparing a commercial textbook. You will receive a study summary of one section.

Follow these rules precisely:

1. REWRITE the summary into flowing, publication-quality prose a student
   would read in a printed textbook
2. PRESERVE every fact, term, and numeric detail of the summary — rephrase,
   never drop or add content
3. Use complete paragraphs; keep lists only where an enumeration is
   genuinely clearer
4. Keep the language of the input
5. Output only the rewritten prose, no commentary"#;

/// Build the user prompt for the summary pass.
pub fn summary_user_prompt(
    subject: Option<&str>,
    chapter: Option<&str>,
    title: &str,
    body: &str,
) -> String {
    let mut prompt = String::new();
    if let Some(subject) = subject {
        prompt.push_str(&format!("Subject: {subject}\n"));
    }
    if let Some(chapter) = chapter {
        prompt.push_str(&format!("Chapter: {chapter}\n"));
    }
    prompt.push_str(&format!("Section: {title}\n\n{body}"));
    prompt
}

/// Build the user prompt for the refinement pass.
pub fn refine_user_prompt(
    subject: Option<&str>,
    chapter: Option<&str>,
    title: &str,
    summary: &str,
) -> String {
    let mut prompt = String::new();
    if let Some(subject) = subject {
        prompt.push_str(&format!("Subject: {subject}\n"));
    }
    if let Some(chapter) = chapter {
        prompt.push_str(&format!("Chapter: {chapter}\n"));
    }
    prompt.push_str(&format!("Section: {title}\n\nStudy summary to rewrite:\n\n{summary}"));
    prompt
}
