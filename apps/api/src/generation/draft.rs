//! Provider-backed field generation: draft → clean → enforce, regenerating once.
//!
//! Each provider call goes through `with_retry`, so a draft that comes back at
//! all has already survived transient upstream failures. A draft that the
//! synthesizer rejects earns one more provider request with a stricter prompt;
//! a second rejection is surfaced to the caller.

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::generation::models::{FieldName, FieldRequest};
use crate::generation::prompts;
use crate::llm_client::{with_retry, RetryPolicy, TextCompletionProvider};
use crate::synthesis::{enforce, FieldConstraint, SynthesisError};

/// Leading/trailing punctuation a subtitle should not carry.
const EDGE_PUNCTUATION: &[char] = &['。', '、', '，', '．', ',', '.', '・', '-', '!', '！'];

async fn request_draft(
    provider: &dyn TextCompletionProvider,
    retry: &RetryPolicy,
    field: FieldName,
    prompt: &str,
    max_output_hint: usize,
) -> Result<String, AppError> {
    let draft = with_retry(retry, field.as_str(), || provider.complete(prompt, max_output_hint)).await?;
    debug!(field = %field, chars = draft.chars().count(), "Provider draft received");
    Ok(draft)
}

async fn draft_enforced<C, S>(
    provider: &dyn TextCompletionProvider,
    retry: &RetryPolicy,
    field: FieldName,
    constraint: &FieldConstraint,
    prompt: &str,
    clean: C,
    strict_prompt: S,
) -> Result<String, AppError>
where
    C: Fn(&str) -> String,
    S: FnOnce(&SynthesisError) -> String,
{
    let draft = request_draft(provider, retry, field, prompt, constraint.max_length).await?;
    let rejection = match enforce(&clean(&draft), constraint) {
        Ok(text) => return Ok(text),
        Err(e) => e,
    };

    warn!(field = %field, error = %rejection, "Draft rejected, regenerating with stricter prompt");
    let retry_prompt = strict_prompt(&rejection);
    let draft = request_draft(provider, retry, field, &retry_prompt, constraint.max_length).await?;
    Ok(enforce(&clean(&draft), constraint)?)
}

/// Whitespace collapsed, edge punctuation and wrapping quotes stripped.
pub fn clean_subtitle(draft: &str) -> String {
    let first_line = draft.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| EDGE_PUNCTUATION.contains(&c) || matches!(c, '"' | '「' | '」'))
        .trim()
        .to_string()
}

pub async fn generate_subtitle(
    provider: &dyn TextCompletionProvider,
    retry: &RetryPolicy,
    request: &FieldRequest,
) -> Result<String, AppError> {
    let constraint = FieldConstraint::subtitle(request.language, &request.primary_keyword);
    draft_enforced(
        provider,
        retry,
        FieldName::Subtitle,
        &constraint,
        &prompts::subtitle_prompt(request),
        clean_subtitle,
        |rejection| prompts::strict_subtitle_prompt(request, rejection),
    )
    .await
}

pub async fn generate_description(
    provider: &dyn TextCompletionProvider,
    retry: &RetryPolicy,
    request: &FieldRequest,
) -> Result<String, AppError> {
    let constraint = FieldConstraint::description(request.language, &request.primary_keyword);
    let prompt = prompts::description_prompt(request);
    draft_enforced(
        provider,
        retry,
        FieldName::Description,
        &constraint,
        &prompt,
        |draft| draft.trim().to_string(),
        |rejection| prompts::strict_long_form_prompt(&prompt, &request.primary_keyword, rejection),
    )
    .await
}

pub async fn generate_whats_new(
    provider: &dyn TextCompletionProvider,
    retry: &RetryPolicy,
    request: &FieldRequest,
) -> Result<String, AppError> {
    let constraint = FieldConstraint::whats_new(request.language, &request.primary_keyword);
    let prompt = prompts::whats_new_prompt(request);
    draft_enforced(
        provider,
        retry,
        FieldName::WhatsNew,
        &constraint,
        &prompt,
        |draft| draft.trim().to_string(),
        |rejection| prompts::strict_long_form_prompt(&prompt, &request.primary_keyword, rejection),
    )
    .await
}
