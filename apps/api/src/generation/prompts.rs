// Prompt builders for the provider-backed fields (subtitle, description, what's new).
// Cross-cutting fragments come from llm_client::prompts.

use crate::generation::models::FieldRequest;
use crate::llm_client::prompts::length_instruction;
use crate::synthesis::constraint::{
    LONG_FORM_MAX, LONG_FORM_MAX_OCCURRENCES, LONG_FORM_MIN_OCCURRENCES, SUBTITLE_MAX,
};
use crate::synthesis::{Language, SynthesisError};

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Ja => "Japanese",
        Language::En => "English",
    }
}

fn feature_lines(request: &FieldRequest) -> String {
    if request.features.is_empty() {
        return "(no features listed)".to_string();
    }
    request.language.rules().bullet_list(&request.features)
}

fn related_keywords(request: &FieldRequest) -> String {
    if request.related_keywords.is_empty() {
        "(none)".to_string()
    } else {
        request.related_keywords.join(", ")
    }
}

pub fn subtitle_prompt(request: &FieldRequest) -> String {
    format!(
        r#"Write an App Store subtitle in {language}.

App name: {app_name}
App features:
{features}

Requirements:
- One short phrase that conveys the app's value
- Do NOT use the word "{keyword}" or any form of it; the title already carries it
- No trailing punctuation, no quotes
- {limit}"#,
        language = language_name(request.language),
        app_name = request.app_name,
        features = feature_lines(request),
        keyword = request.primary_keyword,
        limit = length_instruction(SUBTITLE_MAX),
    )
}

/// Second attempt after a rejected draft: same brief plus the rejection reason.
pub fn strict_subtitle_prompt(request: &FieldRequest, rejection: &SynthesisError) -> String {
    format!(
        "{base}\n\nYour previous answer was rejected: {rejection}.\n\
        STRICT: keep it well under {SUBTITLE_MAX} characters and never mention \"{keyword}\".",
        base = subtitle_prompt(request),
        keyword = request.primary_keyword,
    )
}

pub fn description_prompt(request: &FieldRequest) -> String {
    format!(
        r#"Write an App Store description in {language}.

App name: {app_name}
Main keyword: {keyword}
Related keywords: {related}
App features:
{features}

Requirements:
- Use the main keyword "{keyword}" naturally between {min} and {max} times
- Open with the value the app delivers, then explain the main features and the problems they solve
- Short paragraphs; plain bullet lines are fine
- Every sentence ends with proper punctuation
- {limit}"#,
        language = language_name(request.language),
        app_name = request.app_name,
        keyword = request.primary_keyword,
        related = related_keywords(request),
        features = feature_lines(request),
        min = LONG_FORM_MIN_OCCURRENCES,
        max = LONG_FORM_MAX_OCCURRENCES,
        limit = length_instruction(LONG_FORM_MAX),
    )
}

pub fn whats_new_prompt(request: &FieldRequest) -> String {
    format!(
        r#"Write the "What's New" release notes for the latest version of an app, in {language}.

App name: {app_name}
Main keyword: {keyword}
Updated or new features:
{features}

Requirements:
- Announce the update in one or two opening sentences, then list the improvements
- Use the main keyword "{keyword}" naturally between {min} and {max} times
- Every sentence ends with proper punctuation
- {limit}"#,
        language = language_name(request.language),
        app_name = request.app_name,
        keyword = request.primary_keyword,
        features = feature_lines(request),
        min = LONG_FORM_MIN_OCCURRENCES,
        max = LONG_FORM_MAX_OCCURRENCES,
        limit = length_instruction(LONG_FORM_MAX),
    )
}

/// Second attempt for description / what's new.
pub fn strict_long_form_prompt(base: &str, keyword: &str, rejection: &SynthesisError) -> String {
    format!(
        "{base}\n\nYour previous answer was rejected: {rejection}.\n\
        STRICT: count the occurrences of \"{keyword}\" before answering; it must appear \
        at least {LONG_FORM_MIN_OCCURRENCES} and at most {LONG_FORM_MAX_OCCURRENCES} times."
    )
}
