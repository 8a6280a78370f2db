use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::keywords::{KeywordRecord, SelectionResult};
use crate::synthesis::text::{char_len, count_ci};
use crate::synthesis::{FieldConstraint, Language};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    KeywordField,
    Title,
    Subtitle,
    Description,
    WhatsNew,
}

impl FieldName {
    pub const ALL: [FieldName; 5] = [
        FieldName::KeywordField,
        FieldName::Title,
        FieldName::Subtitle,
        FieldName::Description,
        FieldName::WhatsNew,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::KeywordField => "keyword_field",
            FieldName::Title => "title",
            FieldName::Subtitle => "subtitle",
            FieldName::Description => "description",
            FieldName::WhatsNew => "whats_new",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeKeywordsRequest {
    pub keywords: Vec<KeywordRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordFieldRequest {
    pub keywords: Vec<KeywordRecord>,
    pub language: Language,
}

/// Inputs shared by the title, subtitle, description and what's-new operations.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRequest {
    pub app_name: String,
    pub primary_keyword: String,
    #[serde(default)]
    pub features: Vec<String>,
    /// Secondary keywords the long-form fields may weave in.
    #[serde(default)]
    pub related_keywords: Vec<String>,
    pub language: Language,
}

impl FieldRequest {
    /// Trims every input and rejects blank required fields.
    pub fn validated(self) -> Result<Self, AppError> {
        let app_name = self.app_name.trim().to_string();
        let primary_keyword = self.primary_keyword.trim().to_string();

        if app_name.is_empty() {
            return Err(AppError::Validation("app_name cannot be empty".to_string()));
        }
        if primary_keyword.is_empty() {
            return Err(AppError::Validation(
                "primary_keyword cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            app_name,
            primary_keyword,
            features: non_blank(self.features),
            related_keywords: non_blank(self.related_keywords),
            language: self.language,
        })
    }
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateAllRequest {
    pub app_name: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub keywords: Vec<KeywordRecord>,
    pub language: Language,
}

// ────────────────────────────────────────────────────────────────────────────
// Responses
// ────────────────────────────────────────────────────────────────────────────

/// One generated, constraint-checked field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedText {
    pub field: FieldName,
    pub text: String,
    /// In chars.
    pub length: usize,
    pub language: Language,
    pub primary_keyword: String,
    /// Present when the field has an occurrence window.
    pub keyword_occurrences: Option<usize>,
    pub cached: bool,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedText {
    pub fn new(
        field: FieldName,
        text: String,
        constraint: &FieldConstraint,
        primary_keyword: &str,
        cached: bool,
    ) -> Self {
        let keyword_occurrences = constraint
            .keyword_window
            .as_ref()
            .map(|window| count_ci(&text, &window.keyword));

        Self {
            field,
            length: char_len(&text),
            language: constraint.language,
            primary_keyword: primary_keyword.to_string(),
            keyword_occurrences,
            cached,
            generated_at: Utc::now(),
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    pub step: String,
    pub elapsed_ms: u64,
}

/// Response of the all-fields operation. Every field is present or the request failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsoTextBundle {
    pub request_id: Uuid,
    pub keyword_field: GeneratedText,
    pub title: GeneratedText,
    pub subtitle: GeneratedText,
    pub description: GeneratedText,
    pub whats_new: GeneratedText,
    pub selection: SelectionResult,
    pub language: Language,
    pub timings: Vec<StepTiming>,
    pub generated_at: DateTime<Utc>,
}
