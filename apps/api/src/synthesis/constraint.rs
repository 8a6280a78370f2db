use serde::{Deserialize, Serialize};

use crate::synthesis::locale::Language;

pub const KEYWORD_FIELD_MAX: usize = 100;
pub const TITLE_MAX: usize = 30;
pub const SUBTITLE_MAX: usize = 30;
pub const LONG_FORM_MAX: usize = 4000;
pub const LONG_FORM_MIN_OCCURRENCES: usize = 4;
pub const LONG_FORM_MAX_OCCURRENCES: usize = 7;

/// Required occurrence count of one keyword, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordWindow {
    pub keyword: String,
    pub min: usize,
    pub max: usize,
}

impl KeywordWindow {
    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

/// The contract a generated field must satisfy before it leaves the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConstraint {
    pub max_length: usize,
    pub keyword_window: Option<KeywordWindow>,
    pub excluded_keywords: Vec<String>,
    pub language: Language,
}

impl FieldConstraint {
    pub fn new(max_length: usize, language: Language) -> Self {
        Self {
            max_length,
            keyword_window: None,
            excluded_keywords: Vec::new(),
            language,
        }
    }

    pub fn with_window(mut self, keyword: impl Into<String>, min: usize, max: usize) -> Self {
        self.keyword_window = Some(KeywordWindow {
            keyword: keyword.into(),
            min,
            max,
        });
        self
    }

    pub fn excluding(mut self, keyword: impl Into<String>) -> Self {
        self.excluded_keywords.push(keyword.into());
        self
    }

    // ────────────────────────────────────────────────────────────────
    // Per-field presets
    // ────────────────────────────────────────────────────────────────

    pub fn keyword_field(language: Language) -> Self {
        Self::new(KEYWORD_FIELD_MAX, language)
    }

    pub fn title(language: Language) -> Self {
        Self::new(TITLE_MAX, language)
    }

    /// The subtitle must not repeat the primary keyword; the title already carries it.
    pub fn subtitle(language: Language, primary_keyword: &str) -> Self {
        Self::new(SUBTITLE_MAX, language).excluding(primary_keyword)
    }

    pub fn description(language: Language, primary_keyword: &str) -> Self {
        Self::long_form(language, primary_keyword)
    }

    pub fn whats_new(language: Language, primary_keyword: &str) -> Self {
        Self::long_form(language, primary_keyword)
    }

    fn long_form(language: Language, primary_keyword: &str) -> Self {
        Self::new(LONG_FORM_MAX, language).with_window(
            primary_keyword,
            LONG_FORM_MIN_OCCURRENCES,
            LONG_FORM_MAX_OCCURRENCES,
        )
    }
}
