use std::fmt;

use serde::{Deserialize, Serialize};

/// Output language. The locale set is closed: Japanese and English only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ja,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
        }
    }

    /// Locale rules table entry. Look this up once per operation.
    pub fn rules(self) -> &'static LocaleRules {
        match self {
            Language::Ja => &JA_RULES,
            Language::En => &EN_RULES,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Per-locale text mechanics used by the synthesizer and the field generators.
#[derive(Debug)]
pub struct LocaleRules {
    pub language: Language,
    pub terminators: &'static [char],
    /// Appended after a hard truncation.
    pub ellipsis: &'static str,
    /// Inserted between sentences that are not already whitespace-separated.
    pub sentence_joiner: &'static str,
    pub keyword_separator: &'static str,
    pub title_separator: &'static str,
    pub bullet: &'static str,
    /// Short sentences used to raise keyword density. `{keyword}` appears exactly once.
    pub filler_templates: &'static [&'static str],
}

impl LocaleRules {
    pub fn is_terminator(&self, c: char) -> bool {
        self.terminators.contains(&c)
    }

    /// Filler sentence `index`, cycling through the templates.
    pub fn filler_sentence(&self, index: usize, keyword: &str) -> String {
        let template = self.filler_templates[index % self.filler_templates.len()];
        template.replace("{keyword}", keyword)
    }

    pub fn bullet_list(&self, items: &[String]) -> String {
        items
            .iter()
            .map(|item| format!("{}{}", self.bullet, item.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

static JA_RULES: LocaleRules = LocaleRules {
    language: Language::Ja,
    terminators: &['。', '！', '？'],
    ellipsis: "…",
    sentence_joiner: "",
    keyword_separator: "、",
    title_separator: " - ",
    bullet: "・",
    filler_templates: &[
        "{keyword}で毎日がもっと便利に。",
        "{keyword}をもっと身近に楽しめます。",
        "{keyword}ならこのアプリにおまかせ。",
        "いつでもどこでも{keyword}を。",
    ],
};

static EN_RULES: LocaleRules = LocaleRules {
    language: Language::En,
    terminators: &['.', '!', '?'],
    ellipsis: "...",
    sentence_joiner: " ",
    keyword_separator: ", ",
    title_separator: " - ",
    bullet: "• ",
    filler_templates: &[
        "Enjoy {keyword} every day.",
        "Make {keyword} part of the routine.",
        "Discover {keyword} on the go.",
        "Get more from {keyword} today.",
    ],
};
