//! Title composition: `{keyword}{separator}{app name}`, deterministic, no provider call.
//!
//! Both parts are normalized first (full-width ASCII → half-width for ja, title
//! case for en, forbidden characters removed). When the whole title is too long
//! the app name is shortened; when fewer than `MIN_APP_NAME_CHARS` would remain
//! the title is the keyword alone.

use tracing::debug;

use crate::errors::AppError;
use crate::synthesis::constraint::TITLE_MAX;
use crate::synthesis::text::{char_len, collapse_whitespace};
use crate::synthesis::{enforce, FieldConstraint, Language};

pub const MIN_APP_NAME_CHARS: usize = 3;
const FORBIDDEN_CHARS: &[char] = &['<', '>', '&', '"', '\'', '\\', '/', '|', '*', '?', ':', ';'];

pub fn compose_title(keyword: &str, app_name: &str, language: Language) -> Result<String, AppError> {
    let keyword = normalize_part(keyword, language);
    let app_name = normalize_part(app_name, language);

    if keyword.is_empty() {
        return Err(AppError::Validation("primary keyword is empty after normalization".to_string()));
    }
    if app_name.is_empty() {
        return Err(AppError::Validation("app name is empty after normalization".to_string()));
    }
    if char_len(&keyword) > TITLE_MAX {
        return Err(AppError::Validation(format!(
            "primary keyword is {} chars, longer than the {TITLE_MAX} char title",
            char_len(&keyword)
        )));
    }

    let separator = language.rules().title_separator;
    let full = format!("{keyword}{separator}{app_name}");

    let title = if char_len(&full) <= TITLE_MAX {
        full
    } else {
        let available = TITLE_MAX.saturating_sub(char_len(&keyword) + char_len(separator));
        if available < MIN_APP_NAME_CHARS {
            keyword
        } else {
            let shortened = truncate_name(&app_name, available);
            debug!(app_name = %app_name, shortened = %shortened, "App name shortened to fit title");
            format!("{keyword}{separator}{shortened}")
        }
    };

    Ok(enforce(&title, &FieldConstraint::title(language))?)
}

fn normalize_part(text: &str, language: Language) -> String {
    let text = match language {
        Language::Ja => to_halfwidth_ascii(text.trim()),
        Language::En => title_case(text.trim()),
    };
    let cleaned: String = text.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect();
    collapse_whitespace(&cleaned)
}

/// Full-width digits and Latin letters to their ASCII forms.
fn to_halfwidth_ascii(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Uppercases the first letter of every alphabetic run, lowercases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Cuts at the last word boundary inside `max_chars`, or at a char boundary
/// when that would leave fewer than `MIN_APP_NAME_CHARS`.
fn truncate_name(name: &str, max_chars: usize) -> String {
    let cut: String = name.chars().take(max_chars).collect();
    let mid_word = name.chars().nth(max_chars).is_some_and(|c| !c.is_whitespace());

    if mid_word {
        if let Some(pos) = cut.rfind(char::is_whitespace) {
            let at_word = cut[..pos].trim_end();
            if char_len(at_word) >= MIN_APP_NAME_CHARS {
                return at_word.to_string();
            }
        }
    }
    cut.trim_end().to_string()
}
