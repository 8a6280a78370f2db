//! Keyword field composition: deterministic, no provider call.
//!
//! 1. Primary keyword first (score forced to 1.0), then candidates by score
//! 2. Drop keywords whose normalized form (lowercase, punctuation stripped) repeats
//! 3. Greedily join with the locale separator until the next keyword would overflow

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::synthesis::text::char_len;
use crate::synthesis::{enforce, FieldConstraint, Language};

/// Characters the store rejects in the keyword field.
pub const FORBIDDEN_CHARS: &[char] = &['<', '>', '&', '"', '\''];

/// `ranked` is primary first, then candidates, each with its composite score.
pub fn compose_keyword_field(ranked: &[(&str, f64)], language: Language) -> Result<String, AppError> {
    let Some((primary, _)) = ranked.first() else {
        return Err(AppError::Validation("no keywords to compose".to_string()));
    };
    if primary.contains(FORBIDDEN_CHARS) {
        return Err(AppError::Validation(format!(
            "primary keyword '{primary}' contains a forbidden character"
        )));
    }

    let mut scored: Vec<(&str, f64)> = ranked
        .iter()
        .enumerate()
        .map(|(i, (keyword, score))| (keyword.trim(), if i == 0 { 1.0 } else { *score }))
        .collect();
    // stable: equal scores keep rank order
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    let unique: Vec<&str> = scored
        .into_iter()
        .map(|(keyword, _)| keyword)
        .filter(|keyword| {
            if keyword.contains(FORBIDDEN_CHARS) {
                warn!(keyword, "Skipping keyword with forbidden character");
                return false;
            }
            let normalized = normalize(keyword);
            !normalized.is_empty() && seen.insert(normalized)
        })
        .collect();

    let constraint = FieldConstraint::keyword_field(language);
    let separator = language.rules().keyword_separator;
    let mut fitted: Vec<&str> = Vec::new();
    let mut length = 0;

    for keyword in unique {
        let added = char_len(keyword) + if fitted.is_empty() { 0 } else { char_len(separator) };
        if length + added > constraint.max_length {
            break;
        }
        fitted.push(keyword);
        length += added;
    }

    debug!(keywords = fitted.len(), length, "Keyword field composed");

    Ok(enforce(&fitted.join(separator), &constraint)?)
}

fn normalize(keyword: &str) -> String {
    keyword
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_first_then_by_score() {
        let ranked = [("fitness", 0.4), ("workout", 0.9), ("yoga", 0.5)];
        let field = compose_keyword_field(&ranked, Language::En).unwrap();
        assert_eq!(field, "fitness, workout, yoga");
    }

    #[test]
    fn test_japanese_separator() {
        let ranked = [("ゲーム", 0.9), ("パズル", 0.8)];
        assert_eq!(
            compose_keyword_field(&ranked, Language::Ja).unwrap(),
            "ゲーム、パズル"
        );
    }

    #[test]
    fn test_dedupes_by_normalized_form() {
        let ranked = [("Fitness", 0.9), ("fitness!", 0.8), ("FITNESS", 0.7), ("gym", 0.6)];
        assert_eq!(
            compose_keyword_field(&ranked, Language::En).unwrap(),
            "Fitness, gym"
        );
    }

    #[test]
    fn test_stays_within_100_chars() {
        let words: Vec<String> = (0..30).map(|i| format!("keyword{i:02}")).collect();
        let ranked: Vec<(&str, f64)> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.as_str(), 1.0 - i as f64 / 100.0))
            .collect();

        let field = compose_keyword_field(&ranked, Language::En).unwrap();
        assert!(char_len(&field) <= 100);
        // 9 chars + ", " per keyword → 9 fit (9*9 + 8*2 = 97)
        assert_eq!(field.split(", ").count(), 9);
        assert!(field.starts_with("keyword00"));
    }

    #[test]
    fn test_forbidden_characters() {
        let ranked = [("fitness", 0.9), ("tom & jerry", 0.8), ("gym", 0.7)];
        assert_eq!(
            compose_keyword_field(&ranked, Language::En).unwrap(),
            "fitness, gym"
        );

        let bad_primary = [("<script>", 0.9)];
        assert!(matches!(
            compose_keyword_field(&bad_primary, Language::En),
            Err(AppError::Validation(_))
        ));
    }
}
