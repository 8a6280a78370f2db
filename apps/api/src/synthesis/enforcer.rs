//! Constrained text synthesis: forces generated prose into a field's contract.
//!
//! Pipeline (each stage is a pure `&str -> String` transform over sentence pieces):
//! 1. Exclusion pass: strip excluded keywords
//! 2. Length pass: keep leading whole sentences, hard-truncate with an ellipsis as a fallback
//! 3. Density pass: splice templated filler sentences or remove surplus occurrences
//! 4. Validation: every rule is re-checked on the final text
//!
//! Length and density are re-run together until the window holds, at most
//! `MAX_DENSITY_ATTEMPTS` times. Text that already satisfies the contract comes
//! back unchanged apart from outer whitespace, which makes `enforce` idempotent.

use thiserror::Error;
use tracing::debug;

use crate::synthesis::constraint::{FieldConstraint, KeywordWindow};
use crate::synthesis::locale::{Language, LocaleRules};
use crate::synthesis::text::{
    append_sentence, char_len, collapse_whitespace, contains_ci, count_ci, find_ci,
    is_complete, join_sentences, remove_ci, split_sentences, tidy_spaces,
};

pub const MAX_DENSITY_ATTEMPTS: usize = 5;
/// A sentence must keep at least this many chars after losing a keyword occurrence.
pub const MIN_SENTENCE_CHARS: usize = 10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthesisError {
    #[error("text is empty after enforcement")]
    Empty,

    #[error("text is {length} chars, over the {max} char limit")]
    LengthExceeded { length: usize, max: usize },

    #[error("excluded keyword '{0}' is still present")]
    ExcludedKeywordPresent(String),

    #[error("'{keyword}' appears {count} times, expected between {min} and {max}")]
    DensityUnsatisfiable {
        keyword: String,
        count: usize,
        min: usize,
        max: usize,
    },

    #[error("{min} occurrences of '{keyword}' cannot fit within {max_length} chars")]
    LengthDensityConflict {
        keyword: String,
        min: usize,
        max_length: usize,
    },

    #[error("keyword '{0}' is both required and excluded")]
    ExcludedTarget(String),
}

/// Forces `text` into `constraint`, or explains why it cannot.
pub fn enforce(text: &str, constraint: &FieldConstraint) -> Result<String, SynthesisError> {
    let rules = constraint.language.rules();
    let max_length = constraint.max_length;

    if let Some(window) = &constraint.keyword_window {
        check_feasible(window, constraint)?;
    }

    let mut current = strip_excluded(text.trim(), &constraint.excluded_keywords);

    let Some(window) = &constraint.keyword_window else {
        let fitted = fit_length(&current, max_length, rules);
        return validate(fitted, constraint);
    };

    let mut count = 0;
    for attempt in 1..=MAX_DENSITY_ATTEMPTS {
        current = fit_length(&current, max_length, rules);
        count = count_ci(&current, &window.keyword);

        if window.contains(count) {
            return validate(current, constraint);
        }
        if attempt == MAX_DENSITY_ATTEMPTS {
            break;
        }

        debug!(
            attempt,
            count,
            min = window.min,
            max = window.max,
            "Keyword density outside window, adjusting"
        );

        current = if count < window.min {
            raise_density(&current, window, constraint, rules)?
        } else {
            lower_density(&current, window, rules)
        };
    }

    Err(SynthesisError::DensityUnsatisfiable {
        keyword: window.keyword.clone(),
        count,
        min: window.min,
        max: window.max,
    })
}

fn check_feasible(window: &KeywordWindow, constraint: &FieldConstraint) -> Result<(), SynthesisError> {
    if window.min > window.max {
        return Err(SynthesisError::DensityUnsatisfiable {
            keyword: window.keyword.clone(),
            count: 0,
            min: window.min,
            max: window.max,
        });
    }

    let overlaps_exclusion = constraint
        .excluded_keywords
        .iter()
        .filter(|excluded| !excluded.trim().is_empty())
        .any(|excluded| contains_ci(&window.keyword, excluded) || contains_ci(excluded, &window.keyword));
    if overlaps_exclusion {
        return Err(SynthesisError::ExcludedTarget(window.keyword.clone()));
    }

    if window.min * char_len(&window.keyword) > constraint.max_length {
        return Err(SynthesisError::LengthDensityConflict {
            keyword: window.keyword.clone(),
            min: window.min,
            max_length: constraint.max_length,
        });
    }

    Ok(())
}

// ────────────────────────────────────────────────────────────────
// Exclusion pass
// ────────────────────────────────────────────────────────────────

fn strip_excluded(text: &str, excluded: &[String]) -> String {
    let mut current = text.to_string();
    // A removal can splice a new occurrence together ("aabb" minus "ab"), so repeat
    loop {
        let mut changed = false;
        for keyword in excluded.iter().filter(|k| !k.trim().is_empty()) {
            if contains_ci(&current, keyword) {
                current = remove_ci(&current, keyword);
                changed = true;
            }
        }
        if !changed {
            return current;
        }
        current = collapse_whitespace(&current);
    }
}

// ────────────────────────────────────────────────────────────────
// Length pass
// ────────────────────────────────────────────────────────────────

fn fit_length(text: &str, max_length: usize, rules: &LocaleRules) -> String {
    if char_len(text) <= max_length {
        return text.to_string();
    }

    let mut kept = String::new();
    for piece in split_sentences(text, rules) {
        if !is_complete(&piece, rules) {
            break;
        }
        let mut candidate = kept.clone();
        append_sentence(&mut candidate, &piece, rules);
        if char_len(candidate.trim_end()) > max_length {
            break;
        }
        kept = candidate;
    }

    let kept = kept.trim();
    if kept.is_empty() {
        hard_truncate(text, max_length, rules)
    } else {
        kept.to_string()
    }
}

fn hard_truncate(text: &str, max_length: usize, rules: &LocaleRules) -> String {
    let ellipsis_len = char_len(rules.ellipsis);
    if max_length <= ellipsis_len {
        return text.chars().take(max_length).collect::<String>().trim_end().to_string();
    }

    let budget = max_length - ellipsis_len;
    let mut cut: String = text.chars().take(budget).collect();

    if rules.language == Language::En {
        let at_boundary = text.chars().nth(budget).map_or(true, char::is_whitespace);
        if !at_boundary {
            if let Some(pos) = cut.rfind(char::is_whitespace) {
                if char_len(&cut[..pos]) > budget / 2 {
                    cut.truncate(pos);
                }
            }
        }
    }

    let cut = cut.trim_end_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-' | '、' | '・')
    });
    format!("{cut}{}", rules.ellipsis)
}

// ────────────────────────────────────────────────────────────────
// Density pass
// ────────────────────────────────────────────────────────────────

/// Splices `min - count` filler sentences into the back half of the text.
///
/// While the result is too long, keyword-free sentences are dropped from the
/// end first. Once only keyword-bearing sentences remain, the last one is
/// shortened (or dropped when it cannot keep `MIN_SENTENCE_CHARS`) and the
/// filler count is recomputed to replace any occurrence it lost. Fails only
/// when the fillers alone exceed the limit.
fn raise_density(
    text: &str,
    window: &KeywordWindow,
    constraint: &FieldConstraint,
    rules: &LocaleRules,
) -> Result<String, SynthesisError> {
    let mut pieces = split_sentences(text, rules);
    loop {
        let count = count_ci(&join_sentences(&pieces, rules), &window.keyword);
        let needed = window.min.saturating_sub(count);
        let fillers = filler_sentences(needed, window, constraint, rules)?;

        let spliced = splice(&pieces, &fillers, rules);
        let length = char_len(&spliced);
        if length <= constraint.max_length {
            return Ok(spliced);
        }

        if let Some(index) = pieces
            .iter()
            .rposition(|piece| !contains_ci(piece, &window.keyword))
        {
            pieces.remove(index);
            continue;
        }

        let Some(last) = pieces.pop() else {
            return Err(SynthesisError::LengthDensityConflict {
                keyword: window.keyword.clone(),
                min: window.min,
                max_length: constraint.max_length,
            });
        };

        // every pass strictly shortens the pieces, so this terminates
        let target = char_len(last.trim()).saturating_sub(length - constraint.max_length);
        if target >= MIN_SENTENCE_CHARS {
            pieces.push(hard_truncate(last.trim(), target, rules));
        }
    }
}

/// Templated sentences that mention the keyword and none of the excluded keywords.
fn filler_sentences(
    needed: usize,
    window: &KeywordWindow,
    constraint: &FieldConstraint,
    rules: &LocaleRules,
) -> Result<Vec<String>, SynthesisError> {
    let usable: Vec<String> = (0..rules.filler_templates.len())
        .map(|i| rules.filler_sentence(i, &window.keyword))
        .filter(|sentence| {
            !constraint
                .excluded_keywords
                .iter()
                .filter(|k| !k.trim().is_empty())
                .any(|k| contains_ci(sentence, k))
        })
        .collect();

    if usable.is_empty() && needed > 0 {
        return Err(SynthesisError::DensityUnsatisfiable {
            keyword: window.keyword.clone(),
            count: window.min - needed,
            min: window.min,
            max: window.max,
        });
    }

    Ok((0..needed).map(|i| usable[i % usable.len()].clone()).collect())
}

/// Positions start at the midpoint and spread evenly to the end. A trailing
/// incomplete piece (e.g. one ending in an ellipsis) stays last.
fn splice(pieces: &[String], fillers: &[String], rules: &LocaleRules) -> String {
    let n = pieces.len();
    let limit = match pieces.last() {
        Some(last) if !is_complete(last, rules) => n - 1,
        _ => n,
    };
    let mid = limit / 2;
    let positions: Vec<usize> = (0..fillers.len())
        .map(|i| mid + i * (limit - mid) / fillers.len())
        .collect();

    let mut out = String::new();
    let mut next_filler = 0;
    for index in 0..=n {
        while next_filler < fillers.len() && positions[next_filler] == index {
            append_sentence(&mut out, &fillers[next_filler], rules);
            next_filler += 1;
        }
        if let Some(piece) = pieces.get(index) {
            append_sentence(&mut out, piece, rules);
        }
    }
    out.trim().to_string()
}

/// Removes surplus occurrences, last sentence first and last occurrence first.
fn lower_density(text: &str, window: &KeywordWindow, rules: &LocaleRules) -> String {
    let mut pieces = split_sentences(text, rules);
    let mut count = count_ci(text, &window.keyword);

    for index in (0..pieces.len()).rev() {
        while count > window.max {
            match remove_last_occurrence(&pieces[index], &window.keyword) {
                Some(shorter) => {
                    pieces[index] = shorter;
                    count = count_ci(&join_sentences(&pieces, rules), &window.keyword);
                }
                None => break,
            }
        }
        if count <= window.max {
            break;
        }
    }

    join_sentences(&pieces, rules)
}

/// Drops the last occurrence whose removal leaves the sentence at least
/// `MIN_SENTENCE_CHARS` long. Surrounding whitespace is preserved.
fn remove_last_occurrence(piece: &str, keyword: &str) -> Option<String> {
    let leading = &piece[..piece.len() - piece.trim_start().len()];
    let trailing = &piece[piece.trim_end().len()..];

    find_ci(piece, keyword).into_iter().rev().find_map(|range| {
        let mut candidate = String::with_capacity(piece.len());
        candidate.push_str(&piece[..range.start]);
        candidate.push_str(&piece[range.end..]);

        let core = tidy_spaces(candidate.trim());
        (char_len(&core) >= MIN_SENTENCE_CHARS).then(|| format!("{leading}{core}{trailing}"))
    })
}

// ────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────

fn validate(text: String, constraint: &FieldConstraint) -> Result<String, SynthesisError> {
    let text = text.trim().to_string();

    if text.is_empty() {
        return Err(SynthesisError::Empty);
    }

    let length = char_len(&text);
    if length > constraint.max_length {
        return Err(SynthesisError::LengthExceeded {
            length,
            max: constraint.max_length,
        });
    }

    if let Some(excluded) = constraint
        .excluded_keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .find(|k| contains_ci(&text, k))
    {
        return Err(SynthesisError::ExcludedKeywordPresent(excluded.clone()));
    }

    if let Some(window) = &constraint.keyword_window {
        let count = count_ci(&text, &window.keyword);
        if !window.contains(count) {
            return Err(SynthesisError::DensityUnsatisfiable {
                keyword: window.keyword.clone(),
                count,
                min: window.min,
                max: window.max,
            });
        }
    }

    Ok(text)
}
