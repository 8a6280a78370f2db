//! String primitives for the synthesizer.
//!
//! Lengths are counted in chars, never bytes. Keyword matching is
//! case-insensitive and non-overlapping. Sentence pieces keep their trailing
//! whitespace so that concatenating an unmodified split reproduces the input.

use std::ops::Range;

use crate::synthesis::locale::LocaleRules;

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte ranges of every case-insensitive match of `needle`, left to right.
pub fn find_ci(haystack: &str, needle: &str) -> Vec<Range<usize>> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let chars: Vec<(usize, char)> = haystack.char_indices().collect();
    let mut matches = Vec::new();
    let mut i = 0;

    while i + needle.len() <= chars.len() {
        let hit = needle
            .iter()
            .enumerate()
            .all(|(k, &n)| chars_eq_ignore_case(chars[i + k].1, n));

        if hit {
            let start = chars[i].0;
            let end = chars
                .get(i + needle.len())
                .map(|(offset, _)| *offset)
                .unwrap_or(haystack.len());
            matches.push(start..end);
            i += needle.len();
        } else {
            i += 1;
        }
    }

    matches
}

pub fn count_ci(haystack: &str, needle: &str) -> usize {
    find_ci(haystack, needle).len()
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    !find_ci(haystack, needle).is_empty()
}

/// Removes every case-insensitive occurrence of `needle`.
pub fn remove_ci(haystack: &str, needle: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    for range in find_ci(haystack, needle) {
        out.push_str(&haystack[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&haystack[cursor..]);
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses runs of spaces and drops a space left dangling before punctuation.
/// Newlines are preserved.
pub fn tidy_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        if matches!(c, ',' | '.' | '!' | '?' | '、' | '。' | '！' | '？') && out.ends_with(' ') {
            out.pop();
        }
        out.push(c);
    }
    out
}

/// Splits text into sentence pieces at the locale's terminators.
///
/// A run of terminators stays with its sentence, as does the whitespace after it.
/// The final piece may lack a terminator.
pub fn split_sentences(text: &str, rules: &LocaleRules) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !rules.is_terminator(c) {
            continue;
        }
        while let Some(&next) = chars.peek() {
            if rules.is_terminator(next) || matches!(next, '」' | '』' | ')' | '）' | '"') {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        // space-separated locales only end a sentence before whitespace ("2.5" stays whole)
        if !rules.sentence_joiner.is_empty() {
            if let Some(&next) = chars.peek() {
                if !next.is_whitespace() {
                    continue;
                }
            }
        }
        while let Some(&next) = chars.peek() {
            if next.is_whitespace() {
                current.push(next);
                chars.next();
            } else {
                break;
            }
        }
        pieces.push(std::mem::take(&mut current));
    }

    if !current.trim().is_empty() {
        pieces.push(current);
    } else if let Some(last) = pieces.last_mut() {
        last.push_str(&current);
    }

    pieces
}

/// True if the piece ends with a terminator (closing brackets allowed after it).
pub fn is_complete(piece: &str, rules: &LocaleRules) -> bool {
    piece
        .trim_end()
        .trim_end_matches(['」', '』', ')', '）', '"'])
        .chars()
        .last()
        .map(|c| rules.is_terminator(c))
        .unwrap_or(false)
}

/// Appends `piece` to `acc`, inserting the locale joiner when the two would touch.
pub fn append_sentence(acc: &mut String, piece: &str, rules: &LocaleRules) {
    if !acc.is_empty()
        && !rules.sentence_joiner.is_empty()
        && !acc.ends_with(char::is_whitespace)
        && !piece.starts_with(char::is_whitespace)
    {
        acc.push_str(rules.sentence_joiner);
    }
    acc.push_str(piece);
}

pub fn join_sentences<S: AsRef<str>>(pieces: &[S], rules: &LocaleRules) -> String {
    let mut out = String::new();
    for piece in pieces {
        append_sentence(&mut out, piece.as_ref(), rules);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::locale::Language;

    #[test]
    fn test_char_len_counts_multibyte_as_one() {
        assert_eq!(char_len("ゲーム"), 3);
        assert_eq!("ゲーム".len(), 9);
    }

    #[test]
    fn test_find_ci_ascii_case_insensitive() {
        let ranges = find_ci("Fitness and FITNESS and fit", "fitness");
        assert_eq!(ranges, vec![0..7, 12..19]);
    }

    #[test]
    fn test_find_ci_non_overlapping() {
        assert_eq!(count_ci("aaaa", "aa"), 2);
    }

    #[test]
    fn test_find_ci_multibyte_offsets() {
        let text = "新しいテストとテスト";
        let ranges = find_ci(text, "テスト");
        assert_eq!(ranges.len(), 2);
        assert_eq!(&text[ranges[0].clone()], "テスト");
        assert_eq!(&text[ranges[1].clone()], "テスト");
    }

    #[test]
    fn test_find_ci_empty_needle() {
        assert!(find_ci("abc", "").is_empty());
    }

    #[test]
    fn test_remove_ci() {
        assert_eq!(remove_ci("Best Fitness app for fitness", "FITNESS"), "Best  app for ");
    }

    #[test]
    fn test_tidy_spaces() {
        assert_eq!(tidy_spaces("Track  your runs ."), "Track your runs.");
        assert_eq!(tidy_spaces("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn test_split_sentences_en_round_trips() {
        let rules = Language::En.rules();
        let text = "Track runs. Share results!  Ready? no terminator";
        let pieces = split_sentences(text, rules);
        assert_eq!(
            pieces,
            vec!["Track runs. ", "Share results!  ", "Ready? ", "no terminator"]
        );
        assert_eq!(pieces.concat(), text);
        assert!(is_complete(&pieces[0], rules));
        assert!(!is_complete(&pieces[3], rules));
    }

    #[test]
    fn test_split_sentences_en_keeps_decimals() {
        let rules = Language::En.rules();
        let pieces = split_sentences("Version 2.5 is here. Enjoy.", rules);
        assert_eq!(pieces, vec!["Version 2.5 is here. ", "Enjoy."]);
    }

    #[test]
    fn test_split_sentences_ja() {
        let rules = Language::Ja.rules();
        let pieces = split_sentences("記録できます。共有も簡単！本当？", rules);
        assert_eq!(pieces, vec!["記録できます。", "共有も簡単！", "本当？"]);
    }

    #[test]
    fn test_split_keeps_terminator_runs_and_quotes() {
        let rules = Language::Ja.rules();
        let pieces = split_sentences("「すごい！」と話題。続き", rules);
        assert_eq!(pieces, vec!["「すごい！」", "と話題。", "続き"]);
    }

    #[test]
    fn test_join_sentences_inserts_joiner_for_en_only() {
        let en = Language::En.rules();
        assert_eq!(join_sentences(&["One.", "Two."], en), "One. Two.");
        let ja = Language::Ja.rules();
        assert_eq!(join_sentences(&["一。", "二。"], ja), "一。二。");
    }
}
