//! Keyword Selector: ranks a scored keyword dataset and picks the primary keyword.
//!
//! Algorithm:
//! 1. Score every record with the injected `KeywordScorer`
//! 2. Stable sort descending by composite score (ties keep input order)
//! 3. Index 0 becomes the primary keyword, the next `CANDIDATE_COUNT` are candidates
//!
//! A weak top score is reported through `low_confidence`, never as an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::keywords::models::{ComponentScores, KeywordRecord, ScoredKeyword};
use crate::keywords::scoring::KeywordScorer;

/// Number of ranked candidates returned after the primary keyword.
pub const CANDIDATE_COUNT: usize = 9;
/// Upper bound on dataset size, keeps scoring cost bounded.
pub const MAX_RECORDS: usize = 1000;
/// Top composite scores below this value are flagged as low confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("no keywords to select from")]
    EmptyInput,

    #[error("too many keywords: {count} (max {MAX_RECORDS})")]
    TooManyRecords { count: usize },
}

/// Output of keyword selection. Read-only once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    pub primary_keyword: String,
    pub primary_score: f64,
    pub primary_ranking: u32,
    pub primary_popularity: f64,
    pub primary_difficulty: f64,
    pub component_scores: ComponentScores,
    /// Ranks 1..=CANDIDATE_COUNT after the primary, best first.
    pub candidates: Vec<ScoredKeyword>,
    pub total_keywords_analyzed: usize,
    pub low_confidence: bool,
}

impl SelectionResult {
    /// Primary keyword followed by the candidates, in rank order.
    pub fn ranked_keywords(&self) -> Vec<(&str, f64)> {
        std::iter::once((self.primary_keyword.as_str(), self.primary_score))
            .chain(
                self.candidates
                    .iter()
                    .map(|c| (c.keyword.as_str(), c.composite_score)),
            )
            .collect()
    }
}

pub fn select_keywords(
    records: &[KeywordRecord],
    scorer: &KeywordScorer,
) -> Result<SelectionResult, SelectionError> {
    if records.is_empty() {
        return Err(SelectionError::EmptyInput);
    }
    if records.len() > MAX_RECORDS {
        return Err(SelectionError::TooManyRecords {
            count: records.len(),
        });
    }

    let mut scored: Vec<ScoredKeyword> = records.iter().map(|r| scorer.score(r)).collect();

    // sort_by is stable: equal scores keep their input order
    scored.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranked = scored.into_iter();
    let primary = ranked.next().ok_or(SelectionError::EmptyInput)?;
    let candidates: Vec<ScoredKeyword> = ranked.take(CANDIDATE_COUNT).collect();

    let low_confidence = primary.composite_score < LOW_CONFIDENCE_THRESHOLD;
    if low_confidence {
        warn!(
            keyword = %primary.keyword,
            score = primary.composite_score,
            "Primary keyword has low composite score; continuing with generation"
        );
    }

    debug!(
        primary = %primary.keyword,
        candidates = candidates.len(),
        total = records.len(),
        "Keyword selection complete"
    );

    Ok(SelectionResult {
        component_scores: primary.component_scores(),
        primary_keyword: primary.keyword,
        primary_score: primary.composite_score,
        primary_ranking: primary.ranking,
        primary_popularity: primary.popularity,
        primary_difficulty: primary.difficulty,
        candidates,
        total_keywords_analyzed: records.len(),
        low_confidence,
    })
}
