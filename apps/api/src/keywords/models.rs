use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_RANKING: u32 = 1;
pub const MAX_RANKING: u32 = 1000;

/// One row of the ranked keyword dataset.
///
/// Produced by the ingestion boundary after range and uniqueness validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    pub keyword: String,
    pub ranking: u32,
    pub popularity: f64,
    pub difficulty: f64,
}

impl KeywordRecord {
    /// Builds a validated record. The keyword is trimmed before checks.
    pub fn new(
        keyword: impl Into<String>,
        ranking: u32,
        popularity: f64,
        difficulty: f64,
    ) -> Result<Self, AppError> {
        let record = Self {
            keyword: keyword.into().trim().to_string(),
            ranking,
            popularity,
            difficulty,
        };
        record.validate()?;
        Ok(record)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.keyword.is_empty() {
            return Err(AppError::Validation("keyword cannot be empty".to_string()));
        }
        if !(MIN_RANKING..=MAX_RANKING).contains(&self.ranking) {
            return Err(AppError::Validation(format!(
                "ranking for '{}' must be between {MIN_RANKING} and {MAX_RANKING}, got {}",
                self.keyword, self.ranking
            )));
        }
        if !(0.0..=100.0).contains(&self.popularity) {
            return Err(AppError::Validation(format!(
                "popularity for '{}' must be between 0 and 100, got {}",
                self.keyword, self.popularity
            )));
        }
        if !(0.0..=100.0).contains(&self.difficulty) {
            return Err(AppError::Validation(format!(
                "difficulty for '{}' must be between 0 and 100, got {}",
                self.keyword, self.difficulty
            )));
        }
        Ok(())
    }
}

/// Validates a keyword dataset received over the wire and returns trimmed records.
///
/// Enforces per-field ranges and case-insensitive keyword uniqueness.
pub fn validate_records(records: Vec<KeywordRecord>) -> Result<Vec<KeywordRecord>, AppError> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut validated = Vec::with_capacity(records.len());

    for raw in records {
        let record = KeywordRecord::new(raw.keyword, raw.ranking, raw.popularity, raw.difficulty)?;
        if !seen.insert(record.keyword.to_lowercase()) {
            return Err(AppError::Validation(format!(
                "duplicate keyword '{}' (keywords are compared case-insensitively)",
                record.keyword
            )));
        }
        validated.push(record);
    }

    Ok(validated)
}

/// A keyword record together with its normalized sub-scores and composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub ranking: u32,
    pub popularity: f64,
    pub difficulty: f64,
    pub ranking_score: f64,
    pub popularity_score: f64,
    pub difficulty_score: f64,
    pub composite_score: f64,
}

impl ScoredKeyword {
    pub fn component_scores(&self) -> ComponentScores {
        ComponentScores {
            ranking: self.ranking_score,
            popularity: self.popularity_score,
            difficulty: self.difficulty_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub ranking: f64,
    pub popularity: f64,
    pub difficulty: f64,
}
