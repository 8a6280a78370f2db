use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keywords::models::{KeywordRecord, ScoredKeyword, MAX_RANKING};

/// Allowed drift of the weight sum away from 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("scoring weights must sum to 1.0 (got {sum:.4})")]
    WeightSum { sum: f64 },

    #[error("scoring weights must be non-negative")]
    NegativeWeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub ranking: f64,
    pub popularity: f64,
    pub difficulty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            ranking: 0.4,
            popularity: 0.4,
            difficulty: 0.2,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.ranking < 0.0 || self.popularity < 0.0 || self.difficulty < 0.0 {
            return Err(ScoringError::NegativeWeight);
        }
        let sum = self.ranking + self.popularity + self.difficulty;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoringError::WeightSum { sum });
        }
        Ok(())
    }
}

/// Composite keyword scorer. Construction fails on a bad weight set so a
/// misconfigured scorer can never produce scores.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    weights: ScoringWeights,
}

impl KeywordScorer {
    pub fn new(weights: ScoringWeights) -> Result<Self, ScoringError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Scores one record: w_r·ranking + w_p·popularity + w_d·difficulty, rounded to 4 places.
    pub fn score(&self, record: &KeywordRecord) -> ScoredKeyword {
        let ranking_score = ranking_score(record.ranking);
        let popularity_score = popularity_score(record.popularity);
        let difficulty_score = difficulty_score(record.difficulty);

        let composite = self.weights.ranking * ranking_score
            + self.weights.popularity * popularity_score
            + self.weights.difficulty * difficulty_score;

        ScoredKeyword {
            keyword: record.keyword.clone(),
            ranking: record.ranking,
            popularity: record.popularity,
            difficulty: record.difficulty,
            ranking_score,
            popularity_score,
            difficulty_score,
            composite_score: round4(composite).clamp(0.0, 1.0),
        }
    }
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }
}

/// 1st place → 1.0, 1000th place → 0.0.
pub fn ranking_score(ranking: u32) -> f64 {
    let max = MAX_RANKING as f64;
    ((max - ranking as f64) / (max - 1.0)).clamp(0.0, 1.0)
}

pub fn popularity_score(popularity: f64) -> f64 {
    (popularity / 100.0).clamp(0.0, 1.0)
}

/// Lower difficulty scores higher.
pub fn difficulty_score(difficulty: f64) -> f64 {
    ((100.0 - difficulty) / 100.0).clamp(0.0, 1.0)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
