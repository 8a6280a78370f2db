// Keyword analysis: validated records → composite scores → primary keyword selection.
// Pure computation, no I/O.

pub mod models;
pub mod scoring;
pub mod selector;

pub use models::{validate_records, KeywordRecord, ScoredKeyword};
pub use scoring::{KeywordScorer, ScoringWeights};
pub use selector::{select_keywords, SelectionError, SelectionResult};
