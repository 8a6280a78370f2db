// Constrained text synthesis: locale rules, sentence surgery and the field contract enforcer.
// Pure functions only; the generators in `generation` feed drafts through `enforce`.

pub mod constraint;
pub mod enforcer;
pub mod locale;
pub mod text;

pub use constraint::{FieldConstraint, KeywordWindow};
pub use enforcer::{enforce, SynthesisError};
pub use locale::{Language, LocaleRules};
