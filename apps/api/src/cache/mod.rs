pub mod fingerprint;
pub mod handlers;
pub mod store;

pub use fingerprint::{canonical_list, Fingerprint};
pub use store::{CacheStats, ResultCache};
