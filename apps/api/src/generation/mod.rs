// ASO field generation: keyword field and title are composed locally, subtitle,
// description and what's new are drafted by the completion provider and then
// enforced. All provider calls go through llm_client.

pub mod draft;
pub mod handlers;
pub mod keyword_field;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod title;

pub use orchestrator::GenerationOrchestrator;
