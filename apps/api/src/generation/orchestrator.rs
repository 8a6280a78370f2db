//! Generation Orchestrator: runs the public ASO operations.
//!
//! Per request: analyzing_keywords → generating_fields → merging → done | failed.
//!
//! Every field goes through the same task shape:
//! 1. Fingerprint the inputs and consult the result cache (a hit skips everything below)
//! 2. Ask the load guard for admission
//! 3. Produce the text inside `LoadGuard::run_scoped`
//! 4. Store the text under the fingerprint
//!
//! `generate_all` runs the five field tasks concurrently on the request's task
//! and only merges once all of them have settled. One failed field fails the
//! request; the error lists every failed field.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::cache::{canonical_list, Fingerprint, ResultCache};
use crate::errors::{AppError, FieldFailure};
use crate::generation::draft;
use crate::generation::keyword_field::compose_keyword_field;
use crate::generation::models::{
    AsoTextBundle, FieldName, FieldRequest, GenerateAllRequest, GeneratedText, KeywordFieldRequest,
    StepTiming,
};
use crate::generation::title::compose_title;
use crate::keywords::{select_keywords, validate_records, KeywordRecord, KeywordScorer, SelectionResult};
use crate::llm_client::{RetryPolicy, TextCompletionProvider};
use crate::load_guard::LoadGuard;
use crate::synthesis::{FieldConstraint, Language};

pub struct GenerationOrchestrator {
    provider: Arc<dyn TextCompletionProvider>,
    scorer: KeywordScorer,
    cache: Arc<ResultCache<String>>,
    guard: LoadGuard,
    retry: RetryPolicy,
}

impl GenerationOrchestrator {
    pub fn new(
        provider: Arc<dyn TextCompletionProvider>,
        scorer: KeywordScorer,
        cache: Arc<ResultCache<String>>,
        guard: LoadGuard,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            scorer,
            cache,
            guard,
            retry,
        }
    }

    pub fn cache(&self) -> &ResultCache<String> {
        &self.cache
    }

    pub fn guard(&self) -> &LoadGuard {
        &self.guard
    }

    // ────────────────────────────────────────────────────────────────────────
    // Single operations
    // ────────────────────────────────────────────────────────────────────────

    /// Selection only: validate, score, rank.
    pub fn analyze_keywords(&self, records: Vec<KeywordRecord>) -> Result<SelectionResult, AppError> {
        let records = validate_records(records)?;
        let selection = select_keywords(&records, &self.scorer)?;
        info!(
            primary = %selection.primary_keyword,
            score = selection.primary_score,
            analyzed = selection.total_keywords_analyzed,
            "Keywords analyzed"
        );
        Ok(selection)
    }

    pub async fn generate_keyword_field(
        &self,
        request: KeywordFieldRequest,
    ) -> Result<GeneratedText, AppError> {
        let selection = self.analyze_keywords(request.keywords)?;
        self.keyword_field_task(&selection, request.language).await
    }

    pub async fn generate_title(&self, request: FieldRequest) -> Result<GeneratedText, AppError> {
        let request = request.validated()?;
        self.title_task(&request).await
    }

    pub async fn generate_subtitle(&self, request: FieldRequest) -> Result<GeneratedText, AppError> {
        let request = request.validated()?;
        self.subtitle_task(&request).await
    }

    pub async fn generate_description(&self, request: FieldRequest) -> Result<GeneratedText, AppError> {
        let request = request.validated()?;
        self.description_task(&request).await
    }

    pub async fn generate_whats_new(&self, request: FieldRequest) -> Result<GeneratedText, AppError> {
        let request = request.validated()?;
        self.whats_new_task(&request).await
    }

    // ────────────────────────────────────────────────────────────────────────
    // All fields
    // ────────────────────────────────────────────────────────────────────────

    pub async fn generate_all(&self, request: GenerateAllRequest) -> Result<AsoTextBundle, AppError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let mut timings = Vec::with_capacity(FieldName::ALL.len() + 1);

        info!(%request_id, state = "analyzing_keywords", keywords = request.keywords.len(), "Generation started");
        let step = Instant::now();
        let selection = match self.analyze_keywords(request.keywords) {
            Ok(selection) => selection,
            Err(e) => {
                error!(%request_id, state = "failed", error = %e, "Keyword analysis failed");
                return Err(e);
            }
        };
        timings.push(step_timing("analyzing_keywords", step));

        let field_request = FieldRequest {
            app_name: request.app_name,
            primary_keyword: selection.primary_keyword.clone(),
            features: request.features,
            related_keywords: selection.candidates.iter().map(|c| c.keyword.clone()).collect(),
            language: request.language,
        }
        .validated()?;

        info!(%request_id, state = "generating_fields", primary = %field_request.primary_keyword, "Generating fields");
        let (keyword_field, title, subtitle, description, whats_new) = tokio::join!(
            timed(FieldName::KeywordField, self.keyword_field_task(&selection, request.language)),
            timed(FieldName::Title, self.title_task(&field_request)),
            timed(FieldName::Subtitle, self.subtitle_task(&field_request)),
            timed(FieldName::Description, self.description_task(&field_request)),
            timed(FieldName::WhatsNew, self.whats_new_task(&field_request)),
        );

        info!(%request_id, state = "merging", "All field tasks settled");
        let mut failures = Vec::new();
        let mut settle = |(result, timing): (Result<GeneratedText, AppError>, StepTiming), field: FieldName| {
            timings.push(timing);
            match result {
                Ok(text) => Some(text),
                Err(e) => {
                    error!(%request_id, field = %field, error = %e, "Field generation failed");
                    failures.push(FieldFailure::new(field, &e));
                    None
                }
            }
        };
        let keyword_field = settle(keyword_field, FieldName::KeywordField);
        let title = settle(title, FieldName::Title);
        let subtitle = settle(subtitle, FieldName::Subtitle);
        let description = settle(description, FieldName::Description);
        let whats_new = settle(whats_new, FieldName::WhatsNew);

        let (Some(keyword_field), Some(title), Some(subtitle), Some(description), Some(whats_new)) =
            (keyword_field, title, subtitle, description, whats_new)
        else {
            error!(%request_id, state = "failed", failed = failures.len(), "Generation failed");
            return Err(AppError::Aggregate(failures));
        };

        let total_ms = elapsed_ms(started);
        info!(%request_id, state = "done", elapsed_ms = total_ms, "Generation complete");

        Ok(AsoTextBundle {
            request_id,
            keyword_field,
            title,
            subtitle,
            description,
            whats_new,
            language: request.language,
            selection,
            timings,
            generated_at: Utc::now(),
        })
    }

    // ────────────────────────────────────────────────────────────────────────
    // Field tasks
    // ────────────────────────────────────────────────────────────────────────

    async fn keyword_field_task(
        &self,
        selection: &SelectionResult,
        language: Language,
    ) -> Result<GeneratedText, AppError> {
        let ranked = selection.ranked_keywords();
        // order carries the ranking, so the list is hashed as given
        let keys: Vec<String> = ranked.iter().map(|(k, s)| format!("{k}:{s:.6}")).collect();
        let args = json!({ "keywords": keys, "language": language });

        self.run_task(
            FieldName::KeywordField,
            &args,
            &FieldConstraint::keyword_field(language),
            &selection.primary_keyword,
            async { compose_keyword_field(&ranked, language) },
        )
        .await
    }

    async fn title_task(&self, request: &FieldRequest) -> Result<GeneratedText, AppError> {
        let args = json!({
            "app_name": request.app_name,
            "keyword": request.primary_keyword,
            "language": request.language,
        });

        self.run_task(
            FieldName::Title,
            &args,
            &FieldConstraint::title(request.language),
            &request.primary_keyword,
            async { compose_title(&request.primary_keyword, &request.app_name, request.language) },
        )
        .await
    }

    async fn subtitle_task(&self, request: &FieldRequest) -> Result<GeneratedText, AppError> {
        self.run_task(
            FieldName::Subtitle,
            &provider_args(request),
            &FieldConstraint::subtitle(request.language, &request.primary_keyword),
            &request.primary_keyword,
            draft::generate_subtitle(self.provider.as_ref(), &self.retry, request),
        )
        .await
    }

    async fn description_task(&self, request: &FieldRequest) -> Result<GeneratedText, AppError> {
        self.run_task(
            FieldName::Description,
            &provider_args(request),
            &FieldConstraint::description(request.language, &request.primary_keyword),
            &request.primary_keyword,
            draft::generate_description(self.provider.as_ref(), &self.retry, request),
        )
        .await
    }

    async fn whats_new_task(&self, request: &FieldRequest) -> Result<GeneratedText, AppError> {
        self.run_task(
            FieldName::WhatsNew,
            &provider_args(request),
            &FieldConstraint::whats_new(request.language, &request.primary_keyword),
            &request.primary_keyword,
            draft::generate_whats_new(self.provider.as_ref(), &self.retry, request),
        )
        .await
    }

    /// cache → admission → scoped production → cache write.
    async fn run_task<F>(
        &self,
        field: FieldName,
        args: &impl Serialize,
        constraint: &FieldConstraint,
        primary_keyword: &str,
        produce: F,
    ) -> Result<GeneratedText, AppError>
    where
        F: Future<Output = Result<String, AppError>>,
    {
        let key = Fingerprint::new(field.as_str(), args).map_err(|e| AppError::Internal(e.into()))?;

        if let Some(text) = self.cache.get(&key) {
            debug!(field = %field, key = %key, "Cache hit");
            return Ok(GeneratedText::new(field, text, constraint, primary_keyword, true));
        }

        self.guard.admit()?;

        let text = self.guard.run_scoped(produce).await?;
        self.cache.set(key, text.clone());

        Ok(GeneratedText::new(field, text, constraint, primary_keyword, false))
    }
}

/// Cache inputs shared by the provider-backed fields. Feature and keyword
/// order does not change the output, so both lists are canonicalized.
fn provider_args(request: &FieldRequest) -> serde_json::Value {
    json!({
        "app_name": request.app_name,
        "keyword": request.primary_keyword,
        "features": canonical_list(&request.features),
        "related_keywords": canonical_list(&request.related_keywords),
        "language": request.language,
    })
}

async fn timed<F>(field: FieldName, task: F) -> (Result<GeneratedText, AppError>, StepTiming)
where
    F: Future<Output = Result<GeneratedText, AppError>>,
{
    let started = Instant::now();
    let result = task.await;
    let timing = step_timing(field.as_str(), started);
    debug!(field = %field, elapsed_ms = timing.elapsed_ms, ok = result.is_ok(), "Field task settled");
    (result, timing)
}

fn step_timing(step: &str, started: Instant) -> StepTiming {
    StepTiming {
        step: step.to_string(),
        elapsed_ms: elapsed_ms(started),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm_client::testing::ScriptedProvider;
    use crate::llm_client::ProviderError;
    use crate::load_guard::testing::FixedProbe;
    use crate::load_guard::LoadThresholds;

    const DESCRIPTION: &str =
        "Pulse helps you train. Plans adapt to you. Track every fitness session. Rest days matter too.";
    const WHATS_NEW: &str =
        "This update makes fitness tracking faster. Sync is more reliable. Fitness charts load instantly.";

    fn records() -> Vec<KeywordRecord> {
        vec![
            KeywordRecord::new("workout", 12, 70.0, 40.0).unwrap(),
            KeywordRecord::new("fitness", 1, 100.0, 0.0).unwrap(),
            KeywordRecord::new("yoga", 30, 55.0, 35.0).unwrap(),
        ]
    }

    fn field_request() -> FieldRequest {
        FieldRequest {
            app_name: "Pulse".to_string(),
            primary_keyword: "fitness".to_string(),
            features: vec!["Workout plans".to_string()],
            related_keywords: Vec::new(),
            language: Language::En,
        }
    }

    fn all_request() -> GenerateAllRequest {
        GenerateAllRequest {
            app_name: "Pulse".to_string(),
            features: vec!["Workout plans".to_string(), "Heart rate zones".to_string()],
            keywords: records(),
            language: Language::En,
        }
    }

    /// Routes by prompt so the three provider-backed fields can be told apart.
    fn routed(subtitle: fn() -> Result<String, ProviderError>) -> ScriptedProvider {
        ScriptedProvider::new(move |prompt| {
            if prompt.contains("App Store subtitle") {
                subtitle()
            } else if prompt.contains("release notes") {
                Ok(WHATS_NEW.to_string())
            } else {
                Ok(DESCRIPTION.to_string())
            }
        })
    }

    fn orchestrator(
        provider: Arc<dyn TextCompletionProvider>,
        cache: Arc<ResultCache<String>>,
        probe: Arc<FixedProbe>,
    ) -> GenerationOrchestrator {
        let guard = LoadGuard::new(probe, LoadThresholds::default()).with_reclaimer(cache.clone());
        GenerationOrchestrator::new(
            provider,
            KeywordScorer::default(),
            cache,
            guard,
            RetryPolicy::default(),
        )
    }

    fn fresh_cache() -> Arc<ResultCache<String>> {
        Arc::new(ResultCache::new(100, Duration::from_secs(3600)))
    }

    #[tokio::test]
    async fn test_analyze_keywords_picks_primary() {
        let orch = orchestrator(Arc::new(ScriptedProvider::always("x")), fresh_cache(), FixedProbe::idle());
        let selection = orch.analyze_keywords(records()).unwrap();
        assert_eq!(selection.primary_keyword, "fitness");
        assert_eq!(selection.candidates.len(), 2);
        assert_eq!(selection.total_keywords_analyzed, 3);
    }

    #[tokio::test]
    async fn test_analyze_keywords_rejects_empty_set() {
        let orch = orchestrator(Arc::new(ScriptedProvider::always("x")), fresh_cache(), FixedProbe::idle());
        assert!(matches!(orch.analyze_keywords(Vec::new()), Err(AppError::Selection(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_all_success() {
        let provider = Arc::new(routed(|| Ok("Train smarter every day".to_string())));
        let orch = orchestrator(provider.clone(), fresh_cache(), FixedProbe::idle());

        let bundle = orch.generate_all(all_request()).await.unwrap();

        assert_eq!(bundle.selection.primary_keyword, "fitness");
        assert!(bundle.keyword_field.text.starts_with("fitness, "));
        assert_eq!(bundle.title.text, "Fitness - Pulse");
        assert_eq!(bundle.subtitle.text, "Train smarter every day");
        assert!((4..=7).contains(&bundle.description.keyword_occurrences.unwrap()));
        assert!((4..=7).contains(&bundle.whats_new.keyword_occurrences.unwrap()));
        assert!(bundle.description.length <= 4000);

        let steps: Vec<&str> = bundle.timings.iter().map(|t| t.step.as_str()).collect();
        assert_eq!(
            steps,
            ["analyzing_keywords", "keyword_field", "title", "subtitle", "description", "whats_new"]
        );
        // subtitle, description, what's new
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_all_fails_on_subtitle_provider_failure() {
        let provider = Arc::new(routed(|| {
            Err(ProviderError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }));
        let orch = orchestrator(provider.clone(), fresh_cache(), FixedProbe::idle());

        let err = orch.generate_all(all_request()).await.unwrap_err();

        let AppError::Aggregate(failures) = &err else {
            panic!("expected aggregate error, got {err:?}");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].field, FieldName::Subtitle);
        assert_eq!(failures[0].code, "PROVIDER_ERROR");
        assert!(err.to_string().contains("subtitle"));

        let subtitle_calls = provider
            .prompts()
            .iter()
            .filter(|p| p.contains("App Store subtitle"))
            .count();
        assert_eq!(subtitle_calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_all_reports_every_failed_field() {
        let provider = Arc::new(ScriptedProvider::failing(|| ProviderError::Api {
            status: 400,
            message: "bad request".to_string(),
        }));
        let orch = orchestrator(provider, fresh_cache(), FixedProbe::idle());

        let Err(AppError::Aggregate(failures)) = orch.generate_all(all_request()).await else {
            panic!("expected aggregate error");
        };
        let fields: Vec<FieldName> = failures.iter().map(|f| f.field).collect();
        assert_eq!(fields, [FieldName::Subtitle, FieldName::Description, FieldName::WhatsNew]);
    }

    /// Subtitle requests hang; everything else answers at once.
    struct StalledSubtitle;

    #[async_trait::async_trait]
    impl TextCompletionProvider for StalledSubtitle {
        async fn complete(&self, prompt: &str, _max_output_hint: usize) -> Result<String, ProviderError> {
            if prompt.contains("App Store subtitle") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Ok("Train smarter every day".to_string());
            }
            if prompt.contains("release notes") {
                Ok(WHATS_NEW.to_string())
            } else {
                Ok(DESCRIPTION.to_string())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_request_keeps_finished_fields_cached() {
        let cache = fresh_cache();
        let orch = orchestrator(Arc::new(StalledSubtitle), cache.clone(), FixedProbe::idle());

        let outcome = tokio::time::timeout(Duration::from_secs(5), orch.generate_all(all_request())).await;
        assert!(outcome.is_err(), "request should still be waiting on the subtitle");

        // the in-flight subtitle task was cancelled before it could write
        assert_eq!(cache.invalidate_matching("subtitle:"), 0);
        assert_eq!(cache.invalidate_matching("keyword_field:"), 1);
        assert_eq!(cache.invalidate_matching("description:"), 1);
        assert_eq!(cache.invalidate_matching("whats_new:"), 1);
        // only the title is left ("title:" would also match subtitle keys)
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cached_subtitle_skips_provider() {
        let provider = Arc::new(ScriptedProvider::always("Train smarter every day"));
        let orch = orchestrator(provider.clone(), fresh_cache(), FixedProbe::idle());

        let first = orch.generate_subtitle(field_request()).await.unwrap();
        let second = orch.generate_subtitle(field_request()).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.text, second.text);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_served_while_overloaded() {
        let cache = fresh_cache();
        let provider: Arc<dyn TextCompletionProvider> = Arc::new(ScriptedProvider::always("x"));

        let idle = orchestrator(provider.clone(), cache.clone(), FixedProbe::idle());
        idle.generate_title(field_request()).await.unwrap();

        let busy = orchestrator(provider, cache, FixedProbe::busy());
        let title = busy.generate_title(field_request()).await.unwrap();
        assert!(title.cached);
        assert_eq!(title.text, "Fitness - Pulse");
    }

    #[tokio::test]
    async fn test_overloaded_guard_rejects_new_work() {
        let provider = Arc::new(ScriptedProvider::always("Train smarter every day"));
        let orch = orchestrator(provider.clone(), fresh_cache(), FixedProbe::busy());

        let result = orch.generate_subtitle(field_request()).await;
        assert!(matches!(result, Err(AppError::Overload(_))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_feature_order_does_not_change_cache_key() {
        let provider = Arc::new(ScriptedProvider::always(DESCRIPTION));
        let orch = orchestrator(provider.clone(), fresh_cache(), FixedProbe::idle());

        let mut request = field_request();
        request.features = vec!["b".to_string(), "a".to_string()];
        orch.generate_description(request.clone()).await.unwrap();

        request.features = vec!["a".to_string(), "b".to_string()];
        let again = orch.generate_description(request).await.unwrap();
        assert!(again.cached);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_keyword_field_operation() {
        let orch = orchestrator(Arc::new(ScriptedProvider::always("x")), fresh_cache(), FixedProbe::idle());
        let text = orch
            .generate_keyword_field(KeywordFieldRequest {
                keywords: records(),
                language: Language::En,
            })
            .await
            .unwrap();
        assert_eq!(text.field, FieldName::KeywordField);
        assert!(text.text.starts_with("fitness"));
        assert!(text.length <= 100);
        assert_eq!(text.keyword_occurrences, None);
    }

    #[tokio::test]
    async fn test_blank_app_name_rejected_before_generation() {
        let provider = Arc::new(ScriptedProvider::always("x"));
        let orch = orchestrator(provider.clone(), fresh_cache(), FixedProbe::idle());
        let mut request = all_request();
        request.app_name = "  ".to_string();

        assert!(matches!(orch.generate_all(request).await, Err(AppError::Validation(_))));
        assert_eq!(provider.calls(), 0);
    }
}
