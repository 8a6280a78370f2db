use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::cache::store::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::keywords::ScoringWeights;
use crate::llm_client::{RetryPolicy, DEFAULT_MODEL};
use crate::load_guard::LoadThresholds;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub port: u16,
    pub rust_log: String,
    pub retry: RetryPolicy,
    pub scoring_weights: ScoringWeights,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub load_thresholds: LoadThresholds,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = RetryPolicy::default();
        let thresholds = LoadThresholds::default();

        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "PROVIDER_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_delay: Duration::from_millis(parse_or(
                &lookup,
                "PROVIDER_BACKOFF_BASE_MS",
                defaults.base_delay.as_millis() as u64,
            )?),
            attempt_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PROVIDER_TIMEOUT_SECS",
                defaults.attempt_timeout.as_secs(),
            )?),
        };
        if retry.max_attempts == 0 {
            bail!("PROVIDER_MAX_ATTEMPTS must be at least 1");
        }

        let load_thresholds = LoadThresholds {
            memory: parse_fraction(&lookup, "LOAD_MEMORY_THRESHOLD", thresholds.memory)?,
            cpu: parse_fraction(&lookup, "LOAD_CPU_THRESHOLD", thresholds.cpu)?,
        };

        let scoring_weights = match lookup("SCORING_WEIGHTS") {
            Some(raw) => parse_weights(&raw).context("SCORING_WEIGHTS is invalid")?,
            None => ScoringWeights::default(),
        };

        Ok(Config {
            gemini_api_key: require_env(&lookup, "GEMINI_API_KEY")?,
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port: parse_or(&lookup, "PORT", 8000)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            retry,
            scoring_weights,
            cache_ttl: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SECS", DEFAULT_TTL.as_secs())?),
            cache_capacity: parse_or(&lookup, "CACHE_CAPACITY", DEFAULT_CAPACITY)?,
            load_thresholds,
        })
    }
}

fn require_env(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn parse_fraction(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> Result<f64> {
    let value = parse_or(lookup, key, default)?;
    if !(0.0..=1.0).contains(&value) {
        bail!("{key} must be between 0 and 1, got {value}");
    }
    Ok(value)
}

/// `ranking,popularity,difficulty`, e.g. `0.4,0.4,0.2`.
fn parse_weights(raw: &str) -> Result<ScoringWeights> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .context("weights must be numbers")?;

    let &[ranking, popularity, difficulty] = parts.as_slice() else {
        return Err(anyhow!("expected 3 comma-separated weights, got {}", parts.len()));
    };

    let weights = ScoringWeights {
        ranking,
        popularity,
        difficulty,
    };
    weights.validate()?;
    Ok(weights)
}
