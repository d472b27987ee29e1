// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

use crate::models::evaluation::ScoringMode;

/// Default countdown for one quiz attempt (30 minutes).
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 1800;

/// Wall-clock interval between in-progress snapshot writes.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 30;

/// Cached explanations, hints and unused questions older than this are purged.
pub const DEFAULT_CACHE_RETENTION_DAYS: i64 = 7;

/// Upper bound on questions per quiz, for both drawing and generation.
pub const MAX_QUESTIONS_PER_QUIZ: usize = 50;

/// Number of recent sessions shown on the dashboard.
pub const RECENT_SESSIONS_LIMIT: i64 = 10;

const DEFAULT_LLM_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub rust_log: String,
    pub llm: LlmConfig,
    pub quiz: QuizSettings,
    pub cache_retention_days: i64,
}

/// Connection settings for the LLM collaborator.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

/// Tunables for the quiz state machine.
#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub time_limit_secs: u64,
    pub autosave_interval: Duration,
    pub scoring_mode: ScoringMode,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            autosave_interval: Duration::from_secs(DEFAULT_AUTOSAVE_SECS),
            scoring_mode: ScoringMode::AiAssisted,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://logisticare.db?mode=rwc".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let llm = LlmConfig {
            endpoint: env::var("LLM_ENDPOINT").unwrap_or_else(|_| DEFAULT_LLM_ENDPOINT.to_string()),
            api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            timeout: Duration::from_secs(parse_or("LLM_TIMEOUT_SECS", 60)),
            max_retries: parse_or("LLM_MAX_RETRIES", 2),
            retry_base_delay: Duration::from_millis(parse_or("LLM_RETRY_BASE_MS", 500)),
        };

        let scoring_mode = match env::var("QUIZ_SCORING_MODE").as_deref() {
            Ok("heuristic") => ScoringMode::Heuristic,
            Ok("ai") | Err(_) => ScoringMode::AiAssisted,
            Ok(other) => {
                tracing::warn!("Unknown QUIZ_SCORING_MODE '{}', using AI-assisted scoring", other);
                ScoringMode::AiAssisted
            }
        };

        let quiz = QuizSettings {
            time_limit_secs: parse_or("QUIZ_TIME_LIMIT_SECS", DEFAULT_TIME_LIMIT_SECS),
            autosave_interval: Duration::from_secs(parse_or(
                "QUIZ_AUTOSAVE_SECS",
                DEFAULT_AUTOSAVE_SECS,
            )),
            scoring_mode,
        };

        let cache_retention_days = parse_or("CACHE_RETENTION_DAYS", DEFAULT_CACHE_RETENTION_DAYS);

        Self {
            database_url,
            bind_addr,
            rust_log,
            llm,
            quiz,
            cache_retention_days,
        }
    }
}

/// Reads a numeric variable, keeping the default when it is absent or malformed.
fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value '{}' for {}, using {}", raw, key, default);
            default
        }),
        Err(_) => default,
    }
}
