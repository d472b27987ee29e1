// src/llm/client.rs

//! `LlmService` over an OpenAI-compatible chat-completions API.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};
use validator::Validate;

use crate::{
    config::LlmConfig,
    error::AppError,
    llm::{
        AnswerEvaluationRequest, ExplanationRequest, HintRequest, LlmService, QuestionsRequest,
        QuizEvaluationRequest, ReadingMaterialRequest, RegenerateRequest, prompts,
    },
    models::{
        evaluation::{AnswerEvaluation, QuizEvaluation},
        question::{GeneratedQuestion, NewQuestion},
        reading_material::{GeneratedReadingMaterial, NewReadingMaterial},
    },
};

static FENCED_JSON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok());

/// Retry policy for collaborator calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            retryable_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    pub fn from_settings(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: config.retry_base_delay,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionsEnvelope {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct QuestionEnvelope {
    question: GeneratedQuestion,
}

#[derive(Debug, Deserialize)]
struct MaterialEnvelope {
    material: GeneratedReadingMaterial,
}

/// Pulls the JSON document out of a model reply, which may wrap it in a
/// fenced code block.
pub fn extract_json(content: &str) -> &str {
    FENCED_JSON
        .as_ref()
        .and_then(|re| re.captures(content))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(content)
        .trim()
}

pub struct ChatClient {
    http: Client,
    config: LlmConfig,
    retry: RetryConfig,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalServerError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            retry: RetryConfig::from_settings(config),
            config: config.clone(),
        })
    }

    /// Sends one chat turn and returns the reply text.
    async fn complete(&self, prompt: String, json_reply: bool) -> Result<String, AppError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": prompts::SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.7,
        });
        if json_reply {
            body["response_format"] = json!({"type": "json_object"});
        }

        let completion = self.send_with_retry(&body).await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::GenerationFailed("Model returned an empty reply".to_string()))
    }

    async fn complete_json<T: DeserializeOwned>(&self, prompt: String) -> Result<T, AppError> {
        let content = self.complete(prompt, true).await?;
        serde_json::from_str(extract_json(&content)).map_err(|e| {
            warn!("Unparseable model reply: {}", e);
            AppError::GenerationFailed(format!("Model reply is not valid JSON: {}", e))
        })
    }

    async fn complete_text(&self, prompt: String) -> Result<String, AppError> {
        Ok(self.complete(prompt, false).await?.trim().to_string())
    }

    /// Posts `body` with exponential backoff on timeouts, connection errors
    /// and retryable statuses.
    async fn send_with_retry(&self, body: &serde_json::Value) -> Result<ChatCompletion, AppError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            AppError::GenerationFailed("LLM API key is not configured".to_string())
        })?;
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        let mut last_error = String::from("request was not sent");

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                warn!(
                    "Retry attempt {}/{} after {:?}",
                    attempt, self.retry.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }

            debug!("Sending request to {} (attempt {})", url, attempt + 1);
            let result = self
                .http
                .post(&url)
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<ChatCompletion>().await.map_err(|e| {
                            AppError::GenerationFailed(format!("Malformed completion: {}", e))
                        });
                    }

                    let error_text = response.text().await.unwrap_or_default();
                    if self.retry.retryable_status_codes.contains(&status.as_u16()) {
                        warn!("Retryable error ({}): {}", status, error_text);
                        last_error = format!("API error {}: {}", status, error_text);
                        continue;
                    }
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        tracing::error!("LLM endpoint rejected the API key ({})", status);
                    }
                    return Err(AppError::GenerationFailed(format!(
                        "API error {}: {}",
                        status, error_text
                    )));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!("Network error (retrying): {}", e);
                    last_error = e.to_string();
                }
                Err(e) => {
                    return Err(AppError::GenerationFailed(format!("Failed to send request: {}", e)));
                }
            }
        }

        Err(AppError::GenerationFailed(format!(
            "Gave up after {} attempts: {}",
            self.retry.max_retries + 1,
            last_error
        )))
    }
}

/// A regenerated question must keep the original's type and difficulty.
fn matches_original(req: &RegenerateRequest, fresh: NewQuestion) -> Result<NewQuestion, AppError> {
    if fresh.question_type != req.question_type {
        return Err(AppError::ValidationFailed(format!(
            "Expected a {} question, got {}",
            req.question_type, fresh.question_type
        )));
    }
    if fresh.difficulty != req.difficulty {
        return Err(AppError::ValidationFailed(format!(
            "Expected a {} question, got {}",
            req.difficulty, fresh.difficulty
        )));
    }
    Ok(fresh)
}

#[async_trait]
impl LlmService for ChatClient {
    async fn generate_questions(&self, req: &QuestionsRequest) -> Result<Vec<NewQuestion>, AppError> {
        let envelope: QuestionsEnvelope = self.complete_json(prompts::generate_questions(req)).await?;
        if envelope.questions.is_empty() {
            return Err(AppError::GenerationFailed("Model returned no questions".to_string()));
        }

        envelope
            .questions
            .into_iter()
            .take(req.count)
            .map(|q| {
                q.validate()?;
                q.into_new_question(&req.topic)
            })
            .collect()
    }

    async fn regenerate_question(&self, req: &RegenerateRequest) -> Result<NewQuestion, AppError> {
        let envelope: QuestionEnvelope = self.complete_json(prompts::regenerate_question(req)).await?;
        envelope.question.validate()?;
        let fresh = envelope.question.into_new_question(&req.topic)?;
        matches_original(req, fresh)
    }

    async fn generate_reading_material(
        &self,
        req: &ReadingMaterialRequest,
    ) -> Result<NewReadingMaterial, AppError> {
        let envelope: MaterialEnvelope = self.complete_json(prompts::reading_material(req)).await?;
        envelope.material.validate()?;
        envelope.material.into_new(&req.topic)
    }

    async fn explanation(&self, req: &ExplanationRequest) -> Result<String, AppError> {
        self.complete_text(prompts::explanation(req)).await
    }

    async fn hint(&self, req: &HintRequest) -> Result<String, AppError> {
        self.complete_text(prompts::hint(req)).await
    }

    async fn evaluate_answer(
        &self,
        req: &AnswerEvaluationRequest,
    ) -> Result<AnswerEvaluation, AppError> {
        let evaluation: AnswerEvaluation = self.complete_json(prompts::evaluate_answer(req)).await?;
        evaluation.validate()?;
        Ok(evaluation)
    }

    async fn evaluate_quiz(&self, req: &QuizEvaluationRequest) -> Result<QuizEvaluation, AppError> {
        let evaluation: QuizEvaluation = self.complete_json(prompts::evaluate_quiz(req)).await?;
        evaluation.validate()?;
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, QuestionType};

    #[test]
    fn extracts_fenced_json() {
        let reply = "Berikut hasilnya:\n```json\n{\"score\": 80}\n```\nSemoga membantu";
        assert_eq!(extract_json(reply), "{\"score\": 80}");
        assert_eq!(extract_json("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn regenerated_question_keeps_type_and_difficulty() {
        let req = RegenerateRequest {
            original_question: "Apa itu FEFO?".into(),
            topic: "Manajemen Inventori".into(),
            difficulty: Difficulty::Hard,
            question_type: QuestionType::MultipleChoice,
        };
        let generated = |difficulty: &str| GeneratedQuestion {
            question_type: "multiple-choice".into(),
            topic: None,
            difficulty: difficulty.into(),
            question: "Apa kepanjangan FEFO?".into(),
            options: Some(vec!["First Expired First Out".into(), "First Entry First Out".into()]),
            correct_answer: serde_json::json!(0),
            explanation: String::new(),
            ai_hint: String::new(),
            tags: Vec::new(),
        };

        let same = generated("hard").into_new_question(&req.topic).unwrap();
        assert!(matches_original(&req, same).is_ok());

        let easier = generated("easy").into_new_question(&req.topic).unwrap();
        assert!(matches!(
            matches_original(&req, easier),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let retry = RetryConfig {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(1),
            ..RetryConfig::default()
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(500));
        assert_eq!(retry.delay_for(2), Duration::from_secs(1));
        assert_eq!(retry.delay_for(5), Duration::from_secs(1));
    }

    #[test]
    fn default_retries_on_rate_limit_and_server_errors() {
        let retry = RetryConfig::default();
        for code in [429, 500, 502, 503, 504] {
            assert!(retry.retryable_status_codes.contains(&code));
        }
        assert!(!retry.retryable_status_codes.contains(&400));
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            model: "test".into(),
            timeout: Duration::from_secs(1),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(1),
        };
        let client = ChatClient::new(&config).unwrap();
        let err = client
            .hint(&HintRequest {
                question: "Apa itu FEFO?".into(),
                topic: "Manajemen Inventori".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));
    }
}
