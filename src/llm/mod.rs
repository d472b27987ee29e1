// src/llm/mod.rs

//! LLM collaborators: question and reading-material generation, tutoring and
//! answer evaluation.

pub mod client;
pub mod prompts;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        evaluation::{AnswerEvaluation, QuizEvaluation},
        question::{Difficulty, NewQuestion, Question, QuestionType, QuizDifficulty},
        reading_material::NewReadingMaterial,
    },
};

pub use client::{ChatClient, RetryConfig};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
    pub topic: String,
    pub count: usize,
    pub difficulty: QuizDifficulty,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest {
    pub original_question: String,
    pub topic: String,
    pub difficulty: Difficulty,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
}

impl RegenerateRequest {
    pub fn for_question(question: &Question) -> Self {
        Self {
            original_question: question.question.clone(),
            topic: question.topic.clone(),
            difficulty: question.difficulty,
            question_type: question.question_type,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMaterialRequest {
    pub topic: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationRequest {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    pub question: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluationRequest {
    pub question: String,
    /// Option text for multiple choice, the literal answer otherwise.
    pub user_answer: String,
    pub correct_answer: String,
    pub topic: String,
    pub question_type: QuestionType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEvaluationRequest {
    pub topic: String,
    pub difficulty: QuizDifficulty,
    pub questions: Vec<String>,
    pub user_answers: Vec<String>,
    pub evaluations: Vec<AnswerEvaluation>,
    pub time_spent: u64,
    pub total_questions: usize,
}

/// The external LLM services the core depends on.
///
/// Every failure is `GenerationFailed`, or `ValidationFailed` when the reply
/// parsed but did not have the expected shape.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate_questions(&self, req: &QuestionsRequest) -> Result<Vec<NewQuestion>, AppError>;

    /// A fresh question of the same type, difficulty and topic.
    async fn regenerate_question(&self, req: &RegenerateRequest) -> Result<NewQuestion, AppError>;

    async fn generate_reading_material(
        &self,
        req: &ReadingMaterialRequest,
    ) -> Result<NewReadingMaterial, AppError>;

    async fn explanation(&self, req: &ExplanationRequest) -> Result<String, AppError>;

    async fn hint(&self, req: &HintRequest) -> Result<String, AppError>;

    async fn evaluate_answer(
        &self,
        req: &AnswerEvaluationRequest,
    ) -> Result<AnswerEvaluation, AppError>;

    async fn evaluate_quiz(&self, req: &QuizEvaluationRequest) -> Result<QuizEvaluation, AppError>;
}
