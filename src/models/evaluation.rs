// src/models/evaluation.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How a completed quiz was (or should be) scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Deterministic rule-based checks only.
    Heuristic,
    /// Per-answer and holistic evaluation by the LLM collaborator.
    #[default]
    AiAssisted,
}

impl ScoringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Heuristic => "heuristic",
            ScoringMode::AiAssisted => "ai_assisted",
        }
    }
}

impl std::str::FromStr for ScoringMode {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heuristic" => Ok(ScoringMode::Heuristic),
            "ai_assisted" => Ok(ScoringMode::AiAssisted),
            other => Err(crate::error::AppError::ValidationFailed(format!(
                "Unknown scoring mode '{}'",
                other
            ))),
        }
    }
}

/// Evaluator verdict on a single answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluation {
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
    pub is_correct: bool,
    #[validate(length(min = 1))]
    pub feedback: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub suggestions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceBreakdown {
    #[serde(default)]
    pub excellent: Vec<String>,
    #[serde(default)]
    pub good: Vec<String>,
    #[serde(default)]
    pub needs_improvement: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecommendations {
    #[serde(default)]
    pub priority_topics: Vec<String>,
    #[serde(default)]
    pub study_plan: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// Holistic evaluation of a whole quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizEvaluation {
    #[validate(range(min = 0.0, max = 100.0))]
    pub overall_score: f64,
    pub performance: PerformanceBreakdown,
    pub learning_recommendations: LearningRecommendations,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default)]
    pub motivational_message: String,
}

/// Everything the AI path produced for a completed quiz, kept with the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAssessment {
    pub answers: Vec<AnswerEvaluation>,
    pub summary: QuizEvaluation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_scores_fail_validation() {
        let eval = AnswerEvaluation {
            score: 140.0,
            is_correct: true,
            feedback: "Bagus".into(),
            key_points: vec![],
            suggestions: None,
        };
        assert!(eval.validate().is_err());
    }

    #[test]
    fn parses_camel_case_payload() {
        let raw = serde_json::json!({
            "overallScore": 72.5,
            "performance": {"excellent": [], "good": ["FEFO"], "needsImprovement": []},
            "learningRecommendations": {"priorityTopics": [], "studyPlan": [], "resources": []},
            "strengths": ["konsisten"],
            "weaknesses": [],
            "nextSteps": "Ulangi materi",
            "motivationalMessage": "Semangat!"
        });
        let eval: QuizEvaluation = serde_json::from_value(raw).unwrap();
        assert_eq!(eval.performance.good, vec!["FEFO".to_string()]);
        assert!(eval.validate().is_ok());
    }
}
