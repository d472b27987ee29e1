// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{error::AppError, models::answer::UserAnswer};

/// Question kind. Drives which answer shapes are accepted and how they are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true-false",
            QuestionType::ShortAnswer => "short-answer",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multiple-choice" | "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "true-false" | "true_false" => Ok(QuestionType::TrueFalse),
            "short-answer" | "short_answer" => Ok(QuestionType::ShortAnswer),
            other => Err(AppError::ValidationFailed(format!(
                "Unknown question type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(AppError::ValidationFailed(format!(
                "Unknown difficulty '{}'",
                other
            ))),
        }
    }
}

/// Difficulty requested for a whole quiz. `Mixed` draws from every level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizDifficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Mixed,
}

impl QuizDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizDifficulty::Easy => "easy",
            QuizDifficulty::Medium => "medium",
            QuizDifficulty::Hard => "hard",
            QuizDifficulty::Mixed => "mixed",
        }
    }

    /// The single level to filter the bank by, if any.
    pub fn level(&self) -> Option<Difficulty> {
        match self {
            QuizDifficulty::Easy => Some(Difficulty::Easy),
            QuizDifficulty::Medium => Some(Difficulty::Medium),
            QuizDifficulty::Hard => Some(Difficulty::Hard),
            QuizDifficulty::Mixed => None,
        }
    }
}

impl fmt::Display for QuizDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizDifficulty {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("mixed") {
            return Ok(QuizDifficulty::Mixed);
        }
        Ok(match s.parse::<Difficulty>()? {
            Difficulty::Easy => QuizDifficulty::Easy,
            Difficulty::Medium => QuizDifficulty::Medium,
            Difficulty::Hard => QuizDifficulty::Hard,
        })
    }
}

impl From<Difficulty> for QuizDifficulty {
    fn from(d: Difficulty) -> Self {
        match d {
            Difficulty::Easy => QuizDifficulty::Easy,
            Difficulty::Medium => QuizDifficulty::Medium,
            Difficulty::Hard => QuizDifficulty::Hard,
        }
    }
}

/// The stored key for a question. Its variant always matches the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CorrectAnswer {
    /// Zero-based index into `options`.
    Option(usize),
    Boolean(bool),
    Text(String),
}

impl CorrectAnswer {
    /// Human-readable form, resolving option indexes to their text.
    pub fn display_text(&self, options: &[String]) -> String {
        match self {
            CorrectAnswer::Option(idx) => options
                .get(*idx)
                .cloned()
                .unwrap_or_else(|| idx.to_string()),
            CorrectAnswer::Boolean(b) => b.to_string(),
            CorrectAnswer::Text(t) => t.clone(),
        }
    }
}

/// A question from the bank, or a denormalized snapshot of one inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub topic: String,

    pub difficulty: Difficulty,

    /// The prompt shown to the user.
    pub question: String,

    /// Answer options. Only multiple-choice questions carry any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    pub correct_answer: CorrectAnswer,

    /// Static explanation shipped with the question. Used when the AI tutor is unavailable.
    pub explanation: String,

    pub ai_hint: String,

    pub bookmarked: bool,

    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub last_used: Option<DateTime<Utc>>,
}

impl Question {
    /// Rejects answers whose shape does not fit this question.
    pub fn check_answer(&self, answer: &UserAnswer) -> Result<(), AppError> {
        let fits = match (self.question_type, answer) {
            (_, UserAnswer::Unanswered) => true,
            (QuestionType::MultipleChoice, UserAnswer::SelectedIndex(idx)) => {
                *idx < self.options.len()
            }
            (QuestionType::TrueFalse, UserAnswer::BooleanChoice(_)) => true,
            (QuestionType::ShortAnswer, UserAnswer::FreeText(_)) => true,
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(format!(
                "Answer {:?} does not fit a {} question",
                answer, self.question_type
            )))
        }
    }

    /// Rule-based correctness. `None` means the answer cannot be judged without
    /// the AI evaluator (short answers).
    pub fn heuristic_verdict(&self, answer: &UserAnswer) -> Option<bool> {
        match (&self.correct_answer, answer) {
            (CorrectAnswer::Text(_), _) => None,
            (CorrectAnswer::Option(expected), UserAnswer::SelectedIndex(given)) => {
                Some(expected == given)
            }
            (CorrectAnswer::Boolean(expected), UserAnswer::BooleanChoice(given)) => {
                Some(expected == given)
            }
            _ => Some(false),
        }
    }

    /// The user's answer as the evaluator should read it: option text for
    /// multiple choice, literal text otherwise.
    pub fn format_answer(&self, answer: &UserAnswer) -> String {
        match answer {
            UserAnswer::SelectedIndex(idx) => self
                .options
                .get(*idx)
                .cloned()
                .unwrap_or_else(|| idx.to_string()),
            other => other.canonical(),
        }
    }

    pub fn check_shape(&self) -> Result<(), AppError> {
        check_shape(
            self.question_type,
            &self.question,
            &self.options,
            &self.correct_answer,
        )
    }

    pub fn correct_answer_text(&self) -> String {
        self.correct_answer.display_text(&self.options)
    }

    /// Swaps in regenerated content while keeping identity, bookmark and creation time.
    pub fn replace_content(&mut self, fresh: NewQuestion) {
        self.question_type = fresh.question_type;
        self.difficulty = fresh.difficulty;
        self.question = fresh.question;
        self.options = fresh.options;
        self.correct_answer = fresh.correct_answer;
        self.explanation = fresh.explanation;
        self.ai_hint = fresh.ai_hint;
        self.tags = fresh.tags;
    }
}

/// A question that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuestion {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: CorrectAnswer,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub ai_hint: String,
    #[serde(default)]
    pub bookmarked: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Defaults to the insertion time when absent.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewQuestion {
    /// Checks that options and the correct answer agree with the question type.
    pub fn check_shape(&self) -> Result<(), AppError> {
        check_shape(
            self.question_type,
            &self.question,
            &self.options,
            &self.correct_answer,
        )
    }
}

/// Shared invariant for stored and unstored questions: multiple choice carries
/// at least two options and an in-range answer index, true/false a boolean,
/// short answer a text, and only multiple choice carries options.
pub(crate) fn check_shape(
    question_type: QuestionType,
    text: &str,
    options: &[String],
    correct_answer: &CorrectAnswer,
) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::ValidationFailed(
            "Question text cannot be empty".to_string(),
        ));
    }

    match (question_type, correct_answer) {
        (QuestionType::MultipleChoice, CorrectAnswer::Option(idx)) => {
            if options.len() < 2 {
                return Err(AppError::ValidationFailed(
                    "Multiple-choice questions need at least two options".to_string(),
                ));
            }
            if *idx >= options.len() {
                return Err(AppError::ValidationFailed(format!(
                    "Correct option {} is out of range for {} options",
                    idx,
                    options.len()
                )));
            }
            Ok(())
        }
        (QuestionType::TrueFalse, CorrectAnswer::Boolean(_))
        | (QuestionType::ShortAnswer, CorrectAnswer::Text(_)) => {
            if options.is_empty() {
                Ok(())
            } else {
                Err(AppError::ValidationFailed(format!(
                    "{} questions cannot carry options",
                    question_type
                )))
            }
        }
        (kind, answer) => Err(AppError::ValidationFailed(format!(
            "Correct answer {:?} does not fit a {} question",
            answer, kind
        ))),
    }
}

/// Question as returned by the generation collaborator, before normalisation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub difficulty: String,
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// A string for every type; multiple choice may also send a bare index.
    pub correct_answer: serde_json::Value,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub ai_hint: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl GeneratedQuestion {
    /// Normalises collaborator output into a storable question under `topic`.
    pub fn into_new_question(self, topic: &str) -> Result<NewQuestion, AppError> {
        let question_type: QuestionType = self.question_type.parse()?;
        let difficulty: Difficulty = self.difficulty.parse()?;
        let options = match question_type {
            QuestionType::MultipleChoice => self.options.unwrap_or_default(),
            _ => Vec::new(),
        };

        let correct_answer = match question_type {
            QuestionType::MultipleChoice => {
                CorrectAnswer::Option(resolve_option(&self.correct_answer, &options)?)
            }
            QuestionType::TrueFalse => {
                let raw = value_as_text(&self.correct_answer);
                match raw.trim().to_ascii_lowercase().as_str() {
                    "true" => CorrectAnswer::Boolean(true),
                    "false" => CorrectAnswer::Boolean(false),
                    other => {
                        return Err(AppError::ValidationFailed(format!(
                            "True/false answer must be 'true' or 'false', got '{}'",
                            other
                        )));
                    }
                }
            }
            QuestionType::ShortAnswer => {
                CorrectAnswer::Text(value_as_text(&self.correct_answer).trim().to_string())
            }
        };

        let question = NewQuestion {
            question_type,
            topic: topic.to_string(),
            difficulty,
            question: self.question.trim().to_string(),
            options,
            correct_answer,
            explanation: self.explanation,
            ai_hint: self.ai_hint,
            bookmarked: false,
            tags: self.tags,
            created_at: None,
        };
        question.check_shape()?;
        Ok(question)
    }
}

fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Accepts either a zero-based index (number or numeric string) or the option text.
fn resolve_option(value: &serde_json::Value, options: &[String]) -> Result<usize, AppError> {
    let by_index = match value {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
        serde_json::Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    if let Some(idx) = by_index.filter(|idx| *idx < options.len()) {
        return Ok(idx);
    }

    let text = value_as_text(value);
    options
        .iter()
        .position(|opt| opt.trim().eq_ignore_ascii_case(text.trim()))
        .ok_or_else(|| {
            AppError::ValidationFailed(format!(
                "Correct answer '{}' matches none of the options",
                text
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generated(kind: &str, options: Option<Vec<&str>>, answer: serde_json::Value) -> GeneratedQuestion {
        GeneratedQuestion {
            question_type: kind.to_string(),
            topic: Some("ignored".to_string()),
            difficulty: "Medium".to_string(),
            question: "Apa kepanjangan FEFO?".to_string(),
            options: options.map(|o| o.into_iter().map(String::from).collect()),
            correct_answer: answer,
            explanation: "".to_string(),
            ai_hint: "".to_string(),
            tags: vec![],
        }
    }

    #[test]
    fn multiple_choice_answer_resolves_from_text_or_index() {
        let opts = Some(vec!["First In", "First Expired First Out", "Last In"]);

        let by_text = generated("multiple-choice", opts.clone(), json!("first expired first out"))
            .into_new_question("Manajemen Inventori")
            .unwrap();
        assert_eq!(by_text.correct_answer, CorrectAnswer::Option(1));
        assert_eq!(by_text.topic, "Manajemen Inventori");

        let by_index = generated("multiple-choice", opts, json!(2))
            .into_new_question("Manajemen Inventori")
            .unwrap();
        assert_eq!(by_index.correct_answer, CorrectAnswer::Option(2));
    }

    #[test]
    fn unresolvable_multiple_choice_is_rejected() {
        let err = generated("multiple-choice", Some(vec!["A", "B"]), json!("Z"))
            .into_new_question("SOP Logistik")
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));

        let err = generated("multiple-choice", None, json!("0"))
            .into_new_question("SOP Logistik")
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[test]
    fn true_false_requires_literal_booleans() {
        let ok = generated("true-false", None, json!("TRUE"))
            .into_new_question("SOP Logistik")
            .unwrap();
        assert_eq!(ok.correct_answer, CorrectAnswer::Boolean(true));

        let err = generated("true-false", None, json!("benar"))
            .into_new_question("SOP Logistik")
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[test]
    fn quiz_difficulty_parses_mixed_and_levels() {
        assert_eq!("mixed".parse::<QuizDifficulty>().unwrap(), QuizDifficulty::Mixed);
        assert_eq!("Hard".parse::<QuizDifficulty>().unwrap().level(), Some(Difficulty::Hard));
        assert!("sedang".parse::<QuizDifficulty>().is_err());
    }
}
