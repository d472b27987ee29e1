// src/models/answer.rs

use serde::{Deserialize, Serialize};

/// A user's response to one question.
///
/// Which variant is acceptable depends on the question type; see
/// `Question::check_answer`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UserAnswer {
    #[default]
    Unanswered,
    /// Zero-based option index (multiple choice).
    SelectedIndex(usize),
    /// True/false choice.
    BooleanChoice(bool),
    /// Short-answer text.
    FreeText(String),
}

impl UserAnswer {
    /// Blank free text counts as no answer.
    pub fn normalized(self) -> Self {
        match self {
            UserAnswer::FreeText(text) if text.trim().is_empty() => UserAnswer::Unanswered,
            UserAnswer::FreeText(text) => UserAnswer::FreeText(text.trim().to_string()),
            other => other,
        }
    }

    pub fn is_answered(&self) -> bool {
        !matches!(self, UserAnswer::Unanswered)
    }

    /// Stable text form, used as the answer part of cache keys.
    /// Unanswered is the empty string.
    pub fn canonical(&self) -> String {
        match self {
            UserAnswer::Unanswered => String::new(),
            UserAnswer::SelectedIndex(idx) => idx.to_string(),
            UserAnswer::BooleanChoice(b) => b.to_string(),
            UserAnswer::FreeText(text) => text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_normalizes_to_unanswered() {
        assert_eq!(
            UserAnswer::FreeText("   ".into()).normalized(),
            UserAnswer::Unanswered
        );
        assert_eq!(
            UserAnswer::FreeText(" verifikasi ".into()).normalized(),
            UserAnswer::FreeText("verifikasi".into())
        );
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(UserAnswer::Unanswered.canonical(), "");
        assert_eq!(UserAnswer::SelectedIndex(3).canonical(), "3");
        assert_eq!(UserAnswer::BooleanChoice(false).canonical(), "false");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(UserAnswer::SelectedIndex(1)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "selected_index", "value": 1}));

        let back: UserAnswer = serde_json::from_value(serde_json::json!({"kind": "unanswered"})).unwrap();
        assert_eq!(back, UserAnswer::Unanswered);
    }
}
