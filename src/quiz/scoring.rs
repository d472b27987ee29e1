// src/quiz/scoring.rs

//! Heuristic and AI-assisted scoring of a finished attempt.

use crate::{
    error::AppError,
    llm::{AnswerEvaluationRequest, LlmService, QuizEvaluationRequest},
    models::{
        answer::UserAnswer,
        evaluation::{AiAssessment, AnswerEvaluation, ScoringMode},
        question::{Question, QuizDifficulty},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub score: u32,
    pub correct: u32,
    pub unscored: u32,
    pub mode: ScoringMode,
    pub assessment: Option<AiAssessment>,
}

/// `round(100 * part / total)`, 0 for an empty quiz.
pub fn percent(part: u32, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * f64::from(part) / total as f64).round() as u32
}

/// Rule-based scoring. Multiple choice and true/false must match exactly;
/// short answers are left unscored and count as not correct.
pub fn heuristic(questions: &[Question], answers: &[UserAnswer]) -> Scored {
    let mut correct = 0;
    let mut unscored = 0;
    for (question, answer) in questions.iter().zip(answers) {
        match question.heuristic_verdict(answer) {
            Some(true) => correct += 1,
            Some(false) => {}
            None => unscored += 1,
        }
    }

    Scored {
        score: percent(correct, questions.len()),
        correct,
        unscored,
        mode: ScoringMode::Heuristic,
        assessment: None,
    }
}

/// Per-answer evaluation plus one holistic evaluation, all by the LLM.
/// Unanswered questions are scored 0 without a call.
pub async fn ai_assisted(
    llm: &dyn LlmService,
    topic: &str,
    difficulty: QuizDifficulty,
    questions: &[Question],
    answers: &[UserAnswer],
    time_spent: u64,
) -> Result<Scored, AppError> {
    let mut evaluations = Vec::with_capacity(questions.len());
    for (question, answer) in questions.iter().zip(answers) {
        if !answer.is_answered() {
            evaluations.push(AnswerEvaluation {
                score: 0.0,
                is_correct: false,
                feedback: "Soal tidak dijawab.".to_string(),
                key_points: Vec::new(),
                suggestions: None,
            });
            continue;
        }

        let req = AnswerEvaluationRequest {
            question: question.question.clone(),
            user_answer: question.format_answer(answer),
            correct_answer: question.correct_answer_text(),
            topic: topic.to_string(),
            question_type: question.question_type,
        };
        evaluations.push(llm.evaluate_answer(&req).await?);
    }

    let correct = evaluations.iter().filter(|e| e.is_correct).count() as u32;
    let score = if evaluations.is_empty() {
        0
    } else {
        let sum: f64 = evaluations.iter().map(|e| e.score.clamp(0.0, 100.0)).sum();
        (sum / evaluations.len() as f64).round() as u32
    };

    let summary = llm
        .evaluate_quiz(&QuizEvaluationRequest {
            topic: topic.to_string(),
            difficulty,
            questions: questions.iter().map(|q| q.question.clone()).collect(),
            user_answers: questions
                .iter()
                .zip(answers)
                .map(|(q, a)| q.format_answer(a))
                .collect(),
            evaluations: evaluations.clone(),
            time_spent,
            total_questions: questions.len(),
        })
        .await?;

    Ok(Scored {
        score,
        correct,
        unscored: 0,
        mode: ScoringMode::AiAssisted,
        assessment: Some(AiAssessment {
            answers: evaluations,
            summary,
        }),
    })
}

/// Scores in `mode`, falling back to heuristic scoring when any AI call fails.
pub async fn score(
    mode: ScoringMode,
    llm: &dyn LlmService,
    topic: &str,
    difficulty: QuizDifficulty,
    questions: &[Question],
    answers: &[UserAnswer],
    time_spent: u64,
) -> Scored {
    match mode {
        ScoringMode::Heuristic => heuristic(questions, answers),
        ScoringMode::AiAssisted => {
            match ai_assisted(llm, topic, difficulty, questions, answers, time_spent).await {
                Ok(scored) => scored,
                Err(e) => {
                    tracing::warn!("AI scoring failed, using heuristic scoring: {}", e);
                    heuristic(questions, answers)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{CorrectAnswer, Difficulty, QuestionType};
    use chrono::Utc;

    fn question(kind: QuestionType, answer: CorrectAnswer) -> Question {
        let options = if kind == QuestionType::MultipleChoice {
            vec!["A".into(), "B".into(), "C".into(), "D".into()]
        } else {
            vec![]
        };
        Question {
            id: 1,
            question_type: kind,
            topic: "Distribusi Obat".into(),
            difficulty: Difficulty::Medium,
            question: "Soal".into(),
            options,
            correct_answer: answer,
            explanation: String::new(),
            ai_hint: String::new(),
            bookmarked: false,
            tags: vec![],
            created_at: Utc::now(),
            last_used: None,
        }
    }

    #[test]
    fn three_of_five_multiple_choice_scores_sixty() {
        let questions: Vec<_> = (0..5)
            .map(|_| question(QuestionType::MultipleChoice, CorrectAnswer::Option(1)))
            .collect();
        let answers = vec![
            UserAnswer::SelectedIndex(1),
            UserAnswer::SelectedIndex(1),
            UserAnswer::SelectedIndex(1),
            UserAnswer::SelectedIndex(0),
            UserAnswer::SelectedIndex(3),
        ];
        let scored = heuristic(&questions, &answers);
        assert_eq!(scored.score, 60);
        assert_eq!(scored.correct, 3);
    }

    #[test]
    fn short_answers_are_unscored_but_count_in_total() {
        let questions = vec![
            question(QuestionType::TrueFalse, CorrectAnswer::Boolean(false)),
            question(QuestionType::ShortAnswer, CorrectAnswer::Text("verifikasi".into())),
        ];
        let answers = vec![
            UserAnswer::BooleanChoice(false),
            UserAnswer::FreeText("verifikasi dokumen".into()),
        ];
        let scored = heuristic(&questions, &answers);
        assert_eq!(scored.correct, 1);
        assert_eq!(scored.unscored, 1);
        assert_eq!(scored.score, 50);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 0), 0);
    }
}
