// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use logisticare::{
    error::AppError,
    llm::{
        AnswerEvaluationRequest, ExplanationRequest, HintRequest, LlmService, QuestionsRequest,
        QuizEvaluationRequest, ReadingMaterialRequest, RegenerateRequest,
    },
    models::{
        evaluation::{AnswerEvaluation, LearningRecommendations, PerformanceBreakdown, QuizEvaluation},
        question::{CorrectAnswer, Difficulty, NewQuestion, QuestionType},
        reading_material::NewReadingMaterial,
    },
};

/// Per-method call counters.
#[derive(Debug, Default)]
pub struct Calls {
    pub generate_questions: AtomicUsize,
    pub regenerate_question: AtomicUsize,
    pub reading_material: AtomicUsize,
    pub explanation: AtomicUsize,
    pub hint: AtomicUsize,
    pub evaluate_answer: AtomicUsize,
    pub evaluate_quiz: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Scripted LLM. Every call is counted; `fail(true)` makes every call fail.
#[derive(Debug, Default)]
pub struct MockLlm {
    pub calls: Calls,
    failing: AtomicBool,
}

impl MockLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    fn check(&self, counter: &AtomicUsize) -> Result<(), AppError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::GenerationFailed("mock collaborator is down".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn generate_questions(&self, req: &QuestionsRequest) -> Result<Vec<NewQuestion>, AppError> {
        self.check(&self.calls.generate_questions)?;
        Ok((0..req.count)
            .map(|i| multiple_choice(&req.topic, &format!("Generated question {}", i + 1), 0))
            .collect())
    }

    async fn regenerate_question(&self, req: &RegenerateRequest) -> Result<NewQuestion, AppError> {
        self.check(&self.calls.regenerate_question)?;
        let mut fresh = multiple_choice(&req.topic, &format!("Variant of: {}", req.original_question), 1);
        fresh.difficulty = req.difficulty;
        fresh.question_type = QuestionType::MultipleChoice;
        Ok(fresh)
    }

    async fn generate_reading_material(
        &self,
        req: &ReadingMaterialRequest,
    ) -> Result<NewReadingMaterial, AppError> {
        self.check(&self.calls.reading_material)?;
        Ok(NewReadingMaterial {
            topic: req.topic.clone(),
            title: format!("Panduan {}", req.topic),
            content: "## Pendahuluan\n\nMateri bacaan.".to_string(),
            difficulty: req.difficulty,
            tags: vec!["panduan".to_string()],
            created_at: None,
        })
    }

    async fn explanation(&self, req: &ExplanationRequest) -> Result<String, AppError> {
        self.check(&self.calls.explanation)?;
        Ok(format!("Jawaban yang benar adalah {}.", req.correct_answer))
    }

    async fn hint(&self, req: &HintRequest) -> Result<String, AppError> {
        self.check(&self.calls.hint)?;
        Ok(format!("Ingat kembali dasar-dasar {}.", req.topic))
    }

    async fn evaluate_answer(
        &self,
        req: &AnswerEvaluationRequest,
    ) -> Result<AnswerEvaluation, AppError> {
        self.check(&self.calls.evaluate_answer)?;
        let is_correct = req.user_answer == req.correct_answer;
        Ok(AnswerEvaluation {
            score: if is_correct { 100.0 } else { 0.0 },
            is_correct,
            feedback: if is_correct { "Tepat." } else { "Kurang tepat." }.to_string(),
            key_points: Vec::new(),
            suggestions: None,
        })
    }

    async fn evaluate_quiz(&self, req: &QuizEvaluationRequest) -> Result<QuizEvaluation, AppError> {
        self.check(&self.calls.evaluate_quiz)?;
        let correct = req.evaluations.iter().filter(|e| e.is_correct).count();
        Ok(QuizEvaluation {
            overall_score: 100.0 * correct as f64 / req.total_questions.max(1) as f64,
            performance: PerformanceBreakdown::default(),
            learning_recommendations: LearningRecommendations::default(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            next_steps: "Ulangi materi.".to_string(),
            motivational_message: "Terus belajar!".to_string(),
        })
    }
}

/// Four-option question whose correct answer is option `correct`.
pub fn multiple_choice(topic: &str, text: &str, correct: usize) -> NewQuestion {
    NewQuestion {
        question_type: QuestionType::MultipleChoice,
        topic: topic.to_string(),
        difficulty: Difficulty::Medium,
        question: text.to_string(),
        options: vec![
            "Gudang farmasi".to_string(),
            "Instalasi gizi".to_string(),
            "Laundry".to_string(),
            "CSSD".to_string(),
        ],
        correct_answer: CorrectAnswer::Option(correct),
        explanation: "Penjelasan bawaan.".to_string(),
        ai_hint: String::new(),
        bookmarked: false,
        tags: vec!["logistik".to_string()],
        created_at: None,
    }
}

pub fn true_false(topic: &str, text: &str, correct: bool) -> NewQuestion {
    NewQuestion {
        question_type: QuestionType::TrueFalse,
        options: Vec::new(),
        correct_answer: CorrectAnswer::Boolean(correct),
        ..multiple_choice(topic, text, 0)
    }
}

pub fn short_answer(topic: &str, text: &str, correct: &str) -> NewQuestion {
    NewQuestion {
        question_type: QuestionType::ShortAnswer,
        options: Vec::new(),
        correct_answer: CorrectAnswer::Text(correct.to_string()),
        ..multiple_choice(topic, text, 0)
    }
}

/// `n` distinct multiple-choice questions on `topic`, all answered by option 0.
pub fn bank(topic: &str, n: usize) -> Vec<NewQuestion> {
    (0..n)
        .map(|i| multiple_choice(topic, &format!("{} question {}", topic, i + 1), 0))
        .collect()
}
