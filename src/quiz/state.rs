// src/quiz/state.rs

//! The quiz attempt state machine, free of I/O.
//!
//! Time is passed in by the caller, which keeps every transition
//! deterministic under test.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::AppError,
    models::{
        answer::UserAnswer,
        evaluation::{AiAssessment, ScoringMode},
        progress::{QuizProgress, QuizProgressDraft, UserProgress},
        question::{NewQuestion, Question, QuizDifficulty},
    },
    quiz::timer::Countdown,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizPhase {
    NotStarted,
    InProgress,
    Paused,
    /// Scoring is in flight.
    Completing,
    Completed,
}

/// Outcome of a completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizResult {
    pub session_id: i64,
    /// 0..=100.
    pub score: u32,
    pub correct: u32,
    pub total: usize,
    /// Short answers heuristic scoring could not judge.
    pub unscored: u32,
    pub time_spent: u64,
    /// The mode that actually produced the score.
    pub scoring_mode: ScoringMode,
    pub evaluation: Option<AiAssessment>,
    pub progress: UserProgress,
}

/// Everything scoring needs, copied out when completion begins.
#[derive(Debug, Clone)]
pub struct CompletionInput {
    pub attempt: u64,
    pub topic: String,
    pub difficulty: QuizDifficulty,
    pub questions: Vec<Question>,
    pub answers: Vec<UserAnswer>,
    pub time_spent: u64,
    pub started_at: DateTime<Utc>,
}

/// Result of moving forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved,
    /// `next()` on the last question: the attempt should be completed.
    Finish,
}

#[derive(Debug, Clone)]
pub struct QuizState {
    attempt: u64,
    topic: String,
    difficulty: QuizDifficulty,
    questions: Vec<Question>,
    answers: Vec<UserAnswer>,
    current: usize,
    phase: QuizPhase,
    countdown: Countdown,
    started_at: Option<DateTime<Utc>>,
    /// Creation time recorded on this attempt's snapshots.
    snapshot_created_at: Option<DateTime<Utc>>,
    last_saved: Option<Instant>,
    show_hint: bool,
    show_explanation: bool,
    result: Option<QuizResult>,
}

impl QuizState {
    pub fn new(
        attempt: u64,
        topic: String,
        difficulty: QuizDifficulty,
        questions: Vec<Question>,
        time_limit_secs: u64,
    ) -> Result<Self, AppError> {
        if questions.is_empty() {
            return Err(AppError::BadRequest("A quiz needs at least one question".to_string()));
        }
        let answers = vec![UserAnswer::Unanswered; questions.len()];
        Ok(Self {
            attempt,
            topic,
            difficulty,
            questions,
            answers,
            current: 0,
            phase: QuizPhase::NotStarted,
            countdown: Countdown::new(time_limit_secs),
            started_at: None,
            snapshot_created_at: None,
            last_saved: None,
            show_hint: false,
            show_explanation: false,
            result: None,
        })
    }

    /// Rebuilds a running attempt from a saved snapshot.
    pub fn from_snapshot(
        attempt: u64,
        snapshot: QuizProgress,
        time_limit_secs: u64,
        now: Instant,
    ) -> Result<Self, AppError> {
        if snapshot.questions.is_empty() || snapshot.questions.len() != snapshot.user_answers.len() {
            return Err(AppError::ValidationFailed(format!(
                "Snapshot for '{}' has {} questions and {} answers",
                snapshot.topic,
                snapshot.questions.len(),
                snapshot.user_answers.len()
            )));
        }

        let mut countdown = Countdown::resumed(time_limit_secs, snapshot.time_left);
        countdown.start(now);
        let current = snapshot.current_question_index.min(snapshot.questions.len() - 1);

        Ok(Self {
            attempt,
            topic: snapshot.topic,
            difficulty: snapshot.difficulty,
            questions: snapshot.questions,
            answers: snapshot.user_answers,
            current,
            phase: QuizPhase::InProgress,
            countdown,
            started_at: Some(snapshot.created_at),
            snapshot_created_at: Some(snapshot.created_at),
            last_saved: Some(now),
            show_hint: false,
            show_explanation: false,
            result: None,
        })
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[UserAnswer] {
        &self.answers
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn current_answer(&self) -> &UserAnswer {
        &self.answers[self.current]
    }

    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn time_left(&self, now: Instant) -> u64 {
        self.countdown.remaining_secs(now)
    }

    /// The attempt is still open: started and neither completing nor done.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, QuizPhase::InProgress | QuizPhase::Paused)
    }

    fn require(&self, allowed: &[QuizPhase], action: &str) -> Result<(), AppError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(AppError::InvalidState(format!(
                "Cannot {} while the quiz is {:?}",
                action, self.phase
            )))
        }
    }

    pub fn start(&mut self, now: Instant, wall: DateTime<Utc>) -> Result<(), AppError> {
        self.require(&[QuizPhase::NotStarted], "start")?;
        self.phase = QuizPhase::InProgress;
        self.countdown.start(now);
        self.started_at = Some(wall);
        self.snapshot_created_at = Some(wall);
        self.last_saved = Some(now);
        Ok(())
    }

    /// Refuses further input once the countdown has run out; the next tick
    /// completes the attempt.
    pub fn ensure_time_left(&self, now: Instant) -> Result<(), AppError> {
        if self.is_expired(now) {
            return Err(AppError::InvalidState("Time is up for this quiz".to_string()));
        }
        Ok(())
    }

    /// Records an answer for the question at `index`. Correctness is not
    /// checked here, only that the answer fits the question type.
    pub fn answer(&mut self, index: usize, answer: UserAnswer) -> Result<(), AppError> {
        self.require(&[QuizPhase::InProgress], "answer")?;
        let question = self.questions.get(index).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Question index {} is out of range for {} questions",
                index,
                self.questions.len()
            ))
        })?;
        let answer = answer.normalized();
        question.check_answer(&answer)?;
        self.answers[index] = answer;
        Ok(())
    }

    pub fn next(&mut self) -> Result<Advance, AppError> {
        self.require(&[QuizPhase::InProgress], "move to the next question")?;
        if self.current + 1 >= self.questions.len() {
            return Ok(Advance::Finish);
        }
        self.current += 1;
        self.reset_flags();
        Ok(Advance::Moved)
    }

    pub fn previous(&mut self) -> Result<(), AppError> {
        self.require(&[QuizPhase::InProgress], "move to the previous question")?;
        if self.current > 0 {
            self.current -= 1;
            self.reset_flags();
        }
        Ok(())
    }

    pub fn pause(&mut self, now: Instant) -> Result<(), AppError> {
        self.require(&[QuizPhase::InProgress], "pause")?;
        self.countdown.stop(now);
        self.phase = QuizPhase::Paused;
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> Result<(), AppError> {
        self.require(&[QuizPhase::Paused], "resume")?;
        self.countdown.start(now);
        self.phase = QuizPhase::InProgress;
        Ok(())
    }

    /// Swaps in regenerated content for question `index` if it is still the
    /// question with identity `question_id`.
    pub fn replace_question(
        &mut self,
        index: usize,
        question_id: i64,
        fresh: NewQuestion,
    ) -> Result<&Question, AppError> {
        self.require(&[QuizPhase::InProgress], "regenerate a question")?;
        let slot = self
            .questions
            .get_mut(index)
            .filter(|q| q.id == question_id)
            .ok_or_else(|| {
                AppError::InvalidState("The question changed while regenerating".to_string())
            })?;
        slot.replace_content(fresh);
        self.answers[index] = UserAnswer::Unanswered;
        if index == self.current {
            self.reset_flags();
        }
        Ok(&self.questions[index])
    }

    pub fn show_hint(&mut self) {
        self.show_hint = true;
    }

    pub fn show_explanation(&mut self) {
        self.show_explanation = true;
    }

    fn reset_flags(&mut self) {
        self.show_hint = false;
        self.show_explanation = false;
    }

    /// Countdown ran out while the attempt was running.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.phase == QuizPhase::InProgress && self.countdown.is_expired(now)
    }

    pub fn autosave_due(&self, now: Instant, interval: std::time::Duration) -> bool {
        self.phase == QuizPhase::InProgress
            && self
                .last_saved
                .is_none_or(|saved| now.saturating_duration_since(saved) >= interval)
    }

    /// Snapshot of the open attempt, or `None` when there is nothing to save.
    pub fn draft(&self, now: Instant, wall: DateTime<Utc>) -> Option<QuizProgressDraft> {
        if !self.is_active() {
            return None;
        }
        Some(QuizProgressDraft {
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            questions: self.questions.clone(),
            user_answers: self.answers.clone(),
            current_question_index: self.current,
            time_left: self.countdown.remaining_secs(now),
            created_at: self.snapshot_created_at.unwrap_or(wall),
        })
    }

    pub fn mark_saved(&mut self, now: Instant, created_at: DateTime<Utc>) {
        self.last_saved = Some(now);
        self.snapshot_created_at.get_or_insert(created_at);
    }

    /// Enters `Completing` and hands out what scoring needs. Only one
    /// completion can be in flight.
    pub fn begin_completion(&mut self, now: Instant) -> Result<CompletionInput, AppError> {
        self.require(&[QuizPhase::InProgress, QuizPhase::Paused], "complete")?;
        self.countdown.stop(now);
        self.phase = QuizPhase::Completing;
        Ok(CompletionInput {
            attempt: self.attempt,
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            questions: self.questions.clone(),
            answers: self.answers.clone(),
            time_spent: self.countdown.spent_secs(now),
            started_at: self.started_at.unwrap_or_else(Utc::now),
        })
    }

    pub fn finish(&mut self, result: QuizResult) -> Result<(), AppError> {
        self.require(&[QuizPhase::Completing], "finish")?;
        self.phase = QuizPhase::Completed;
        self.result = Some(result);
        self.reset_flags();
        Ok(())
    }

    /// Backs out of a failed completion so the user can try again.
    pub fn abort_completion(&mut self) {
        if self.phase == QuizPhase::Completing {
            self.phase = QuizPhase::Paused;
        }
    }

    pub fn view(&self, now: Instant) -> QuizView {
        QuizView {
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            phase: self.phase,
            current_index: self.current,
            total_questions: self.questions.len(),
            question: self.questions[self.current].clone(),
            answer: self.answers[self.current].clone(),
            answers: self.answers.clone(),
            answered: self.answers.iter().filter(|a| a.is_answered()).count(),
            time_left: self.time_left(now),
            time_limit: self.countdown.limit_secs(),
            show_hint: self.show_hint,
            show_explanation: self.show_explanation,
            result: self.result.clone(),
        }
    }
}

/// What the UI renders for the active attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizView {
    pub topic: String,
    pub difficulty: QuizDifficulty,
    pub phase: QuizPhase,
    pub current_index: usize,
    pub total_questions: usize,
    pub question: Question,
    /// Recorded answer for the current question.
    pub answer: UserAnswer,
    pub answers: Vec<UserAnswer>,
    pub answered: usize,
    pub time_left: u64,
    pub time_limit: u64,
    pub show_hint: bool,
    pub show_explanation: bool,
    pub result: Option<QuizResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{CorrectAnswer, Difficulty, QuestionType};
    use crate::quiz::timer::{Clock, ManualClock};
    use std::time::Duration;

    fn question(id: i64) -> Question {
        Question {
            id,
            question_type: QuestionType::MultipleChoice,
            topic: "Manajemen Inventori".into(),
            difficulty: Difficulty::Easy,
            question: format!("Soal {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: CorrectAnswer::Option(0),
            explanation: "Karena A".into(),
            ai_hint: String::new(),
            bookmarked: false,
            tags: vec![],
            created_at: Utc::now(),
            last_used: None,
        }
    }

    fn state(n: i64) -> QuizState {
        QuizState::new(
            1,
            "Manajemen Inventori".into(),
            QuizDifficulty::Mixed,
            (1..=n).map(question).collect(),
            1800,
        )
        .unwrap()
    }

    #[test]
    fn transitions_follow_the_lifecycle() {
        let clock = ManualClock::new();
        let mut quiz = state(3);
        assert_eq!(quiz.phase(), QuizPhase::NotStarted);
        assert!(quiz.answer(0, UserAnswer::SelectedIndex(1)).is_err());

        quiz.start(clock.now(), Utc::now()).unwrap();
        assert!(quiz.start(clock.now(), Utc::now()).is_err());

        quiz.pause(clock.now()).unwrap();
        assert!(matches!(quiz.next(), Err(AppError::InvalidState(_))));
        quiz.resume(clock.now()).unwrap();

        quiz.begin_completion(clock.now()).unwrap();
        assert_eq!(quiz.phase(), QuizPhase::Completing);
        assert!(matches!(
            quiz.begin_completion(clock.now()),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn navigation_is_clamped_and_last_next_finishes() {
        let clock = ManualClock::new();
        let mut quiz = state(2);
        quiz.start(clock.now(), Utc::now()).unwrap();

        quiz.previous().unwrap();
        assert_eq!(quiz.current_index(), 0);

        quiz.answer(0, UserAnswer::SelectedIndex(2)).unwrap();
        assert_eq!(quiz.next().unwrap(), Advance::Moved);
        assert_eq!(quiz.next().unwrap(), Advance::Finish);
        assert_eq!(quiz.current_index(), 1);

        quiz.previous().unwrap();
        assert_eq!(quiz.current_answer(), &UserAnswer::SelectedIndex(2));
    }

    #[test]
    fn moving_resets_hint_and_explanation_flags() {
        let clock = ManualClock::new();
        let mut quiz = state(2);
        quiz.start(clock.now(), Utc::now()).unwrap();
        quiz.show_hint();
        quiz.show_explanation();
        quiz.next().unwrap();

        let view = quiz.view(clock.now());
        assert!(!view.show_hint);
        assert!(!view.show_explanation);
    }

    #[test]
    fn answers_must_fit_the_question() {
        let clock = ManualClock::new();
        let mut quiz = state(1);
        quiz.start(clock.now(), Utc::now()).unwrap();

        assert!(matches!(
            quiz.answer(0, UserAnswer::BooleanChoice(true)),
            Err(AppError::ValidationFailed(_))
        ));
        assert!(matches!(
            quiz.answer(0, UserAnswer::SelectedIndex(9)),
            Err(AppError::ValidationFailed(_))
        ));
        assert!(matches!(
            quiz.answer(4, UserAnswer::SelectedIndex(0)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn paused_countdown_does_not_move_or_expire() {
        let clock = ManualClock::new();
        let mut quiz = state(1);
        quiz.start(clock.now(), Utc::now()).unwrap();
        clock.advance(Duration::from_secs(100));
        quiz.pause(clock.now()).unwrap();
        let before = quiz.time_left(clock.now());

        clock.advance(Duration::from_secs(5000));
        assert_eq!(quiz.time_left(clock.now()), before);
        assert!(!quiz.is_expired(clock.now()));

        quiz.resume(clock.now()).unwrap();
        clock.advance(Duration::from_secs(1700));
        assert!(quiz.is_expired(clock.now()));
    }

    #[test]
    fn aborted_completion_returns_to_paused() {
        let clock = ManualClock::new();
        let mut quiz = state(1);
        quiz.start(clock.now(), Utc::now()).unwrap();
        clock.advance(Duration::from_secs(42));

        let input = quiz.begin_completion(clock.now()).unwrap();
        assert_eq!(input.time_spent, 42);

        quiz.abort_completion();
        assert_eq!(quiz.phase(), QuizPhase::Paused);
        assert!(quiz.draft(clock.now(), Utc::now()).is_some());
    }

    #[test]
    fn snapshot_round_trip_restores_position() {
        let clock = ManualClock::new();
        let mut quiz = state(3);
        quiz.start(clock.now(), Utc::now()).unwrap();
        quiz.answer(0, UserAnswer::SelectedIndex(3)).unwrap();
        quiz.next().unwrap();
        clock.advance(Duration::from_secs(600));

        let draft = quiz.draft(clock.now(), Utc::now()).unwrap();
        let snapshot = QuizProgress {
            id: 1,
            topic: draft.topic,
            difficulty: draft.difficulty,
            questions: draft.questions,
            user_answers: draft.user_answers,
            current_question_index: draft.current_question_index,
            time_left: draft.time_left,
            created_at: draft.created_at,
            last_updated: Utc::now(),
        };

        let restored = QuizState::from_snapshot(2, snapshot, 1800, clock.now()).unwrap();
        assert_eq!(restored.phase(), QuizPhase::InProgress);
        assert_eq!(restored.current_index(), 1);
        assert_eq!(restored.answers()[0], UserAnswer::SelectedIndex(3));
        assert_eq!(restored.time_left(clock.now()), 1200);
    }

    #[test]
    fn snapshot_keeps_the_start_time() {
        let clock = ManualClock::new();
        let mut quiz = state(2);
        let started = Utc::now();
        quiz.start(clock.now(), started).unwrap();

        clock.advance(Duration::from_secs(30));
        let later = started + chrono::Duration::seconds(30);
        let draft = quiz.draft(clock.now(), later).unwrap();
        assert_eq!(draft.created_at, started);

        quiz.mark_saved(clock.now(), later);
        assert_eq!(quiz.draft(clock.now(), later).unwrap().created_at, started);
    }

    #[test]
    fn expired_countdown_refuses_input() {
        let clock = ManualClock::new();
        let mut quiz = state(2);
        quiz.start(clock.now(), Utc::now()).unwrap();
        assert!(quiz.ensure_time_left(clock.now()).is_ok());

        clock.advance(Duration::from_secs(1800));
        assert!(matches!(
            quiz.ensure_time_left(clock.now()),
            Err(AppError::InvalidState(_))
        ));

        quiz.pause(clock.now()).unwrap();
        assert!(quiz.ensure_time_left(clock.now()).is_ok());
    }
}
