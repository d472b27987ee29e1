// src/quiz/engine.rs

//! Drives the active quiz attempt against the store, the cache and the LLM.
//!
//! The attempt lives behind one async mutex. Every transition, the countdown
//! check and autosave take that lock, so a snapshot is always written from a
//! consistent state. Collaborator calls run without the lock held.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::{
    cache::ContentCache,
    config::{MAX_QUESTIONS_PER_QUIZ, QuizSettings},
    error::AppError,
    llm::{LlmService, QuestionsRequest, RegenerateRequest},
    models::{
        answer::UserAnswer,
        evaluation::ScoringMode,
        progress::QuizProgress,
        question::{Question, QuizDifficulty},
        quiz_session::NewQuizSession,
    },
    quiz::{
        scoring::{self, Scored},
        state::{Advance, CompletionInput, QuizPhase, QuizResult, QuizState, QuizView},
        timer::{Clock, SystemClock},
    },
    store::{QuestionPatch, Store},
};

/// Where the questions of a new quiz come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    /// Random draw from the bank.
    Existing,
    /// Fresh questions from the generator, stored into the bank.
    Generate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadRequest {
    pub source: QuestionSource,
    pub topic: String,
    #[serde(default)]
    pub difficulty: QuizDifficulty,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HintView {
    pub question_id: i64,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationView {
    pub question_id: i64,
    pub explanation: String,
    /// The generator failed and this is the question's static explanation.
    pub fallback: bool,
}

/// What one driver tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Attempt exists but the countdown is not running.
    Idle,
    Running,
    Saved,
    Expired,
    /// No attempt to drive any more.
    Stopped,
}

#[derive(Clone)]
pub struct QuizEngine {
    store: Store,
    llm: Arc<dyn LlmService>,
    cache: ContentCache,
    clock: Arc<dyn Clock>,
    settings: QuizSettings,
    state: Arc<Mutex<Option<QuizState>>>,
    attempts: Arc<AtomicU64>,
    drive: bool,
}

fn no_quiz() -> AppError {
    AppError::InvalidState("No quiz is loaded".to_string())
}

fn refuse_if_open(state: &Option<QuizState>) -> Result<(), AppError> {
    match state {
        Some(s) if s.is_active() || s.phase() == QuizPhase::Completing => {
            Err(AppError::InvalidState(format!(
                "A quiz on '{}' is still open; complete it first",
                s.topic()
            )))
        }
        _ => Ok(()),
    }
}

impl QuizEngine {
    pub fn new(store: Store, llm: Arc<dyn LlmService>, settings: QuizSettings) -> Self {
        Self {
            cache: ContentCache::new(store.clone(), llm.clone()),
            store,
            llm,
            clock: Arc::new(SystemClock),
            settings,
            state: Arc::new(Mutex::new(None)),
            attempts: Arc::new(AtomicU64::new(0)),
            drive: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn a background task per started attempt that checks the countdown
    /// every second and autosaves on the configured interval.
    pub fn with_driver(mut self, enabled: bool) -> Self {
        self.drive = enabled;
        self
    }

    fn next_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn view(&self) -> Option<QuizView> {
        let guard = self.state.lock().await;
        guard.as_ref().map(|s| s.view(self.clock.now()))
    }

    /// Prepares a new attempt. Refused while another attempt is open.
    pub async fn load_questions(&self, req: LoadRequest) -> Result<QuizView, AppError> {
        let topic = req.topic.trim().to_string();
        if topic.is_empty() {
            return Err(AppError::BadRequest("Topic cannot be empty".to_string()));
        }
        if req.count == 0 || req.count > MAX_QUESTIONS_PER_QUIZ {
            return Err(AppError::BadRequest(format!(
                "Question count must be between 1 and {}",
                MAX_QUESTIONS_PER_QUIZ
            )));
        }
        refuse_if_open(&*self.state.lock().await)?;

        let questions = match req.source {
            QuestionSource::Existing => self.draw_existing(&topic, req.difficulty, req.count).await?,
            QuestionSource::Generate => self.generate(&topic, req.difficulty, req.count).await?,
        };

        let mut guard = self.state.lock().await;
        refuse_if_open(&guard)?;
        let state = QuizState::new(
            self.next_attempt(),
            topic,
            req.difficulty,
            questions,
            self.settings.time_limit_secs,
        )?;
        let view = state.view(self.clock.now());
        tracing::info!(
            "Loaded {} questions on '{}' ({:?})",
            view.total_questions,
            view.topic,
            req.source
        );
        *guard = Some(state);
        Ok(view)
    }

    async fn draw_existing(
        &self,
        topic: &str,
        difficulty: QuizDifficulty,
        count: usize,
    ) -> Result<Vec<Question>, AppError> {
        let repo = self.store.questions();
        let insufficient = |available: usize| AppError::InsufficientBank {
            topic: topic.to_string(),
            requested: count,
            available,
        };

        let available = repo.count_for_topic(topic, difficulty.level()).await?;
        if available < count {
            return Err(insufficient(available));
        }

        let drawn = repo.random_by_topic(topic, difficulty.level(), count).await?;
        if drawn.len() < count {
            return Err(insufficient(drawn.len()));
        }

        let ids: Vec<i64> = drawn.iter().map(|q| q.id).collect();
        repo.touch_last_used(&ids, Utc::now()).await?;
        Ok(drawn)
    }

    async fn generate(
        &self,
        topic: &str,
        difficulty: QuizDifficulty,
        count: usize,
    ) -> Result<Vec<Question>, AppError> {
        let mut fresh = self
            .llm
            .generate_questions(&QuestionsRequest {
                topic: topic.to_string(),
                count,
                difficulty,
            })
            .await?;
        if fresh.is_empty() {
            return Err(AppError::GenerationFailed("No questions were generated".to_string()));
        }
        for q in &mut fresh {
            q.topic = topic.to_string();
        }

        let repo = self.store.questions();
        let ids = repo.bulk_put(&fresh).await?;
        repo.get_many(&ids).await
    }

    pub async fn pending_snapshot(&self, topic: &str) -> Result<Option<QuizProgress>, AppError> {
        self.store.snapshots().load(topic).await
    }

    /// Continues a saved attempt where it left off.
    pub async fn resume_snapshot(&self, topic: &str) -> Result<QuizView, AppError> {
        let mut guard = self.state.lock().await;
        refuse_if_open(&guard)?;

        let snapshot = self
            .store
            .snapshots()
            .load(topic)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No saved quiz for '{}'", topic)))?;

        let attempt = self.next_attempt();
        let state = QuizState::from_snapshot(
            attempt,
            snapshot,
            self.settings.time_limit_secs,
            self.clock.now(),
        )?;
        let view = state.view(self.clock.now());
        *guard = Some(state);
        drop(guard);

        tracing::info!("Resumed saved quiz on '{}'", topic);
        self.spawn_driver(attempt);
        Ok(view)
    }

    /// Deletes the saved attempt for `topic`. Returns whether one existed.
    pub async fn discard_snapshot(&self, topic: &str) -> Result<bool, AppError> {
        let existed = self.store.snapshots().delete(topic).await?;
        if existed {
            tracing::info!("Discarded saved quiz on '{}'", topic);
        }
        Ok(existed)
    }

    /// Starts the loaded attempt. A saved attempt on the same topic has to be
    /// resumed or discarded first.
    pub async fn start(&self) -> Result<QuizView, AppError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(no_quiz)?;

        if state.phase() == QuizPhase::NotStarted
            && self.store.snapshots().load(state.topic()).await?.is_some()
        {
            return Err(AppError::InvalidState(format!(
                "A saved quiz on '{}' exists; resume or discard it first",
                state.topic()
            )));
        }

        let now = self.clock.now();
        state.start(now, Utc::now())?;
        let attempt = state.attempt();
        let view = state.view(now);
        drop(guard);

        tracing::info!("Quiz on '{}' started", view.topic);
        self.spawn_driver(attempt);
        Ok(view)
    }

    pub async fn answer(&self, index: usize, answer: UserAnswer) -> Result<QuizView, AppError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(no_quiz)?;
        let now = self.clock.now();
        state.ensure_time_left(now)?;
        state.answer(index, answer)?;
        Ok(state.view(now))
    }

    /// Moves forward; on the last question this completes the attempt.
    pub async fn next(&self) -> Result<QuizView, AppError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(no_quiz)?;
        let now = self.clock.now();
        state.ensure_time_left(now)?;
        match state.next()? {
            Advance::Moved => Ok(state.view(now)),
            Advance::Finish => {
                drop(guard);
                self.complete(None).await
            }
        }
    }

    pub async fn previous(&self) -> Result<QuizView, AppError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(no_quiz)?;
        let now = self.clock.now();
        state.ensure_time_left(now)?;
        state.previous()?;
        Ok(state.view(now))
    }

    /// Stops the countdown and saves a snapshot right away.
    pub async fn pause(&self) -> Result<QuizView, AppError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(no_quiz)?;
        state.pause(self.clock.now())?;
        self.save_locked(state).await?;
        Ok(state.view(self.clock.now()))
    }

    pub async fn resume(&self) -> Result<QuizView, AppError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or_else(no_quiz)?;
        state.resume(self.clock.now())?;
        Ok(state.view(self.clock.now()))
    }

    async fn save_locked(&self, state: &mut QuizState) -> Result<bool, AppError> {
        let now = self.clock.now();
        let wall = Utc::now();
        let Some(draft) = state.draft(now, wall) else {
            return Ok(false);
        };

        self.store.snapshots().save(&draft, wall).await?;
        state.mark_saved(now, draft.created_at);
        tracing::debug!(
            "Saved quiz on '{}' at question {} with {}s left",
            draft.topic,
            draft.current_question_index + 1,
            draft.time_left
        );
        Ok(true)
    }

    /// Writes a snapshot if the attempt is running. Skipped while paused.
    pub async fn autosave(&self) -> Result<bool, AppError> {
        let mut guard = self.state.lock().await;
        match guard.as_mut() {
            Some(state) if state.phase() == QuizPhase::InProgress => self.save_locked(state).await,
            _ => Ok(false),
        }
    }

    /// One driver step for the current attempt.
    pub async fn tick(&self) -> Result<Tick, AppError> {
        self.tick_attempt(None).await
    }

    async fn tick_attempt(&self, attempt: Option<u64>) -> Result<Tick, AppError> {
        let mut guard = self.state.lock().await;
        let Some(state) = guard.as_mut() else {
            return Ok(Tick::Stopped);
        };
        if attempt.is_some_and(|a| a != state.attempt()) {
            return Ok(Tick::Stopped);
        }
        match state.phase() {
            QuizPhase::Completed => return Ok(Tick::Stopped),
            QuizPhase::NotStarted | QuizPhase::Paused | QuizPhase::Completing => {
                return Ok(Tick::Idle);
            }
            QuizPhase::InProgress => {}
        }

        let now = self.clock.now();
        if state.is_expired(now) {
            let topic = state.topic().to_string();
            drop(guard);
            tracing::info!("Time is up for the quiz on '{}'", topic);
            return match self.complete(None).await {
                Ok(_) => Ok(Tick::Expired),
                Err(AppError::InvalidState(_)) => Ok(Tick::Idle),
                Err(e) => Err(e),
            };
        }

        if state.autosave_due(now, self.settings.autosave_interval) {
            self.save_locked(state).await?;
            return Ok(Tick::Saved);
        }
        Ok(Tick::Running)
    }

    fn spawn_driver(&self, attempt: u64) {
        if !self.drive {
            return;
        }
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match engine.tick_attempt(Some(attempt)).await {
                    Ok(Tick::Stopped) => break,
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Quiz driver tick failed: {}", e),
                }
            }
            tracing::debug!("Driver for attempt {} stopped", attempt);
        });
    }

    /// Scores and records the attempt.
    ///
    /// `mode` overrides the configured scoring mode. AI scoring failures fall
    /// back to heuristic scoring; a failure to record the result puts the
    /// attempt back into `Paused`.
    pub async fn complete(&self, mode: Option<ScoringMode>) -> Result<QuizView, AppError> {
        let input = {
            let mut guard = self.state.lock().await;
            let state = guard.as_mut().ok_or_else(no_quiz)?;
            state.begin_completion(self.clock.now())?
        };

        let mode = mode.unwrap_or(self.settings.scoring_mode);
        let scored = scoring::score(
            mode,
            self.llm.as_ref(),
            &input.topic,
            input.difficulty,
            &input.questions,
            &input.answers,
            input.time_spent,
        )
        .await;
        let recorded = self.record(&input, scored).await;

        let mut guard = self.state.lock().await;
        let state = guard
            .as_mut()
            .filter(|s| s.attempt() == input.attempt)
            .ok_or_else(|| {
                AppError::InvalidState("The quiz was abandoned while being scored".to_string())
            })?;

        match recorded {
            Ok(result) => {
                tracing::info!(
                    "Quiz on '{}' completed: score {} ({} mode)",
                    input.topic,
                    result.score,
                    result.scoring_mode.as_str()
                );
                state.finish(result)?;
                Ok(state.view(self.clock.now()))
            }
            Err(e) => {
                tracing::error!("Failed to record quiz on '{}': {}", input.topic, e);
                state.abort_completion();
                Err(e)
            }
        }
    }

    async fn record(&self, input: &CompletionInput, scored: Scored) -> Result<QuizResult, AppError> {
        let now = Utc::now();
        let session_id = self
            .store
            .sessions()
            .put(&NewQuizSession {
                topic: input.topic.clone(),
                difficulty: input.difficulty,
                questions: input.questions.clone(),
                user_answers: input.answers.clone(),
                score: Some(scored.score),
                time_spent: Some(input.time_spent),
                scoring_mode: scored.mode,
                evaluation: scored.assessment.clone(),
                created_at: Some(input.started_at),
                completed_at: Some(now),
            })
            .await?;

        let progress = self
            .store
            .progress()
            .record_completion(
                &input.topic,
                scored.correct,
                input.questions.len() as u32,
                input.time_spent,
                now,
            )
            .await?;

        if let Err(e) = self.store.snapshots().delete(&input.topic).await {
            tracing::warn!("Failed to drop snapshot for '{}': {}", input.topic, e);
        }

        Ok(QuizResult {
            session_id,
            score: scored.score,
            correct: scored.correct,
            total: input.questions.len(),
            unscored: scored.unscored,
            time_spent: input.time_spent,
            scoring_mode: scored.mode,
            evaluation: scored.assessment,
            progress,
        })
    }

    /// Replaces the current question with a generated variant. Identity and
    /// bookmark are kept; cached hints and explanations for it are dropped.
    pub async fn regenerate(&self) -> Result<QuizView, AppError> {
        let (attempt, index, original) = {
            let guard = self.state.lock().await;
            let state = guard.as_ref().ok_or_else(no_quiz)?;
            if state.phase() != QuizPhase::InProgress {
                return Err(AppError::InvalidState(
                    "Questions can only be regenerated during a running quiz".to_string(),
                ));
            }
            (state.attempt(), state.current_index(), state.current_question().clone())
        };

        let fresh = self
            .llm
            .regenerate_question(&RegenerateRequest::for_question(&original))
            .await?;

        let (updated, view) = {
            let mut guard = self.state.lock().await;
            let state = guard
                .as_mut()
                .filter(|s| s.attempt() == attempt)
                .ok_or_else(no_quiz)?;
            let updated = state.replace_question(index, original.id, fresh)?.clone();
            (updated, state.view(self.clock.now()))
        };

        match self
            .store
            .questions()
            .update(updated.id, QuestionPatch::content_of(&updated))
            .await
        {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                tracing::debug!("Question {} is no longer in the bank", updated.id);
            }
            Err(e) => tracing::warn!("Failed to store regenerated question {}: {}", updated.id, e),
        }
        if let Err(e) = self.cache.invalidate(updated.id).await {
            tracing::warn!("Failed to drop cache for question {}: {}", updated.id, e);
        }

        Ok(view)
    }

    /// Current question and answer, for tutoring calls.
    async fn current_for_tutoring(&self) -> Result<(u64, usize, Question, UserAnswer), AppError> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or_else(no_quiz)?;
        if matches!(state.phase(), QuizPhase::NotStarted | QuizPhase::Completing) {
            return Err(AppError::InvalidState(format!(
                "No help is available while the quiz is {:?}",
                state.phase()
            )));
        }
        Ok((
            state.attempt(),
            state.current_index(),
            state.current_question().clone(),
            state.current_answer().clone(),
        ))
    }

    async fn with_current(&self, attempt: u64, index: usize, f: impl FnOnce(&mut QuizState)) {
        let mut guard = self.state.lock().await;
        if let Some(state) = guard
            .as_mut()
            .filter(|s| s.attempt() == attempt && s.current_index() == index)
        {
            f(state);
        }
    }

    pub async fn hint(&self) -> Result<HintView, AppError> {
        let (attempt, index, question, _) = self.current_for_tutoring().await?;
        let hint = self.cache.hint(&question).await?;
        self.with_current(attempt, index, QuizState::show_hint).await;
        Ok(HintView {
            question_id: question.id,
            hint,
        })
    }

    /// Explanation for the current answer. Falls back to the question's
    /// static explanation when the generator fails.
    pub async fn explanation(&self) -> Result<ExplanationView, AppError> {
        let (attempt, index, question, answer) = self.current_for_tutoring().await?;
        let (explanation, fallback) = match self.cache.explanation(&question, &answer).await {
            Ok(text) => (text, false),
            Err(AppError::GenerationFailed(e) | AppError::ValidationFailed(e)) => {
                tracing::warn!(
                    "Explanation for question {} unavailable, using stored text: {}",
                    question.id,
                    e
                );
                (question.explanation.clone(), true)
            }
            Err(e) => return Err(e),
        };
        self.with_current(attempt, index, QuizState::show_explanation).await;
        Ok(ExplanationView {
            question_id: question.id,
            explanation,
            fallback,
        })
    }

    /// Drops the in-memory attempt, if any. Any saved snapshot stays.
    pub async fn abandon(&self) -> bool {
        let mut guard = self.state.lock().await;
        let had = guard.take().is_some();
        if had {
            tracing::info!("Active quiz abandoned");
        }
        had
    }

    /// Drops the in-memory attempt if it belongs to `topic`.
    pub async fn abandon_if_topic(&self, topic: &str) -> bool {
        let mut guard = self.state.lock().await;
        if guard.as_ref().is_some_and(|s| s.topic() == topic) {
            *guard = None;
            tracing::info!("Active quiz on '{}' abandoned", topic);
            true
        } else {
            false
        }
    }
}
