// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, llm::LlmService, quiz::QuizEngine, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub llm: Arc<dyn LlmService>,
    pub engine: QuizEngine,
}

impl AppState {
    /// Builds the quiz engine on top of `store` and `llm`.
    pub fn new(store: Store, config: Config, llm: Arc<dyn LlmService>) -> Self {
        let engine = QuizEngine::new(store.clone(), llm.clone(), config.quiz.clone());
        Self {
            store,
            config,
            llm,
            engine,
        }
    }

    pub fn with_engine(mut self, engine: QuizEngine) -> Self {
        self.engine = engine;
        self
    }
}

impl FromRef<AppState> for Store {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for QuizEngine {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Arc<dyn LlmService> {
    fn from_ref(state: &AppState) -> Self {
        state.llm.clone()
    }
}
