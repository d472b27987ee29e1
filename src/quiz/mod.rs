// src/quiz/mod.rs

pub mod engine;
pub mod scoring;
pub mod state;
pub mod timer;

pub use engine::{ExplanationView, HintView, LoadRequest, QuestionSource, QuizEngine, Tick};
pub use state::{QuizPhase, QuizResult, QuizState, QuizView};
pub use timer::{Clock, Countdown, ManualClock, SystemClock};
