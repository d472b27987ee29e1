// src/models/mod.rs

pub mod answer;
pub mod cache;
pub mod evaluation;
pub mod progress;
pub mod question;
pub mod quiz_session;
pub mod reading_material;
