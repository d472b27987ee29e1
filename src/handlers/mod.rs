// src/handlers/mod.rs

pub mod data;
pub mod progress;
pub mod questions;
pub mod quiz;
pub mod reading;
