// src/scoring/mod.rs
//! Scoring client for the remote messages API.

pub mod client;
pub mod error;
pub mod prompts;
pub mod stream;
pub mod types;

pub use client::ScoringClient;
pub use error::{ScoringError, MISSING_API_KEY};
pub use prompts::Prompts;
pub use stream::StreamAccumulator;
