// src/lib.rs
pub mod cli;
pub mod config;
pub mod logging;
pub mod page;
pub mod pipeline;
pub mod presenter;
pub mod profile;
pub mod relay;
pub mod scoring;
pub mod settings;
pub mod utils;

pub use config::AppConfig;
pub use pipeline::{Pipeline, PipelineError};
pub use profile::{ExperienceRow, ProfileRecord};
pub use relay::{RelayClient, RelayError, RelayRequest, RelayResponse};
