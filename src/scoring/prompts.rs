// src/scoring/prompts.rs
use crate::config::RubricConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a board composition analyst for a Microsoft consulting services M&A consolidation strategy. Focus on seasoned executives with clean records and substantial transaction experience.

Board Positions:
- Chairman: former CEO with 100+ deals, M&A leadership
- CFO/Financial Strategist: ex-CFO of a public tech firm, strategic finance
- Finance & Deal Expert: investment banking MD, commercial debt experience
- Accounting Expert: Big 4 partner or public controller, consulting experience
- Microsoft Technology Strategist: ex-Microsoft executive, D365/Azure/Power Platform
- Enterprise Sales Executive: Microsoft partner sales leader, enterprise experience
- Industry Practice Leader: Big 4 or top-tier consulting MD, broad industry experience
- Legal Expert: tech M&A attorney, 20+ transactions

Key Criteria:
- Must have: clean background, senior leadership, relevant M&A/transaction experience
- Red flags: background hesitation, equity % focus, condescending attitude, insufficient deals

Retirement signals: extract them carefully (gap since the last executive role, board-only current positions, "retired" mentions, age indicators). Identify retirement status first, then determine the best board position match.

Output Format:
Respond with one JSON object and nothing else:
{
  "score": <integer 0-100, strength of the best match>,
  "category": "<exact board position name from the list above, or None>",
  "retired": "<Active | Unknown | Month Year the person retired>",
  "rationale": "<one sentence on the strongest match, one sentence on the biggest gap or risk>",
  "promptSuggestion": "<optional: what extra profile detail would sharpen this assessment>"
}"#;

pub const DEFAULT_USER_TEMPLATE: &str = "Analyze this LinkedIn profile for board position fit.
The profile lists: name, headline, about, then a tab-separated experience table (Title, Company, From, To, Total, Experience).
Determine the best board position match using the output format above.

LinkedIn Profile:
";

/// The rubric (system prompt) and the user template the payload is appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub system: String,
    pub user_template: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_template: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }
}

impl Prompts {
    /// Built-in prompts, each replaced by the configured file when one is set.
    pub fn load(config: &RubricConfig) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            system: read_override(config.system_prompt_path.as_deref(), defaults.system)?,
            user_template: read_override(
                config.user_template_path.as_deref(),
                defaults.user_template,
            )?,
        })
    }

    pub fn user_message(&self, payload: &str) -> String {
        format!("{}{}", self.user_template, payload)
    }
}

fn read_override(path: Option<&Path>, default: String) -> Result<String> {
    match path {
        Some(path) => {
            info!("Loading prompt from {}", path.display());
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))
        }
        None => Ok(default),
    }
}
