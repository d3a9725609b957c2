// src/presenter.rs
//! Turns the model's answer into something to show, and the whole record into
//! a line to paste into a spreadsheet.

use crate::profile::{write_tsv, ProfileRecord};
use crate::utils::strip_markdown_emphasis;
use anyhow::Result;
use chrono::Datelike;
use serde::{Deserialize, Deserializer};
use std::fmt;
use tracing::debug;

pub const EXPORT_HEADER: [&str; 6] = ["Name", "LinkedIn", "Headline", "About", "Experience", "AI"];

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BoardRole {
    #[serde(rename = "Chairman")]
    Chairman,
    #[serde(rename = "CFO/Financial Strategist")]
    CfoFinancialStrategist,
    #[serde(rename = "Finance & Deal Expert")]
    FinanceDealExpert,
    #[serde(rename = "Accounting Expert")]
    AccountingExpert,
    #[serde(rename = "Microsoft Technology Strategist")]
    MicrosoftTechnologyStrategist,
    #[serde(rename = "Enterprise Sales Executive")]
    EnterpriseSalesExecutive,
    #[serde(rename = "Industry Practice Leader")]
    IndustryPracticeLeader,
    #[serde(rename = "Legal Expert")]
    LegalExpert,
    #[serde(rename = "None")]
    None,
}

impl BoardRole {
    pub fn label(&self) -> &'static str {
        match self {
            BoardRole::Chairman => "Chairman",
            BoardRole::CfoFinancialStrategist => "CFO/Financial Strategist",
            BoardRole::FinanceDealExpert => "Finance & Deal Expert",
            BoardRole::AccountingExpert => "Accounting Expert",
            BoardRole::MicrosoftTechnologyStrategist => "Microsoft Technology Strategist",
            BoardRole::EnterpriseSalesExecutive => "Enterprise Sales Executive",
            BoardRole::IndustryPracticeLeader => "Industry Practice Leader",
            BoardRole::LegalExpert => "Legal Expert",
            BoardRole::None => "None",
        }
    }
}

impl fmt::Display for BoardRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RetiredStatus {
    Active,
    #[default]
    Unknown,
    /// "<Month> <Year>"; the month may be missing when only a year is given.
    Since { month: Option<String>, year: i32 },
}

impl RetiredStatus {
    /// Anything that is neither "Active" nor a recognizable month/year reads
    /// as unknown.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("active") {
            return RetiredStatus::Active;
        }

        let tokens: Vec<&str> = value.split_whitespace().collect();
        let year = tokens
            .last()
            .filter(|token| token.len() == 4)
            .and_then(|token| token.parse::<i32>().ok());

        match (tokens.len(), year) {
            (1, Some(year)) => RetiredStatus::Since { month: None, year },
            (2, Some(year)) if is_month(tokens[0]) => RetiredStatus::Since {
                month: Some(tokens[0].to_string()),
                year,
            },
            _ => RetiredStatus::Unknown,
        }
    }
}

fn is_month(token: &str) -> bool {
    let token = token.trim_end_matches('.').to_lowercase();
    token.len() >= 3 && MONTHS.iter().any(|month| month.starts_with(&token))
}

impl fmt::Display for RetiredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetiredStatus::Active => f.write_str("Active"),
            RetiredStatus::Unknown => f.write_str("Unknown"),
            RetiredStatus::Since {
                month: Some(month),
                year,
            } => write!(f, "{} {}", month, year),
            RetiredStatus::Since { month: None, year } => write!(f, "{}", year),
        }
    }
}

impl<'de> Deserialize<'de> for RetiredStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .map(|value| RetiredStatus::parse(&value))
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetiredColor {
    Green,
    Amber,
    Red,
    Gray,
}

impl RetiredColor {
    pub fn name(&self) -> &'static str {
        match self {
            RetiredColor::Green => "green",
            RetiredColor::Amber => "amber",
            RetiredColor::Red => "red",
            RetiredColor::Gray => "gray",
        }
    }
}

/// Active and recently retired are green, 3 to 5 years amber, older red.
pub fn classify_retired(status: &RetiredStatus, current_year: i32) -> RetiredColor {
    match status {
        RetiredStatus::Active => RetiredColor::Green,
        RetiredStatus::Unknown => RetiredColor::Gray,
        RetiredStatus::Since { year, .. } => match current_year - year {
            age if age <= 2 => RetiredColor::Green,
            age if age <= 5 => RetiredColor::Amber,
            _ => RetiredColor::Red,
        },
    }
}

/// Same as [`classify_retired`], against the local clock's current year.
pub fn retired_color_now(status: &RetiredStatus) -> RetiredColor {
    classify_retired(status, chrono::Local::now().year())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u8,
    pub category: BoardRole,
    #[serde(default)]
    pub retired: RetiredStatus,
    pub rationale: String,
    #[serde(default)]
    pub prompt_suggestion: Option<String>,
}

/// Remove a surrounding ```json ... ``` (or bare ```) fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches("json"),
    };
    body.trim_end().trim_end_matches("```").trim()
}

pub fn parse_score(raw: &str) -> Result<ScoreResult> {
    let json = strip_code_fence(raw);
    let result: ScoreResult = serde_json::from_str(json)?;
    if result.score > 100 {
        anyhow::bail!("score {} is outside 0-100", result.score);
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Structured {
        result: ScoreResult,
        retired_color: RetiredColor,
    },
    Raw(String),
}

/// Never fails: anything that is not a valid score result is shown verbatim.
pub fn present(raw: &str) -> Presentation {
    present_at(raw, chrono::Local::now().year())
}

pub fn present_at(raw: &str, current_year: i32) -> Presentation {
    match parse_score(raw) {
        Ok(result) => {
            let retired_color = classify_retired(&result.retired, current_year);
            Presentation::Structured {
                result,
                retired_color,
            }
        }
        Err(e) => {
            debug!("Showing raw response, not a score result: {}", e);
            Presentation::Raw(raw.to_string())
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Presentation::Raw(text) => f.write_str(text),
            Presentation::Structured {
                result,
                retired_color,
            } => {
                writeln!(f, "Score: {}/100", result.score)?;
                writeln!(f, "Best Fit Position: {}", result.category)?;
                writeln!(f, "Retired: {} ({})", result.retired, retired_color.name())?;
                write!(f, "Rationale: {}", result.rationale)?;
                if let Some(suggestion) = &result.prompt_suggestion {
                    write!(f, "\nPrompt suggestion: {}", suggestion)?;
                }
                Ok(())
            }
        }
    }
}

/// One TSV line: name, url, headline, about, experience, AI response.
/// Line breaks are flattened and markdown emphasis dropped from the AI text,
/// so the line always has six cells.
pub fn export_line(record: &ProfileRecord, url: &str) -> Result<String> {
    let ai_response = strip_markdown_emphasis(&record.ai_response);
    write_tsv([[
        record.name.as_str(),
        url,
        record.headline.as_str(),
        record.about.as_str(),
        record.experience.as_str(),
        ai_response.as_str(),
    ]])
}

pub fn export_with_header(record: &ProfileRecord, url: &str) -> Result<String> {
    Ok(format!("{}\n{}", EXPORT_HEADER.join("\t"), export_line(record, url)?))
}

/// Every field under its own heading, for diagnosing extraction problems.
pub fn debug_dump(record: &ProfileRecord, url: &str) -> String {
    let sections = [
        ("URL", url),
        ("NAME", record.name.as_str()),
        ("HEADLINE", record.headline.as_str()),
        ("ABOUT", record.about.as_str()),
        ("EXPERIENCE", record.experience.as_str()),
        ("AI RESPONSE", record.ai_response.as_str()),
    ];
    sections
        .iter()
        .map(|(title, body)| {
            let body = if body.is_empty() { "(empty)" } else { body };
            format!("=== {} ===\n{}", title, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{"score": 82, "category": "Chairman", "retired": "March 2021", "rationale": "Led 120 deals.", "promptSuggestion": "Add board roles."}"#;

    #[test]
    fn test_structured_view() {
        let presentation = present_at(RESPONSE, 2024);
        let Presentation::Structured {
            result,
            retired_color,
        } = &presentation
        else {
            panic!("expected structured view, got {:?}", presentation);
        };
        assert_eq!(result.score, 82);
        assert_eq!(result.category, BoardRole::Chairman);
        assert_eq!(
            result.retired,
            RetiredStatus::Since {
                month: Some("March".to_string()),
                year: 2021
            }
        );
        assert_eq!(*retired_color, RetiredColor::Amber);
        assert_eq!(
            presentation.to_string(),
            "Score: 82/100\nBest Fit Position: Chairman\nRetired: March 2021 (amber)\nRationale: Led 120 deals.\nPrompt suggestion: Add board roles."
        );
    }

    #[test]
    fn test_shuffled_and_padded_parses_identically() {
        let shuffled = "\n\n  {\n \"rationale\" : \"Led 120 deals.\",\n \"promptSuggestion\": \"Add board roles.\",\n \"retired\":\"March 2021\", \"category\": \"Chairman\",\n \"score\" : 82 }  \n";
        assert_eq!(parse_score(shuffled).unwrap(), parse_score(RESPONSE).unwrap());
    }

    #[test]
    fn test_code_fence_parses_identically() {
        let fenced = format!("```json\n{}\n```", RESPONSE);
        assert_eq!(parse_score(&fenced).unwrap(), parse_score(RESPONSE).unwrap());
        let bare_fence = format!("```\n{}\n```\n", RESPONSE);
        assert_eq!(parse_score(&bare_fence).unwrap(), parse_score(RESPONSE).unwrap());
    }

    #[test]
    fn test_fallback_to_raw_text() {
        let text = "**Best Fit Position:** Chairman\nReason in Favor: deals";
        assert_eq!(present_at(text, 2024), Presentation::Raw(text.to_string()));

        // missing rationale
        let partial = r#"{"score": 50, "category": "Chairman"}"#;
        assert!(matches!(present_at(partial, 2024), Presentation::Raw(_)));

        // unknown category and out-of-range score
        let unknown = r#"{"score": 50, "category": "Astronaut", "rationale": "x"}"#;
        assert!(matches!(present_at(unknown, 2024), Presentation::Raw(_)));
        let too_high = r#"{"score": 150, "category": "None", "rationale": "x"}"#;
        assert!(matches!(present_at(too_high, 2024), Presentation::Raw(_)));
    }

    #[test]
    fn test_retired_defaults_to_unknown() {
        let minimal = r#"{"score": 10, "category": "None", "rationale": "No fit."}"#;
        let result = parse_score(minimal).unwrap();
        assert_eq!(result.retired, RetiredStatus::Unknown);
        assert_eq!(result.prompt_suggestion, None);
    }

    #[test]
    fn test_retired_parsing() {
        assert_eq!(RetiredStatus::parse("Active"), RetiredStatus::Active);
        assert_eq!(RetiredStatus::parse(" unknown "), RetiredStatus::Unknown);
        assert_eq!(RetiredStatus::parse("Retired, maybe"), RetiredStatus::Unknown);
        assert_eq!(
            RetiredStatus::parse("2019"),
            RetiredStatus::Since { month: None, year: 2019 }
        );
        assert_eq!(
            RetiredStatus::parse("Sept 2019"),
            RetiredStatus::Since {
                month: Some("Sept".to_string()),
                year: 2019
            }
        );
        assert_eq!(RetiredStatus::parse("Spring 2019"), RetiredStatus::Unknown);
    }

    #[test]
    fn test_retired_colors() {
        let since = |year| RetiredStatus::Since { month: None, year };
        assert_eq!(classify_retired(&RetiredStatus::Active, 2025), RetiredColor::Green);
        assert_eq!(classify_retired(&RetiredStatus::Unknown, 2025), RetiredColor::Gray);
        assert_eq!(classify_retired(&since(2023), 2025), RetiredColor::Green);
        assert_eq!(classify_retired(&since(2022), 2025), RetiredColor::Amber);
        assert_eq!(classify_retired(&since(2020), 2025), RetiredColor::Amber);
        assert_eq!(classify_retired(&since(2019), 2025), RetiredColor::Red);
    }

    #[test]
    fn test_export_line_has_six_clean_cells() {
        let record = ProfileRecord {
            name: "Ada".to_string(),
            headline: "Chair\tCFO".to_string(),
            about: "Investor".to_string(),
            experience: "Title\tCompany\tFrom\tTo\tTotal\tExperience\nCFO\tAcme\t2015\t2020\t5 yrs\tLed".to_string(),
            ai_response: "**Best Fit:** Chairman\nStrong *deal* record".to_string(),
        };
        let line = export_line(&record, "https://example.test/in/ada").unwrap();
        assert!(!line.contains('\n'));
        let cells: Vec<&str> = line.split('\t').collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], "Ada");
        assert_eq!(cells[1], "https://example.test/in/ada");
        assert_eq!(cells[2], "Chair CFO");
        assert_eq!(
            cells[4],
            "Title Company From To Total Experience CFO Acme 2015 2020 5 yrs Led"
        );
        assert_eq!(cells[5], "Best Fit: Chairman Strong deal record");
    }

    #[test]
    fn test_export_with_header() {
        let record = ProfileRecord::default();
        let text = export_with_header(&record, "u").unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[0], "Name\tLinkedIn\tHeadline\tAbout\tExperience\tAI");
        assert_eq!(lines[1], "\tu\t\t\t\t");
    }

    #[test]
    fn test_debug_dump_sections() {
        let record = ProfileRecord {
            name: "Ada".to_string(),
            ..Default::default()
        };
        let dump = debug_dump(&record, "https://example.test");
        assert!(dump.starts_with("=== URL ===\nhttps://example.test"));
        assert!(dump.contains("=== NAME ===\nAda"));
        assert!(dump.contains("=== ABOUT ===\n(empty)"));
    }
}
