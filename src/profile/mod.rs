// src/profile/mod.rs
use crate::utils::sanitize_field;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod expansion;
pub mod extractor;

pub use expansion::ExpansionTrigger;
pub use extractor::FieldExtractor;

pub const EXPERIENCE_HEADER: [&str; 6] = ["Title", "Company", "From", "To", "Total", "Experience"];

/// Everything one extraction-and-score cycle produces. Built fresh per cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub name: String,
    pub headline: String,
    pub about: String,
    /// TSV table, header row first.
    pub experience: String,
    #[serde(default)]
    pub ai_response: String,
}

impl ProfileRecord {
    /// The text sent to the scoring API: name, headline, about, experience.
    pub fn combined_payload(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.name, self.headline, self.about, self.experience
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRow {
    pub title: String,
    pub company: String,
    pub from_date: String,
    pub to_date: String,
    pub duration: String,
    pub description: String,
}

impl ExperienceRow {
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|field| field.is_empty())
    }

    fn fields(&self) -> [&str; 6] {
        [
            &self.title,
            &self.company,
            &self.from_date,
            &self.to_date,
            &self.duration,
            &self.description,
        ]
    }
}

/// Split a date range on its en-dash. Without a dash the whole string is the
/// start date and the end date stays empty.
pub fn split_date_range(text: &str) -> (String, String) {
    match text.split_once('–') {
        Some((from, to)) => (from.trim().to_string(), to.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

/// Write tab-separated records with no quoting. Callers sanitize fields first,
/// so no cell can contain a delimiter or a line break.
pub(crate) fn write_tsv<'a, I, R>(records: I) -> Result<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = &'a str>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    for record in records {
        let cells: Vec<String> = record.into_iter().map(sanitize_field).collect();
        writer
            .write_record(&cells)
            .context("Failed to write TSV record")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush TSV writer: {}", e))?;
    let mut text = String::from_utf8(bytes).context("TSV output is not UTF-8")?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Header row followed by one row per entry, rows separated by `\n`.
pub fn experience_table(rows: &[ExperienceRow]) -> Result<String> {
    let records = std::iter::once(EXPERIENCE_HEADER.to_vec())
        .chain(rows.iter().map(|row| row.fields().to_vec()));
    write_tsv(records)
}

pub fn experience_header() -> String {
    EXPERIENCE_HEADER.join("\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_date_range_with_en_dash() {
        assert_eq!(
            split_date_range("  Jan 2019 – Present "),
            ("Jan 2019".to_string(), "Present".to_string())
        );
    }

    #[test]
    fn test_split_date_range_without_dash() {
        assert_eq!(
            split_date_range(" 2015 "),
            ("2015".to_string(), String::new())
        );
        // a plain hyphen is not a range separator
        assert_eq!(
            split_date_range("2015-2018"),
            ("2015-2018".to_string(), String::new())
        );
    }

    #[test]
    fn test_empty_table_is_header_only() {
        assert_eq!(experience_table(&[]).unwrap(), experience_header());
        assert_eq!(experience_header(), "Title\tCompany\tFrom\tTo\tTotal\tExperience");
    }

    #[test]
    fn test_table_rows_never_contain_stray_tabs_or_newlines() {
        let row = ExperienceRow {
            title: "VP\tSales".to_string(),
            company: "Acme\nCorp".to_string(),
            from_date: "Jan 2019".to_string(),
            to_date: "Present".to_string(),
            duration: "5 yrs".to_string(),
            description: "Grew\r\nrevenue".to_string(),
        };
        let table = experience_table(&[row]).unwrap();
        let lines: Vec<&str> = table.split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].split('\t').count(), 6);
        assert_eq!(lines[1], "VP Sales\tAcme Corp\tJan 2019\tPresent\t5 yrs\tGrew  revenue");
    }

    #[test]
    fn test_combined_payload_order() {
        let record = ProfileRecord {
            name: "Ada".to_string(),
            headline: "Chair".to_string(),
            about: "About".to_string(),
            experience: "Title".to_string(),
            ai_response: "ignored".to_string(),
        };
        assert_eq!(record.combined_payload(), "Ada\nChair\nAbout\nTitle");
    }
}
