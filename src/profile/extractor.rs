// src/profile/extractor.rs
use super::{experience_header, experience_table, split_date_range, ExperienceRow, ProfileRecord};
use crate::config::SelectorConfig;
use crate::utils::collapse_whitespace;
use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

lazy_static! {
    static ref DURATION: Regex =
        Regex::new(r"(\d+\s+(?:yrs?|mos?|days?)(?:\s+\d+\s+(?:yrs?|mos?|days?))*)")
            .expect("valid duration regex");
}

/// Reads profile fields out of a parsed document.
///
/// Every field is extracted on its own: a missing element yields an empty
/// string and a warning, never an error for the whole record.
pub struct FieldExtractor {
    name: Vec<Selector>,
    headline: Vec<Selector>,
    about: Vec<Selector>,
    experience_entry: Vec<Selector>,
    job_title: Vec<Selector>,
    company: Vec<Selector>,
    date_range: Vec<Selector>,
    description: Vec<Selector>,
}

impl FieldExtractor {
    /// Compile the configured selectors. A selector that does not parse is a
    /// configuration error.
    pub fn new(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            name: compile("name", &config.name)?,
            headline: compile("headline", &config.headline)?,
            about: compile("about", &config.about)?,
            experience_entry: compile("experience_entry", &config.experience_entry)?,
            job_title: compile("job_title", &config.job_title)?,
            company: compile("company", &config.company)?,
            date_range: compile("date_range", &config.date_range)?,
            description: compile("description", &config.description)?,
        })
    }

    pub fn extract_all(&self, document: &Html) -> ProfileRecord {
        let record = ProfileRecord {
            name: self.extract_name(document),
            headline: self.extract_headline(document),
            about: self.extract_about(document),
            experience: self.extract_experience(document),
            ai_response: String::new(),
        };
        info!(
            "Extracted profile '{}' ({} chars of experience)",
            record.name,
            record.experience.len()
        );
        record
    }

    pub fn extract_name(&self, document: &Html) -> String {
        let name = self.heading_text(document, &self.name, "person name");
        debug!("Person name: {}", name);
        name
    }

    pub fn extract_headline(&self, document: &Html) -> String {
        let headline = self.heading_text(document, &self.headline, "headline");
        debug!("Headline: {}", headline);
        headline
    }

    /// Prefer the blurb's `title` attribute; otherwise join the visible text,
    /// skipping stale copies kept in hidden spans.
    pub fn extract_about(&self, document: &Html) -> String {
        let Some(blurb) = first_match(document.root_element(), &self.about) else {
            warn!("About blurb not found");
            return String::new();
        };

        if let Some(title) = blurb.value().attr("title") {
            let title = collapse_whitespace(title);
            if !title.is_empty() {
                return title;
            }
        }

        collapse_whitespace(&collect_text(blurb, is_hidden))
    }

    /// The experience table as TSV, header first. Header only when no entry
    /// is found.
    pub fn extract_experience(&self, document: &Html) -> String {
        let rows = self.extract_experience_rows(document);
        match experience_table(&rows) {
            Ok(table) => table,
            Err(e) => {
                warn!("Failed to assemble experience table: {}", e);
                experience_header()
            }
        }
    }

    pub fn extract_experience_rows(&self, document: &Html) -> Vec<ExperienceRow> {
        let entries: Vec<ElementRef> = self
            .experience_entry
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|entries| !entries.is_empty())
            .unwrap_or_default();

        info!("Found experience entries: {}", entries.len());

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let row = self.extract_row(entry);
                if row.is_empty() {
                    warn!("Experience entry {} has no recognizable fields", index + 1);
                }
                row
            })
            .collect()
    }

    fn extract_row(&self, entry: ElementRef<'_>) -> ExperienceRow {
        let title = first_match(entry, &self.job_title)
            .map(element_text)
            .unwrap_or_default();
        let company = first_match(entry, &self.company)
            .map(element_text)
            .unwrap_or_default();

        let mut row = ExperienceRow {
            title,
            company,
            ..Default::default()
        };

        if let Some(date) = first_match(entry, &self.date_range) {
            let (from, to) = split_date_range(&element_text(date));
            row.from_date = from;
            row.to_date = to;
            let scope = closest_paragraph(date).unwrap_or(date);
            row.duration = find_duration(&text_content(scope, |_| false));
        }

        if let Some(description) = first_match(entry, &self.description) {
            row.description =
                collapse_whitespace(&text_content(description, |el| el.name() == "button"));
        }

        row
    }

    fn heading_text(&self, document: &Html, selectors: &[Selector], field: &str) -> String {
        match first_match(document.root_element(), selectors) {
            Some(element) => element_text(element),
            None => {
                warn!("No element found for {}", field);
                String::new()
            }
        }
    }
}

fn compile(field: &str, selectors: &[String]) -> Result<Vec<Selector>> {
    selectors
        .iter()
        .map(|raw| {
            Selector::parse(raw)
                .map_err(|e| anyhow::anyhow!("Invalid {} selector '{}': {}", field, raw, e))
        })
        .collect()
}

/// First element under `scope` matching any selector, in selector order.
fn first_match<'a>(scope: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| scope.select(selector).next())
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text nodes under `root` in document order, leaving out anything inside an
/// element for which `skip` holds.
fn text_nodes<'a, F>(root: ElementRef<'a>, skip: F) -> impl Iterator<Item = &'a str>
where
    F: Fn(&Element) -> bool,
{
    let root_id = root.id();
    root.descendants().filter_map(move |node| {
        let text = node.value().as_text()?;
        let skipped = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root_id)
            .filter_map(ElementRef::wrap)
            .any(|ancestor| skip(ancestor.value()));
        (!skipped).then_some(&**text)
    })
}

/// Visible pieces trimmed and joined by single spaces.
fn collect_text<F>(root: ElementRef<'_>, skip: F) -> String
where
    F: Fn(&Element) -> bool,
{
    text_nodes(root, skip)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Like `textContent`: text nodes concatenated as-is.
fn text_content<F>(root: ElementRef<'_>, skip: F) -> String
where
    F: Fn(&Element) -> bool,
{
    text_nodes(root, skip).collect()
}

fn is_hidden(element: &Element) -> bool {
    if element.attr("hidden").is_some() {
        return true;
    }
    if element
        .classes()
        .any(|class| class == "visually-hidden" || class == "hidden")
    {
        return true;
    }
    element
        .attr("style")
        .map(|style| {
            let style: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            style.contains("display:none") || style.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

fn closest_paragraph(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "p")
}

fn find_duration(text: &str) -> String {
    DURATION
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
