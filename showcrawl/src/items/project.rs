use scraper::Html;
use serde::Serialize;

use super::sections::{
    flat_text, heading_section, selector, tag_fallback, Section, SECTION_KEYWORDS,
};
use crate::FromHTML;

/// Suffix the site appends to every `<title>`.
const TITLE_SUFFIX: &str = "| Devfolio";

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Selector Error: {0}")]
    Selector(String),
}

/// Structured fields of one project page. Any field may be empty.
///
/// Serializes with the column names of the exported CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    #[serde(rename = "urlOfProject")]
    pub url: String,
    #[serde(rename = "nameOfProject")]
    pub name: String,
    #[serde(rename = "descriptionOfProject")]
    pub description: String,
    #[serde(rename = "problemSolved")]
    pub problem_solved: String,
    #[serde(rename = "challengesFaced")]
    pub challenges_faced: String,
    #[serde(rename = "technologiesUsed")]
    pub technologies_used: String,
}

impl FromHTML for ProjectRecord {
    type Error = ExtractError;
    type Output = Self;

    fn from_html(url: &str, html: &str) -> Result<Self::Output, Self::Error>
    where
        Self: Sized,
    {
        let document = Html::parse_document(html);

        let mut record = ProjectRecord {
            url: url.to_string(),
            name: extract_name(&document)?,
            description: extract_description(&document)?,
            ..Default::default()
        };

        for (section, keywords) in SECTION_KEYWORDS {
            let text = heading_section(&document, keywords)?;
            match section {
                Section::ProblemSolved => record.problem_solved = text,
                Section::ChallengesFaced => record.challenges_faced = text,
                Section::TechnologiesUsed => record.technologies_used = text,
            }
        }

        if record.technologies_used.is_empty() {
            record.technologies_used = tag_fallback(&document)?;
        }

        Ok(record)
    }
}

fn extract_name(document: &Html) -> Result<String, ExtractError> {
    let heading = selector("main h1")?;
    if let Some(text) = document
        .select(&heading)
        .next()
        .map(flat_text)
        .filter(|text| !text.is_empty())
    {
        return Ok(text);
    }

    let title = selector("title")?;
    Ok(document
        .select(&title)
        .next()
        .map(|title| flat_text(title).replace(TITLE_SUFFIX, "").trim().to_string())
        .unwrap_or_default())
}

fn extract_description(document: &Html) -> Result<String, ExtractError> {
    for css in [
        r#"meta[property="og:description"]"#,
        r#"meta[name="description"]"#,
    ] {
        let meta = selector(css)?;
        let content = document
            .select(&meta)
            .next()
            .and_then(|element| element.value().attr("content"))
            .map(str::trim)
            .filter(|content| !content.is_empty());
        if let Some(content) = content {
            return Ok(content.to_string());
        }
    }

    Ok(String::new())
}
