//! Heading-proximity heuristics for the free-text parts of a project page.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Node, Selector};

use super::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    ProblemSolved,
    ChallengesFaced,
    TechnologiesUsed,
}

/// Keyword synonyms per section, matched as lowercase substrings of heading text.
pub const SECTION_KEYWORDS: &[(Section, &[&str])] = &[
    (
        Section::ProblemSolved,
        &["problem", "problem statement", "what it does", "solution"],
    ),
    (
        Section::ChallengesFaced,
        &["challenge", "challenges", "obstacle", "hurdle"],
    ),
    (
        Section::TechnologiesUsed,
        &["technologies", "tech stack", "built with", "stack"],
    ),
];

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";

/// Elements whose class or attributes usually mark a tag, chip or badge.
const TAG_SELECTORS: &[&str] = &[
    "[class*='Tag']",
    "[class*='tag']",
    "[class*='Tech']",
    "a[href*='tag']",
    "span.chip",
    "[data-testid*='chip']",
];

const MAX_TAG_LEN: usize = 40;

pub(super) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|err| ExtractError::Selector(format!("{css}: {err}")))
}

/// Elements rendered on their own line.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th",
    "thead", "tr", "ul",
];

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Chips are usually inline boxes laid out side by side, so each one is a line of its own.
const CHIP_ELEMENTS: &[&str] = &["a", "button", "span"];

/// Rendered lines of an element, similar to the DOM's `innerText`.
///
/// Block boundaries and `<br>` break lines, whitespace is collapsed within a line and
/// blank lines are dropped, so minified markup keeps its words apart.
fn text_lines(element: ElementRef, breaks: &[&str]) -> Vec<String> {
    let mut raw = String::new();
    push_text(element, breaks, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn push_text(element: ElementRef, breaks: &[&str], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                // source newlines are plain whitespace; only the layout breaks lines
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_ELEMENTS.contains(&name) || breaks.contains(&name);
                if block {
                    out.push('\n');
                }
                push_text(child, breaks, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Element text as rendered lines joined with `\n`.
pub(super) fn inner_text(element: ElementRef) -> String {
    text_lines(element, &[]).join("\n")
}

/// Element text on a single line, for names and titles.
pub(super) fn flat_text(element: ElementRef) -> String {
    text_lines(element, &[]).join(" ")
}

fn is_heading(element: &ElementRef) -> bool {
    matches!(
        element.value().name(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

/// Text under the first heading that mentions any keyword.
///
/// Headings are visited in document order and the first one containing any of
/// the keywords wins. Its following sibling elements, up to the next heading,
/// are newline-joined. Empty when no heading matches.
pub fn heading_section(document: &Html, keywords: &[&str]) -> Result<String, ExtractError> {
    let headings = selector(HEADINGS)?;
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    let Some(heading) = document.select(&headings).find(|heading| {
        let text = flat_text(*heading).to_lowercase();
        keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }) else {
        return Ok(String::new());
    };

    let chunks: Vec<String> = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|sibling| !is_heading(sibling))
        .map(inner_text)
        .filter(|text| !text.is_empty())
        .collect();

    Ok(chunks.join("\n"))
}

/// Short, deduplicated texts of tag-like elements, comma separated.
///
/// A container such as `<div class="tags">` contributes each of its chips separately.
pub fn tag_fallback(document: &Html) -> Result<String, ExtractError> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for css in TAG_SELECTORS {
        let tag_selector = selector(css)?;
        for element in document.select(&tag_selector) {
            for text in text_lines(element, CHIP_ELEMENTS) {
                if text.chars().count() > MAX_TAG_LEN {
                    continue;
                }
                if seen.insert(text.clone()) {
                    tags.push(text);
                }
            }
        }
    }

    Ok(tags.join(", "))
}
