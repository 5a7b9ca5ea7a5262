//! Discipline detail page: requirement list and class blocks.

use super::normalize_whitespace;
use crate::browser::DomSnapshot;
use crate::constants::{CLASSES_HEADERS, DEFAULT_REQUIREMENT_TYPE, NO_REQUIREMENTS_TEXT, REQUIREMENTS_HEADER};
use crate::types::Requirement;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

static BLOCK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".divContentBlock").expect("block selector"));
static HEADER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".divContentBlockHeader").expect("header selector"));
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".divContentBlockBody").expect("body selector"));
static LINE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[style*="margin-bottom"]"#).expect("line selector"));
static BOLD_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("b").expect("b selector"));
static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("table selector"));
static TR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector"));
static DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("div selector"));

fn text_of(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Requirements listed on the detail page.
///
/// Empty when there is no requirements block or when the portal states that
/// the discipline has none. Labeled paragraphs give one entry each; a body
/// without paragraphs becomes a single entry.
pub fn extract_requirements(snapshot: &DomSnapshot) -> Vec<Requirement> {
    let document = snapshot.document();

    let Some(block) = document.select(&BLOCK_SELECTOR).find(|block| {
        block
            .select(&HEADER_SELECTOR)
            .next()
            .is_some_and(|header| text_of(&header).contains(REQUIREMENTS_HEADER))
    }) else {
        return Vec::new();
    };
    let Some(body) = block.select(&BODY_SELECTOR).next() else {
        return Vec::new();
    };
    let body_text = text_of(&body);
    if body_text.contains(NO_REQUIREMENTS_TEXT) {
        return Vec::new();
    }

    let lines: Vec<ElementRef> = body.select(&LINE_SELECTOR).collect();
    if lines.is_empty() {
        let label = body.select(&BOLD_SELECTOR).next();
        let description = label
            .and_then(|b| description_after(&b))
            .unwrap_or(body_text);
        return vec![Requirement {
            kind: requirement_type(label),
            description,
        }];
    }

    lines
        .iter()
        .map(|line| {
            let label = line.select(&BOLD_SELECTOR).next();
            Requirement {
                kind: requirement_type(label),
                description: label
                    .and_then(|b| description_after(&b))
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn requirement_type(label: Option<ElementRef>) -> String {
    label
        .map(|b| text_of(&b).replacen(':', "", 1).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_REQUIREMENT_TYPE.to_string())
}

// The description sits in the element following the label's wrapper.
fn description_after(label: &ElementRef) -> Option<String> {
    let wrapper = label.parent().and_then(ElementRef::wrap)?;
    let next = wrapper.next_siblings().find_map(ElementRef::wrap)?;
    Some(text_of(&next))
}

/// Normalized text of each class block, in page order.
pub fn extract_class_blocks(snapshot: &DomSnapshot) -> Vec<String> {
    let document = snapshot.document();

    let Some(header) = document.select(&HEADER_SELECTOR).find(|h| {
        let text = text_of(h);
        CLASSES_HEADERS.iter().any(|label| text.contains(label))
    }) else {
        return Vec::new();
    };
    let Some(container) = header.parent().and_then(ElementRef::wrap) else {
        return Vec::new();
    };
    let Some(table) = container.select(&TABLE_SELECTOR).next() else {
        return Vec::new();
    };

    table
        .select(&TR_SELECTOR)
        // Rows of nested tables belong to the class block that contains them
        .filter(|row| {
            row.ancestors()
                .find(|node| {
                    node.value()
                        .as_element()
                        .is_some_and(|el| el.name() == "table")
                })
                .is_some_and(|owner| owner.id() == table.id())
        })
        .filter_map(|row| {
            let cell = row
                .children()
                .filter_map(ElementRef::wrap)
                .find(|child| child.value().name() == "td")?;
            let block = cell.select(&DIV_SELECTOR).next()?;
            Some(text_of(&block))
        })
        .filter(|text| !text.is_empty())
        .collect()
}
