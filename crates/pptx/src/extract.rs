//! Text and speaker-notes extraction.
//!
//! Only text inside a run-text element (`a:t`) is author-visible. Attribute
//! values, declarations and stray text on unrelated elements never reach
//! the output.

use crate::xml::{parse_tree, XmlElement, XmlNode};
use deck_core::{normalize_run, Result};

/// Local name of the run-text element.
const RUN_TEXT: &str = "t";
const PARAGRAPH: &str = "p";
const LINE_BREAK: &str = "br";
const FIELD: &str = "fld";
const SHAPE: &str = "sp";
const PLACEHOLDER: &str = "ph";

/// Placeholder types on a notes page that carry page furniture, not notes.
const NOTES_FURNITURE: &[&str] = &["sldNum", "dt", "hdr", "ftr"];

/// The content shapes a run-text element is found in across exporters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunShape<'a> {
    /// A single text node.
    Plain(&'a str),
    /// Several text nodes, e.g. text split by a comment or a CDATA section.
    Fragments(Vec<&'a str>),
    /// Text wrapped in further elements.
    Nested(&'a XmlElement),
}

impl RunShape<'_> {
    /// Flatten to the run's text.
    pub fn text(&self) -> String {
        match self {
            RunShape::Plain(text) => text.to_string(),
            RunShape::Fragments(parts) => parts.concat(),
            RunShape::Nested(element) => {
                let mut out = String::new();
                collect_all_text(element, &mut out);
                out
            }
        }
    }
}

/// Classify the content of a run-text element.
pub fn classify_run(run: &XmlElement) -> RunShape<'_> {
    if run.child_elements().next().is_some() {
        return RunShape::Nested(run);
    }

    let texts: Vec<&str> = run
        .children
        .iter()
        .filter_map(|child| match child {
            XmlNode::Text(text) => Some(text.as_str()),
            XmlNode::Element(_) => None,
        })
        .collect();

    match texts.as_slice() {
        [] => RunShape::Plain(""),
        [only] => RunShape::Plain(only),
        _ => RunShape::Fragments(texts),
    }
}

fn is_text_run(element: &XmlElement) -> bool {
    element.name == RUN_TEXT
}

/// Ordered, normalized, non-empty text runs of a slide part.
pub fn extract_text_runs(xml: &str) -> Result<Vec<String>> {
    let root = parse_tree(xml)?;

    let mut shapes = Vec::new();
    collect_runs(&root, &mut shapes);

    Ok(shapes
        .iter()
        .map(|shape| normalize_run(&shape.text()))
        .filter(|text| !text.is_empty())
        .collect())
}

fn collect_runs<'a>(element: &'a XmlElement, out: &mut Vec<RunShape<'a>>) {
    if is_text_run(element) {
        out.push(classify_run(element));
        return;
    }

    for child in element.child_elements() {
        collect_runs(child, out);
    }
}

/// Speaker notes of a notes part as one string.
///
/// Runs of one paragraph are concatenated, paragraphs are joined with `\n`.
/// Slide-number fields and header/footer/date placeholders are skipped.
pub fn extract_notes_text(xml: &str) -> Result<String> {
    let root = parse_tree(xml)?;

    let mut paragraphs = Vec::new();
    collect_paragraphs(&root, &mut paragraphs);

    Ok(paragraphs
        .iter()
        .map(|p| normalize_run(p))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn collect_paragraphs(element: &XmlElement, out: &mut Vec<String>) {
    if element.name == SHAPE && is_furniture_shape(element) {
        return;
    }

    if element.name == PARAGRAPH {
        let mut text = String::new();
        collect_paragraph_text(element, &mut text);
        out.push(text);
        return;
    }

    for child in element.child_elements() {
        collect_paragraphs(child, out);
    }
}

fn collect_paragraph_text(element: &XmlElement, out: &mut String) {
    for child in element.child_elements() {
        if is_text_run(child) {
            out.push_str(&classify_run(child).text());
        } else if child.name == LINE_BREAK {
            out.push('\n');
        } else if child.name == FIELD && child.attr("type") == Some("slidenum") {
            continue;
        } else {
            collect_paragraph_text(child, out);
        }
    }
}

fn is_furniture_shape(shape: &XmlElement) -> bool {
    shape
        .find(PLACEHOLDER)
        .and_then(|ph| ph.attr("type"))
        .map(|kind| NOTES_FURNITURE.contains(&kind))
        .unwrap_or(false)
}

fn collect_all_text(element: &XmlElement, out: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(el) => collect_all_text(el, out),
        }
    }
}
