//! Slide model builder.
//!
//! Turns ordered per-slide text runs into [`ParsedSlide`] records using a
//! title/body split heuristic. The heuristic is lossy for rich multi-paragraph
//! layouts; misclassification is an accepted limitation.

use crate::text::char_len;
use crate::types::{ParseOutcome, ParsedSlide};

/// A single run longer than this is treated as body text, not a title.
pub const TITLE_MAX_CHARS: usize = 80;

/// Title used when a lone long run is moved into the body.
pub const GENERIC_TITLE: &str = "Slide";

/// Split a slide's text runs into `(title, body)`.
///
/// `index` is the 1-based slide number.
pub fn classify_slide(index: usize, runs: &[String]) -> (String, String) {
    match runs {
        [] => (format!("Slide {}", index), String::new()),
        [only] if char_len(only) > TITLE_MAX_CHARS => (GENERIC_TITLE.to_string(), only.clone()),
        [only] => (only.clone(), String::new()),
        [title, rest @ ..] => {
            let body = rest
                .iter()
                .map(|run| format!("- {}", run))
                .collect::<Vec<_>>()
                .join("\n");
            (title.clone(), body)
        }
    }
}

/// Accumulates slides and warnings, then enforces the [`ParseOutcome`] contract.
#[derive(Debug, Default)]
pub struct SlideModelBuilder {
    slides: Vec<ParsedSlide>,
    warnings: Vec<String>,
}

impl SlideModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the next slide and return its 1-based number.
    pub fn push(&mut self, runs: &[String], notes: impl Into<String>) -> usize {
        let index = self.slides.len() + 1;
        let (title, body) = classify_slide(index, runs);
        self.slides.push(ParsedSlide::new(title, body, notes));
        index
    }

    /// Record a non-fatal warning.
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Number of slides pushed so far.
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Finish the model. An empty builder yields a failed outcome.
    pub fn finish(self) -> ParseOutcome {
        if self.slides.is_empty() {
            return ParseOutcome::failed(crate::Error::NoSlidesFound.to_string());
        }

        ParseOutcome::Parsed {
            slides: self.slides,
            warnings: self.warnings,
        }
    }
}
