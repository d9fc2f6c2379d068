//! PPTX file parser implementation.

use crate::container::Container;
use crate::extract::{extract_notes_text, extract_text_runs};
use crate::resolver::{resolve_notes_part, resolve_slide_order};
use deck_core::{Error, OrderedPartRef, ParseOutcome, Result, SlideModelBuilder};

/// Parser for PPTX (Office Open XML) uploads.
///
/// Parsing never fails with an `Err`: fatal problems become
/// [`ParseOutcome::Failed`] and per-slide problems become warnings.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse an uploaded buffer into the structured slide model.
    pub fn parse(&self, bytes: &[u8]) -> ParseOutcome {
        match self.parse_slides(bytes) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Presentation rejected: {:?}", e);
                ParseOutcome::failed(e.to_string())
            }
        }
    }

    fn parse_slides(&self, bytes: &[u8]) -> Result<ParseOutcome> {
        let mut container = Container::open(bytes)?;
        let resolution = resolve_slide_order(&mut container)?;

        let mut builder = SlideModelBuilder::new();
        for warning in resolution.warnings {
            builder.warn(warning);
        }

        for part in &resolution.parts {
            let runs = match self.read_slide_runs(&mut container, part) {
                Ok(runs) => runs,
                Err(e) => {
                    log::warn!("{}", e);
                    builder.warn(format!("Slide {} could not be read and was left empty.", part.index));
                    Vec::new()
                }
            };

            let notes = match self.read_notes(&mut container, part) {
                Ok(notes) => notes,
                Err(e) => {
                    log::warn!("Speaker notes for slide {}: {}", part.index, e);
                    builder.warn(format!("Speaker notes for slide {} could not be read.", part.index));
                    String::new()
                }
            };

            log::debug!(
                "Slide {} ({}): {} text runs, {} chars of notes",
                part.index,
                part.path,
                runs.len(),
                notes.len()
            );
            builder.push(&runs, notes);
        }

        log::info!("Parsed {} slides", builder.len());
        Ok(builder.finish())
    }

    /// Read and walk one slide part.
    fn read_slide_runs(&self, container: &mut Container<'_>, part: &OrderedPartRef) -> Result<Vec<String>> {
        let slide_error = |reason: String| Error::SlideRead {
            slide: part.index,
            reason,
        };

        let xml = container
            .read_text(&part.path)
            .map_err(|e| slide_error(format!("{:?}", e)))?
            .ok_or_else(|| slide_error(format!("part {} is missing", part.path)))?;

        extract_text_runs(&xml).map_err(|e| slide_error(e.to_string()))
    }

    /// Notes text of a slide, or an empty string when it has none.
    fn read_notes(&self, container: &mut Container<'_>, part: &OrderedPartRef) -> Result<String> {
        let Some(notes_path) = resolve_notes_part(container, part) else {
            return Ok(String::new());
        };

        match container.read_text(&notes_path)? {
            Some(xml) => extract_notes_text(&xml),
            None => Ok(String::new()),
        }
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an uploaded buffer with a default parser.
pub fn parse_presentation(bytes: &[u8]) -> ParseOutcome {
    PptxParser::new().parse(bytes)
}
