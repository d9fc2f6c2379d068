//! PPTX (Office Open XML) parser backend for presentation ingestion.
//!
//! Opens uploads as ZIP archives, resolves the author-intended slide order
//! and extracts ordered slide text and speaker notes.

pub mod container;
pub mod extract;
pub mod parser;
pub mod resolver;
pub mod xml;

pub use container::{normalize_part_name, Container, MAX_UPLOAD_BYTES};
pub use extract::{classify_run, extract_notes_text, extract_text_runs, RunShape};
pub use parser::{parse_presentation, PptxParser};
pub use resolver::{resolve_notes_part, resolve_slide_order, Resolution, FALLBACK_ORDER_WARNING};
