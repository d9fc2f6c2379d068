//! Slide order resolution.
//!
//! The authoritative order lives in `ppt/presentation.xml` (`sldIdLst`), whose
//! entries point through `ppt/_rels/presentation.xml.rels` at the slide parts.
//! When that chain is missing or broken the order is inferred from the
//! numerals in `ppt/slides/slideN.xml` file names.

use crate::container::{normalize_part_name, Container};
use crate::xml::{attr_value, local_name};
use deck_core::{Error, OrderedPartRef, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

pub const PRESENTATION_PART: &str = "ppt/presentation.xml";
pub const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// Warning attached when the file-name fallback decided the order.
pub const FALLBACK_ORDER_WARNING: &str = "Slide order was inferred from file names.";

/// Slide parts as they appear in the normalized file table.
static SLIDE_PART_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

const SLIDE_REL_TYPE_SUFFIX: &str = "/slide";
const NOTES_REL_TYPE_SUFFIX: &str = "/notesSlide";

/// Ordered slide parts plus any non-fatal warnings raised on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub parts: Vec<OrderedPartRef>,
    pub warnings: Vec<String>,
}

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    target: String,
    rel_type: String,
}

/// Produce the definitive slide order for a package.
pub fn resolve_slide_order(container: &mut Container<'_>) -> Result<Resolution> {
    let mut warnings = Vec::new();

    match ordered_from_manifest(container, &mut warnings) {
        Ok(paths) if !paths.is_empty() => {
            log::debug!("Resolved {} slides from the presentation manifest", paths.len());
            return Ok(Resolution {
                parts: number_parts(paths),
                warnings,
            });
        }
        Ok(_) => log::warn!("Presentation manifest did not resolve to any slide parts"),
        Err(e) => log::warn!("Presentation manifest unusable for slide order: {}", e),
    }

    let paths = ordered_from_file_names(container);
    if paths.is_empty() {
        return Err(Error::NoSlidesFound);
    }

    log::info!("Inferred order of {} slides from file names", paths.len());
    Ok(Resolution {
        parts: number_parts(paths),
        warnings: vec![FALLBACK_ORDER_WARNING.to_string()],
    })
}

/// Find the notes part belonging to a slide.
///
/// Follows the slide's own relationship file; a slide without one falls back
/// to `ppt/notesSlides/notesSlide{index}.xml`.
pub fn resolve_notes_part(container: &mut Container<'_>, slide: &OrderedPartRef) -> Option<String> {
    let (dir, file) = split_part(&slide.path);
    let rels_path = format!("{}/_rels/{}.rels", dir, file);

    let rels = match container.read_text(&rels_path) {
        Ok(Some(xml)) => parse_relationships(&xml),
        Ok(None) => Err(Error::Xml(format!("{} is missing", rels_path))),
        Err(e) => Err(e),
    };

    match rels {
        Ok(rels) => {
            let mut ids: Vec<&String> = rels.keys().collect();
            ids.sort();
            ids.into_iter()
                .filter_map(|id| rels.get(id))
                .filter(|rel| rel.rel_type.ends_with(NOTES_REL_TYPE_SUFFIX))
                .map(|rel| resolve_target(dir, &rel.target))
                .find(|path| container.contains(path))
        }
        Err(e) => {
            log::debug!("No usable relationships for {}: {}", slide.path, e);
            let fallback = format!("ppt/notesslides/notesslide{}.xml", slide.index);
            container.contains(&fallback).then_some(fallback)
        }
    }
}

fn ordered_from_manifest(container: &mut Container<'_>, warnings: &mut Vec<String>) -> Result<Vec<String>> {
    let manifest = container
        .read_text(PRESENTATION_PART)?
        .ok_or_else(|| Error::Xml(format!("{} is missing", PRESENTATION_PART)))?;
    let rels_xml = container
        .read_text(PRESENTATION_RELS_PART)?
        .ok_or_else(|| Error::Xml(format!("{} is missing", PRESENTATION_RELS_PART)))?;

    let slide_ids = parse_slide_ids(&manifest)?;
    let rels = parse_relationships(&rels_xml)?;
    let (base_dir, _) = split_part(PRESENTATION_PART);

    let mut seen = HashSet::new();
    let mut paths = Vec::with_capacity(slide_ids.len());

    for id in slide_ids {
        let Some(rel) = rels.get(&id) else {
            log::warn!("Slide reference {} has no relationship entry", id);
            warnings.push(format!("Slide reference {} could not be resolved and was skipped.", id));
            continue;
        };

        if !rel.rel_type.is_empty() && !rel.rel_type.ends_with(SLIDE_REL_TYPE_SUFFIX) {
            log::warn!("Slide reference {} points at a {} relationship", id, rel.rel_type);
            continue;
        }

        let path = resolve_target(base_dir, &rel.target);
        if !container.contains(&path) {
            log::warn!("Slide reference {} targets missing part {}", id, path);
            warnings.push(format!("Slide reference {} points to a missing part and was skipped.", id));
            continue;
        }

        if seen.insert(path.clone()) {
            paths.push(path);
        }
    }

    Ok(paths)
}

fn ordered_from_file_names(container: &Container<'_>) -> Vec<String> {
    let mut numbered: Vec<(u64, String)> = container
        .keys()
        .into_iter()
        .filter_map(|key| {
            let caps = SLIDE_PART_REGEX.captures(key)?;
            let number = caps[1].parse::<u64>().ok()?;
            Some((number, key.to_string()))
        })
        .collect();

    numbered.sort();
    numbered.into_iter().map(|(_, path)| path).collect()
}

fn number_parts(paths: Vec<String>) -> Vec<OrderedPartRef> {
    paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| OrderedPartRef { path, index: i + 1 })
        .collect()
}

/// Relationship ids of `p:sldIdLst/p:sldId`, in document order.
fn parse_slide_ids(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut ids = Vec::new();
    let mut in_list = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                in_list = true;
            }
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"sldIdLst" => {
                in_list = false;
            }
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_list && local_name(e.name().as_ref()) == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    let key = attr.key.as_ref();
                    // The relationship id is the namespaced `r:id`, not the numeric `id`
                    if key != b"id" && local_name(key) == b"id" {
                        ids.push(attr_value(&attr)?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing presentation manifest: {}", e)));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Map of relationship id to entry; external targets are dropped.
fn parse_relationships(xml: &str) -> Result<HashMap<String, Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut rels = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = String::new();
                let mut target = String::new();
                let mut rel_type = String::new();
                let mut external = false;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr_value(&attr)?,
                        b"Target" => target = attr_value(&attr)?,
                        b"Type" => rel_type = attr_value(&attr)?,
                        b"TargetMode" => external = attr_value(&attr)?.eq_ignore_ascii_case("External"),
                        _ => {}
                    }
                }

                if !id.is_empty() && !target.is_empty() && !external {
                    rels.insert(id, Relationship { target, rel_type });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Resolve a relationship target against the directory of its source part
/// and normalize it into a file-table key.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => target,
        None => format!("{}/{}", base_dir, target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    normalize_part_name(&segments.join("/"))
}

/// Split `dir/file` at the last slash.
fn split_part(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}
