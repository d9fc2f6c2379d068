//! Generic XML tree built from a package part.
//!
//! Elements keep their local (prefix-free) name; attribute keys keep their
//! qualified form so `r:id` and `id` stay distinguishable.

use deck_core::{Error, Result};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parts nested deeper than this are rejected instead of walked.
pub const MAX_DEPTH: usize = 256;

/// A node of the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its local name, attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Look up an attribute by its qualified key (`type`, `r:id`).
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First descendant (depth-first) with the given local name.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in self.child_elements() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

/// Parse a complete XML document into its root element.
///
/// Mismatched or unclosed tags, bad escapes and multiple roots are errors.
/// Declarations, comments and processing instructions are dropped.
pub fn parse_tree(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::Xml(format!("at position {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(ref e) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(Error::Xml(format!("nesting deeper than {} levels", MAX_DEPTH)));
                }
                stack.push(element_from_start(e)?);
            }
            Event::Empty(ref e) => {
                let element = element_from_start(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("closing tag without an open element".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let text = e.unescape().map_err(|err| Error::Xml(err.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                push_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Xml(format!("unclosed element <{}>", open.name)));
    }

    root.ok_or_else(|| Error::Xml("document has no root element".into()))
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(local_name(e.name().as_ref())).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        attributes.push((key, attr_value(&attr)?));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Xml("multiple root elements".into())),
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            // Adjacent text and CDATA stay separate fragments
            parent.children.push(XmlNode::Text(text.to_string()));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(Error::Xml("text outside of the root element".into())),
    }
}

/// Unescaped attribute value.
pub(crate) fn attr_value(attr: &Attribute<'_>) -> Result<String> {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .map_err(|err| Error::Xml(err.to_string()))
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
