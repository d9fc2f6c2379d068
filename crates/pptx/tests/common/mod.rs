//! In-memory PPTX fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_NOTES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const REL_LAYOUT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";

struct SlideFixture {
    xml: String,
    notes: Option<String>,
}

/// Builds a minimal but structurally faithful presentation package.
pub struct DeckBuilder {
    slides: Vec<SlideFixture>,
    file_numbers: Option<Vec<usize>>,
    with_manifest: bool,
    with_rels: bool,
    raw_rels: Option<String>,
    mixed_case_names: bool,
    padding: usize,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self {
            slides: Vec::new(),
            file_numbers: None,
            with_manifest: true,
            with_rels: true,
            raw_rels: None,
            mixed_case_names: false,
            padding: 0,
        }
    }

    /// Append a slide whose text runs are one paragraph each.
    pub fn slide(mut self, runs: &[&str]) -> Self {
        self.slides.push(SlideFixture {
            xml: slide_xml(runs),
            notes: None,
        });
        self
    }

    pub fn slide_with_notes(mut self, runs: &[&str], notes: &str) -> Self {
        self.slides.push(SlideFixture {
            xml: slide_xml(runs),
            notes: Some(notes_xml(notes)),
        });
        self
    }

    /// Append a slide whose notes part holds verbatim XML.
    pub fn slide_with_raw_notes(mut self, runs: &[&str], notes: &str) -> Self {
        self.slides.push(SlideFixture {
            xml: slide_xml(runs),
            notes: Some(notes.to_string()),
        });
        self
    }

    /// Append a slide with verbatim XML.
    pub fn raw_slide(mut self, xml: &str) -> Self {
        self.slides.push(SlideFixture {
            xml: xml.to_string(),
            notes: None,
        });
        self
    }

    /// Physical file numbers of the slides, in author order.
    pub fn file_numbers(mut self, numbers: &[usize]) -> Self {
        self.file_numbers = Some(numbers.to_vec());
        self
    }

    pub fn without_manifest(mut self) -> Self {
        self.with_manifest = false;
        self
    }

    pub fn without_rels(mut self) -> Self {
        self.with_rels = false;
        self
    }

    /// Replace the presentation relationship part. Slide references in the
    /// manifest are `rId100`, `rId101`, ... in author order.
    pub fn raw_rels(mut self, xml: &str) -> Self {
        self.raw_rels = Some(xml.to_string());
        self
    }

    /// Write entry names upper-cased with backslash separators.
    pub fn mixed_case_names(mut self) -> Self {
        self.mixed_case_names = true;
        self
    }

    /// Add an uncompressed filler entry of `bytes` bytes.
    pub fn padding(mut self, bytes: usize) -> Self {
        self.padding = bytes;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let numbers: Vec<usize> = self
            .file_numbers
            .clone()
            .unwrap_or_else(|| (1..=self.slides.len()).collect());
        assert_eq!(numbers.len(), self.slides.len());

        let mut entries: Vec<(String, String)> = Vec::new();
        entries.push(("[Content_Types].xml".into(), content_types(&numbers)));

        let mut sld_ids = String::new();
        let mut rels = String::new();
        rels.push_str(&format!(
            r#"<Relationship Id="rId1" Type="{}" Target="slideMasters/slideMaster1.xml"/>"#,
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster"
        ));
        for (i, number) in numbers.iter().enumerate() {
            let rid = format!("rId{}", 100 + i);
            sld_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + i, rid));
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="slides/slide{}.xml"/>"#,
                rid, REL_SLIDE, number
            ));
        }

        if self.with_manifest {
            entries.push((
                "ppt/presentation.xml".into(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
                    NS, sld_ids
                ),
            ));
        }
        if self.with_rels {
            let xml = self.raw_rels.clone().unwrap_or_else(|| relationships_xml(&rels));
            entries.push(("ppt/_rels/presentation.xml.rels".into(), xml));
        }

        for (fixture, number) in self.slides.iter().zip(&numbers) {
            entries.push((format!("ppt/slides/slide{}.xml", number), fixture.xml.clone()));

            let mut slide_rels = format!(
                r#"<Relationship Id="rId1" Type="{}" Target="../slideLayouts/slideLayout1.xml"/>"#,
                REL_LAYOUT
            );
            if let Some(notes) = &fixture.notes {
                slide_rels.push_str(&format!(
                    r#"<Relationship Id="rId2" Type="{}" Target="../notesSlides/notesSlide{}.xml"/>"#,
                    REL_NOTES, number
                ));
                entries.push((format!("ppt/notesSlides/notesSlide{}.xml", number), notes.clone()));
            }
            entries.push((
                format!("ppt/slides/_rels/slide{}.xml.rels", number),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
                    slide_rels
                ),
            ));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, body) in &entries {
            let name = if self.mixed_case_names {
                name.to_uppercase().replace('/', "\\")
            } else {
                name.clone()
            };
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }

        if self.padding > 0 {
            let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
            writer.start_file("docProps/thumbnail.bin", stored).unwrap();
            writer.write_all(&vec![0u8; self.padding]).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }
}

/// Presentation relationships mapping each `(id, target)` to a slide.
pub fn slide_rels_xml(entries: &[(&str, &str)]) -> String {
    let rels: String = entries
        .iter()
        .map(|(id, target)| {
            format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                id, REL_SLIDE, target
            )
        })
        .collect();
    relationships_xml(&rels)
}

fn relationships_xml(rels: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels
    )
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn slide_xml(runs: &[&str]) -> String {
    let paragraphs: String = runs
        .iter()
        .map(|run| format!(r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#, escape(run)))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:sp><p:nvSpPr><p:cNvPr id="2" name="Content"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        NS, paragraphs
    )
}

pub fn notes_xml(notes: &str) -> String {
    let paragraphs: String = notes
        .lines()
        .map(|line| format!(r#"<a:p><a:r><a:t>{}</a:t></a:r></a:p>"#, escape(line)))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:notes {}><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Notes"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/>{}</p:txBody></p:sp></p:spTree></p:cSld></p:notes>"#,
        NS, paragraphs
    )
}

fn content_types(numbers: &[usize]) -> String {
    let overrides: String = numbers
        .iter()
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                n
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/>{}</Types>"#,
        overrides
    )
}
