//! Domain types for representing parsed presentation content.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// One authored slide, in author order.
///
/// `body` and `notes` are empty strings rather than options so consumers
/// never need to special-case missing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSlide {
    pub title: String,
    pub body: String,
    pub notes: String,
}

impl ParsedSlide {
    /// Create a slide from its three text fields.
    pub fn new(title: impl Into<String>, body: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            notes: notes.into(),
        }
    }
}

/// Result of a structured parse.
///
/// `Parsed` always carries at least one slide. Serializes as
/// `{"ok":true,"slides":[..],"warnings":[..]}` or `{"ok":false,"message":".."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed {
        slides: Vec<ParsedSlide>,
        warnings: Vec<String>,
    },
    Failed {
        message: String,
    },
}

impl ParseOutcome {
    /// Create a failed outcome from any displayable error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }

    /// Slides of a successful parse; empty for a failure.
    pub fn slides(&self) -> &[ParsedSlide] {
        match self {
            Self::Parsed { slides, .. } => slides,
            Self::Failed { .. } => &[],
        }
    }

    /// Non-fatal warnings of a successful parse.
    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Parsed { warnings, .. } => warnings,
            Self::Failed { .. } => &[],
        }
    }

    /// Failure message, if the parse failed.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Parsed { .. } => None,
            Self::Failed { message } => Some(message),
        }
    }
}

impl Serialize for ParseOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Parsed { slides, warnings } => {
                let len = if warnings.is_empty() { 2 } else { 3 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("slides", slides)?;
                if !warnings.is_empty() {
                    map.serialize_entry("warnings", warnings)?;
                }
                map.end()
            }
            Self::Failed { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

/// A resolved slide part: normalized archive key plus its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedPartRef {
    pub path: String,
    pub index: usize,
}

/// Outcome of one raster job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RasterJobResult {
    /// `count` PNGs were produced, named `1.png..count.png`.
    Rendered { count: usize },
    Failed { error: String },
}

impl RasterJobResult {
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::Rendered { count } => Some(*count),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rendered { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// The classes of binary artifacts persisted under the storage mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactClass {
    /// Raster PNG cache; fully regenerable.
    SlideImages,
    /// Originally uploaded presentation files.
    Presentations,
    /// Generated narration audio.
    Narration,
}

impl ArtifactClass {
    pub const ALL: [ArtifactClass; 3] = [
        ArtifactClass::SlideImages,
        ArtifactClass::Presentations,
        ArtifactClass::Narration,
    ];

    /// Directory name of this class under the storage mount.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::SlideImages => "slide-images",
            Self::Presentations => "presentations",
            Self::Narration => "narration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outcome_serializes_ok_shape() {
        let outcome = ParseOutcome::Parsed {
            slides: vec![ParsedSlide::new("Intro", "", "")],
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["slides"][0]["title"], "Intro");
        assert_eq!(json["slides"][0]["body"], "");
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn test_parse_outcome_serializes_warnings_when_present() {
        let outcome = ParseOutcome::Parsed {
            slides: vec![ParsedSlide::new("Slide 1", "", "")],
            warnings: vec!["Slide order was inferred from file names.".into()],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["warnings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_outcome_serializes_failure_shape() {
        let outcome = ParseOutcome::failed("Invalid or corrupted PPTX file.");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ok": false, "message": "Invalid or corrupted PPTX file."})
        );
        assert!(outcome.slides().is_empty());
        assert!(!outcome.is_ok());
    }

    #[test]
    fn test_raster_job_result_is_untagged() {
        let ok = serde_json::to_value(RasterJobResult::Rendered { count: 4 }).unwrap();
        assert_eq!(ok, serde_json::json!({"count": 4}));

        let failed = RasterJobResult::Failed {
            error: "pdftoppm timed out after 120s".into(),
        };
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"error": "pdftoppm timed out after 120s"}));
        assert_eq!(failed.count(), None);
    }

    #[test]
    fn test_artifact_class_dir_names() {
        let names: Vec<_> = ArtifactClass::ALL.iter().map(|c| c.dir_name()).collect();
        assert_eq!(names, vec!["slide-images", "presentations", "narration"]);
    }
}
