//! Caption and meme output models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caption layout templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// Outlined uppercase text at the top and bottom of the frame
    #[default]
    Classic,
    /// Solid caption bar above the frame
    Modern,
    /// Dark gradient at the bottom with light text over it
    Quote,
}

impl TemplateKind {
    pub const ALL: &'static [TemplateKind] = &[
        TemplateKind::Classic,
        TemplateKind::Modern,
        TemplateKind::Quote,
    ];

    /// Lenient lookup: unknown names fall back to `Classic`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "modern" => TemplateKind::Modern,
            "quote" => TemplateKind::Quote,
            _ => TemplateKind::Classic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Classic => "classic",
            TemplateKind::Modern => "modern",
            TemplateKind::Quote => "quote",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caption text, shaped by its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Caption {
    Classic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bottom_text: Option<String>,
    },
    Modern {
        body_text: String,
    },
    Quote {
        body_text: String,
    },
}

impl Caption {
    pub fn classic(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Caption::Classic {
            top_text: Some(top.into()),
            bottom_text: Some(bottom.into()),
        }
    }

    pub fn modern(body: impl Into<String>) -> Self {
        Caption::Modern {
            body_text: body.into(),
        }
    }

    pub fn quote(body: impl Into<String>) -> Self {
        Caption::Quote {
            body_text: body.into(),
        }
    }

    pub fn kind(&self) -> TemplateKind {
        match self {
            Caption::Classic { .. } => TemplateKind::Classic,
            Caption::Modern { .. } => TemplateKind::Modern,
            Caption::Quote { .. } => TemplateKind::Quote,
        }
    }
}

/// Caption as returned by the caption-writing collaborator.
///
/// Every field is optional and the template is a free-form string;
/// [`CaptionRecord::into_caption`] resolves it into a [`Caption`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionRecord {
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub top_text: Option<String>,
    #[serde(default)]
    pub bottom_text: Option<String>,
    #[serde(default, alias = "caption")]
    pub body_text: Option<String>,
}

impl CaptionRecord {
    pub fn into_caption(self) -> Caption {
        let kind = self
            .template
            .as_deref()
            .map(TemplateKind::from_name)
            .unwrap_or_default();

        let non_empty = |s: Option<String>| s.filter(|t| !t.trim().is_empty());

        match kind {
            TemplateKind::Classic => Caption::Classic {
                top_text: non_empty(self.top_text),
                bottom_text: non_empty(self.bottom_text),
            },
            TemplateKind::Modern => Caption::Modern {
                body_text: non_empty(self.body_text).unwrap_or_default(),
            },
            TemplateKind::Quote => Caption::Quote {
                body_text: non_empty(self.body_text)
                    .or_else(|| non_empty(self.bottom_text))
                    .unwrap_or_default(),
            },
        }
    }
}

impl From<CaptionRecord> for Caption {
    fn from(record: CaptionRecord) -> Self {
        record.into_caption()
    }
}

/// Output image presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemeFormat {
    /// 1080x1080
    #[default]
    Square,
    /// 1200x675
    Wide,
    /// 1080x1920
    Tall,
}

impl MemeFormat {
    /// Fixed pixel dimensions `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            MemeFormat::Square => (1080, 1080),
            MemeFormat::Wide => (1200, 675),
            MemeFormat::Tall => (1080, 1920),
        }
    }

    /// Lenient lookup: unknown names fall back to `Square`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "wide" => MemeFormat::Wide,
            "tall" => MemeFormat::Tall,
            _ => MemeFormat::Square,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemeFormat::Square => "square",
            MemeFormat::Wide => "wide",
            MemeFormat::Tall => "tall",
        }
    }
}

impl fmt::Display for MemeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_template_defaults_to_classic() {
        let rec = CaptionRecord {
            template: Some("deepfried".into()),
            top_text: Some("when the".into()),
            bottom_text: Some("ref blinks".into()),
            body_text: Some("ignored".into()),
        };
        assert_eq!(rec.into_caption(), Caption::classic("when the", "ref blinks"));
    }

    #[test]
    fn test_missing_template_is_classic() {
        let rec: CaptionRecord = serde_json::from_str(r#"{"top_text": "hi"}"#).unwrap();
        assert_eq!(
            rec.into_caption(),
            Caption::Classic {
                top_text: Some("hi".into()),
                bottom_text: None
            }
        );
    }

    #[test]
    fn test_modern_reads_caption_alias() {
        let rec: CaptionRecord =
            serde_json::from_str(r#"{"template": "Modern", "caption": "me at 3am"}"#).unwrap();
        assert_eq!(rec.into_caption(), Caption::modern("me at 3am"));
    }

    #[test]
    fn test_quote_falls_back_to_bottom_text() {
        let rec = CaptionRecord {
            template: Some("quote".into()),
            bottom_text: Some("they never saw it coming".into()),
            ..Default::default()
        };
        assert_eq!(rec.into_caption(), Caption::quote("they never saw it coming"));
    }

    #[test]
    fn test_caption_is_tagged_by_template() {
        let json = serde_json::to_value(Caption::quote("x")).unwrap();
        assert_eq!(json["template"], "quote");
        assert_eq!(json["body_text"], "x");

        let parsed: Caption =
            serde_json::from_str(r#"{"template": "classic", "bottom_text": "b"}"#).unwrap();
        assert_eq!(parsed.kind(), TemplateKind::Classic);
    }

    #[test]
    fn test_format_presets() {
        assert_eq!(MemeFormat::Square.dimensions(), (1080, 1080));
        assert_eq!(MemeFormat::Wide.dimensions(), (1200, 675));
        assert_eq!(MemeFormat::Tall.dimensions(), (1080, 1920));
        assert_eq!(MemeFormat::from_name("TALL"), MemeFormat::Tall);
        assert_eq!(MemeFormat::from_name("panorama"), MemeFormat::Square);
    }
}
