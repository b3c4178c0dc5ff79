use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AssemblyError, BackendErrorKind, ValidationError};

pub const MIN_PAGES_COUNT: u32 = 1;
pub const MAX_PAGES_COUNT: u32 = 50;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 100..=2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Educational,
    Marketing,
    Technical,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::Educational, Style::Marketing, Style::Technical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Educational => "educational",
            Self::Marketing => "marketing",
            Self::Technical => "technical",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "educational" => Ok(Self::Educational),
            "marketing" => Ok(Self::Marketing),
            "technical" => Ok(Self::Technical),
            _ => Err(ValidationError::UnknownStyle(raw.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default = "GenerationRequest::default_pages_count")]
    pub pages_count: u32,
    #[serde(default = "GenerationRequest::default_style")]
    pub style: Style,
    #[serde(default = "GenerationRequest::default_max_tokens")]
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn default_pages_count() -> u32 {
        5
    }
    pub fn default_style() -> Style {
        Style::Educational
    }
    pub fn default_max_tokens() -> u32 {
        800
    }

    /// Builds a request and rejects it if any field is out of bounds.
    pub fn new(
        topic: impl Into<String>,
        pages_count: u32,
        style: Style,
        max_tokens: u32,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            topic: topic.into(),
            pages_count,
            style,
            max_tokens,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic.trim().is_empty() {
            return Err(ValidationError::EmptyTopic);
        }
        if !(MIN_PAGES_COUNT..=MAX_PAGES_COUNT).contains(&self.pages_count) {
            return Err(ValidationError::PagesCountOutOfRange(self.pages_count));
        }
        if !MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(ValidationError::MaxTokensOutOfRange(self.max_tokens));
        }
        Ok(())
    }
}

/// One entry of a style's section catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionType {
    pub id: String,
    pub heading: String,
}

impl SectionType {
    pub fn new(id: impl Into<String>, heading: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            heading: heading.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Modern,
    Minimal,
    Classic,
    Magazine,
}

impl TemplateId {
    pub const ALL: [TemplateId; 4] = [
        TemplateId::Modern,
        TemplateId::Minimal,
        TemplateId::Classic,
        TemplateId::Magazine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Minimal => "minimal",
            Self::Classic => "classic",
            Self::Magazine => "magazine",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScheme {
    Indigo,
    Flamingo,
    Mint,
    Sunset,
    Seafoam,
    Blush,
    Peach,
    Lavender,
    Skyline,
    DeepSea,
    Orchid,
    Marigold,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 12] = [
        ColorScheme::Indigo,
        ColorScheme::Flamingo,
        ColorScheme::Mint,
        ColorScheme::Sunset,
        ColorScheme::Seafoam,
        ColorScheme::Blush,
        ColorScheme::Peach,
        ColorScheme::Lavender,
        ColorScheme::Skyline,
        ColorScheme::DeepSea,
        ColorScheme::Orchid,
        ColorScheme::Marigold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indigo => "indigo",
            Self::Flamingo => "flamingo",
            Self::Mint => "mint",
            Self::Sunset => "sunset",
            Self::Seafoam => "seafoam",
            Self::Blush => "blush",
            Self::Peach => "peach",
            Self::Lavender => "lavender",
            Self::Skyline => "skyline",
            Self::DeepSea => "deep_sea",
            Self::Orchid => "orchid",
            Self::Marigold => "marigold",
        }
    }

    pub fn palette(self) -> Palette {
        let (primary, secondary, accent) = match self {
            Self::Indigo => ("#667eea", "#764ba2", "#f093fb"),
            Self::Flamingo => ("#f093fb", "#f5576c", "#4facfe"),
            Self::Mint => ("#43e97b", "#38f9d7", "#667eea"),
            Self::Sunset => ("#fa709a", "#fee140", "#30cfd0"),
            Self::Seafoam => ("#a8edea", "#fed6e3", "#667eea"),
            Self::Blush => ("#ff9a9e", "#fecfef", "#667eea"),
            Self::Peach => ("#ffecd2", "#fcb69f", "#ff6e7f"),
            Self::Lavender => ("#e0c3fc", "#8ec5fc", "#667eea"),
            Self::Skyline => ("#4facfe", "#00f2fe", "#f5576c"),
            Self::DeepSea => ("#30cfd0", "#330867", "#fee140"),
            Self::Orchid => ("#5ee7df", "#b490ca", "#f093fb"),
            Self::Marigold => ("#f6d365", "#fda085", "#667eea"),
        };
        Palette {
            primary,
            secondary,
            accent,
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Randomized sampling and presentation choices for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityProfile {
    pub temperature: f64,
    pub nucleus_p: f64,
    pub section_count: usize,
    pub selected_sections: Vec<SectionType>,
    pub template_id: TemplateId,
    pub color_scheme: ColorScheme,
}

/// A content slot that needs its own backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Title,
    MetaDescription,
    /// `position` is 1-based within the site's selected sections.
    Section { position: usize, heading: String },
}

impl Slot {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::MetaDescription => "meta",
            Self::Section { .. } => "section",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => f.write_str("title"),
            Self::MetaDescription => f.write_str("meta_description"),
            Self::Section { position, heading } => write!(f, "section {position} ({heading})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub section_type: String,
    pub heading: String,
    pub body_text: String,
}

/// All generated text for one site plus its presentation choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub site_id: String,
    /// 0-based position in the batch that produced this bundle.
    pub site_index: usize,
    pub title: String,
    pub meta_description: String,
    pub sections: Vec<Section>,
    pub diversity_profile: DiversityProfile,
    pub tokens_used: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFailure {
    pub site_index: usize,
    pub topic: String,
    pub slot_description: String,
    pub error_kind: BackendErrorKind,
    pub message: String,
}

impl SlotFailure {
    pub fn from_assembly(site_index: usize, topic: &str, err: &AssemblyError) -> Self {
        Self {
            site_index,
            topic: topic.to_owned(),
            slot_description: err.slot.clone(),
            error_kind: err.kind(),
            message: err.source.message.clone(),
        }
    }
}

/// Outcome of one batch: every requested site lands in exactly one list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationResult {
    pub generated_count: usize,
    pub succeeded: Vec<ContentBundle>,
    pub failed: Vec<SlotFailure>,
}
