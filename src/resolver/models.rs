// Common data models for the resolution engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source platform declared by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
    Facebook,
}

impl Platform {
    /// Every supported platform, in declaration order
    pub const ALL: [Platform; 4] = [
        Platform::Youtube,
        Platform::Tiktok,
        Platform::Instagram,
        Platform::Facebook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unsupported platform: {}", s))
    }
}

/// One resolution call. Built after schema validation, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub platform: Platform,
    pub url: String,
}

impl ResolutionRequest {
    pub fn new(platform: Platform, url: impl Into<String>) -> Self {
        Self {
            platform,
            url: url.into(),
        }
    }
}

/// Normalized downloadable encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub quality: String,
    pub format: String,
    pub url: String,
}

/// Successful resolution, serialized as the `processDownload` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub title: String,
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(rename = "downloadLinks")]
    pub variants: Vec<Variant>,
}

/// Backend-native descriptor of one encoding, before normalization.
///
/// Only lives inside an adapter call and the normalizer; it never reaches callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFormat {
    /// Primary label (`qualityLabel` for YouTube, `resolution` for yt-dlp)
    pub quality_label: Option<String>,
    /// Secondary label (`format_note` for yt-dlp)
    pub format_note: Option<String>,
    /// Container / extension (mp4, webm, m4a)
    pub container: Option<String>,
    pub has_video: bool,
    pub has_audio: bool,
    pub url: Option<String>,
}

/// What an adapter hands back to the dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    pub title: String,
    pub thumbnail: String,
    pub duration: Option<String>,
    /// Already filtered and ordered by the adapter's policies
    pub formats: Vec<RawFormat>,
}

/// Backend family, selects the label rule chain used by the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Native InnerTube metadata backend (YouTube)
    NativeYoutube,
    /// External `yt-dlp` tool
    YtDlp,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NativeYoutube => write!(f, "native-youtube"),
            Self::YtDlp => write!(f, "yt-dlp"),
        }
    }
}
