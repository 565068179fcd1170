// Normalizer - raw backend descriptors to uniform variants
//
// Each adapter family declares an ordered chain of label rules; the first rule
// that yields a label wins. The normalizer itself knows nothing about backends.
// Containers are copied verbatim and order is never changed.

use super::models::{AdapterKind, RawFormat, Variant};

/// Quality used when no rule produces a label
pub const UNKNOWN_QUALITY: &str = "Unknown";

/// Quality used for unlabeled audio-only YouTube streams
pub const AUDIO_ONLY_QUALITY: &str = "Audio Only";

/// One step of a quality label fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRule {
    /// Backend's primary quality label, if non-empty
    QualityLabel,
    /// Backend's secondary note, if non-empty
    FormatNote,
    /// Fixed label when the stream carries audio but no video
    AudioOnly(&'static str),
    /// Unconditional label
    Fixed(&'static str),
}

impl LabelRule {
    fn apply(&self, raw: &RawFormat) -> Option<String> {
        match self {
            Self::QualityLabel => non_empty(raw.quality_label.as_deref()),
            Self::FormatNote => non_empty(raw.format_note.as_deref()),
            Self::AudioOnly(label) => {
                (raw.has_audio && !raw.has_video).then(|| label.to_string())
            }
            Self::Fixed(label) => Some(label.to_string()),
        }
    }
}

const NATIVE_YOUTUBE_RULES: &[LabelRule] = &[
    LabelRule::QualityLabel,
    LabelRule::AudioOnly(AUDIO_ONLY_QUALITY),
    LabelRule::Fixed(UNKNOWN_QUALITY),
];

const YTDLP_RULES: &[LabelRule] = &[
    LabelRule::QualityLabel,
    LabelRule::FormatNote,
    LabelRule::Fixed(UNKNOWN_QUALITY),
];

impl AdapterKind {
    /// Label rule chain declared for this backend family
    pub fn label_rules(&self) -> &'static [LabelRule] {
        match self {
            Self::NativeYoutube => NATIVE_YOUTUBE_RULES,
            Self::YtDlp => YTDLP_RULES,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Pick a quality label by walking `rules` in order
pub fn select_label(raw: &RawFormat, rules: &[LabelRule]) -> String {
    rules
        .iter()
        .find_map(|rule| rule.apply(raw))
        .unwrap_or_else(|| UNKNOWN_QUALITY.to_string())
}

/// Convert descriptors into variants using the rules of `kind`.
///
/// Descriptors without a URL cannot become variants and are skipped.
pub fn normalize(raw: &[RawFormat], kind: AdapterKind) -> Vec<Variant> {
    normalize_with(raw, kind.label_rules())
}

pub fn normalize_with(raw: &[RawFormat], rules: &[LabelRule]) -> Vec<Variant> {
    raw.iter()
        .filter_map(|f| {
            let url = f.url.as_deref().filter(|u| !u.is_empty())?;
            Some(Variant {
                quality: select_label(f, rules),
                format: f.container.clone().unwrap_or_default(),
                url: url.to_string(),
            })
        })
        .collect()
}
