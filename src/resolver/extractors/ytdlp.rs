// yt-dlp adapter - shells out to the external extractor tool
//
// Used for TikTok, Instagram and Facebook. The tool prints one JSON document
// (`-J`); it is decoded against a strict schema so that a changed or broken
// tool surfaces as an upstream failure instead of garbage variants.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::resolver::config::ResolverConfig;
use crate::resolver::errors::ExtractError;
use crate::resolver::models::{AdapterKind, RawFormat, RawMetadata};
use crate::resolver::traits::Extractor;
use crate::resolver::utils::run_output_with_timeout;

use super::diagnostics::summarize_stderr;

/// One entry of yt-dlp's `formats` array, or the top-level object itself
#[derive(Debug, Clone, Default, Deserialize)]
struct DumpDescriptor {
    url: Option<String>,
    ext: Option<String>,
    resolution: Option<String>,
    format_note: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
}

impl DumpDescriptor {
    fn into_raw(self) -> RawFormat {
        let present = |codec: &Option<String>| {
            codec
                .as_deref()
                .map_or(false, |c| !c.is_empty() && c != "none")
        };
        RawFormat {
            has_video: present(&self.vcodec),
            has_audio: present(&self.acodec),
            quality_label: self.resolution,
            format_note: self.format_note,
            container: self.ext,
            url: self.url,
        }
    }
}

/// Shape of `yt-dlp -J` output
#[derive(Debug, Deserialize)]
struct Dump {
    title: String,
    thumbnail: Option<String>,
    duration: Option<f64>,
    formats: Option<Vec<DumpDescriptor>>,
    /// Set when the resource is a single format with no `formats` list
    #[serde(flatten)]
    single: DumpDescriptor,
}

/// Ordering policy: yt-dlp lists formats worst to best, so reverse for best-first.
///
/// This is an observation about the tool's output, not a documented contract.
pub fn reverse_worst_to_best(mut formats: Vec<RawFormat>) -> Vec<RawFormat> {
    formats.reverse();
    formats
}

/// Filter policy: only plain HTTP(S) links are directly downloadable
pub fn is_direct_http(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `String(duration || 0)`: integral seconds print without a fraction
fn format_duration(duration: Option<f64>) -> String {
    match duration {
        Some(d) if d.is_finite() && d != 0.0 => {
            if d.fract() == 0.0 {
                format!("{}", d as i64)
            } else {
                format!("{}", d)
            }
        }
        _ => "0".to_string(),
    }
}

/// yt-dlp based extractor
pub struct YtDlpExtractor {
    ytdlp_path: String,
    timeout_secs: u64,
    proxy: Option<String>,
}

impl YtDlpExtractor {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            ytdlp_path: config.ytdlp_path.clone(),
            timeout_secs: config.timeout_secs(),
            proxy: config.proxy.clone(),
        }
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "-J".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.timeout_secs.to_string(),
        ];

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Decode tool output and apply the filter and ordering policies
    pub fn parse_dump(stdout: &[u8]) -> Result<RawMetadata, ExtractError> {
        let dump: Dump = serde_json::from_slice(stdout)
            .map_err(|e| ExtractError::Parse(format!("Invalid yt-dlp JSON: {}", e)))?;

        let descriptors = match dump.formats {
            Some(list) => list,
            None => vec![dump.single],
        };

        let formats: Vec<RawFormat> = descriptors
            .into_iter()
            .map(DumpDescriptor::into_raw)
            .filter(|f| f.url.as_deref().map_or(false, is_direct_http))
            .collect();

        Ok(RawMetadata {
            title: dump.title,
            thumbnail: dump.thumbnail.unwrap_or_default(),
            duration: Some(format_duration(dump.duration)),
            formats: reverse_worst_to_best(formats),
        })
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::YtDlp
    }

    async fn extract(&self, url: &str) -> Result<RawMetadata, ExtractError> {
        let args = self.build_args(url);
        debug!(program = %self.ytdlp_path, args = %args.join(" "), "running yt-dlp");

        let output = run_output_with_timeout(&self.ytdlp_path, &args, self.timeout_secs).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "yt-dlp failed");
            return Err(ExtractError::ToolFailed {
                tool: "yt-dlp".to_string(),
                status: output.status.to_string(),
                stderr: summarize_stderr(&stderr),
            });
        }

        let metadata = Self::parse_dump(&output.stdout)?;
        debug!(formats = metadata.formats.len(), "yt-dlp descriptors kept");
        Ok(metadata)
    }
}
