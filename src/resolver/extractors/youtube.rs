// Native YouTube adapter
//
// Talks to YouTube's InnerTube `player` endpoint directly (no external tool).
// The adapter only sees the `YoutubeBackend` capability: validate a link, then
// fetch details plus format descriptors. URL validation happens before any
// network traffic.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::resolver::config::ResolverConfig;
use crate::resolver::errors::ExtractError;
use crate::resolver::models::{AdapterKind, RawFormat, RawMetadata};
use crate::resolver::traits::Extractor;

const PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";

const VALID_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "gaming.youtube.com",
];

const SHORT_HOST: &str = "youtu.be";

/// Path prefixes that carry the id as the next segment
const ID_PATH_PREFIXES: &[&str] = &["embed", "v", "shorts", "live"];

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

/// Pull the 11-character video id out of a YouTube link
pub fn extract_video_id(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();

    let candidate = (if host == SHORT_HOST {
        url.path_segments()?.next().map(str::to_string)
    } else if VALID_HOSTS.contains(&host.as_str()) {
        let from_query = url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned());
        from_query.or_else(|| {
            let segments: Vec<&str> = url.path_segments()?.collect();
            match segments.as_slice() {
                [prefix, id, ..] if ID_PATH_PREFIXES.contains(prefix) => Some(id.to_string()),
                _ => None,
            }
        })
    } else {
        None
    })?;

    VIDEO_ID_RE
        .is_match(&candidate)
        .then_some(candidate)
}

/// Thumbnail as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Subset of the video details the adapter consumes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoDetails {
    pub title: String,
    /// Backend order, smallest first
    pub thumbnails: Vec<Thumbnail>,
    pub length_seconds: Option<String>,
}

/// Backend format descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YoutubeFormat {
    pub itag: u32,
    /// Absent for cipher-protected streams
    pub url: Option<String>,
    pub container: Option<String>,
    pub quality_label: Option<String>,
    pub has_video: bool,
    pub has_audio: bool,
}

/// What `get_info` returns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YoutubeInfo {
    pub video_details: VideoDetails,
    pub formats: Vec<YoutubeFormat>,
}

/// Metadata library capability the adapter is built on
#[async_trait]
pub trait YoutubeBackend: Send + Sync {
    /// Cheap, offline check that `url` is a video link
    fn validate(&self, url: &str) -> bool {
        extract_video_id(url).is_some()
    }

    async fn get_info(&self, url: &str) -> Result<YoutubeInfo, ExtractError>;
}

// --- InnerTube wire format ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    video_details: Option<PlayerVideoDetails>,
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerVideoDetails {
    #[serde(default)]
    title: String,
    length_seconds: Option<String>,
    thumbnail: Option<ThumbnailList>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailList {
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<PlayerFormat>,
    #[serde(default)]
    adaptive_formats: Vec<PlayerFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerFormat {
    #[serde(default)]
    itag: u32,
    url: Option<String>,
    mime_type: Option<String>,
    quality_label: Option<String>,
    audio_quality: Option<String>,
    height: Option<u32>,
    bitrate: Option<u64>,
}

impl PlayerFormat {
    fn into_format(self) -> (YoutubeFormat, u32, u64) {
        let mime = self.mime_type.unwrap_or_default();
        let essence = mime.split(';').next().unwrap_or("").trim();
        let (top, sub) = essence.split_once('/').unwrap_or((essence, ""));

        let has_video = top == "video";
        let has_audio = top == "audio" || self.audio_quality.is_some();
        let format = YoutubeFormat {
            itag: self.itag,
            url: self.url,
            container: (!sub.is_empty()).then(|| sub.to_string()),
            quality_label: self.quality_label,
            has_video,
            has_audio,
        };
        (format, self.height.unwrap_or(0), self.bitrate.unwrap_or(0))
    }
}

/// Muxed streams first, then taller video, then higher bitrate
fn sort_best_first(formats: Vec<PlayerFormat>) -> Vec<YoutubeFormat> {
    let mut keyed: Vec<(YoutubeFormat, u32, u64)> =
        formats.into_iter().map(PlayerFormat::into_format).collect();
    keyed.sort_by(|(a, ah, ab), (b, bh, bb)| {
        let a_muxed = a.has_video && a.has_audio;
        let b_muxed = b.has_video && b.has_audio;
        b_muxed
            .cmp(&a_muxed)
            .then(bh.cmp(ah))
            .then(bb.cmp(ab))
    });
    keyed.into_iter().map(|(f, _, _)| f).collect()
}

fn parse_player_response(body: &[u8]) -> Result<YoutubeInfo, ExtractError> {
    let response: PlayerResponse = serde_json::from_slice(body)
        .map_err(|e| ExtractError::Parse(format!("Invalid player response: {}", e)))?;

    if let Some(status) = &response.playability_status {
        if status.status != "OK" {
            return Err(ExtractError::Unplayable(
                status
                    .reason
                    .clone()
                    .unwrap_or_else(|| status.status.clone()),
            ));
        }
    }

    let details = response
        .video_details
        .ok_or_else(|| ExtractError::Parse("Player response has no videoDetails".to_string()))?;
    let streaming = response.streaming_data.unwrap_or_default();

    let mut all = streaming.formats;
    all.extend(streaming.adaptive_formats);

    Ok(YoutubeInfo {
        video_details: VideoDetails {
            title: details.title,
            thumbnails: details.thumbnail.map(|t| t.thumbnails).unwrap_or_default(),
            length_seconds: details.length_seconds,
        },
        formats: sort_best_first(all),
    })
}

/// InnerTube HTTP backend (ANDROID client, which returns plain stream URLs)
pub struct InnerTubeClient {
    http: reqwest::Client,
    client_version: String,
}

impl InnerTubeClient {
    pub fn new(config: &ResolverConfig) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .user_agent(format!(
                "com.google.android.youtube/{} (Linux; U; Android 11) gzip",
                config.innertube_client_version
            ));

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ExtractError::Http(format!("Invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build()?,
            client_version: config.innertube_client_version.clone(),
        })
    }
}

#[async_trait]
impl YoutubeBackend for InnerTubeClient {
    async fn get_info(&self, url: &str) -> Result<YoutubeInfo, ExtractError> {
        let video_id = extract_video_id(url)
            .ok_or_else(|| ExtractError::InvalidUrl(url.to_string()))?;

        let body = json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": self.client_version,
                    "androidSdkVersion": 30,
                    "hl": "en",
                    "gl": "US",
                }
            },
            "videoId": video_id,
            "contentCheckOk": true,
            "racyCheckOk": true,
        });

        debug!(%video_id, "requesting InnerTube player response");
        let bytes = self
            .http
            .post(PLAYER_ENDPOINT)
            .header("X-YouTube-Client-Name", "3")
            .header("X-YouTube-Client-Version", &self.client_version)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_player_response(&bytes)
    }
}

/// Thumbnail policy: the backend lists thumbnails smallest first, so the last
/// entry is taken as the highest resolution.
pub fn last_thumbnail_is_highest_res(thumbnails: &[Thumbnail]) -> String {
    thumbnails
        .last()
        .map(|t| t.url.clone())
        .unwrap_or_default()
}

/// YouTube adapter over any `YoutubeBackend`
pub struct YoutubeExtractor {
    backend: Arc<dyn YoutubeBackend>,
}

impl YoutubeExtractor {
    pub fn new(backend: Arc<dyn YoutubeBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Extractor for YoutubeExtractor {
    fn name(&self) -> &'static str {
        "native-youtube"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::NativeYoutube
    }

    async fn extract(&self, url: &str) -> Result<RawMetadata, ExtractError> {
        if !self.backend.validate(url) {
            return Err(ExtractError::InvalidUrl("Invalid YouTube URL".to_string()));
        }

        let info = self.backend.get_info(url).await?;

        // Every descriptor with a direct URL is kept; no muxed-stream preference.
        let formats: Vec<RawFormat> = info
            .formats
            .into_iter()
            .filter(|f| f.url.as_deref().map_or(false, |u| !u.is_empty()))
            .map(|f| RawFormat {
                quality_label: f.quality_label,
                format_note: None,
                container: f.container,
                has_video: f.has_video,
                has_audio: f.has_audio,
                url: f.url,
            })
            .collect();

        debug!(formats = formats.len(), "youtube descriptors kept");

        Ok(RawMetadata {
            title: info.video_details.title,
            thumbnail: last_thumbnail_is_highest_res(&info.video_details.thumbnails),
            duration: info.video_details.length_seconds,
            formats,
        })
    }
}
