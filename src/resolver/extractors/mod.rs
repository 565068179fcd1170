// Extractor adapters
//
// - youtube: native InnerTube backend, validates links before any request
// - ytdlp: external `yt-dlp -J` for TikTok, Instagram and Facebook
//
// Both implement `Extractor`; the dispatcher picks one per platform.

mod diagnostics;
mod youtube;
mod ytdlp;

pub use diagnostics::{diagnose_error, summarize_stderr, FailureHint};
pub use youtube::{
    extract_video_id, last_thumbnail_is_highest_res, InnerTubeClient, Thumbnail, VideoDetails,
    YoutubeBackend, YoutubeExtractor, YoutubeFormat, YoutubeInfo,
};
pub use ytdlp::{is_direct_http, reverse_worst_to_best, YtDlpExtractor};
