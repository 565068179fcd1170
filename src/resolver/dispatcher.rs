// Resolution dispatcher - adapter table keyed by platform
//
// Flow: platform -> adapter -> raw descriptors -> normalize -> dedupe.
// This is the only place that branches on the platform, and the only place
// adapter errors are translated into the public taxonomy.

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{info, warn};

use super::config::ResolverConfig;
use super::dedupe::dedupe;
use super::errors::{ErrorKind, ExtractError, ResolutionError};
use super::extractors::{diagnose_error, InnerTubeClient, YoutubeExtractor, YtDlpExtractor};
use super::models::{AdapterKind, Platform, ResolutionRequest, ResolutionResult, Variant};
use super::normalizer::normalize;
use super::traits::Extractor;

/// Message prefix for failures of the external tool
pub const EXTERNAL_TOOL_FAILURE: &str = "Failed to process video with external downloader";

/// Message prefix for failures of the native YouTube backend
pub const NATIVE_BACKEND_FAILURE: &str = "Failed to fetch YouTube video info";

pub struct Resolver {
    adapters: HashMap<Platform, Arc<dyn Extractor>>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
}

impl Resolver {
    /// Resolver with the default adapter table: YouTube goes to the native
    /// backend, everything else to yt-dlp.
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolutionError> {
        let innertube = InnerTubeClient::new(config).map_err(|e| {
            ResolutionError::internal(format!("Failed to build YouTube client: {}", e))
        })?;
        let ytdlp: Arc<dyn Extractor> = Arc::new(YtDlpExtractor::new(config));

        let mut resolver = Self::empty(config);
        resolver.register(
            Platform::Youtube,
            Arc::new(YoutubeExtractor::new(Arc::new(innertube))),
        );
        for platform in [Platform::Tiktok, Platform::Instagram, Platform::Facebook] {
            resolver.register(platform, ytdlp.clone());
        }
        Ok(resolver)
    }

    /// Resolver with no adapters registered
    pub fn empty(config: &ResolverConfig) -> Self {
        Self {
            adapters: HashMap::new(),
            limiter: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            timeout: config.timeout,
        }
    }

    /// Register (or replace) the adapter for `platform`
    pub fn register(
        &mut self,
        platform: Platform,
        adapter: Arc<dyn Extractor>,
    ) -> Option<Arc<dyn Extractor>> {
        self.adapters.insert(platform, adapter)
    }

    pub fn adapter_for(&self, platform: Platform) -> Option<&Arc<dyn Extractor>> {
        self.adapters.get(&platform)
    }

    /// Resolve one request. All or nothing: no partial results.
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<ResolutionResult, ResolutionError> {
        let adapter = self.adapter_for(request.platform).cloned().ok_or_else(|| {
            ResolutionError::internal(format!(
                "No extractor registered for platform {}",
                request.platform
            ))
        })?;

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ResolutionError::internal("Resolver is shutting down"))?;

        info!(platform = %request.platform, adapter = adapter.name(), "resolving");

        let extraction = AssertUnwindSafe(adapter.extract(&request.url)).catch_unwind();
        let raw = match timeout(self.timeout, extraction).await {
            Ok(Ok(Ok(raw))) => raw,
            Ok(Ok(Err(e))) => {
                warn!(platform = %request.platform, adapter = adapter.name(), error = %e, "extraction failed");
                return Err(map_extract_error(adapter.kind(), &e));
            }
            Ok(Err(_)) => {
                warn!(adapter = adapter.name(), "extractor panicked");
                return Err(ResolutionError::internal(format!(
                    "Extractor {} failed unexpectedly",
                    adapter.name()
                )));
            }
            Err(_) => {
                let secs = self.timeout.as_secs().max(1);
                warn!(adapter = adapter.name(), secs, "extraction timed out");
                return Err(map_extract_error(
                    adapter.kind(),
                    &ExtractError::Timeout(secs),
                ));
            }
        };

        let variants = dedupe(normalize(&raw.formats, adapter.kind()));
        check_variants(&variants)?;

        info!(
            platform = %request.platform,
            variants = variants.len(),
            "resolved"
        );

        Ok(ResolutionResult {
            title: raw.title,
            thumbnail: raw.thumbnail,
            duration: raw.duration,
            variants,
        })
    }
}

/// Translate an adapter failure into the public taxonomy
pub fn map_extract_error(kind: AdapterKind, err: &ExtractError) -> ResolutionError {
    match err.kind() {
        ErrorKind::InvalidInput => {
            let message = match err {
                ExtractError::InvalidUrl(msg) => msg.clone(),
                other => other.to_string(),
            };
            ResolutionError::invalid_input(message)
        }
        _ => {
            let prefix = match kind {
                AdapterKind::YtDlp => EXTERNAL_TOOL_FAILURE,
                AdapterKind::NativeYoutube => NATIVE_BACKEND_FAILURE,
            };
            let detail = err.to_string();
            let mut message = format!("{}: {}", prefix, detail);
            if let Some(hint) = diagnose_error(&detail) {
                message.push_str(&format!(" ({})", hint.explanation()));
            }
            ResolutionError::upstream(message)
        }
    }
}

/// Post-condition of normalize + dedupe; a violation is an engine defect
fn check_variants(variants: &[Variant]) -> Result<(), ResolutionError> {
    if let Some(bad) = variants.iter().find(|v| v.url.is_empty()) {
        return Err(ResolutionError::internal(format!(
            "Normalized variant {} / {} has no URL",
            bad.quality, bad.format
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::extractors::{
        Thumbnail, VideoDetails, YoutubeBackend, YoutubeFormat, YoutubeInfo,
    };
    use crate::resolver::models::RawMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> ResolverConfig {
        ResolverConfig::default().with_timeout(Duration::from_secs(5))
    }

    /// Fake adapter that records calls and returns canned output
    struct Recording {
        kind: AdapterKind,
        calls: AtomicUsize,
        output: fn() -> Result<RawMetadata, ExtractError>,
    }

    impl Recording {
        fn new(kind: AdapterKind, output: fn() -> Result<RawMetadata, ExtractError>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                calls: AtomicUsize::new(0),
                output,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Extractor for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn kind(&self) -> AdapterKind {
            self.kind
        }

        async fn extract(&self, _url: &str) -> Result<RawMetadata, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.output)()
        }
    }

    fn empty_metadata() -> Result<RawMetadata, ExtractError> {
        Ok(RawMetadata {
            title: "t".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_default_table_covers_every_platform() {
        let resolver = Resolver::new(&config()).unwrap();
        for platform in Platform::ALL {
            let adapter = resolver.adapter_for(platform).unwrap();
            let expected = if platform == Platform::Youtube {
                AdapterKind::NativeYoutube
            } else {
                AdapterKind::YtDlp
            };
            assert_eq!(adapter.kind(), expected);
        }
    }

    #[tokio::test]
    async fn test_each_platform_routes_to_exactly_one_adapter() {
        let mut resolver = Resolver::empty(&config());
        let fakes: Vec<(Platform, Arc<Recording>)> = Platform::ALL
            .into_iter()
            .map(|p| (p, Recording::new(AdapterKind::YtDlp, empty_metadata)))
            .collect();
        for (platform, fake) in &fakes {
            resolver.register(*platform, fake.clone());
        }

        for (i, (platform, _)) in fakes.iter().enumerate() {
            resolver
                .resolve(&ResolutionRequest::new(*platform, "https://example.com/v"))
                .await
                .unwrap();
            for (j, (_, fake)) in fakes.iter().enumerate() {
                assert_eq!(fake.calls(), usize::from(j <= i));
            }
        }
    }

    #[tokio::test]
    async fn test_unregistered_platform_is_internal_error() {
        let resolver = Resolver::empty(&config());
        let err = resolver
            .resolve(&ResolutionRequest::new(Platform::Tiktok, "https://t.example/1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InternalError);
    }

    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl YoutubeBackend for CountingBackend {
        async fn get_info(&self, _url: &str) -> Result<YoutubeInfo, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let format = |url: &str| YoutubeFormat {
                itag: 22,
                url: Some(url.to_string()),
                container: Some("mp4".to_string()),
                quality_label: Some("720p".to_string()),
                has_video: true,
                has_audio: true,
            };
            Ok(YoutubeInfo {
                video_details: VideoDetails {
                    title: "Happy".to_string(),
                    thumbnails: vec![Thumbnail {
                        url: "https://i/hq.jpg".to_string(),
                        width: None,
                        height: None,
                    }],
                    length_seconds: Some("42".to_string()),
                },
                formats: vec![format("https://a"), format("https://b")],
            })
        }
    }

    fn youtube_resolver() -> (Resolver, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let mut resolver = Resolver::empty(&config());
        resolver.register(
            Platform::Youtube,
            Arc::new(YoutubeExtractor::new(backend.clone())),
        );
        (resolver, backend)
    }

    #[tokio::test]
    async fn test_youtube_duplicates_collapse_to_first() {
        let (resolver, _) = youtube_resolver();
        let result = resolver
            .resolve(&ResolutionRequest::new(
                Platform::Youtube,
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            ))
            .await
            .unwrap();

        assert_eq!(result.title, "Happy");
        assert_eq!(result.thumbnail, "https://i/hq.jpg");
        assert_eq!(result.duration.as_deref(), Some("42"));
        assert_eq!(
            result.variants,
            vec![Variant {
                quality: "720p".to_string(),
                format: "mp4".to_string(),
                url: "https://a".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_malformed_youtube_url_fails_without_io() {
        let (resolver, backend) = youtube_resolver();
        let err = resolver
            .resolve(&ResolutionRequest::new(Platform::Youtube, "not-a-url"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidInput);
        assert_eq!(err.message, "Invalid YouTube URL");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    fn single_object_dump() -> Result<RawMetadata, ExtractError> {
        YtDlpExtractor::parse_dump(
            br#"{"title": "tok", "thumbnail": "https://t/1.jpg", "duration": 9,
                 "url": "https://cdn.tiktok.example/v.mp4", "ext": "mp4"}"#,
        )
    }

    fn mixed_scheme_dump() -> Result<RawMetadata, ExtractError> {
        YtDlpExtractor::parse_dump(
            br#"{"title": "live", "formats": [
                {"url": "https://fb.example/sd.mp4", "ext": "mp4", "format_note": "sd"},
                {"url": "rtmp://fb.example/live", "ext": "flv", "format_note": "live"},
                {"url": "https://fb.example/hd.mp4", "ext": "mp4", "format_note": "hd"}
            ]}"#,
        )
    }

    #[tokio::test]
    async fn test_single_object_response_yields_one_variant() {
        let mut resolver = Resolver::empty(&config());
        resolver.register(
            Platform::Tiktok,
            Recording::new(AdapterKind::YtDlp, single_object_dump),
        );

        let result = resolver
            .resolve(&ResolutionRequest::new(
                Platform::Tiktok,
                "https://www.tiktok.com/@a/video/1",
            ))
            .await
            .unwrap();

        assert_eq!(result.variants.len(), 1);
        assert_eq!(result.variants[0].quality, "Unknown");
        assert_eq!(result.duration.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn test_non_http_descriptor_never_surfaces() {
        let mut resolver = Resolver::empty(&config());
        resolver.register(
            Platform::Facebook,
            Recording::new(AdapterKind::YtDlp, mixed_scheme_dump),
        );

        let result = resolver
            .resolve(&ResolutionRequest::new(
                Platform::Facebook,
                "https://www.facebook.com/watch/?v=1",
            ))
            .await
            .unwrap();

        assert!(result.variants.iter().all(|v| !v.url.starts_with("rtmp")));
        let qualities: Vec<&str> = result.variants.iter().map(|v| v.quality.as_str()).collect();
        assert_eq!(qualities, vec!["hd", "sd"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_non_zero_exit_is_upstream_failure() {
        let config = config().with_ytdlp_path("false");
        let mut resolver = Resolver::empty(&config);
        resolver.register(Platform::Instagram, Arc::new(YtDlpExtractor::new(&config)));

        let err = resolver
            .resolve(&ResolutionRequest::new(
                Platform::Instagram,
                "https://www.instagram.com/reel/abc/",
            ))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::UpstreamFailure);
        assert!(err.message.starts_with(EXTERNAL_TOOL_FAILURE));
    }

    #[tokio::test]
    async fn test_missing_tool_is_upstream_failure() {
        let config = config().with_ytdlp_path("/nonexistent/yt-dlp");
        let resolver = Resolver::new(&config).unwrap();

        let err = resolver
            .resolve(&ResolutionRequest::new(
                Platform::Facebook,
                "https://www.facebook.com/watch/?v=1",
            ))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::UpstreamFailure);
        assert!(!err.message.is_empty());
    }

    struct Slow;

    #[async_trait]
    impl Extractor for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::YtDlp
        }

        async fn extract(&self, _url: &str) -> Result<RawMetadata, ExtractError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            empty_metadata()
        }
    }

    #[tokio::test]
    async fn test_timeout_is_upstream_failure() {
        let mut resolver =
            Resolver::empty(&ResolverConfig::default().with_timeout(Duration::from_millis(50)));
        resolver.register(Platform::Tiktok, Arc::new(Slow));

        let err = resolver
            .resolve(&ResolutionRequest::new(Platform::Tiktok, "https://t.example/1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamFailure);
        assert!(err.message.contains("Timed out"));
    }

    struct Panicking;

    #[async_trait]
    impl Extractor for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::YtDlp
        }

        async fn extract(&self, _url: &str) -> Result<RawMetadata, ExtractError> {
            panic!("adapter bug");
        }
    }

    #[tokio::test]
    async fn test_adapter_panic_is_internal_error() {
        let mut resolver = Resolver::empty(&config());
        resolver.register(Platform::Instagram, Arc::new(Panicking));

        let err = resolver
            .resolve(&ResolutionRequest::new(Platform::Instagram, "https://i.example/1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InternalError);
    }

    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Extractor for Gauge {
        fn name(&self) -> &'static str {
            "gauge"
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::YtDlp
        }

        async fn extract(&self, _url: &str) -> Result<RawMetadata, ExtractError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            empty_metadata()
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let gauge = Arc::new(Gauge {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let mut resolver = Resolver::empty(&config().with_max_concurrent(2));
        resolver.register(Platform::Tiktok, gauge.clone());

        let request = ResolutionRequest::new(Platform::Tiktok, "https://t.example/1");
        let results = futures::future::join_all((0..6).map(|_| resolver.resolve(&request))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_error_mapping() {
        let err = map_extract_error(
            AdapterKind::YtDlp,
            &ExtractError::ToolFailed {
                tool: "yt-dlp".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "ERROR: [TikTok] 1: Video unavailable".to_string(),
            },
        );
        assert_eq!(err.kind, ErrorKind::UpstreamFailure);
        assert!(err.message.starts_with(EXTERNAL_TOOL_FAILURE));
        assert!(err.message.contains("unavailable or was removed"));

        let err = map_extract_error(
            AdapterKind::NativeYoutube,
            &ExtractError::InvalidUrl("Invalid YouTube URL".to_string()),
        );
        assert_eq!(err.kind, ErrorKind::InvalidInput);
        assert_eq!(err.message, "Invalid YouTube URL");
    }

    /// yt-dlp stand-in that records its pid and then hangs
    #[cfg(unix)]
    struct StallingTool {
        pid_file: std::path::PathBuf,
    }

    #[cfg(unix)]
    #[async_trait]
    impl Extractor for StallingTool {
        fn name(&self) -> &'static str {
            "stalling-tool"
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::YtDlp
        }

        async fn extract(&self, _url: &str) -> Result<RawMetadata, ExtractError> {
            let script = format!("echo $$ > {}; exec sleep 30", self.pid_file.display());
            let args = vec!["-c".to_string(), script];
            crate::resolver::utils::run_output_with_timeout("sh", &args, 60).await?;
            empty_metadata()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abandoned_resolve_kills_subprocess() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let mut resolver = Resolver::empty(&config());
        resolver.register(
            Platform::Tiktok,
            Arc::new(StallingTool {
                pid_file: pid_file.clone(),
            }),
        );

        let request = ResolutionRequest::new(Platform::Tiktok, "https://t.example/1");
        let abandoned = timeout(Duration::from_millis(500), resolver.resolve(&request)).await;
        assert!(abandoned.is_err());

        let pid = std::fs::read_to_string(&pid_file).unwrap().trim().to_string();
        let mut gone = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let alive = std::process::Command::new("kill")
                .args(["-0", &pid])
                .stderr(std::process::Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if !alive {
                gone = true;
                break;
            }
        }
        assert!(gone, "extractor process {} outlived the request", pid);

        // the permit was released with the dropped future
        assert_eq!(resolver.limiter.available_permits(), config().max_concurrent);
    }
}
