// Resolver configuration

use std::process::Command as StdCommand;
use std::time::Duration;

/// InnerTube client version reported by the native YouTube backend
pub const DEFAULT_INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// Configuration shared by the dispatcher and its adapters
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Path to the yt-dlp binary
    pub ytdlp_path: String,
    /// Overall deadline for one resolution
    pub timeout: Duration,
    /// Maximum resolutions in flight at once
    pub max_concurrent: usize,
    /// SOCKS5/HTTP proxy URL
    pub proxy: Option<String>,
    /// InnerTube ANDROID client version
    pub innertube_client_version: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            timeout: Duration::from_secs(30),
            max_concurrent: 8,
            proxy: None,
            innertube_client_version: DEFAULT_INNERTUBE_CLIENT_VERSION.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn with_ytdlp_path(mut self, path: impl Into<String>) -> Self {
        self.ytdlp_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Zero is treated as one; a pool without permits would never resolve anything
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_innertube_client_version(mut self, version: impl Into<String>) -> Self {
        self.innertube_client_version = version.into();
        self
    }

    /// Timeout in whole seconds, at least one
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs().max(1)
    }
}

/// Find the yt-dlp binary: well-known install paths, then `which`, then bare name
pub fn locate_ytdlp() -> String {
    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    "yt-dlp".to_string()
}
