// Failure diagnostics - turns raw extractor stderr into a short hint
//
// The hint only enriches the message. Every diagnosed failure is still an
// upstream failure for the caller.

/// Recognizable reasons an extractor backend refused a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHint {
    /// 429 or explicit throttling
    RateLimited,
    /// Not available in the server's region
    GeoBlocked,
    /// Private post or video
    PrivateContent,
    /// Deleted, removed, or never existed
    Unavailable,
    /// Platform demands a logged-in session
    LoginRequired,
    /// Connection timed out inside the tool
    NetworkTimeout,
    /// Tool has no extractor for this URL
    UnsupportedUrl,
}

impl FailureHint {
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::RateLimited => "the platform is rate-limiting requests, try again later",
            Self::GeoBlocked => "the video is not available in this region",
            Self::PrivateContent => "the video is private",
            Self::Unavailable => "the video is unavailable or was removed",
            Self::LoginRequired => "the platform requires a logged-in session for this video",
            Self::NetworkTimeout => "the platform did not respond in time",
            Self::UnsupportedUrl => "the URL is not supported by the extractor",
        }
    }
}

/// Classify an error message, most specific patterns first
pub fn diagnose_error(error: &str) -> Option<FailureHint> {
    let lower = error.to_lowercase();

    if lower.contains("unsupported url") {
        return Some(FailureHint::UnsupportedUrl);
    }

    if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate-limit")
    {
        return Some(FailureHint::RateLimited);
    }

    if lower.contains("not available in your country")
        || lower.contains("geo restricted")
        || lower.contains("geo-restricted")
    {
        return Some(FailureHint::GeoBlocked);
    }

    if lower.contains("private video") || lower.contains("this account is private") {
        return Some(FailureHint::PrivateContent);
    }

    if lower.contains("login required")
        || lower.contains("log in")
        || lower.contains("sign in")
        || lower.contains("cookies")
    {
        return Some(FailureHint::LoginRequired);
    }

    if lower.contains("video unavailable")
        || lower.contains("has been removed")
        || lower.contains("does not exist")
        || lower.contains("404")
    {
        return Some(FailureHint::Unavailable);
    }

    if lower.contains("timed out") || lower.contains("timeout") {
        return Some(FailureHint::NetworkTimeout);
    }

    None
}

/// Most useful line of yt-dlp stderr: the last `ERROR:` line, else the last non-empty line
pub fn summarize_stderr(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_default()
}
