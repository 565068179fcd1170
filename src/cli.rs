use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use media_resolver::resolver::config::{locate_ytdlp, DEFAULT_INNERTUBE_CLIENT_VERSION};
use media_resolver::ResolverConfig;

#[derive(Parser, Debug)]
#[command(name = "media-resolver", about = "Resolve media links into direct download variants")]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "RESOLVER_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Path to the yt-dlp binary (searched for when omitted)
    #[arg(long, env = "RESOLVER_YTDLP_PATH")]
    pub ytdlp_path: Option<String>,

    /// Overall deadline per resolution, in seconds
    #[arg(long, env = "RESOLVER_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Maximum resolutions in flight
    #[arg(long, env = "RESOLVER_MAX_CONCURRENT", default_value_t = 8)]
    pub max_concurrent: usize,

    /// Proxy for outbound requests (e.g. socks5://127.0.0.1:1080)
    #[arg(long, env = "RESOLVER_PROXY")]
    pub proxy: Option<String>,

    /// InnerTube client version reported to YouTube
    #[arg(
        long,
        env = "RESOLVER_INNERTUBE_CLIENT_VERSION",
        default_value = DEFAULT_INNERTUBE_CLIENT_VERSION
    )]
    pub innertube_client_version: String,
}

impl Cli {
    pub fn resolver_config(&self) -> ResolverConfig {
        let ytdlp_path = self.ytdlp_path.clone().unwrap_or_else(locate_ytdlp);
        ResolverConfig::default()
            .with_ytdlp_path(ytdlp_path)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_concurrent(self.max_concurrent)
            .with_proxy(self.proxy.clone())
            .with_innertube_client_version(self.innertube_client_version.clone())
    }
}
