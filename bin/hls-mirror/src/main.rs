use std::{num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use clap::Parser;
use fake_user_agent::get_chrome_rua;
use hls_mirror::{util::uri, HttpClient, MirrorOptions, PlaylistMirror};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    ClientBuilder,
};
use url::Url;

/// Mirror a remote HLS playlist tree for offline playback.
#[derive(Parser, Debug, Clone)]
#[clap(version, author)]
pub struct MirrorArgs {
    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,

    /// Output directory
    #[clap(short, long, env = "HLS_MIRROR_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// HTTP Header used to download
    ///
    /// Custom header. eg. "Referer: https://example.com/".
    #[clap(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Cookies used to download, eg. "a=1; b=2"
    #[clap(long)]
    cookies: Option<String>,

    /// Abort a transfer when no data arrives for this many seconds
    ///
    /// Unset by default, slow transfers are allowed to finish.
    #[clap(long)]
    timeout: Option<u64>,

    /// Segments fetched in parallel within one playlist
    #[clap(long, default_value = "1")]
    concurrency: NonZeroU32,

    /// Retry limit for transient failures
    #[clap(long, default_value = "0")]
    retries: u32,

    /// Master playlist url or local path
    playlist: String,
}

impl MirrorArgs {
    fn client(&self) -> anyhow::Result<HttpClient> {
        let mut headers = HeaderMap::new();
        for header in &self.headers {
            let (key, value) = header
                .split_once(':')
                .with_context(|| format!("Invalid header {header:?}"))?;
            headers.insert(
                HeaderName::from_str(key.trim())
                    .with_context(|| format!("Invalid header name {key:?}"))?,
                HeaderValue::from_str(value.trim())
                    .with_context(|| format!("Invalid header value {value:?}"))?,
            );
        }

        let mut builder = ClientBuilder::new()
            .default_headers(headers)
            .user_agent(get_chrome_rua());
        if let Some(timeout) = self.timeout {
            builder = builder.read_timeout(Duration::from_secs(timeout));
        }
        Ok(HttpClient::new(builder)?)
    }

    /// Local paths become `file://` urls.
    fn playlist_url(&self) -> anyhow::Result<Url> {
        if uri::is_absolute(&self.playlist) || self.playlist.starts_with("file://") {
            return Ok(Url::parse(&self.playlist)?);
        }

        let path = PathBuf::from(&self.playlist)
            .canonicalize()
            .with_context(|| format!("Playlist {} not found", self.playlist))?;
        let url = Url::from_file_path(&path)
            .map_err(|_| anyhow::anyhow!("Invalid playlist path {}", path.display()))?;
        Ok(url)
    }

    fn options(&self) -> MirrorOptions {
        MirrorOptions::default()
            .with_output_dir(&self.output)
            .with_concurrency(self.concurrency)
            .with_retry(self.retries)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = MirrorArgs::parse();

    pretty_env_logger::formatted_builder()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let client = args.client()?;
    let url = args.playlist_url()?;
    if let Some(cookies) = &args.cookies {
        if matches!(url.scheme(), "http" | "https") {
            let cookies = cookies.split(';').map(|c| c.trim().to_string()).collect();
            client.add_cookies(cookies, url.clone())?;
        }
    }

    let mut mirror = PlaylistMirror::new(client, url.clone(), args.options());
    let root = mirror.mirror(url.as_str()).await?;
    log::info!("Mirrored {url} to {}", args.output.join(root).display());

    Ok(())
}
