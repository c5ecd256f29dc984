use m3u8_rs::Playlist;
use url::Url;

use crate::{
    error::{MirrorError, MirrorResult},
    util::with_retry,
    Remote,
};

/// Fetch and parse the playlist at `url`.
pub async fn load_m3u8<R>(remote: &R, url: &Url, retries: u32) -> MirrorResult<Playlist>
where
    R: Remote,
{
    log::info!("loading {url}");

    let m3u8_bytes = with_retry(url, retries, || remote.load(url))
        .await
        .map_err(|source| MirrorError::PlaylistLoadError {
            url: url.clone(),
            source: Box::new(source),
        })?;

    m3u8_rs::parse_playlist_res(&m3u8_bytes).map_err(|error| MirrorError::M3u8ParseError {
        url: url.clone(),
        reason: error.to_string(),
    })
}
