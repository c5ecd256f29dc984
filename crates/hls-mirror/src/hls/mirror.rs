use std::{
    collections::{HashMap, HashSet},
    num::NonZeroU32,
    path::PathBuf,
};

use futures::{stream, StreamExt, TryStreamExt};
use m3u8_rs::{
    AlternativeMedia, AlternativeMediaType, Key, KeyMethod, MasterPlaylist, MediaPlaylist,
    Playlist, VariantStream,
};
use url::Url;

use crate::{
    error::{MirrorError, MirrorResult},
    fetch::Fetcher,
    hls::load_m3u8,
    util::uri,
    Remote,
};

/// Playlists nest at most twice in practice. Deeper trees are treated as self references.
pub const MAX_PLAYLIST_DEPTH: usize = 8;

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Directory every mirrored file is written into.
    pub output_dir: PathBuf,
    /// Number of segments of one media playlist fetched at the same time.
    pub concurrency: NonZeroU32,
    /// Extra attempts for transient failures.
    pub retries: u32,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            concurrency: NonZeroU32::MIN,
            retries: 0,
        }
    }
}

impl MirrorOptions {
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: NonZeroU32) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retry(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// An `EXT-X-MEDIA` tag, identified by its position in the master playlist declaring it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MediaRef {
    playlist: Url,
    index: usize,
}

/// Mirrors one playlist tree. All state of a run lives here and is dropped with it.
pub struct PlaylistMirror<R> {
    fetcher: Fetcher<R>,
    base: Url,
    retries: u32,
    concurrency: usize,

    /// Alternative renditions already localized.
    seen_media: HashSet<MediaRef>,
    /// Playlist url to the local file name it was written as.
    localized: HashMap<Url, String>,
}

impl<R> PlaylistMirror<R>
where
    R: Remote,
{
    /// `base` resolves the playlist uri passed to [`PlaylistMirror::mirror`] when it is relative.
    pub fn new(remote: R, base: Url, options: MirrorOptions) -> Self {
        Self {
            fetcher: Fetcher::new(remote, options.output_dir).with_retry(options.retries),
            base,
            retries: options.retries,
            concurrency: options.concurrency.get() as usize,
            seen_media: HashSet::new(),
            localized: HashMap::new(),
        }
    }

    pub fn fetcher(&self) -> &Fetcher<R> {
        &self.fetcher
    }

    /// Mirror the playlist tree rooted at `playlist_uri` and return the local file name
    /// of the root playlist.
    pub async fn mirror(&mut self, playlist_uri: &str) -> MirrorResult<String> {
        let output_dir = self.fetcher.output_dir().to_path_buf();
        if !output_dir.exists() {
            tokio::fs::create_dir_all(&output_dir)
                .await
                .map_err(|source| MirrorError::WriteError {
                    path: output_dir,
                    source,
                })?;
        }

        let base = self.base.clone();
        self.localize(playlist_uri, &base, 0).await
    }

    #[async_recursion::async_recursion]
    async fn localize(
        &mut self,
        playlist_uri: &str,
        base: &Url,
        depth: usize,
    ) -> MirrorResult<String> {
        let url = uri::resolve(base, playlist_uri)?;
        if depth > MAX_PLAYLIST_DEPTH {
            return Err(MirrorError::RecursionLimit {
                url,
                depth: MAX_PLAYLIST_DEPTH,
            });
        }
        if let Some(file_name) = self.localized.get(&url) {
            log::debug!("{url} was already mirrored as {file_name}");
            return Ok(file_name.clone());
        }
        let file_name = uri::basename(&url)?;

        let mut playlist = load_m3u8(self.fetcher.remote(), &url, self.retries).await?;
        match &mut playlist {
            Playlist::MasterPlaylist(master) => self.localize_master(master, &url, depth).await?,
            Playlist::MediaPlaylist(media) => self.localize_media(media, &url).await?,
        }

        self.write_playlist(&playlist, &file_name).await?;
        self.localized.insert(url, file_name.clone());
        Ok(file_name)
    }

    async fn localize_master(
        &mut self,
        master: &mut MasterPlaylist,
        url: &Url,
        depth: usize,
    ) -> MirrorResult<()> {
        let MasterPlaylist {
            variants,
            alternatives,
            session_key,
            ..
        } = master;

        for variant in variants.iter_mut().filter(|v| !v.is_i_frame) {
            let local = self.localize(&variant.uri, url, depth + 1).await?;
            log::info!("playlist: {} ... {local}", variant.uri);
            variant.uri = local;

            for index in attached_alternatives(variant, alternatives) {
                self.localize_alternative(&mut alternatives[index], index, url, depth)
                    .await?;
            }
        }

        for variant in variants.iter_mut().filter(|v| v.is_i_frame) {
            let local = self.localize(&variant.uri, url, depth + 1).await?;
            log::info!("iframe: {} ... {local}", variant.uri);
            variant.uri = local;
        }

        // Renditions no variant points at would otherwise keep their remote uri.
        for (index, alternative) in alternatives.iter_mut().enumerate() {
            self.localize_alternative(alternative, index, url, depth).await?;
        }

        for session_key in session_key.iter_mut() {
            self.localize_key(&mut session_key.0, url).await?;
        }

        Ok(())
    }

    async fn localize_alternative(
        &mut self,
        alternative: &mut AlternativeMedia,
        index: usize,
        url: &Url,
        depth: usize,
    ) -> MirrorResult<()> {
        let Some(media_uri) = alternative.uri.clone() else {
            return Ok(());
        };
        let media = MediaRef {
            playlist: url.clone(),
            index,
        };
        if !self.seen_media.insert(media) {
            return Ok(());
        }

        let local = self.localize(&media_uri, url, depth + 1).await?;
        log::info!("media: {media_uri} ... {local}");
        alternative.uri = Some(local);
        Ok(())
    }

    async fn localize_media(&self, media: &mut MediaPlaylist, url: &Url) -> MirrorResult<()> {
        let targets = media
            .segments
            .iter()
            .map(|segment| {
                let segment_url = uri::resolve(url, &segment.uri)?;
                let file_name = uri::basename(&segment_url)?;
                Ok((segment_url, file_name))
            })
            .collect::<MirrorResult<Vec<_>>>()?;

        let fetches: Vec<_> = targets
            .iter()
            .map(|(segment_url, file_name)| self.fetcher.fetch(segment_url, file_name))
            .collect();
        let saved: Vec<String> = stream::iter(fetches)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        for (segment, saved_as) in media.segments.iter_mut().zip(saved) {
            log::info!("segment: {} ... {saved_as}", segment.uri);
            segment.uri = saved_as;
        }

        for segment in media.segments.iter_mut() {
            if let Some(map) = &mut segment.map {
                let map_url = uri::resolve(url, &map.uri)?;
                let saved_as = self.fetcher.fetch(&map_url, &uri::basename(&map_url)?).await?;
                log::info!("map: {} ... {saved_as}", map.uri);
                map.uri = saved_as;
            }
            if let Some(key) = &mut segment.key {
                self.localize_key(key, url).await?;
            }
        }

        Ok(())
    }

    /// Store clear-key material next to the segments. Keys delivered by DRM systems stay remote.
    async fn localize_key(&self, key: &mut Key, url: &Url) -> MirrorResult<()> {
        if !is_clear_key(key) {
            return Ok(());
        }
        let Some(key_uri) = key.uri.as_deref() else {
            return Ok(());
        };

        let key_url = uri::resolve(url, key_uri)?;
        if !matches!(key_url.scheme(), "http" | "https" | "file") {
            log::debug!("Keeping key {key_url} remote");
            return Ok(());
        }

        let saved_as = self.fetcher.fetch(&key_url, &uri::basename(&key_url)?).await?;
        log::info!("key: {key_uri} ... {saved_as}");
        key.uri = Some(saved_as);
        Ok(())
    }

    async fn write_playlist(&self, playlist: &Playlist, file_name: &str) -> MirrorResult<()> {
        let path = self.fetcher.output_dir().join(file_name);

        let mut data = Vec::new();
        playlist
            .write_to(&mut data)
            .map_err(|source| MirrorError::WriteError {
                path: path.clone(),
                source,
            })?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| MirrorError::WriteError {
                path: path.clone(),
                source,
            })?;

        log::debug!("Wrote playlist {}", path.display());
        Ok(())
    }
}

/// Indexes of the renditions a variant refers to through its group attributes.
fn attached_alternatives(
    variant: &VariantStream,
    alternatives: &[AlternativeMedia],
) -> Vec<usize> {
    alternatives
        .iter()
        .enumerate()
        .filter(|(_, alternative)| {
            let group = match alternative.media_type {
                AlternativeMediaType::Audio => &variant.audio,
                AlternativeMediaType::Video => &variant.video,
                AlternativeMediaType::Subtitles => &variant.subtitles,
                _ => return false,
            };
            group.as_deref() == Some(alternative.group_id.as_str())
        })
        .map(|(index, _)| index)
        .collect()
}

fn is_clear_key(key: &Key) -> bool {
    matches!(key.method, KeyMethod::AES128 | KeyMethod::SampleAES)
        && key
            .keyformat
            .as_deref()
            .map_or(true, |format| format == "identity")
}
