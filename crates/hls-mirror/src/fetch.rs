use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use sha2::{Digest, Sha256};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
    sync::{Mutex, OnceCell},
};
use url::Url;

use crate::{
    error::{MirrorError, MirrorResult},
    util::{range::ContentRange, with_retry},
    Remote, RemoteBody,
};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Downloads resources into the output directory, at most once per url.
pub struct Fetcher<R> {
    remote: R,
    output_dir: PathBuf,
    retries: u32,

    /// Source url to the local file name it was stored as.
    cache: Mutex<HashMap<Url, Arc<OnceCell<String>>>>,
}

impl<R> Fetcher<R>
where
    R: Remote,
{
    pub fn new(remote: R, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            output_dir: output_dir.into(),
            retries: 0,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Local file name `url` was stored as, if it has been fetched.
    pub async fn cached(&self, url: &Url) -> Option<String> {
        let cache = self.cache.lock().await;
        cache.get(url).and_then(|cell| cell.get().cloned())
    }

    /// Fetch `url` into the output directory and return the local file name.
    ///
    /// `default_name` is used unless the url has a query or the server answers with a
    /// `Content-Range`, in which case it is prefixed to keep resources apart. Concurrent
    /// calls for the same url share a single transfer.
    pub async fn fetch(&self, url: &Url, default_name: &str) -> MirrorResult<String> {
        let cell = {
            let mut cache = self.cache.lock().await;
            cache.entry(url.clone()).or_default().clone()
        };

        if let Some(file_name) = cell.get() {
            log::debug!("Reusing {file_name} for {url}");
            return Ok(file_name.clone());
        }

        let file_name = cell
            .get_or_try_init(|| {
                with_retry(url, self.retries, || self.download(url, default_name))
            })
            .await?;
        Ok(file_name.clone())
    }

    async fn download(&self, url: &Url, default_name: &str) -> MirrorResult<String> {
        let mut file_name = match url.query().filter(|q| !q.is_empty()) {
            Some(query) => format!("{}-{default_name}", query_fingerprint(query)),
            None => default_name.to_string(),
        };

        let body = self.remote.open(url).await?;
        if let Some(range) = body.content_range.as_deref().and_then(ContentRange::parse) {
            file_name = format!("{}{file_name}", range.file_name_prefix());
        }

        let path = self.output_dir.join(&file_name);
        let partial = PartialFile::new(path.clone());
        write_body(url, body, &path).await?;
        partial.commit();

        log::debug!("Saved {url} as {}", path.display());
        Ok(file_name)
    }
}

/// Deletes a file being written unless it was committed, including when the
/// download is dropped halfway.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed incomplete file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove incomplete file {}: {e}",
                self.path.display()
            ),
        }
    }
}

/// Hex encoded sha256 of the query string.
pub fn query_fingerprint(query: &str) -> String {
    hex::encode(Sha256::digest(query.as_bytes()))
}

async fn write_body(url: &Url, body: RemoteBody, path: &Path) -> MirrorResult<()> {
    let write_error = |source| MirrorError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = body.reader;
    let mut file = File::create(path).await.map_err(write_error)?;
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let read = reader
            .read(&mut buffer)
            .await
            .map_err(|source| MirrorError::TransferError {
                url: url.clone(),
                source,
            })?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read]).await.map_err(write_error)?;
    }
    file.flush().await.map_err(write_error)?;

    Ok(())
}
