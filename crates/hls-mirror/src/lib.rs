pub mod error;
pub mod fetch;
pub mod hls;
pub mod util;

use std::{future::Future, sync::Arc};

use tokio::io::AsyncRead;
use url::Url;

pub use bytes::Bytes;
pub use error::*;
pub use fetch::Fetcher;
pub use hls::{MirrorOptions, PlaylistMirror, MAX_PLAYLIST_DEPTH};
pub use util::http::HttpClient;

pub type RemoteReader = Box<dyn AsyncRead + Unpin + Send + 'static>;

/// An opened resource whose body has not been consumed yet.
pub struct RemoteBody {
    /// Raw `Content-Range` header of the response, if any.
    pub content_range: Option<String>,
    pub reader: RemoteReader,
}

impl RemoteBody {
    pub fn new(reader: RemoteReader) -> Self {
        Self {
            content_range: None,
            reader,
        }
    }

    pub fn with_content_range(mut self, content_range: impl Into<String>) -> Self {
        self.content_range = Some(content_range.into());
        self
    }
}

/// ┌────────────────┐   load   ┌──────────────┐
/// │ PlaylistMirror ├──────────►              │
/// └───────┬────────┘          │    Remote    │
///         │ fetch             │              │
/// ┌───────▼────────┐   open   │  http/file   │
/// │    Fetcher     ├──────────►              │
/// └───────┬────────┘          └──────────────┘
///         │ write
/// ┌───────▼────────┐
/// │   output dir   │
/// └────────────────┘
pub trait Remote: Send + Sync + 'static {
    /// Read a whole playlist into memory.
    fn load(&self, url: &Url) -> impl Future<Output = MirrorResult<Bytes>> + Send;

    /// Open a resource for streaming. Non-success responses are reported as errors.
    fn open(&self, url: &Url) -> impl Future<Output = MirrorResult<RemoteBody>> + Send;
}

impl<R> Remote for Arc<R>
where
    R: Remote,
{
    fn load(&self, url: &Url) -> impl Future<Output = MirrorResult<Bytes>> + Send {
        self.as_ref().load(url)
    }

    fn open(&self, url: &Url) -> impl Future<Output = MirrorResult<RemoteBody>> + Send {
        self.as_ref().open(url)
    }
}
