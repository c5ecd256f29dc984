use std::path::PathBuf;

use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("HTTP error {status} while fetching {url}")]
    HttpError {
        url: Url,
        status: reqwest::StatusCode,
    },

    #[error("Request to {url} failed: {source}")]
    RequestError {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("Transfer of {url} was interrupted: {source}")]
    TransferError {
        url: Url,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read local file {url}: {source}")]
    ReadError {
        url: Url,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load playlist {url}: {source}")]
    PlaylistLoadError {
        url: Url,
        #[source]
        source: Box<MirrorError>,
    },

    #[error("Invalid m3u8 file {url}: {reason}")]
    M3u8ParseError { url: Url, reason: String },

    #[error("Invalid uri {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Uri {0} has no file name")]
    MissingFileName(Url),

    #[error("Unsupported uri scheme: {0}")]
    UnsupportedScheme(Url),

    #[error("Playlist {url} is nested deeper than {depth} levels")]
    RecursionLimit { url: Url, depth: usize },
}

/// Coarse classification of a [`MirrorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A playlist could not be reached or parsed.
    ManifestLoad,
    /// A resource could not be transferred or stored locally.
    Fetch,
    /// A uri could not be classified, joined or named.
    UriResolution,
    /// The playlist tree references itself.
    RecursionLimit,
}

impl MirrorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PlaylistLoadError { .. } | Self::M3u8ParseError { .. } => ErrorKind::ManifestLoad,
            Self::HttpError { .. }
            | Self::RequestError { .. }
            | Self::TransferError { .. }
            | Self::ReadError { .. }
            | Self::WriteError { .. } => ErrorKind::Fetch,
            Self::InvalidUri { .. } | Self::MissingFileName(_) | Self::UnsupportedScheme(_) => {
                ErrorKind::UriResolution
            }
            Self::RecursionLimit { .. } => ErrorKind::RecursionLimit,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestError { .. } | Self::TransferError { .. } => true,
            Self::HttpError { status, .. } => status.is_server_error(),
            Self::PlaylistLoadError { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

pub type MirrorResult<T> = Result<T, MirrorError>;
