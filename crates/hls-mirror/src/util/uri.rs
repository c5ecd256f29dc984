use url::Url;

use crate::error::{MirrorError, MirrorResult};

/// Whether the uri carries a network location (scheme and host).
pub fn is_absolute(uri: &str) -> bool {
    Url::parse(uri)
        .map(|url| url.has_host() && !url.host_str().unwrap_or_default().is_empty())
        .unwrap_or(false)
}

/// Resolve `uri` against `base` following RFC 3986. Absolute uris are returned unchanged.
pub fn resolve(base: &Url, uri: &str) -> MirrorResult<Url> {
    let resolved = if is_absolute(uri) {
        Url::parse(uri)
    } else {
        base.join(uri)
    };

    resolved.map_err(|source| MirrorError::InvalidUri {
        uri: uri.to_string(),
        source,
    })
}

/// Last segment of the url path, without query or fragment.
///
/// Urls whose path is empty or ends with `/` have no file name and are rejected.
pub fn basename(url: &Url) -> MirrorResult<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MirrorError::MissingFileName(url.clone()))
}
