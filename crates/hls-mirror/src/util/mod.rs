use std::future::Future;

use url::Url;

use crate::MirrorResult;

pub mod http;
pub mod range;
pub mod uri;

/// Run `operation` until it succeeds, fails permanently or `retries` extra attempts are used up.
pub async fn with_retry<T, F, Fut>(url: &Url, retries: u32, mut operation: F) -> MirrorResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MirrorResult<T>>,
{
    let mut remaining = retries;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if remaining > 0 && error.is_transient() => {
                remaining -= 1;
                log::warn!("Failed to fetch {url}: {error}. {remaining} retries left.");
            }
            Err(error) => return Err(error),
        }
    }
}
