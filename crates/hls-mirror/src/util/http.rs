use std::{ops::Deref, sync::Arc};

use futures::TryStreamExt;
use reqwest::{header::CONTENT_RANGE, Client, ClientBuilder, IntoUrl, Response};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use tokio_util::io::StreamReader;
use url::Url;

use crate::{
    error::{MirrorError, MirrorResult},
    Bytes, Remote, RemoteBody,
};

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> reqwest::Result<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store.clone()).build()?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    /// Add `Set-Cookie` style cookies scoped to `url`. Malformed cookies are skipped.
    pub fn add_cookies(&self, cookies: Vec<String>, url: impl IntoUrl) -> reqwest::Result<()> {
        let url = url.into_url()?;
        let Ok(mut lock) = self.cookies_store.lock() else {
            log::warn!("Cookie store is poisoned, cookies are ignored.");
            return Ok(());
        };
        for cookie in cookies {
            if let Err(e) = lock.parse(&cookie, &url) {
                log::warn!("Invalid cookie {cookie:?}: {e}");
            }
        }
        Ok(())
    }

    async fn send(&self, url: &Url) -> MirrorResult<Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| MirrorError::RequestError {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            if let Ok(body) = response.text().await {
                log::debug!("Error body: {body}");
            }
            return Err(MirrorError::HttpError {
                url: url.clone(),
                status,
            });
        }

        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = match Client::builder()
            .cookie_provider(cookies_store.clone())
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::warn!("Failed to build http client, cookies will not be kept: {e}");
                Client::default()
            }
        };

        Self {
            client,
            cookies_store,
        }
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Remote for HttpClient {
    async fn load(&self, url: &Url) -> MirrorResult<Bytes> {
        match url.scheme() {
            "http" | "https" => {
                let response = self.send(url).await?;
                response
                    .bytes()
                    .await
                    .map_err(|source| MirrorError::RequestError {
                        url: url.clone(),
                        source,
                    })
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| MirrorError::UnsupportedScheme(url.clone()))?;
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|source| MirrorError::ReadError {
                        url: url.clone(),
                        source,
                    })?;
                Ok(Bytes::from(data))
            }
            _ => Err(MirrorError::UnsupportedScheme(url.clone())),
        }
    }

    async fn open(&self, url: &Url) -> MirrorResult<RemoteBody> {
        match url.scheme() {
            "http" | "https" => {
                let response = self.send(url).await?;
                let content_range = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                let stream = response.bytes_stream().map_err(std::io::Error::other);
                let body = RemoteBody::new(Box::new(StreamReader::new(stream)));
                Ok(match content_range {
                    Some(content_range) => body.with_content_range(content_range),
                    None => body,
                })
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| MirrorError::UnsupportedScheme(url.clone()))?;
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| MirrorError::ReadError {
                        url: url.clone(),
                        source,
                    })?;
                Ok(RemoteBody::new(Box::new(file)))
            }
            _ => Err(MirrorError::UnsupportedScheme(url.clone())),
        }
    }
}
