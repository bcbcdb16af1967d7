use std::time::Duration;

use thiserror::Error;

use crate::cache::{CacheError, CacheStrategy, OfflineCache};
use crate::model::{normalize, Document, RawDocument};

pub const USER_AGENT: &str = concat!("linkhub/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    Url(String),
    File(String),
    Inline(String),
}

impl DataSource {
    /// `http(s)://` locations are fetched, anything else is a file path.
    pub fn detect(value: &str) -> Self {
        let trimmed = value.trim();
        let lower = trimmed.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::File(crate::config::expand_tilde_string(trimmed))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.clone(),
            Self::Inline(_) => "<inline>".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("request failed: {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read data file: {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid link document from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub fn build_client(timeout_seconds: u64) -> Result<reqwest::Client, LoaderError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(USER_AGENT),
    );
    headers.insert(
        reqwest::header::CACHE_CONTROL,
        reqwest::header::HeaderValue::from_static("no-store"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(Duration::from_secs(timeout_seconds.max(1)))
        .build()
        .map_err(|e| LoaderError::HttpClientBuild { source: e })
}

/// One GET; any non-2xx status is an error. No retry.
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, LoaderError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| LoaderError::Request {
            url: url.to_string(),
            source: e,
        })?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LoaderError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = resp.bytes().await.map_err(|e| LoaderError::Request {
        url: url.to_string(),
        source: e,
    })?;
    Ok(body.to_vec())
}

pub fn parse_document(bytes: &[u8], origin: &str) -> Result<Document, LoaderError> {
    let raw: RawDocument = serde_json::from_slice(bytes).map_err(|e| LoaderError::Parse {
        origin: origin.to_string(),
        source: e,
    })?;
    let report = normalize(raw);
    for (original, renamed) in report.renamed_ids.iter() {
        tracing::warn!(%original, %renamed, "duplicate item id renamed");
    }
    for (original, renamed) in report.renamed_groups.iter() {
        tracing::warn!(%original, %renamed, "group id clashed, renamed");
    }
    Ok(report.document)
}

#[derive(Default)]
pub struct LoadOptions<'a> {
    pub cache: Option<(&'a OfflineCache, CacheStrategy)>,
}

pub async fn load_document(
    client: &reqwest::Client,
    source: &DataSource,
    options: LoadOptions<'_>,
) -> Result<Document, LoaderError> {
    let origin = source.describe();
    let bytes = match source {
        DataSource::Inline(body) => body.clone().into_bytes(),
        DataSource::File(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|e| LoaderError::FileRead {
                    path: path.clone(),
                    source: e,
                })?
        }
        DataSource::Url(url) => match options.cache {
            Some((cache, strategy)) => cache.fetch(client, url, strategy).await?,
            None => fetch_bytes(client, url).await?,
        },
    };
    let document = parse_document(&bytes, &origin)?;
    tracing::debug!(
        origin = %origin,
        groups = document.groups.len(),
        items = document.item_count(),
        "loaded link document"
    );
    Ok(document)
}
