//! HTTP catalog retrieval.

use std::cell::RefCell;
use std::time::Duration;

use clipper_core::catalog::CatalogSource;
use clipper_core::{CoreError, Result};

/// Fetches `<base>/<channel_id>.json` with `ureq`.
pub struct HttpCatalogSource {
    base_url: String,
    http_client: ureq::Agent,
    last_etag: RefCell<Option<String>>,
}

impl HttpCatalogSource {
    pub fn new(base_url: &str) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .build();
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            http_client,
            last_etag: RefCell::new(None),
        }
    }

    pub fn catalog_url(&self, channel_id: &str) -> String {
        format!("{}/{}.json", self.base_url, urlencoding::encode(channel_id))
    }

    /// `ETag` of the last successful response, if the server sent one.
    pub fn last_etag(&self) -> Option<String> {
        self.last_etag.borrow().clone()
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch(&self, channel_id: &str) -> Result<String> {
        let url = self.catalog_url(channel_id);
        tracing::debug!("GET {}", url);
        let response = self
            .http_client
            .get(&url)
            .call()
            .map_err(|err| classify_failure(channel_id, err))?;
        *self.last_etag.borrow_mut() = response.header("ETag").map(str::to_string);
        response
            .into_string()
            .map_err(|err| CoreError::Unavailable(format!("reading {}: {}", url, err)))
    }
}

fn classify_failure(channel_id: &str, error: ureq::Error) -> CoreError {
    match error {
        ureq::Error::Status(404, _) | ureq::Error::Status(410, _) => {
            CoreError::NotFound(channel_id.to_string())
        }
        ureq::Error::Status(code, _) => {
            CoreError::Unavailable(format!("server returned status {}", code))
        }
        ureq::Error::Transport(transport) => CoreError::Unavailable(transport.to_string()),
    }
}
