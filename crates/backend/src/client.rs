use snafu::ResultExt;
use url::Url;

use crate::error::{BackendResult, InvalidBaseUrlSnafu, ReadResponseBodySnafu};

/// Shared HTTP plumbing for the hosted backend.
///
/// Constructed once at process start and handed to the auth client and the
/// REST store, so there is exactly one connection pool and one place that
/// knows the project base URL and publishable API key.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> BackendResult<Self> {
        let base_url = Url::parse(base_url).context(InvalidBaseUrlSnafu {
            stage: "backend-client-new",
            raw: base_url.to_string(),
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Endpoint for one table of the REST data API.
    pub fn table_url(&self, table: &str) -> Url {
        self.endpoint_url(&format!("/rest/v1/{table}"))
    }

    /// Endpoint under the auth API.
    pub fn auth_url(&self, path: &str) -> Url {
        self.endpoint_url(&format!("/auth/v1/{path}"))
    }

    fn endpoint_url(&self, absolute_path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(absolute_path);
        url.set_query(None);
        url
    }
}

/// Maps a non-success response to `UnexpectedStatus`, keeping the body for
/// the log line.
pub(crate) async fn ensure_success(
    stage: &'static str,
    response: reqwest::Response,
) -> BackendResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .context(ReadResponseBodySnafu { stage })?;

    crate::error::UnexpectedStatusSnafu {
        stage,
        status: status.as_u16(),
        body,
    }
    .fail()
}
