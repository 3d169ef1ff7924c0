//! HTTP page client for the supplier query endpoint
//!
//! Sends the [`QueryTemplate`] envelope as a JSON POST with the vendor's
//! authentication headers. One call is one request: failures are classified
//! and returned, never retried here.

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, ORIGIN,
    REFERER, USER_AGENT,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::ExportConfig;
use crate::metrics::FetchMetrics;

use super::payload::{QueryTemplate, ResponseEnvelope};
use super::{body_preview, FetcherError, FetcherResult, PageClient, PageRequest, PageResponse};

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

const ORIGIN_URL: &str = "https://one.cnncecp.com";
const REFERER_URL: &str = "https://one.cnncecp.com/cnnc-pm-web/";
const MENU_ID: &str = "PCPSAM26";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

/// reqwest-backed [`PageClient`]
///
/// Cheap to share: the reqwest client pools connections internally and the
/// template and headers are only ever read.
#[derive(Debug, Clone)]
pub struct HttpPageClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    template: Arc<QueryTemplate>,
}

impl HttpPageClient {
    /// Build a client from the export configuration
    ///
    /// # Errors
    /// Returns [`FetcherError::InvalidRequest`] if the token cannot be used as
    /// a header value or the HTTP client cannot be constructed.
    pub fn new(config: &ExportConfig) -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                FetcherError::InvalidRequest(format!("failed to build HTTP client: {e}"))
            })?;

        Self::with_client(client, config, QueryTemplate::supplier_query())
    }

    /// Build a client around an existing reqwest client and template
    pub fn with_client(
        client: Client,
        config: &ExportConfig,
        template: QueryTemplate,
    ) -> FetcherResult<Self> {
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            headers: build_headers(&config.access_token)?,
            template: Arc::new(template),
        })
    }

    /// Endpoint every page is posted to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared request template
    pub fn template(&self) -> &QueryTemplate {
        &self.template
    }
}

#[async_trait]
impl PageClient for HttpPageClient {
    async fn fetch(&self, request: PageRequest) -> FetcherResult<PageResponse> {
        let payload = self.template.for_page(request);
        let metrics = FetchMetrics::start(request.offset);

        debug!(
            correlation_id = %metrics.correlation_id(),
            limit = request.limit,
            offset = request.offset,
            "Posting page request"
        );

        let response = self
            .client
            .post(&self.base_url)
            .headers(self.headers.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                metrics.record_transport_error();
                FetcherError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            metrics.record_transport_error();
            FetcherError::Transport(format!("failed to read response body: {e}"))
        })?;
        metrics.record_complete(status.as_u16());

        if !status.is_success() {
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
                body_preview: body_preview(&body),
            });
        }

        let envelope: ResponseEnvelope =
            serde_json::from_str(&body).map_err(|e| FetcherError::Decode {
                detail: e.to_string(),
                body_preview: body_preview(&body),
            })?;

        let page = envelope.into_page();
        debug!(
            offset = request.offset,
            rows = page.rows.len(),
            total_count = ?page.total_count,
            "Page decoded"
        );
        Ok(page)
    }
}

/// Vendor authentication and browser headers
fn build_headers(token: &str) -> FetcherResult<HeaderMap> {
    let token_value = HeaderValue::from_str(token).map_err(|e| {
        FetcherError::InvalidRequest(format!("access token is not a valid header value: {e}"))
    })?;
    let cookie = HeaderValue::from_str(&format!("_tea_utm_cache_10000007=undefined; token={token}"))
        .map_err(|e| FetcherError::InvalidRequest(format!("invalid cookie header: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json;charset=UTF-8"));
    headers.insert(COOKIE, cookie);
    headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_URL));
    headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

    for name in ["access-token", "access-no", "sso_token"] {
        headers.insert(HeaderName::from_static(name), token_value.clone());
    }
    headers.insert(HeaderName::from_static("menuid"), HeaderValue::from_static(MENU_ID));
    headers.insert(HeaderName::from_static("mk-request"), HeaderValue::from_static("1"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("empty"));
    headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("cors"));
    headers.insert(HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static("same-origin"));

    Ok(headers)
}
