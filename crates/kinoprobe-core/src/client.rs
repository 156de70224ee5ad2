//! HTTP transport for the probed API
//!
//! Wraps `reqwest` with the conventions every probe relies on: a shared base
//! URL, bearer-token authorization, a uniform per-call timeout, and
//! opportunistic JSON parsing. Non-2xx statuses are ordinary responses here;
//! it is up to each probe to decide whether a status is a failure.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use crate::error::{ProbeError, Result};

/// Default v1 API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.service-kp.com/";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all request paths are joined onto
    pub base_url: String,
    /// Request timeout in seconds, applied uniformly (default: 30)
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Normalize a base URL to end with exactly one slash
pub fn ensure_trailing_slash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

/// Derive the api2 base URL from the v1 base URL
///
/// The official client uses `https://<host>/api/` for v1 paths and
/// `https://<host>/` for `api2/...` paths. When the v1 base ends with an
/// `/api` segment, strip it; otherwise reuse the v1 base as-is.
pub fn derive_api2_base_url(v1_base_url: &str) -> String {
    if let Some(stripped) = v1_base_url.strip_suffix("/api/") {
        ensure_trailing_slash(stripped)
    } else if let Some(stripped) = v1_base_url.strip_suffix("/api") {
        ensure_trailing_slash(stripped)
    } else {
        ensure_trailing_slash(v1_base_url)
    }
}

/// One HTTP exchange's response, immutable once constructed
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub raw_text: String,
    /// Present only when the body looked like JSON and parsed cleanly
    pub json: Option<Value>,
}

impl HttpResponse {
    /// Field lookup on the parsed JSON body, `None` when anything is missing
    pub fn json_get(&self, key: &str) -> Option<&Value> {
        self.json.as_ref().and_then(|v| v.get(key))
    }
}

/// A request under construction
///
/// Carries everything a probe specifies about one call; the same structure
/// later feeds the snapshot's request descriptor so what is persisted always
/// matches what was sent.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: reqwest::Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    /// Raw body bytes plus their content type; mutually exclusive with form
    pub body: Option<(Vec<u8>, String)>,
    /// Whether to attach the bearer token (device-flow calls go without)
    pub authorized: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(reqwest::Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(reqwest::Method::POST, path)
    }

    fn new(method: reqwest::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            form: Vec::new(),
            body: None,
            authorized: true,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn form(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.form.push((key.into(), value.to_string()));
        self
    }

    pub fn raw_body(mut self, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = Some((bytes, content_type.into()));
        self
    }

    pub fn unauthorized(mut self) -> Self {
        self.authorized = false;
        self
    }
}

/// Percent-encode query pairs into a query string
fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn is_json_content_type(headers: &BTreeMap<String, String>) -> bool {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, ct)| {
            ct.contains("application/json") || ct.contains("application/js") || ct.contains("+json")
        })
        .unwrap_or(false)
}

/// HTTP client bound to one base URL and an optional bearer token
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client with the default configuration and no token
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default(), None)
    }

    /// Create a client with a custom configuration and optional bearer token
    pub fn with_config(config: ClientConfig, token: Option<String>) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ProbeError::InvalidConfig("base URL cannot be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(ProbeError::Http)?;

        Ok(Self {
            client,
            base_url: ensure_trailing_slash(&config.base_url),
            token,
        })
    }

    /// The normalized base URL this client joins paths onto
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a request path (and encoded query) onto the base URL
    pub fn build_url(&self, path: &str, query: &[(String, String)]) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query));
        }
        url
    }

    /// Perform one exchange and capture the full response
    ///
    /// Non-2xx statuses come back as ordinary responses. Only transport
    /// failures (DNS, connect, timeout) surface as errors.
    pub async fn execute(&self, request: &ApiRequest) -> Result<HttpResponse> {
        let url = self.build_url(&request.path, &request.query);

        let mut builder = self.client.request(request.method.clone(), &url);

        if request.authorized && let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        } else if let Some((bytes, content_type)) = &request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes.clone());
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(ProbeError::Http)?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let bytes = response.bytes().await.map_err(ProbeError::Http)?;
        let raw_text = String::from_utf8_lossy(&bytes).into_owned();

        debug!(
            method = %request.method,
            path = %request.path,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exchange complete"
        );

        let json = parse_jsonish(&raw_text, &headers);

        Ok(HttpResponse {
            status,
            headers,
            raw_text,
            json,
        })
    }
}

/// Parse the body as JSON when it plausibly is JSON
///
/// Either the Content-Type says so or the body starts with `{`/`[`.
/// Parse failures are not errors; the raw text is still kept.
fn parse_jsonish(raw_text: &str, headers: &BTreeMap<String, String>) -> Option<Value> {
    if raw_text.is_empty() {
        return None;
    }
    let looks_like_json = raw_text.trim_start().starts_with(['{', '[']);
    if !is_json_content_type(headers) && !looks_like_json {
        return None;
    }
    serde_json::from_str(raw_text).ok()
}
