//! JSON-over-HTTPS client for the completion provider.
//!
//! One attempt per call: a failed request is returned to the caller, never
//! repeated. Bearer keys are sanitised before use and never logged; set
//! `AUM_HTTP_RAW=1` to log each request as a redacted `curl` line (target
//! `http.raw`) together with the response body.
//!
//! ```no_run
//! # async fn demo() -> Result<(), aum_http::HttpError> {
//! let client = aum_http::HttpClient::new("https://api.example.com/v1/")?;
//! let got: serde_json::Value = client
//!     .post_json("responses", Some("sk-..."), &serde_json::json!({ "input": "hi" }))
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const RAW_ENV: &str = "AUM_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
}

impl HttpClient {
    /// Construct a client anchored to a base URL. Relative paths passed to
    /// [`post_json`](Self::post_json) are joined onto it, so keep the
    /// trailing slash.
    ///
    /// ```
    /// use aum_http::{HttpClient, HttpError};
    ///
    /// assert!(HttpClient::new("https://api.openai.com/v1/").is_ok());
    /// assert!(matches!(HttpClient::new("not a url"), Err(HttpError::Url(_))));
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self { base, inner })
    }

    /// POST `body` as JSON and decode a JSON reply.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let payload = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        let key = bearer.map(sanitize_api_key).transpose()?;
        let req_id = uuid::Uuid::new_v4().simple().to_string();

        let mut rb = self
            .inner
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.clone());
        if let Some(key) = &key {
            rb = rb.bearer_auth(key);
        }

        debug!(
            %req_id,
            host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            authenticated = key.is_some(),
            body_len = payload.len(),
            "http.request.start"
        );
        if raw_enabled() {
            let curl = redacted_curl(&url, key.is_some(), &payload);
            debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|e| {
            warn!(%req_id, error = %e, "http.network_error");
            HttpError::Network(e.to_string())
        })?;
        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let bytes = resp.bytes().await.map_err(|e| {
            warn!(%req_id, error = %e, "http.network_error");
            HttpError::Network(e.to_string())
        })?;

        debug!(
            %req_id,
            %status,
            duration_ms = t0.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            x_request_id = %request_id,
            "http.response"
        );
        if raw_enabled() {
            let end = bytes.len().min(RAW_MAX_BODY);
            debug!(
                target: "http.raw",
                %req_id,
                %status,
                body = %String::from_utf8_lossy(&bytes[..end]),
                truncated = bytes.len() > RAW_MAX_BODY,
                "response"
            );
        }

        if !status.is_success() {
            let message = error_message(&bytes);
            warn!(%req_id, %status, %message, x_request_id = %request_id, "http.error");
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            let snippet = snip_body(&bytes);
            warn!(%req_id, serde_err = %e, body_snippet = %snippet, "http.response.decode_error");
            HttpError::Decode(e.to_string(), snippet)
        })
    }
}

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// `curl` rendition of a JSON POST. The key never appears.
fn redacted_curl(url: &Url, authenticated: bool, body: &[u8]) -> String {
    let mut parts = vec![
        "curl -XPOST".to_string(),
        "-H 'content-type: application/json'".to_string(),
    ];
    if authenticated {
        parts.push("-H 'authorization: Bearer <redacted>'".to_string());
    }
    let end = body.len().min(RAW_MAX_BODY);
    let text = String::from_utf8_lossy(&body[..end]);
    parts.push(format!("-d '{}'", text.replace('\'', r"'\''")));
    parts.push(format!("'{url}'"));
    parts.join(" ")
}

/// Pull a human message out of an error body, falling back to a snippet.
fn error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorBody {
        // {"error":{"message":"..."}}
        Nested { error: Detail },
        // {"message":"..."} / {"detail":"..."} / {"error":"..."}
        Flat {
            #[serde(default)]
            message: String,
            #[serde(default)]
            detail: String,
            #[serde(default)]
            error: String,
        },
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }

    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody::Nested { error }) => error.message,
        Ok(ErrorBody::Flat {
            message,
            detail,
            error,
        }) => [message, detail, error]
            .into_iter()
            .find(|m| !m.is_empty())
            .unwrap_or_else(|| snip_body(body)),
        Err(_) => snip_body(body),
    }
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

/// Strip quotes and whitespace a key picks up from env files, and reject
/// anything that cannot travel in an `Authorization` header.
fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut key = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    key.retain(|ch| !ch.is_ascii_whitespace());

    if !key.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(key)
}
