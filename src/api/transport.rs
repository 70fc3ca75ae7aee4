//! HTTP transport of the agent API.
//!
//! This module provides the [`Transport`] trait, the lowest layer of the
//! client, and its `reqwest` implementation [`HttpTransport`]. A transport
//! sends one request, attaches the credential and classifies what went
//! wrong; it knows nothing about games or retries.

use std::time::Duration;

use log::debug;
use mockall::automock;
use reqwest::{
    Client, Method,
    header::{self, HeaderMap, HeaderValue},
};
use serde_json::Value;
use thiserror::Error;

use crate::{config::ClientConfig, error::ClientError};

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("crawlerverse-rust/", env!("CARGO_PKG_VERSION"));

/// A request to the agent API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path starting with `/`, e.g. `/games/abc/action`.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A successful (2xx) response with its decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    /// `Value::Null` when the body was empty.
    pub body: Value,
}

/// Failure classes of a single request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not produce a response: connection refused, DNS,
    /// timeout.
    #[error("network failure: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("http status {status}")]
    Http {
        status: u16,
        /// Raw response body.
        body: String,
        /// Parsed `retry-after` header.
        retry_after: Option<Duration>,
    },

    /// A 2xx response whose body is not JSON.
    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Sends requests to the agent API.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
#[automock]
pub trait Transport {
    /// Sends one request and returns the decoded 2xx body.
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest` connection pool.
///
/// The credential and the user agent are installed as default headers when
/// the transport is built, so no request can leave without them. The
/// connection pool is released when the transport is dropped.
///
/// # Examples
///
/// ```no_run
/// use crawlerverse::{api::HttpTransport, config::ClientConfig};
///
/// let config = ClientConfig::default().with_api_key(Some("cra_key".to_owned()));
/// let transport = HttpTransport::new(&config).unwrap();
/// ```
pub struct HttpTransport {
    /// Base URL, without trailing slash
    base_url: String,
    /// HTTP client
    client: Client,
}

impl HttpTransport {
    /// Create a new [HttpTransport].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingCredential`] before touching the network
    /// if the configuration has no API key, and [`ClientError::Setup`] if the
    /// key cannot be sent as a header.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let api_key = config.api_key()?;

        let mut headers = HeaderMap::new();
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| ClientError::Setup("API key is not a valid header value".to_owned()))?;
        authorization.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(HttpTransport {
            base_url: config.normalized_base_url().to_owned(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", &self.base_url, &request.path);
        debug!("request {} {} {:?}", &request.method, &url, &request.query);

        let mut builder = self.client.request(request.method, &url).query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        debug!("response from {} -> {} ({} bytes)", &url, status, bytes.len());

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
                retry_after,
            });
        }

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))?
        };

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}
