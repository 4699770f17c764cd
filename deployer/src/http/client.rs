//! HTTP client implementation

use std::time::Duration;

use reqwest::{header::HeaderMap, Client, Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::DeployError;
use crate::gateway::QueryOptions;

/// Header carrying the ACL token
const TOKEN_HEADER: &str = "X-Nomad-Token";

/// Header carrying the raft index of a read
const INDEX_HEADER: &str = "X-Nomad-Index";

/// Raw scheduler response, kept undecoded so callers can map error bodies
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
    pub index: Option<u64>,
}

impl ApiResponse {
    /// Decode a JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DeployError> {
        serde_json::from_str(&self.body)
            .map_err(|e| DeployError::Gateway(format!("invalid response body: {}", e)))
    }

    /// Turn non-success statuses into a gateway error
    pub fn ok(self, method: &Method, path: &str) -> Result<Self, DeployError> {
        if self.status.is_success() {
            return Ok(self);
        }
        error!("HTTP {} {} failed: {} - {}", method, path, self.status, self.body.trim());
        Err(DeployError::Gateway(format!(
            "{} {}: {} - {}",
            method,
            path,
            self.status,
            self.body.trim()
        )))
    }
}

/// HTTP client for the scheduler API
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client. `address` may omit the scheme.
    pub fn new(
        address: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, DeployError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: normalize_address(address)?,
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token.expose_secret());
        }
        request
    }

    async fn send(request: RequestBuilder) -> Result<ApiResponse, DeployError> {
        let response = request.send().await?;
        let status = response.status();
        let index = read_index(response.headers());
        let body = response.text().await?;
        Ok(ApiResponse {
            status,
            body,
            index,
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeployError> {
        let response = Self::send(self.request(Method::GET, path)).await?;
        response.ok(&Method::GET, path)?.json()
    }

    /// Make a blocking GET request, returning the body and the index to
    /// block on next
    pub async fn get_blocking<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryOptions,
    ) -> Result<(T, u64), DeployError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        let mut request = self.request(Method::GET, path);
        if query.wait_index > 0 {
            params.push(("index", query.wait_index.to_string()));
            params.push(("wait", format!("{}ms", query.wait_time.as_millis())));
            // the server adds up to wait/16 of jitter on top of the wait
            request = request.timeout(self.blocking_timeout(query.wait_time));
        }
        if query.allow_stale {
            params.push(("stale", String::new()));
        }

        let response = Self::send(request.query(&params)).await?;
        let response = response.ok(&Method::GET, path)?;
        let index = response.index.unwrap_or(query.wait_index);
        Ok((response.json()?, index))
    }

    fn blocking_timeout(&self, wait: Duration) -> Duration {
        wait + wait / 16 + Duration::from_secs(10)
    }

    /// Make a PUT request without decoding errors
    pub async fn put_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, DeployError> {
        Self::send(self.request(Method::PUT, path).json(body)).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        self.put_raw(path, body).await?.ok(&Method::PUT, path)?.json()
    }

    /// Make a POST request without decoding errors
    pub async fn post_raw<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, DeployError> {
        Self::send(self.request(Method::POST, path).json(body)).await
    }
}

fn read_index(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(INDEX_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Validate a scheduler address and strip trailing slashes
fn normalize_address(address: &str) -> Result<String, DeployError> {
    let address = address.trim();
    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| DeployError::Gateway(format!("invalid scheduler address {}: {}", address, e)))?;
    if url.host_str().is_none() {
        return Err(DeployError::Gateway(format!(
            "invalid scheduler address {}: missing host",
            address
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
