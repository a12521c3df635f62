use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::common::ApiQueryParams;
use super::error::ApiError;
use super::pool::{ConnectionStats, RequestStats};
use super::session::Session;

/// Client bound to one service endpoint in one region
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<ServiceClientInner>,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service", &self.inner.service)
            .field("region", &self.inner.region)
            .field("base_url", &self.inner.base_url)
            .finish()
    }
}

struct ServiceClientInner {
    service: String,
    region: String,
    base_url: String,
    session: Session,
    retry_config: RetryConfig,
    stats: RequestStats,
    user_agent: String,
    no_cache: bool,
    log_requests: bool,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
        }
    }
}

enum Body {
    Empty,
    Json(serde_json::Value),
    Text { content_type: &'static str, body: String },
}

pub fn user_agent(terraform_version: &str) -> String {
    let terraform_version = if terraform_version.is_empty() {
        "0.11+compatible"
    } else {
        terraform_version
    };
    format!(
        "HashiCorp Terraform/{} (+https://www.terraform.io) terraform-provider-openstack/{}",
        terraform_version,
        env!("CARGO_PKG_VERSION")
    )
}

impl ServiceClient {
    pub fn new(
        service: &str,
        region: &str,
        endpoint: &str,
        session: Session,
    ) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| ApiError::Config(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        let mut base_url = parsed.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let config = session.config().clone();
        Ok(Self {
            inner: Arc::new(ServiceClientInner {
                service: service.to_string(),
                region: region.to_string(),
                base_url,
                session,
                retry_config: RetryConfig {
                    max_retries: config.max_retries,
                    ..Default::default()
                },
                stats: RequestStats::default(),
                user_agent: user_agent(&config.terraform_version),
                no_cache: !config.disable_no_cache_header,
                log_requests: config.enable_logging,
            }),
        })
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn max_retries(&self) -> u32 {
        self.inner.retry_config.max_retries
    }

    /// Whether both handles point at the same cached client
    pub fn ptr_eq(&self, other: &ServiceClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub async fn connection_stats(&self) -> ConnectionStats {
        self.inner.stats.get_stats().await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.execute(Method::GET, path, Body::Empty).await?;
        parse_body(&text)
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let text = self.execute(Method::POST, path, Body::Json(to_json(body)?)).await?;
        parse_body(&text)
    }

    /// Execute a POST request whose response has no meaningful body
    pub async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.execute(Method::POST, path, Body::Json(to_json(body)?))
            .await
            .map(|_| ())
    }

    /// Execute a POST request with a plain-text body, e.g. a YAML definition
    pub async fn post_text<T: DeserializeOwned>(
        &self,
        path: &str,
        body: String,
    ) -> Result<T, ApiError> {
        let body = Body::Text {
            content_type: "text/plain",
            body,
        };
        let text = self.execute(Method::POST, path, body).await?;
        parse_body(&text)
    }

    /// Execute a PUT request with a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let text = self.execute(Method::PUT, path, Body::Json(to_json(body)?)).await?;
        parse_body(&text)
    }

    /// Execute a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, Body::Empty)
            .await
            .map(|_| ())
    }

    async fn execute(&self, method: Method, path: &str, body: Body) -> Result<String, ApiError> {
        let url = self.url(path);
        self.execute_with_retry(
            |token: String| {
                let mut request = self
                    .inner
                    .session
                    .http_client()
                    .request(method.clone(), &url)
                    .header("X-Auth-Token", token)
                    .header(ACCEPT, "application/json")
                    .header(USER_AGENT, &self.inner.user_agent);

                if self.inner.no_cache {
                    request = request.header(CACHE_CONTROL, "no-cache");
                }

                request = match &body {
                    Body::Empty => request,
                    Body::Json(value) => request.json(value),
                    Body::Text { content_type, body } => {
                        request.header(CONTENT_TYPE, *content_type).body(body.clone())
                    }
                };

                if self.inner.log_requests {
                    tracing::debug!("{} request to: {}", method, url);
                }

                request.send()
            },
            path,
        )
        .await
    }

    /// Execute request with retry logic. A 401 triggers one re-authentication
    /// and an immediate retry when allowed; it never counts as a retry.
    async fn execute_with_retry<F, Fut>(&self, request_fn: F, path: &str) -> Result<String, ApiError>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let session = &self.inner.session;
        let retry = &self.inner.retry_config;
        let mut token = session.token_id().await?;
        let mut attempt = 0;
        let mut reauthenticated = false;

        loop {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    retry.initial_backoff_ms.saturating_mul(2_u64.saturating_pow(attempt - 1)),
                    retry.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            let received = match request_fn(token.clone()).await {
                Ok(response) => {
                    let status = response.status();
                    response.text().await.map(|text| (status, text))
                }
                Err(e) => Err(e),
            };

            let error = match received {
                Ok((status, text)) => {
                    if self.inner.log_requests {
                        tracing::debug!("API response status: {}, body: {}", status, text);
                    }

                    if status.is_success() {
                        self.inner.stats.record_request(true).await;
                        return Ok(text);
                    }

                    self.inner.stats.record_request(false).await;

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        if session.allow_reauth() && !reauthenticated {
                            reauthenticated = true;
                            token = session.reauthenticate(&token).await?;
                            continue;
                        }
                        return Err(ApiError::Auth(format!(
                            "Request to {} was rejected with 401",
                            path
                        )));
                    }

                    ApiError::from_status(status, text)
                }
                Err(e) => {
                    self.inner.stats.record_request(false).await;
                    ApiError::Request(e)
                }
            };

            if !error.is_retryable() || attempt >= retry.max_retries {
                return Err(error);
            }

            tracing::warn!("Request to {} failed, will retry: {}", path, error);
            attempt += 1;
        }
    }
}

fn to_json<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::Parse(format!("Failed to encode request: {}", e)))
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    // Deletes and actions answer with an empty body; treat it as JSON null.
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str::<T>(text).map_err(|e| {
        tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
        ApiError::Parse(format!("Failed to parse response: {}", e))
    })
}
