use exlink_core::{ExLinkError, Operation, Result};
use reqwest::{Client, Method, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::rate_limiter::RateLimiter;
use crate::signer::{FormBody, RequestSigner};
use crate::traits::ExchangeConfig;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub operation: Operation,
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(operation: Operation, method: Method, url: Url) -> Self {
        Self {
            operation,
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(operation: Operation, url: Url) -> Self {
        Self::new(operation, Method::GET, url)
    }

    pub fn post(operation: Operation, url: Url) -> Self {
        Self::new(operation, Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Sends requests through the shared rate limiter and maps every failure to
/// an [`ExLinkError`] carrying the operation. Never retries.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    cancel: Option<CancellationToken>,
}

impl HttpDispatcher {
    pub fn new(request_timeout: Duration, rate_limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ExLinkError::InvalidRequest(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rate_limiter,
            cancel: None,
        })
    }

    pub fn from_config<C: ExchangeConfig>(config: &C) -> Result<Self> {
        Self::new(
            Duration::from_millis(config.request_timeout_ms()),
            Arc::new(RateLimiter::new(&config.rate_limit())),
        )
    }

    /// Ties every request sent through this dispatcher to `token`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub async fn send(&self, request: HttpRequest) -> Result<Vec<u8>> {
        let operation = request.operation;

        match &self.cancel {
            None => {
                self.rate_limiter.acquire(operation.channel()).await;
                self.execute(request).await
            }
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("{} cancelled while waiting for the rate limiter", operation);
                        return Err(ExLinkError::Cancelled { operation });
                    }
                    _ = self.rate_limiter.acquire(operation.channel()) => {}
                }

                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        if operation.is_idempotent() {
                            Err(ExLinkError::Cancelled { operation })
                        } else {
                            warn!("{} cancelled in flight, venue-side outcome unknown", operation);
                            Err(ExLinkError::OutcomeUnknown { operation })
                        }
                    }
                    result = self.execute(request) => result,
                }
            }
        }
    }

    /// Sends `form` as a signed `application/x-www-form-urlencoded` body.
    pub async fn send_signed(
        &self,
        request: HttpRequest,
        signer: &dyn RequestSigner,
        form: &FormBody,
    ) -> Result<Vec<u8>> {
        let body = form.encode();
        let signature = signer.sign(body.as_bytes())?;

        let request = request
            .header("Content-Type", FORM_CONTENT_TYPE)
            .header(signer.api_key_header(), signer.api_key())
            .header(signer.signature_header(), signature)
            .body(body);

        self.send(request).await
    }

    async fn execute(&self, request: HttpRequest) -> Result<Vec<u8>> {
        let operation = request.operation;
        debug!("Making {} request to: {} ({})", request.method, request.url, operation);

        let response = self
            .build(request)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        debug!("Response status: {}", status);

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, e))?;

        if !status.is_success() {
            return Err(ExLinkError::HttpStatus {
                operation,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }

    fn build(&self, request: HttpRequest) -> RequestBuilder {
        let mut builder = self.client.request(request.method, request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder
    }
}

fn transport_error(operation: Operation, err: reqwest::Error) -> ExLinkError {
    if err.is_timeout() {
        ExLinkError::Timeout { operation }
    } else {
        ExLinkError::Transport {
            operation,
            source: err,
        }
    }
}

/// Joins `base` with path segments (each may itself contain `/`) and appends
/// the query pairs in order.
pub fn build_url(base: &str, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| ExLinkError::InvalidRequest(format!("Invalid URL {}: {}", base, e)))?;

    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| ExLinkError::InvalidRequest(format!("URL cannot be a base: {}", base)))?;
        path.pop_if_empty();
        for segment in segments {
            path.extend(segment.split('/').filter(|part| !part.is_empty()));
        }
    }

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}
