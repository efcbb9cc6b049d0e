use tokio::time::{Duration, sleep};

use super::error::TransportError;

/// Retry policy applied to timed out requests.
///
/// Fixed delay, fixed bound. No backoff growth, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Pause between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}

/// A single HTTP GET, no retries.
///
/// Implementations must classify timeouts as `TransportError::Timeout`
/// and every other failure as `TransportError::Request`.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// Read-only access to the remote API.
///
/// `url` is fully formed, the credential already interpolated.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        (**self).get(url).await
    }
}

// ------------------------------------------------------------
// reqwest client
// ------------------------------------------------------------
//
// The body is returned whatever the status code: the API reports
// application errors inside the JSON envelope, not via HTTP status.
//
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client whose per-request timeout drives the
    /// timeout classification used for retries.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("spacetraders-inventory/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().await?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

// ------------------------------------------------------------
// Retrying transport
// ------------------------------------------------------------

/// Wraps an `HttpClient` with the bounded timeout retry.
///
/// Behavior:
/// - success: body returned at once
/// - timeout: sleep `delay`, try again, up to `max_attempts` in total
/// - any other error: returned at once, no sleep
/// - bound reached: `TransportError::ExhaustedRetries`
pub struct RetryingTransport<C> {
    client: C,
    policy: RetryPolicy,
}

impl<C: HttpClient> RetryingTransport<C> {
    pub fn new(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }
}

#[async_trait::async_trait]
impl<C: HttpClient> Transport for RetryingTransport<C> {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let mut attempt = 0;

        while attempt < self.policy.max_attempts {
            attempt += 1;

            match self.client.fetch(url).await {
                Ok(body) => return Ok(body),

                Err(e) if e.is_timeout() => {
                    log::warn!(
                        "request timed out (attempt {}/{}): {}",
                        attempt,
                        self.policy.max_attempts,
                        e
                    );

                    if attempt < self.policy.max_attempts {
                        sleep(self.policy.delay).await;
                    }
                }

                Err(e) => return Err(e),
            }
        }

        Err(TransportError::ExhaustedRetries { attempts: attempt })
    }
}
