//! Rate-limited HTTP client
//!
//! Wraps outbound calls to the network API. The only transparently
//! retried condition is HTTP 429: the client waits a fixed interval and
//! tries again up to the attempt budget. Every other response or error
//! is returned to the caller untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::warn;

use crate::error::{Error, Result};

/// Decorates every outbound request before it is sent (auth headers etc).
///
/// Composed into the client at construction time; the client itself is
/// never mutated afterwards.
pub type RequestDecorator = Arc<dyn Fn(RequestBuilder) -> RequestBuilder + Send + Sync>;

/// Retry policy for rate-limit responses
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(30),
        }
    }
}

/// One attempt against the service: either a usable value or a
/// rate-limit signal that asks for another round.
pub enum Attempt<T> {
    Done(T),
    RateLimited,
}

/// Run `op` until it completes, waiting `policy.backoff` between
/// rate-limited attempts. Non-rate-limit errors propagate immediately.
pub async fn retry_on_rate_limit<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>>>,
{
    for attempt in 1..=policy.max_attempts {
        match op().await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::RateLimited => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    "rate limit hit, waiting {}s before retry",
                    policy.backoff.as_secs()
                );
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }

    Err(Error::RateLimitExceeded {
        attempts: policy.max_attempts,
    })
}

pub struct RateLimitedClient {
    client: Client,
    decorator: Option<RequestDecorator>,
    policy: RetryPolicy,
}

impl RateLimitedClient {
    pub fn new(policy: RetryPolicy, decorator: Option<RequestDecorator>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            decorator,
            policy,
        }
    }

    /// Decorator adding a bearer token to every request
    pub fn bearer_decorator(token: &str) -> RequestDecorator {
        let value = format!("Bearer {}", token);
        Arc::new(move |req: RequestBuilder| {
            req.header(reqwest::header::AUTHORIZATION, value.clone())
        })
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(self.client.get(url)).await
    }

    pub async fn post_json<B: serde::Serialize>(&self, url: &str, body: &B) -> Result<Response> {
        self.send(self.client.post(url).json(body)).await
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let req = match &self.decorator {
            Some(decorate) => decorate(req),
            None => req,
        };
        let req = &req;

        retry_on_rate_limit(self.policy, move || {
            let attempt = req.try_clone();
            async move {
                let attempt =
                    attempt.ok_or_else(|| Error::Network("request cannot be retried".into()))?;
                let response = attempt
                    .send()
                    .await
                    .map_err(|e| Error::Network(e.to_string()))?;
                if response.status() == StatusCode::TOO_MANY_REQUESTS {
                    Ok(Attempt::RateLimited)
                } else {
                    Ok(Attempt::Done(response))
                }
            }
        })
        .await
    }
}
