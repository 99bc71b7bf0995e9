use reqwest::{Client, Method, Request};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::rate_limit::AdmissionGate;
use super::retry::RetryPolicy;
use crate::config::TransportConfig;
use crate::error::{ScoutError, TransportError};
use crate::models::HttpResponse;

pub struct HttpClient {
    client: Client,
    gate: AdmissionGate,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: &TransportConfig) -> Result<Self, ScoutError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(false)
            .build()
            .map_err(TransportError::from)?;

        let gate = AdmissionGate::per_second(config.rate_per_second)?;
        let retry = RetryPolicy::new(
            config.max_retries,
            Duration::from_millis(config.base_backoff_ms),
        );

        Ok(Self { client, gate, retry })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn build_request(&self, method: Method, url: &str) -> Result<Request, TransportError> {
        self.client
            .request(method, url)
            .build()
            .map_err(|e| TransportError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let request = self.build_request(Method::GET, url)?;
        self.execute(request).await
    }

    pub async fn execute(&self, request: Request) -> Result<HttpResponse, TransportError> {
        self.execute_with_cancel(request, &CancellationToken::new()).await
    }

    /// Sends `request`, retrying network failures and retryable statuses.
    ///
    /// Cancellation interrupts the admission wait and backoff sleeps but never
    /// an HTTP exchange already on the wire; that one completes or times out.
    pub async fn execute_with_cancel(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        let url = request.url().to_string();
        let attempts = self.retry.total_attempts();
        let mut last_error = TransportError::Cancelled;

        for attempt in 0..attempts {
            self.gate.acquire_or_cancel(cancel).await?;

            let req = request
                .try_clone()
                .ok_or(TransportError::UncloneableRequest)?;

            match self.attempt(req).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(url = %url, attempt = attempt + 1, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(err) => {
                    debug!(
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %err,
                        "Request attempt failed"
                    );
                    last_error = err;
                }
            }

            if attempt + 1 < attempts {
                let backoff = self.retry.backoff(attempt);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }

        warn!(url = %url, attempts = attempts, error = %last_error, "Retry budget exhausted");

        Err(TransportError::Exhausted {
            attempts,
            last: Box::new(last_error),
        })
    }

    async fn attempt(&self, request: Request) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();
        let response = self.client.execute(request).await?;

        let status = response.status();
        if RetryPolicy::is_retryable_status(status) {
            return Err(TransportError::RetryableStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(HttpResponse::capture(response, start).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TransportConfig {
        TransportConfig {
            rate_per_second: 100,
            max_retries: 1,
            base_backoff_ms: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_url_is_rejected_before_sending() {
        let client = HttpClient::new(&config()).unwrap();
        let result = client.build_request(Method::GET, "not a url");
        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));
    }

    #[test]
    fn test_zero_rate_is_a_config_error() {
        let cfg = TransportConfig {
            rate_per_second: 0,
            ..config()
        };
        assert!(matches!(HttpClient::new(&cfg), Err(ScoutError::Config(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let client = HttpClient::new(&config()).unwrap();
        let request = client.build_request(Method::GET, "http://127.0.0.1:9/").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.execute_with_cancel(request, &cancel).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }

    #[tokio::test]
    async fn test_connection_refused_exhausts_budget() {
        let client = HttpClient::new(&config()).unwrap();
        let result = client.get("http://127.0.0.1:9/").await;

        match result {
            Err(TransportError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, TransportError::Network(_)));
            }
            other => panic!("expected exhausted error, got {:?}", other.map(|r| r.status)),
        }
    }
}
