use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::model::Slot;

/// One completion call: a prompt plus its sampling parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Labels the call in logs; never sent to the backend.
    pub slot: Slot,
    pub prompt: String,
    pub temperature: f64,
    pub nucleus_p: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u64,
}

/// The generative text service. Each `invoke` issues exactly one request.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; 1 disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Retries rate-limit and timeout failures with exponential backoff.
pub struct RetryingBackend<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: Backend> RetryingBackend<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<B: Backend> Backend for RetryingBackend<B> {
    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, BackendError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.invoke(request).await {
                Ok(completion) => return Ok(completion),
                Err(err) if err.kind.is_retryable() && attempt < attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        slot = %request.slot,
                        kind = %err.kind,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "backend call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
