//! Connection resolution
//!
//! `ConnectionResolver` turns a [`ConnectionConfig`] into a live connection,
//! retrying refused attempts with linear backoff:
//! - the wait after failure `k` (0-indexed) is `base_delay × (k + 1)`
//! - after `max_retries` retries beyond the first failure the resolver gives
//!   up with [`ConnectionError::RetriesExhausted`]
//!
//! The cap keeps startup from hanging forever when the broker is gone for
//! good; restarting the process is left to whatever supervises it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::ConnectionConfig;
use crate::transport::{BrokerConnector, ConnectionPtr};
use crate::utils::error::ConnectionError;

pub const CONNECT_RETRY_SECONDS: u64 = 10;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(CONNECT_RETRY_SECONDS),
            max_retries: MAX_RETRY_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed attempt numbered `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Attempting { attempt: u32 },
    Connected,
    Failed { attempts: u32 },
}

impl ResolverState {
    pub fn initial() -> Self {
        Self::Attempting { attempt: 0 }
    }

    pub fn on_success(self) -> Self {
        match self {
            Self::Attempting { .. } => Self::Connected,
            terminal => terminal,
        }
    }

    /// Transition taken once the backoff wait for a failed attempt is over.
    pub fn on_failure(self, policy: &RetryPolicy) -> Self {
        match self {
            Self::Attempting { attempt } => {
                let next = attempt + 1;
                if next > policy.max_retries {
                    Self::Failed { attempts: next }
                } else {
                    Self::Attempting { attempt: next }
                }
            }
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Attempting { .. })
    }
}

/// Suspends the resolver between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Clone)]
pub struct ConnectionResolver {
    connector: Arc<dyn BrokerConnector>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl ConnectionResolver {
    pub fn new(connector: Arc<dyn BrokerConnector>) -> Self {
        Self {
            connector,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn resolve(
        &self,
        config: &ConnectionConfig,
    ) -> Result<ConnectionPtr, ConnectionError> {
        let uri = config.uri();
        let mut state = ResolverState::initial();
        let mut connection = None;

        while let ResolverState::Attempting { attempt } = state {
            match self.connector.connect(&uri).await {
                Ok(established) => {
                    info!(
                        "Connected to AMQP broker at {}:{} after {} failed attempts",
                        config.hostname, config.port, attempt
                    );
                    connection = Some(established);
                    state = state.on_success();
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempt);
                    error!(
                        "Failed to connect to AMQP broker at {}:{}: {}. Retrying in {} seconds...",
                        config.hostname,
                        config.port,
                        e,
                        delay.as_secs()
                    );
                    self.sleeper.sleep(delay).await;
                    state = state.on_failure(&self.policy);
                }
            }
        }

        match (state, connection) {
            (ResolverState::Connected, Some(connection)) => Ok(connection),
            (ResolverState::Failed { attempts }, _) => {
                Err(ConnectionError::RetriesExhausted { attempts })
            }
            _ => Err(ConnectionError::RetriesExhausted {
                attempts: self.policy.max_retries + 1,
            }),
        }
    }
}
