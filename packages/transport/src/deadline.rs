//! Optional deadline policy layered over any [`Transport`].
//!
//! The query engine itself never times out a request. Callers that want a
//! bound wrap their transport in [`DeadlineTransport`]; once the deadline
//! passes the call is reported as a network failure without waiting for the
//! underlying request to finish.

use std::time::Duration;

use asrs_query_models::ParamSet;
use async_trait::async_trait;

use crate::{Transport, TransportError};

/// Fails requests that take longer than a fixed deadline.
#[derive(Debug, Clone)]
pub struct DeadlineTransport<T> {
    inner: T,
    deadline: Duration,
}

impl<T> DeadlineTransport<T> {
    /// Wraps `inner` with `deadline`.
    #[must_use]
    pub const fn new(inner: T, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    /// The configured deadline.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }
}

#[async_trait]
impl<T: Transport> Transport for DeadlineTransport<T> {
    async fn execute(
        &self,
        path: &str,
        params: &ParamSet,
    ) -> Result<serde_json::Value, TransportError> {
        match tokio::time::timeout(self.deadline, self.inner.execute(path, params)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("{path}: deadline of {:?} exceeded", self.deadline);
                Err(TransportError::Network {
                    message: format!("deadline of {} ms exceeded", self.deadline.as_millis()),
                })
            }
        }
    }
}
