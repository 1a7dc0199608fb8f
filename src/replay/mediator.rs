//! Target mediator
//!
//! Bound 1:1 to a target environment. Picks an execution pathway once and
//! caches it: a zero-injection bridge into the target's credential context
//! when the target exposes one, otherwise a one-time installed executor
//! reached over the correlation channel. Enforces the wall-clock timeout by
//! tearing down the pending waiter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use url::Url;
use uuid::Uuid;

use super::executor::{self, CorrelationTable, ExecutorHandle};
use super::{sanitize_headers, ReplayExecutor, ReplayState};
use crate::app::ReplayConfig;
use crate::error::ReplayError;
use crate::http::{HeaderMap, ReplayRequestDescriptor, ReplayResponse};

/// A fully resolved request, past URL normalization and header hygiene,
/// ready to cross the trust boundary.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: String,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Errors a bridge may raise.
#[derive(Debug)]
pub enum BridgeError {
    /// The bridge cannot operate across this isolation boundary; the
    /// mediator falls back to the installed executor.
    Isolation(String),
    /// Transport-level failure inside the bridge.
    Network(String),
}

/// Zero-injection execution primitive: runs a request already inside the
/// target's trust/credential context without deploying new code.
#[async_trait]
pub trait ExecutionBridge: Send + Sync {
    async fn execute(&self, request: PreparedRequest) -> Result<ReplayResponse, BridgeError>;
}

/// Reference to a target execution environment.
pub struct TargetHandle {
    /// The target's current location; relative replay URLs resolve against it
    pub location: Url,

    /// Optional zero-injection bridge
    pub bridge: Option<Arc<dyn ExecutionBridge>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pathway {
    DirectBridge,
    InstalledExecutor,
}

/// Mediates request execution for one target.
pub struct TargetMediator {
    target: TargetHandle,
    timeout: Duration,
    timeout_ms: u64,
    pathway: Mutex<Option<Pathway>>,
    executor: OnceCell<ExecutorHandle>,
    correlations: Arc<CorrelationTable>,
    states: Mutex<std::collections::HashMap<Uuid, ReplayState>>,
}

impl TargetMediator {
    pub fn new(target: TargetHandle, config: &ReplayConfig) -> Self {
        Self {
            target,
            timeout: Duration::from_millis(config.timeout_ms),
            timeout_ms: config.timeout_ms,
            pathway: Mutex::new(None),
            executor: OnceCell::new(),
            correlations: Arc::new(CorrelationTable::new()),
            states: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Last recorded lifecycle state for a correlation id.
    pub fn state_of(&self, correlation_id: Uuid) -> Option<ReplayState> {
        self.states.lock().get(&correlation_id).copied()
    }

    fn record(&self, correlation_id: Uuid, state: ReplayState) {
        self.states.lock().insert(correlation_id, state);
    }

    /// Resolve the descriptor's URL against the target's own location and
    /// strip forbidden headers.
    fn prepare(&self, descriptor: &ReplayRequestDescriptor) -> Result<PreparedRequest, ReplayError> {
        let url = self
            .target
            .location
            .join(&descriptor.url)
            .map_err(|e| ReplayError::Parse(format!("{}: {}", descriptor.url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReplayError::Parse(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        Ok(PreparedRequest {
            method: descriptor.method.clone(),
            url,
            headers: sanitize_headers(&descriptor.headers),
            body: descriptor.body.clone(),
        })
    }

    /// Execute over the installed-executor pathway, installing it on first
    /// use. The correlation waiter is registered before dispatch and torn
    /// down on timeout; a completion landing afterwards finds no listener.
    async fn execute_installed(
        &self,
        correlation_id: Uuid,
        request: PreparedRequest,
    ) -> Result<ReplayResponse, ReplayError> {
        let table = Arc::clone(&self.correlations);
        let handle = self
            .executor
            .get_or_try_init(|| async { executor::install(table) })
            .await?
            .clone();

        let waiter = self.correlations.register(correlation_id);
        if let Err(e) = handle.dispatch(correlation_id, request).await {
            self.correlations.remove(correlation_id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, waiter).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                // Sender dropped without resolving: executor died mid-flight
                Err(ReplayError::Dispatch("executor went away".to_string()))
            }
            Err(_) => {
                self.correlations.remove(correlation_id);
                Err(ReplayError::Timeout(self.timeout_ms))
            }
        }
    }

    async fn execute_inner(
        &self,
        descriptor: &ReplayRequestDescriptor,
    ) -> Result<ReplayResponse, ReplayError> {
        let request = self.prepare(descriptor)?;
        self.record(descriptor.correlation_id, ReplayState::Dispatched);

        let cached = *self.pathway.lock();
        let pathway = match cached {
            Some(p) => p,
            None => {
                let chosen = if self.target.bridge.is_some() {
                    Pathway::DirectBridge
                } else {
                    Pathway::InstalledExecutor
                };
                *self.pathway.lock() = Some(chosen);
                chosen
            }
        };

        if pathway == Pathway::DirectBridge {
            let bridge = self
                .target
                .bridge
                .as_ref()
                .ok_or_else(|| ReplayError::Dispatch("bridge disappeared".to_string()))?;

            let attempt = tokio::time::timeout(self.timeout, bridge.execute(request.clone())).await;
            match attempt {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(BridgeError::Network(e))) => return Err(ReplayError::Network(e)),
                Ok(Err(BridgeError::Isolation(e))) => {
                    // The bridge cannot reach this target's context; switch
                    // pathways permanently for the target's lifetime.
                    tracing::debug!(error = %e, "Bridge isolation error, falling back to installed executor");
                    *self.pathway.lock() = Some(Pathway::InstalledExecutor);
                }
                Err(_) => return Err(ReplayError::Timeout(self.timeout_ms)),
            }
        }

        self.execute_installed(descriptor.correlation_id, request).await
    }
}

#[async_trait]
impl ReplayExecutor for TargetMediator {
    async fn execute(
        &self,
        descriptor: &ReplayRequestDescriptor,
    ) -> Result<ReplayResponse, ReplayError> {
        self.record(descriptor.correlation_id, ReplayState::Created);
        let result = self.execute_inner(descriptor).await;

        let state = match &result {
            Ok(_) => ReplayState::Resolved,
            Err(ReplayError::Timeout(_)) => ReplayState::TimedOut,
            Err(_) => ReplayState::Failed,
        };
        self.record(descriptor.correlation_id, state);

        result
    }
}
