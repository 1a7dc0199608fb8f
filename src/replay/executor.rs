//! Installed executor
//!
//! The minimal executor the mediator deploys into a target environment when
//! no zero-injection bridge exists. It receives prepared requests over a
//! command channel, performs the network call with the target's ambient
//! credentials (retrying once without them on a transport failure), and
//! signals completion through a single-shot channel keyed exactly to the
//! request's correlation id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::mediator::PreparedRequest;
use crate::error::ReplayError;
use crate::http::ReplayResponse;

/// Completion payload for one dispatched request.
pub type ExecutorOutcome = Result<ReplayResponse, ReplayError>;

/// Map from correlation id to the single pending waiter for that id. An id
/// is resolved at most once: the waiter is removed when it fires, and a
/// completion arriving after teardown finds no entry and is dropped.
#[derive(Default)]
pub(crate) struct CorrelationTable {
    waiters: Mutex<HashMap<Uuid, oneshot::Sender<ExecutorOutcome>>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sole listener for an id.
    pub fn register(&self, id: Uuid) -> oneshot::Receiver<ExecutorOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(id, tx);
        rx
    }

    /// Deliver a completion. Returns false when no listener remains (the
    /// waiter timed out and was torn down).
    pub fn resolve(&self, id: Uuid, outcome: ExecutorOutcome) -> bool {
        match self.waiters.lock().remove(&id) {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Tear down a pending listener on timeout.
    pub fn remove(&self, id: Uuid) -> bool {
        self.waiters.lock().remove(&id).is_some()
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.waiters.lock().len()
    }
}

struct ExecutorCommand {
    correlation_id: Uuid,
    request: PreparedRequest,
}

/// Handle to an installed executor's command channel.
#[derive(Clone)]
pub struct ExecutorHandle {
    commands: mpsc::Sender<ExecutorCommand>,
}

impl ExecutorHandle {
    /// Hand a prepared request to the executor. Failure here means the
    /// executor is gone, which is a dispatch failure, not a network one.
    pub(crate) async fn dispatch(
        &self,
        correlation_id: Uuid,
        request: PreparedRequest,
    ) -> Result<(), ReplayError> {
        self.commands
            .send(ExecutorCommand {
                correlation_id,
                request,
            })
            .await
            .map_err(|_| ReplayError::Dispatch("executor channel closed".to_string()))
    }
}

/// Install the executor into the target environment. Called exactly once per
/// target by the mediator's install guard.
pub(crate) fn install(table: Arc<CorrelationTable>) -> Result<ExecutorHandle, ReplayError> {
    let credentialed = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .map_err(|e| ReplayError::Dispatch(format!("executor install failed: {}", e)))?;
    let anonymous = reqwest::Client::new();

    let (tx, mut rx) = mpsc::channel::<ExecutorCommand>(16);

    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            let outcome = perform(&credentialed, &anonymous, &command.request).await;
            if !table.resolve(command.correlation_id, outcome) {
                tracing::debug!(
                    correlation_id = %command.correlation_id,
                    "Completion arrived after waiter teardown, dropping"
                );
            }
        }
        tracing::debug!("Executor channel closed, task exiting");
    });

    Ok(ExecutorHandle { commands: tx })
}

/// Perform the network call: ambient credentials first, then once without
/// them on a transport failure. Whichever attempt succeeds determines the
/// response.
async fn perform(
    credentialed: &reqwest::Client,
    anonymous: &reqwest::Client,
    request: &PreparedRequest,
) -> ExecutorOutcome {
    match send(credentialed, request).await {
        Ok(response) => Ok(response),
        Err(first) => {
            tracing::debug!(error = %first, "Credentialed attempt failed, retrying without credentials");
            send(anonymous, request)
                .await
                .map_err(|second| ReplayError::Network(format!("{}; retry: {}", first, second)))
        }
    }
}

async fn send(client: &reqwest::Client, request: &PreparedRequest) -> Result<ReplayResponse, String> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .map_err(|_| format!("invalid method {}", request.method))?;

    let mut builder = client.request(method, request.url.clone());
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }

    let response = builder.send().await.map_err(|e| e.to_string())?;

    let status = response.status().as_u16();
    let status_text = response
        .status()
        .canonical_reason()
        .unwrap_or("")
        .to_string();
    let final_url = response.url().to_string();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = response.text().await.map_err(|e| e.to_string())?;

    Ok(ReplayResponse {
        status,
        status_text,
        headers,
        body,
        final_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> ReplayResponse {
        ReplayResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: Default::default(),
            body: String::new(),
            final_url: "https://example.com/".to_string(),
        }
    }

    #[tokio::test]
    async fn test_correlation_resolved_exactly_once() {
        let table = CorrelationTable::new();
        let id = Uuid::new_v4();

        let rx = table.register(id);
        assert!(table.resolve(id, Ok(response())));
        // The same id can never fire a second time
        assert!(!table.resolve(id, Ok(response())));

        assert!(rx.await.unwrap().is_ok());
        assert_eq!(table.pending(), 0);
    }

    #[tokio::test]
    async fn test_late_completion_after_teardown_is_dropped() {
        let table = CorrelationTable::new();
        let id = Uuid::new_v4();

        let rx = table.register(id);
        // Timeout path: listener torn down before any completion
        assert!(table.remove(id));
        drop(rx);

        assert!(!table.resolve(id, Ok(response())));
    }

    #[tokio::test]
    async fn test_distinct_ids_do_not_cross_resolve() {
        let table = CorrelationTable::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let rx_a = table.register(a);
        let _rx_b = table.register(b);

        table.resolve(a, Ok(response()));
        assert!(rx_a.await.is_ok());
        assert_eq!(table.pending(), 1);
    }
}
