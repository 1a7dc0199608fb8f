//! Replay controller
//!
//! Privileged owner of per-target session state: captured endpoints and the
//! mediator bound to each target. All mutation goes through the controller's
//! own methods; other components only receive read-only snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use super::mediator::{TargetHandle, TargetMediator};
use super::ReplayExecutor;
use crate::app::ReplayConfig;
use crate::error::ReplayError;
use crate::http::{ReplayRequestDescriptor, ReplayResponse, RequestEdits};

/// Opaque target/session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(Uuid);

struct TargetState {
    mediator: Arc<TargetMediator>,
    captured: Vec<ReplayRequestDescriptor>,
}

/// Arena of attached targets, keyed by target id.
pub struct ReplayController {
    config: ReplayConfig,
    targets: RwLock<HashMap<TargetId, TargetState>>,
}

impl ReplayController {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            targets: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a target environment, creating its 1:1 mediator.
    pub fn register_target(&self, handle: TargetHandle) -> TargetId {
        let id = TargetId(Uuid::new_v4());
        let mediator = Arc::new(TargetMediator::new(handle, &self.config));

        self.targets.write().insert(
            id,
            TargetState {
                mediator,
                captured: Vec::new(),
            },
        );
        id
    }

    pub fn detach_target(&self, id: TargetId) {
        self.targets.write().remove(&id);
    }

    /// Record an observed network call against its target.
    pub fn capture_endpoint(&self, id: TargetId, descriptor: ReplayRequestDescriptor) {
        if let Some(state) = self.targets.write().get_mut(&id) {
            state.captured.push(descriptor);
        }
    }

    /// Read-only snapshot of a target's captured endpoints.
    pub fn captured_endpoints(&self, id: TargetId) -> Vec<ReplayRequestDescriptor> {
        self.targets
            .read()
            .get(&id)
            .map(|state| state.captured.clone())
            .unwrap_or_default()
    }

    /// The mediator bound to a target, for probe runs.
    pub fn mediator(&self, id: TargetId) -> Option<Arc<TargetMediator>> {
        self.targets.read().get(&id).map(|s| Arc::clone(&s.mediator))
    }

    /// Replay one descriptor inside its target's credential context, after
    /// applying any user edits.
    pub async fn replay(
        &self,
        id: TargetId,
        descriptor: &ReplayRequestDescriptor,
        edits: Option<&RequestEdits>,
    ) -> Result<ReplayResponse, ReplayError> {
        let mediator = self
            .mediator(id)
            .ok_or_else(|| ReplayError::Parse(format!("unknown target {:?}", id)))?;

        let descriptor = match edits {
            Some(edits) => descriptor.edited(edits),
            None => descriptor.clone(),
        };

        mediator.execute(&descriptor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn handle() -> TargetHandle {
        TargetHandle {
            location: Url::parse("https://app.example.com/").unwrap(),
            bridge: None,
        }
    }

    #[test]
    fn test_capture_and_snapshot() {
        let controller = ReplayController::new(ReplayConfig::default());
        let id = controller.register_target(handle());

        controller.capture_endpoint(id, ReplayRequestDescriptor::new("GET", "/api/users"));
        controller.capture_endpoint(id, ReplayRequestDescriptor::new("POST", "/api/orders"));

        let snapshot = controller.captured_endpoints(id);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].method, "GET");
    }

    #[test]
    fn test_targets_are_independent() {
        let controller = ReplayController::new(ReplayConfig::default());
        let a = controller.register_target(handle());
        let b = controller.register_target(handle());

        controller.capture_endpoint(a, ReplayRequestDescriptor::new("GET", "/a"));

        assert_eq!(controller.captured_endpoints(a).len(), 1);
        assert!(controller.captured_endpoints(b).is_empty());
    }

    #[tokio::test]
    async fn test_replay_against_unknown_target_is_parse_error() {
        let controller = ReplayController::new(ReplayConfig::default());
        let ghost = TargetId(Uuid::new_v4());

        let err = controller
            .replay(ghost, &ReplayRequestDescriptor::new("GET", "/x"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "PARSE_ERROR");
    }

    #[test]
    fn test_detach_removes_state() {
        let controller = ReplayController::new(ReplayConfig::default());
        let id = controller.register_target(handle());
        controller.detach_target(id);
        assert!(controller.captured_endpoints(id).is_empty());
    }
}
