use std::sync::Arc;
use tracing::debug;

use super::context::CallContext;
use super::messages::{ControllerRef, WeakControllerRef};
use crate::adapters::MediaResourceBroker;
use crate::config::ControllerConfig;
use crate::errors::{ControllerError, Result};
use crate::observers::{ControllerStateChanged, ObserverEvent, ObserverRegistry};
use crate::recording::RecordingCoordinator;
use crate::types::{ControllerId, ControllerState, MediaSessionInfo};

/// Everything a controller owns besides its state machine; the state
/// table's actions run against it
#[derive(Debug)]
pub(crate) struct CallSession {
    pub id: ControllerId,
    pub self_ref: WeakControllerRef,
    pub broker: Arc<dyn MediaResourceBroker>,
    pub config: ControllerConfig,
    pub context: CallContext,
    pub observers: Arc<ObserverRegistry>,
    pub recorder: RecordingCoordinator,
}

impl CallSession {
    /// Address to hand to collaborators for their answers
    pub fn self_ref(&self) -> Result<ControllerRef> {
        self.self_ref.upgrade().ok_or(ControllerError::Detached)
    }

    pub fn broadcast(&self, state: ControllerState, session_info: Option<MediaSessionInfo>) {
        debug!(
            "Controller {} broadcasting {:?} to {} observers",
            self.id,
            state,
            self.observers.len()
        );
        self.observers
            .broadcast(ObserverEvent::StateChanged(ControllerStateChanged {
                controller: self.id.clone(),
                state,
                session_info,
            }));
    }
}
