//! Call controller
//!
//! One [`CallController`] drives the media path of one call. It owns a
//! state machine over the call controller state table and a [`CallSession`]
//! holding the call's context, and processes the messages of its inbox one
//! at a time. Collaborators answer by sending messages back to the
//! controller's [`ControllerRef`], so no handler ever waits for the gateway.

mod context;
mod handlers;
pub mod messages;
pub(crate) mod session;

pub use context::ContextSnapshot;
pub use messages::{
    CallNotification, CallerRef, ConnectionStateChanged, ControllerMessage, ControllerRef,
    CreateMediaSession, EndpointStateChanged, GatewayResponse, Join, LinkStateChanged,
    MediaGroupStateChanged, StartRecording, StopRecording,
};

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::adapters::MediaResourceBroker;
use crate::config::ControllerConfig;
use crate::errors::Result;
use crate::observers::ObserverRegistry;
use crate::recording::{AudioDurationProbe, RecordingCoordinator, WavDurationProbe};
use crate::state_machine::StateMachine;
use crate::state_table::{Action, MASTER_TABLE};
use crate::types::{CallState, ControllerId, ResourceRef};
use context::CallContext;
use session::CallSession;

pub struct CallController {
    id: ControllerId,
    fsm: StateMachine<CallState, Action>,
    session: CallSession,
    inbox: mpsc::UnboundedReceiver<ControllerMessage>,
}

impl CallController {
    /// Create a controller in `Uninitialized` together with its address.
    ///
    /// The controller only holds a weak reference to its own inbox: once
    /// every [`ControllerRef`] is dropped, [`CallController::run`] returns.
    pub fn new(broker: Arc<dyn MediaResourceBroker>, config: ControllerConfig) -> (Self, ControllerRef) {
        Self::with_probe(broker, config, Arc::new(WavDurationProbe::new()))
    }

    /// Same as [`CallController::new`] with a custom recording duration probe
    pub fn with_probe(
        broker: Arc<dyn MediaResourceBroker>,
        config: ControllerConfig,
        probe: Arc<dyn AudioDurationProbe>,
    ) -> (Self, ControllerRef) {
        let id = ControllerId::new();
        let (tx, inbox) = mpsc::unbounded_channel();
        let observers = Arc::new(ObserverRegistry::new());
        let address = ControllerRef::new(id.clone(), tx, Arc::clone(&observers));

        let session = CallSession {
            id: id.clone(),
            self_ref: address.downgrade(),
            broker,
            recorder: RecordingCoordinator::new(&config, probe),
            config,
            context: CallContext::default(),
            observers,
        };

        let controller = Self {
            id,
            fsm: StateMachine::new(CallState::Uninitialized, Arc::clone(&MASTER_TABLE)),
            session,
            inbox,
        };
        debug!("Created call controller {}", controller.id);
        (controller, address)
    }

    /// Create a controller and run it on its own task
    pub fn spawn(broker: Arc<dyn MediaResourceBroker>, config: ControllerConfig) -> (ControllerRef, JoinHandle<()>) {
        let (controller, address) = Self::new(broker, config);
        let handle = tokio::spawn(controller.run());
        (address, handle)
    }

    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    pub fn state(&self) -> CallState {
        self.fsm.state()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.session.config
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        self.session.context.snapshot(
            self.fsm.state(),
            self.session.recorder.is_recording(),
            self.session.recorder.is_collecting(),
        )
    }

    /// Handle every message already waiting in the inbox, stopping at the
    /// first error. Returns how many messages were handled.
    pub async fn drain_inbox(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Ok(message) = self.inbox.try_recv() {
            self.handle(message).await?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Process messages until `Shutdown` arrives or every address is gone,
    /// then release whatever is still held.
    pub async fn run(mut self) {
        info!("Call controller {} started", self.id);

        while let Some(message) = self.inbox.recv().await {
            if matches!(message, ControllerMessage::Shutdown) {
                info!("Call controller {} shutting down", self.id);
                break;
            }
            let kind = message.kind();
            if let Err(e) = self.handle(message).await {
                error!(
                    "Call controller {} failed to handle {} in {:?}: {}",
                    self.id,
                    kind,
                    self.fsm.state(),
                    e
                );
            }
        }

        self.cleanup().await;
        info!("Call controller {} stopped in {:?}", self.id, self.fsm.state());
    }

    /// Release every resource the controller still holds
    pub async fn cleanup(&mut self) {
        info!("De-activating call controller {}", self.id);
        let context = &mut self.session.context;

        if let Some(group) = context.media_group.take() {
            if let Err(e) = group.stop_observing(&self.id).await {
                warn!("Failed to stop observing media group {}: {}", group.id(), e);
            }
            if let Err(e) = group.stop().await {
                warn!("Failed to stop media group {}: {}", group.id(), e);
            }
            if let Err(e) = group.destroy().await {
                warn!("Failed to destroy media group {}: {}", group.id(), e);
            }
        }

        context.connection = None;
        context.link = None;
        context.link_endpoint = None;
        context.link_mode = None;

        if let Some(endpoint) = context.bridge_endpoint.take() {
            if let Some(gateway) = context.gateway.as_ref() {
                info!("Call controller {} destroying bridge endpoint {}", self.id, endpoint);
                if let Err(e) = gateway
                    .stop_observing(ResourceRef::Endpoint(endpoint.clone()), &self.id)
                    .await
                {
                    warn!("Failed to stop observing endpoint {}: {}", endpoint, e);
                }
                if let Err(e) = gateway.destroy_endpoint(&endpoint).await {
                    warn!("Failed to destroy endpoint {}: {}", endpoint, e);
                }
            }
        }

        context.bridge_partner = None;
        self.session.observers.clear();
    }
}
