//! Inbox messages and addresses of a call controller

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::adapters::MediaGateway;
use crate::config::RuntimeSettings;
use crate::errors::{ControllerError, Result};
use crate::observers::{Observer, ObserverRegistry};
use crate::recording::RecordingStore;
use crate::types::{
    AccountId, CallId, Collect, ConnectionId, ConnectionIdentifier, ConnectionMode,
    ConnectionState, ControllerId, EndpointId, EndpointState, GatewayInfo, LinkId, LinkState,
    MediaGroupState, MediaSessionId, ObserverId, Play, Record, RecordingId, Stop,
};

/// Everything a controller can find in its inbox
#[derive(Debug)]
pub enum ControllerMessage {
    // Observer management
    Observe(Observer),
    StopObserving(ObserverId),

    // Lifecycle commands from the owning call
    CreateMediaSession(CreateMediaSession),
    CloseMediaSession,
    UpdateMediaSession { remote_sdp: String },
    JoinBridge(Join),
    JoinConference(Join),
    Leave,
    Mute,
    Unmute,

    // Media operations
    StartRecording(StartRecording),
    StopRecording(StopRecording),
    Stop(Stop),
    StopMediaGroup,
    Record(Record),
    Play(Play),
    Collect(Collect),

    // Collaborator events
    MediaGatewayAcquired(Arc<dyn MediaGateway>),
    GatewayResponse(GatewayResponse),
    ConnectionStateChanged(ConnectionStateChanged),
    LinkStateChanged(LinkStateChanged),
    EndpointStateChanged(EndpointStateChanged),
    MediaGroupStateChanged(MediaGroupStateChanged),

    /// Stop the message loop and release every resource
    Shutdown,
}

impl ControllerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ControllerMessage::Observe(_) => "Observe",
            ControllerMessage::StopObserving(_) => "StopObserving",
            ControllerMessage::CreateMediaSession(_) => "CreateMediaSession",
            ControllerMessage::CloseMediaSession => "CloseMediaSession",
            ControllerMessage::UpdateMediaSession { .. } => "UpdateMediaSession",
            ControllerMessage::JoinBridge(_) => "JoinBridge",
            ControllerMessage::JoinConference(_) => "JoinConference",
            ControllerMessage::Leave => "Leave",
            ControllerMessage::Mute => "Mute",
            ControllerMessage::Unmute => "Unmute",
            ControllerMessage::StartRecording(_) => "StartRecording",
            ControllerMessage::StopRecording(_) => "StopRecording",
            ControllerMessage::Stop(_) => "Stop",
            ControllerMessage::StopMediaGroup => "StopMediaGroup",
            ControllerMessage::Record(_) => "Record",
            ControllerMessage::Play(_) => "Play",
            ControllerMessage::Collect(_) => "Collect",
            ControllerMessage::MediaGatewayAcquired(_) => "MediaGatewayAcquired",
            ControllerMessage::GatewayResponse(_) => "GatewayResponse",
            ControllerMessage::ConnectionStateChanged(_) => "ConnectionStateChanged",
            ControllerMessage::LinkStateChanged(_) => "LinkStateChanged",
            ControllerMessage::EndpointStateChanged(_) => "EndpointStateChanged",
            ControllerMessage::MediaGroupStateChanged(_) => "MediaGroupStateChanged",
            ControllerMessage::Shutdown => "Shutdown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMediaSession {
    pub connection_mode: ConnectionMode,
    pub outbound: bool,
    pub remote_sdp: String,
    pub webrtc: bool,
    pub call_id: Option<CallId>,
    /// Receives join/leave notifications for this call
    pub caller: Option<CallerRef>,
}

/// Join this call into a bridge or a conference
#[derive(Debug, Clone)]
pub struct Join {
    /// Endpoint of the bridge or conference to link to
    pub endpoint: EndpointId,
    pub mode: ConnectionMode,
    pub requester: Option<CallerRef>,
}

#[derive(Debug, Clone)]
pub struct StartRecording {
    pub runtime_settings: Option<RuntimeSettings>,
    pub store: Option<Arc<dyn RecordingStore>>,
    pub account_id: Option<AccountId>,
    pub call_id: Option<CallId>,
    pub recording_id: RecordingId,
    pub recording_uri: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StopRecording {
    pub runtime_settings: Option<RuntimeSettings>,
    pub store: Option<Arc<dyn RecordingStore>>,
    pub account_id: Option<AccountId>,
}

/// Answer to a gateway acquisition request; the expected variant depends
/// on the state the controller is waiting in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayResponse {
    Info(GatewayInfo),
    Session(MediaSessionId),
    BridgeEndpoint(EndpointId),
    Connection(ConnectionId),
    Link(LinkId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStateChanged {
    pub state: ConnectionState,
    pub descriptor: Option<String>,
    pub connection_identifier: Option<ConnectionIdentifier>,
}

impl ConnectionStateChanged {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            descriptor: None,
            connection_identifier: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStateChanged {
    pub state: LinkState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStateChanged {
    /// Endpoint reporting the change
    pub endpoint: EndpointId,
    pub state: EndpointState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaGroupStateChanged {
    pub state: MediaGroupState,
}

/// Notifications sent back to the call that owns the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallNotification {
    JoinComplete {
        endpoint: EndpointId,
        session_id: MediaSessionId,
        connection_identifier: Option<ConnectionIdentifier>,
    },
    Left,
}

/// Address of the call that drives a controller
#[derive(Debug, Clone)]
pub struct CallerRef {
    tx: mpsc::UnboundedSender<CallNotification>,
}

impl CallerRef {
    pub fn new(tx: mpsc::UnboundedSender<CallNotification>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CallNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn notify(&self, notification: CallNotification) -> bool {
        self.tx.send(notification).is_ok()
    }
}

/// Cloneable address of a running controller
#[derive(Debug, Clone)]
pub struct ControllerRef {
    id: ControllerId,
    tx: mpsc::UnboundedSender<ControllerMessage>,
    observers: Arc<ObserverRegistry>,
}

impl ControllerRef {
    pub(crate) fn new(
        id: ControllerId,
        tx: mpsc::UnboundedSender<ControllerMessage>,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        Self { id, tx, observers }
    }

    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    /// Queue a message in the controller's inbox
    pub fn tell(&self, message: ControllerMessage) -> Result<()> {
        self.tx.send(message).map_err(|_| ControllerError::Detached)
    }

    /// Register an observer without going through the inbox
    pub fn subscribe(&self, observer: Observer) -> bool {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: &ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.tell(ControllerMessage::Shutdown)
    }

    pub(crate) fn downgrade(&self) -> WeakControllerRef {
        WeakControllerRef {
            id: self.id.clone(),
            tx: self.tx.downgrade(),
            observers: Arc::clone(&self.observers),
        }
    }
}

impl PartialEq for ControllerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ControllerRef {}

/// Address a controller keeps of itself; does not keep its inbox open
#[derive(Debug, Clone)]
pub(crate) struct WeakControllerRef {
    id: ControllerId,
    tx: mpsc::WeakUnboundedSender<ControllerMessage>,
    observers: Arc<ObserverRegistry>,
}

impl WeakControllerRef {
    pub(crate) fn upgrade(&self) -> Option<ControllerRef> {
        self.tx
            .upgrade()
            .map(|tx| ControllerRef::new(self.id.clone(), tx, Arc::clone(&self.observers)))
    }
}
