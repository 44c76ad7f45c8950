// Facades over the media gateway control plane
pub mod gateway_adapter;
pub mod media_group_adapter;

pub use gateway_adapter::{
    BrokerRequest, ChannelMediaGateway, ChannelResourceBroker, GatewayCommand,
};
pub use media_group_adapter::{ChannelMediaGroup, MediaGroupCommand, MediaGroupRequest};

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::controller::ControllerRef;
use crate::errors::Result;
use crate::types::{
    CallId, Collect, ConnectionId, ConnectionMode, ControllerId, EndpointId, LinkId, LinkSide,
    MediaGroupId, MediaSessionId, OpenConnection, Play, Record, ResourceRef, Stop,
    UpdateConnection,
};

/// Hands out a media gateway for a call.
///
/// The answer is delivered asynchronously as
/// `ControllerMessage::MediaGatewayAcquired` to `reply_to`.
#[async_trait]
pub trait MediaResourceBroker: Send + Sync + Debug {
    async fn get_media_gateway(&self, call_id: Option<&CallId>, reply_to: ControllerRef) -> Result<()>;
}

/// Control surface of a media gateway.
///
/// Methods taking `reply_to` answer with a `ControllerMessage::GatewayResponse`.
/// State changes of observed resources arrive as `ConnectionStateChanged`,
/// `LinkStateChanged` and `EndpointStateChanged` messages.
#[async_trait]
pub trait MediaGateway: Send + Sync + Debug {
    async fn get_info(&self, reply_to: ControllerRef) -> Result<()>;

    async fn create_media_session(&self, reply_to: ControllerRef) -> Result<()>;

    async fn create_bridge_endpoint(&self, session: &MediaSessionId, reply_to: ControllerRef) -> Result<()>;

    async fn create_connection(&self, session: &MediaSessionId, reply_to: ControllerRef) -> Result<()>;

    async fn initialize_connection(&self, connection: &ConnectionId, endpoint: &EndpointId) -> Result<()>;

    async fn open_connection(&self, connection: &ConnectionId, request: OpenConnection) -> Result<()>;

    async fn update_connection(&self, connection: &ConnectionId, request: UpdateConnection) -> Result<()>;

    async fn close_connection(&self, connection: &ConnectionId) -> Result<()>;

    async fn create_link(&self, session: &MediaSessionId, reply_to: ControllerRef) -> Result<()>;

    /// Wire a link between two endpoints
    async fn initialize_link(&self, link: &LinkId, primary: &EndpointId, secondary: &EndpointId) -> Result<()>;

    async fn open_link(&self, link: &LinkId, mode: ConnectionMode) -> Result<()>;

    async fn update_link(&self, link: &LinkId, mode: ConnectionMode, side: LinkSide) -> Result<()>;

    async fn close_link(&self, link: &LinkId) -> Result<()>;

    async fn destroy_link(&self, link: &LinkId) -> Result<()>;

    async fn destroy_endpoint(&self, endpoint: &EndpointId) -> Result<()>;

    async fn observe(&self, resource: ResourceRef, observer: ControllerRef) -> Result<()>;

    async fn stop_observing(&self, resource: ResourceRef, observer: &ControllerId) -> Result<()>;

    /// Create the media group serving a session's bridge endpoint
    async fn create_media_group(&self, session: &MediaSessionId, endpoint: &EndpointId) -> Result<Arc<dyn MediaGroup>>;
}

/// Play/record/collect facility attached to a call's media.
///
/// Reports `MediaGroupStateChanged` to its observers.
#[async_trait]
pub trait MediaGroup: Send + Sync + Debug {
    fn id(&self) -> &MediaGroupId;

    async fn observe(&self, observer: ControllerRef) -> Result<()>;

    async fn stop_observing(&self, observer: &ControllerId) -> Result<()>;

    async fn start(&self) -> Result<()>;

    /// Terminate the group's current activity and wind it down
    async fn stop(&self) -> Result<()>;

    /// Stop the running media operation (recording or collect)
    async fn stop_media(&self, stop: Stop) -> Result<()>;

    async fn record(&self, request: Record) -> Result<()>;

    async fn play(&self, request: Play) -> Result<()>;

    async fn collect(&self, request: Collect) -> Result<()>;

    async fn destroy(&self) -> Result<()>;
}
