//! Channel-backed gateway and resource broker
//!
//! Thin translation layer between the controller and whatever speaks the
//! gateway control protocol. Calls are turned into [`GatewayCommand`]s on an
//! unbounded channel; answers come back into the controller's inbox through
//! the `reply_to` address carried by the command.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::media_group_adapter::{ChannelMediaGroup, MediaGroupRequest};
use super::{MediaGateway, MediaGroup, MediaResourceBroker};
use crate::controller::ControllerRef;
use crate::errors::{ControllerError, Result};
use crate::types::{
    CallId, ConnectionId, ConnectionMode, ControllerId, EndpointId, LinkId, LinkSide,
    MediaGroupId, MediaSessionId, OpenConnection, ResourceRef, UpdateConnection,
};

/// Request for a gateway on behalf of a call
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerRequest {
    pub call_id: Option<CallId>,
    pub reply_to: ControllerRef,
}

#[derive(Debug, Clone)]
pub struct ChannelResourceBroker {
    tx: mpsc::UnboundedSender<BrokerRequest>,
}

impl ChannelResourceBroker {
    pub fn new(tx: mpsc::UnboundedSender<BrokerRequest>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BrokerRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl MediaResourceBroker for ChannelResourceBroker {
    async fn get_media_gateway(&self, call_id: Option<&CallId>, reply_to: ControllerRef) -> Result<()> {
        self.tx
            .send(BrokerRequest {
                call_id: call_id.cloned(),
                reply_to,
            })
            .map_err(|_| ControllerError::Gateway("Resource broker is gone".to_string()))
    }
}

/// Everything the controller can ask of a gateway
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCommand {
    GetInfo {
        reply_to: ControllerRef,
    },
    CreateMediaSession {
        reply_to: ControllerRef,
    },
    CreateBridgeEndpoint {
        session: MediaSessionId,
        reply_to: ControllerRef,
    },
    CreateConnection {
        session: MediaSessionId,
        reply_to: ControllerRef,
    },
    InitializeConnection {
        connection: ConnectionId,
        endpoint: EndpointId,
    },
    OpenConnection {
        connection: ConnectionId,
        request: OpenConnection,
    },
    UpdateConnection {
        connection: ConnectionId,
        request: UpdateConnection,
    },
    CloseConnection {
        connection: ConnectionId,
    },
    CreateLink {
        session: MediaSessionId,
        reply_to: ControllerRef,
    },
    InitializeLink {
        link: LinkId,
        primary: EndpointId,
        secondary: EndpointId,
    },
    OpenLink {
        link: LinkId,
        mode: ConnectionMode,
    },
    UpdateLink {
        link: LinkId,
        mode: ConnectionMode,
        side: LinkSide,
    },
    CloseLink {
        link: LinkId,
    },
    DestroyLink {
        link: LinkId,
    },
    DestroyEndpoint {
        endpoint: EndpointId,
    },
    Observe {
        resource: ResourceRef,
        observer: ControllerRef,
    },
    StopObserving {
        resource: ResourceRef,
        observer: ControllerId,
    },
    CreateMediaGroup {
        group: MediaGroupId,
        session: MediaSessionId,
        endpoint: EndpointId,
    },
}

/// Gateway that forwards commands on a channel.
///
/// Media groups it creates are [`ChannelMediaGroup`]s sharing one command
/// channel, so a single receiver sees the requests of every group.
#[derive(Debug, Clone)]
pub struct ChannelMediaGateway {
    tx: mpsc::UnboundedSender<GatewayCommand>,
    media_groups: mpsc::UnboundedSender<MediaGroupRequest>,
}

impl ChannelMediaGateway {
    pub fn new(
        tx: mpsc::UnboundedSender<GatewayCommand>,
        media_groups: mpsc::UnboundedSender<MediaGroupRequest>,
    ) -> Self {
        Self { tx, media_groups }
    }

    pub fn channel() -> (
        Self,
        mpsc::UnboundedReceiver<GatewayCommand>,
        mpsc::UnboundedReceiver<MediaGroupRequest>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (group_tx, group_rx) = mpsc::unbounded_channel();
        (Self::new(tx, group_tx), rx, group_rx)
    }

    fn send(&self, command: GatewayCommand) -> Result<()> {
        debug!("Gateway <- {:?}", command);
        self.tx
            .send(command)
            .map_err(|e| ControllerError::Gateway(format!("Failed to send {:?}: gateway is gone", e.0)))
    }
}

#[async_trait]
impl MediaGateway for ChannelMediaGateway {
    async fn get_info(&self, reply_to: ControllerRef) -> Result<()> {
        self.send(GatewayCommand::GetInfo { reply_to })
    }

    async fn create_media_session(&self, reply_to: ControllerRef) -> Result<()> {
        self.send(GatewayCommand::CreateMediaSession { reply_to })
    }

    async fn create_bridge_endpoint(&self, session: &MediaSessionId, reply_to: ControllerRef) -> Result<()> {
        self.send(GatewayCommand::CreateBridgeEndpoint {
            session: session.clone(),
            reply_to,
        })
    }

    async fn create_connection(&self, session: &MediaSessionId, reply_to: ControllerRef) -> Result<()> {
        self.send(GatewayCommand::CreateConnection {
            session: session.clone(),
            reply_to,
        })
    }

    async fn initialize_connection(&self, connection: &ConnectionId, endpoint: &EndpointId) -> Result<()> {
        self.send(GatewayCommand::InitializeConnection {
            connection: connection.clone(),
            endpoint: endpoint.clone(),
        })
    }

    async fn open_connection(&self, connection: &ConnectionId, request: OpenConnection) -> Result<()> {
        self.send(GatewayCommand::OpenConnection {
            connection: connection.clone(),
            request,
        })
    }

    async fn update_connection(&self, connection: &ConnectionId, request: UpdateConnection) -> Result<()> {
        self.send(GatewayCommand::UpdateConnection {
            connection: connection.clone(),
            request,
        })
    }

    async fn close_connection(&self, connection: &ConnectionId) -> Result<()> {
        self.send(GatewayCommand::CloseConnection {
            connection: connection.clone(),
        })
    }

    async fn create_link(&self, session: &MediaSessionId, reply_to: ControllerRef) -> Result<()> {
        self.send(GatewayCommand::CreateLink {
            session: session.clone(),
            reply_to,
        })
    }

    async fn initialize_link(&self, link: &LinkId, primary: &EndpointId, secondary: &EndpointId) -> Result<()> {
        self.send(GatewayCommand::InitializeLink {
            link: link.clone(),
            primary: primary.clone(),
            secondary: secondary.clone(),
        })
    }

    async fn open_link(&self, link: &LinkId, mode: ConnectionMode) -> Result<()> {
        self.send(GatewayCommand::OpenLink {
            link: link.clone(),
            mode,
        })
    }

    async fn update_link(&self, link: &LinkId, mode: ConnectionMode, side: LinkSide) -> Result<()> {
        self.send(GatewayCommand::UpdateLink {
            link: link.clone(),
            mode,
            side,
        })
    }

    async fn close_link(&self, link: &LinkId) -> Result<()> {
        self.send(GatewayCommand::CloseLink { link: link.clone() })
    }

    async fn destroy_link(&self, link: &LinkId) -> Result<()> {
        self.send(GatewayCommand::DestroyLink { link: link.clone() })
    }

    async fn destroy_endpoint(&self, endpoint: &EndpointId) -> Result<()> {
        self.send(GatewayCommand::DestroyEndpoint {
            endpoint: endpoint.clone(),
        })
    }

    async fn observe(&self, resource: ResourceRef, observer: ControllerRef) -> Result<()> {
        self.send(GatewayCommand::Observe { resource, observer })
    }

    async fn stop_observing(&self, resource: ResourceRef, observer: &ControllerId) -> Result<()> {
        self.send(GatewayCommand::StopObserving {
            resource,
            observer: observer.clone(),
        })
    }

    async fn create_media_group(&self, session: &MediaSessionId, endpoint: &EndpointId) -> Result<Arc<dyn MediaGroup>> {
        let group = ChannelMediaGroup::new(MediaGroupId::new(), self.media_groups.clone());
        self.send(GatewayCommand::CreateMediaGroup {
            group: group.id().clone(),
            session: session.clone(),
            endpoint: endpoint.clone(),
        })?;
        Ok(Arc::new(group))
    }
}
