use std::sync::Arc;

use super::messages::CallerRef;
use crate::adapters::{MediaGateway, MediaGroup};
use crate::errors::{ControllerError, Result};
use crate::types::{
    CallId, CallState, ConnectionId, ConnectionIdentifier, ConnectionMode, EndpointId,
    GatewayInfo, LinkId, MediaSessionId, MediaSessionInfo,
};

/// Per-call data owned by one controller.
///
/// Filled in step by step as resources are acquired and emptied again on
/// teardown. Only the controller's own message loop touches it.
#[derive(Debug, Default)]
pub(crate) struct CallContext {
    /// The call that created the media session
    pub caller: Option<CallerRef>,
    pub call_id: Option<CallId>,

    pub local_sdp: Option<String>,
    pub remote_sdp: Option<String>,
    pub connection_mode: ConnectionMode,
    pub outbound: bool,
    pub webrtc: bool,

    pub gateway: Option<Arc<dyn MediaGateway>>,
    pub gateway_info: Option<GatewayInfo>,
    pub session: Option<MediaSessionId>,
    pub bridge_endpoint: Option<EndpointId>,

    pub connection: Option<ConnectionId>,
    pub connection_identifier: Option<ConnectionIdentifier>,

    pub link: Option<LinkId>,
    /// Endpoint the internal link joins us to
    pub link_endpoint: Option<EndpointId>,
    pub link_mode: Option<ConnectionMode>,

    pub media_group: Option<Arc<dyn MediaGroup>>,
    /// Whoever asked for the current join
    pub bridge_partner: Option<CallerRef>,
}

impl CallContext {
    pub fn gateway(&self) -> Result<Arc<dyn MediaGateway>> {
        self.gateway
            .clone()
            .ok_or(ControllerError::MissingResource("media gateway"))
    }

    pub fn session(&self) -> Result<&MediaSessionId> {
        self.session
            .as_ref()
            .ok_or(ControllerError::MissingResource("media session"))
    }

    pub fn bridge_endpoint(&self) -> Result<&EndpointId> {
        self.bridge_endpoint
            .as_ref()
            .ok_or(ControllerError::MissingResource("bridge endpoint"))
    }

    pub fn connection(&self) -> Result<&ConnectionId> {
        self.connection
            .as_ref()
            .ok_or(ControllerError::MissingResource("connection"))
    }

    pub fn link(&self) -> Result<&LinkId> {
        self.link.as_ref().ok_or(ControllerError::MissingResource("link"))
    }

    pub fn media_group(&self) -> Result<&Arc<dyn MediaGroup>> {
        self.media_group
            .as_ref()
            .ok_or(ControllerError::MissingResource("media group"))
    }

    pub fn media_session_info(&self) -> Result<MediaSessionInfo> {
        let info = self
            .gateway_info
            .as_ref()
            .ok_or(ControllerError::MissingResource("gateway info"))?;
        Ok(MediaSessionInfo {
            use_nat: info.use_nat,
            external_ip: info.external_ip,
            local_sdp: self.local_sdp.clone().unwrap_or_default(),
            remote_sdp: self.remote_sdp.clone().unwrap_or_default(),
        })
    }

    pub fn snapshot(&self, state: CallState, recording: bool, collecting: bool) -> ContextSnapshot {
        ContextSnapshot {
            state,
            outbound: self.outbound,
            webrtc: self.webrtc,
            connection_mode: self.connection_mode,
            local_sdp: self.local_sdp.clone(),
            remote_sdp: self.remote_sdp.clone(),
            has_gateway: self.gateway.is_some(),
            has_session: self.session.is_some(),
            has_bridge_endpoint: self.bridge_endpoint.is_some(),
            has_connection: self.connection.is_some(),
            has_link: self.link.is_some(),
            has_link_endpoint: self.link_endpoint.is_some(),
            has_media_group: self.media_group.is_some(),
            has_bridge_partner: self.bridge_partner.is_some(),
            recording,
            collecting,
        }
    }
}

/// Point-in-time view of a controller.
///
/// Tells which resources are held without handing them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub state: CallState,
    pub outbound: bool,
    pub webrtc: bool,
    pub connection_mode: ConnectionMode,
    pub local_sdp: Option<String>,
    pub remote_sdp: Option<String>,
    pub has_gateway: bool,
    pub has_session: bool,
    pub has_bridge_endpoint: bool,
    pub has_connection: bool,
    pub has_link: bool,
    pub has_link_endpoint: bool,
    pub has_media_group: bool,
    pub has_bridge_partner: bool,
    pub recording: bool,
    pub collecting: bool,
}

impl ContextSnapshot {
    /// True when no gateway resource handle is held
    pub fn is_released(&self) -> bool {
        !(self.has_media_group || self.has_bridge_endpoint || self.has_connection || self.has_link)
    }
}
