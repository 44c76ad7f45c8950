use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::executor::{ActionExecutor, Step};
use crate::controller::messages::{
    CallNotification, ConnectionStateChanged, ControllerMessage, GatewayResponse,
};
use crate::controller::session::CallSession;
use crate::errors::{ControllerError, Result};
use crate::state_table::Action;
use crate::types::{
    CallState, ConnectionMode, ControllerState, LinkSide, OpenConnection, ResourceRef,
    UpdateConnection,
};

fn gateway_response(event: &ControllerMessage) -> Option<&GatewayResponse> {
    match event {
        ControllerMessage::GatewayResponse(response) => Some(response),
        _ => None,
    }
}

fn connection_event(event: &ControllerMessage) -> Option<&ConnectionStateChanged> {
    match event {
        ControllerMessage::ConnectionStateChanged(changed) => Some(changed),
        _ => None,
    }
}

fn unexpected(step: Step<CallState>, event: &ControllerMessage) -> ControllerError {
    ControllerError::unexpected_event(step.to, format!("{} while entering {}", event.kind(), step.to))
}

#[async_trait]
impl ActionExecutor<CallState, Action, ControllerMessage> for CallSession {
    async fn execute(&mut self, action: &Action, step: Step<CallState>, event: &ControllerMessage) -> Result<()> {
        debug!("Controller {} executing {:?} ({:?} -> {:?})", self.id, action, step.from, step.to);

        match action {
            // Acquisition
            Action::RequestMediaGateway => {
                let reply_to = self.self_ref()?;
                self.broker
                    .get_media_gateway(self.context.call_id.as_ref(), reply_to)
                    .await?;
            }
            Action::RequestGatewayInfo => {
                if let ControllerMessage::MediaGatewayAcquired(gateway) = event {
                    self.context.gateway = Some(gateway.clone());
                }
                let reply_to = self.self_ref()?;
                self.context.gateway()?.get_info(reply_to).await?;
            }
            Action::CreateMediaSession => {
                let Some(GatewayResponse::Info(info)) = gateway_response(event) else {
                    return Err(unexpected(step, event));
                };
                info!("Controller {} using gateway {} (nat: {})", self.id, info.name, info.use_nat);
                self.context.gateway_info = Some(info.clone());
                let reply_to = self.self_ref()?;
                self.context.gateway()?.create_media_session(reply_to).await?;
            }
            Action::CreateBridgeEndpoint => {
                let Some(GatewayResponse::Session(session)) = gateway_response(event) else {
                    return Err(unexpected(step, event));
                };
                self.context.session = Some(session.clone());
                let reply_to = self.self_ref()?;
                self.context
                    .gateway()?
                    .create_bridge_endpoint(session, reply_to)
                    .await?;
            }
            Action::StartMediaGroup => {
                // An existing media group is reused
                if self.context.media_group.is_none() {
                    let gateway = self.context.gateway()?;
                    let group = gateway
                        .create_media_group(self.context.session()?, self.context.bridge_endpoint()?)
                        .await?;
                    self.context.media_group = Some(group.clone());
                    group.observe(self.self_ref()?).await?;
                    group.start().await?;
                }
            }

            // Remote connection
            Action::CreateConnection => {
                let reply_to = self.self_ref()?;
                self.context
                    .gateway()?
                    .create_connection(self.context.session()?, reply_to)
                    .await?;
            }
            Action::InitializeConnection => {
                let Some(GatewayResponse::Connection(connection)) = gateway_response(event) else {
                    return Err(unexpected(step, event));
                };
                self.context.connection = Some(connection.clone());
                let gateway = self.context.gateway()?;
                gateway
                    .observe(ResourceRef::Connection(connection.clone()), self.self_ref()?)
                    .await?;
                gateway
                    .initialize_connection(connection, self.context.bridge_endpoint()?)
                    .await?;
            }
            Action::OpenConnection => {
                let descriptor = if self.context.outbound {
                    None
                } else {
                    self.context.remote_sdp.clone()
                };
                let request = OpenConnection {
                    descriptor,
                    mode: ConnectionMode::SendRecv,
                    webrtc: self.context.webrtc,
                };
                self.context
                    .gateway()?
                    .open_connection(self.context.connection()?, request)
                    .await?;
            }
            Action::UpdateRemoteDescriptor => {
                let sdp = self.context.remote_sdp.clone().unwrap_or_default();
                self.context
                    .gateway()?
                    .update_connection(self.context.connection()?, UpdateConnection::descriptor(sdp))
                    .await?;
            }
            Action::MuteConnection => {
                self.context
                    .gateway()?
                    .update_connection(
                        self.context.connection()?,
                        UpdateConnection::mode(ConnectionMode::SendOnly),
                    )
                    .await?;
            }
            Action::UnmuteConnection => {
                self.context
                    .gateway()?
                    .update_connection(
                        self.context.connection()?,
                        UpdateConnection::mode(ConnectionMode::SendRecv),
                    )
                    .await?;
            }
            Action::CloseConnection => {
                if let Some(connection) = self.context.connection.as_ref() {
                    self.context.gateway()?.close_connection(connection).await?;
                }
            }

            // Internal link
            Action::CreateLink => {
                let reply_to = self.self_ref()?;
                self.context
                    .gateway()?
                    .create_link(self.context.session()?, reply_to)
                    .await?;
            }
            Action::InitializeLink => {
                let Some(GatewayResponse::Link(link)) = gateway_response(event) else {
                    return Err(unexpected(step, event));
                };
                let secondary = self
                    .context
                    .link_endpoint
                    .clone()
                    .ok_or(ControllerError::MissingResource("link endpoint"))?;
                self.context.link = Some(link.clone());
                let gateway = self.context.gateway()?;
                gateway
                    .observe(ResourceRef::Link(link.clone()), self.self_ref()?)
                    .await?;
                gateway
                    .initialize_link(link, self.context.bridge_endpoint()?, &secondary)
                    .await?;
            }
            Action::OpenLink => {
                let mode = self
                    .context
                    .link_mode
                    .ok_or(ControllerError::MissingResource("link mode"))?;
                self.context.gateway()?.open_link(self.context.link()?, mode).await?;
            }
            Action::UpdateLink => {
                self.context
                    .gateway()?
                    .update_link(self.context.link()?, ConnectionMode::SendRecv, LinkSide::Primary)
                    .await?;
            }
            Action::CloseLink => {
                self.context.gateway()?.close_link(self.context.link()?).await?;
            }
            Action::DestroyLink => {
                if let Some(link) = self.context.link.take() {
                    self.context.gateway()?.destroy_link(&link).await?;
                }
                self.context.link_endpoint = None;
                self.context.link_mode = None;
            }

            // Publication
            Action::PublishPending => {
                if let Some(changed) = connection_event(event) {
                    if let Some(descriptor) = changed.descriptor.clone() {
                        self.context.local_sdp = Some(descriptor);
                    }
                }
                let info = self.context.media_session_info()?;
                self.broadcast(ControllerState::Pending, Some(info));
            }
            Action::PublishActive => self.enter_active(step, event)?,
            Action::PublishInactive => self.broadcast(ControllerState::Inactive, None),
            Action::PublishFailed => self.broadcast(ControllerState::Failed, None),

            // Teardown
            Action::TerminateResources => self.terminate_resources().await,
            Action::ReleaseResources => self.release_resources().await,
        }

        Ok(())
    }
}

impl CallSession {
    /// What entering Active means depends on where we came from
    fn enter_active(&mut self, step: Step<CallState>, event: &ControllerMessage) -> Result<()> {
        match step.from {
            CallState::UpdatingInternalLink => {
                let notification = CallNotification::JoinComplete {
                    endpoint: self.context.bridge_endpoint()?.clone(),
                    session_id: self.context.session()?.clone(),
                    connection_identifier: self.context.connection_identifier.clone(),
                };
                self.notify_caller(notification);
            }
            CallState::ClosingInternalLink => self.notify_caller(CallNotification::Left),
            CallState::OpeningRemoteConnection | CallState::UpdatingRemoteConnection => {
                let changed = connection_event(event).ok_or_else(|| {
                    ControllerError::unexpected_event(step.to, event.kind())
                })?;
                self.context.connection_identifier = changed.connection_identifier.clone();
                info!(
                    "Controller {} connection identifier: {:?}",
                    self.id, self.context.connection_identifier
                );
                if let Some(descriptor) = changed.descriptor.clone() {
                    self.context.local_sdp = Some(descriptor);
                }
                let info = self.context.media_session_info()?;
                self.broadcast(ControllerState::Active, Some(info));
            }
            _ => {}
        }
        Ok(())
    }

    fn notify_caller(&self, notification: CallNotification) {
        match self.context.caller.as_ref() {
            Some(caller) => {
                if !caller.notify(notification) {
                    warn!("Controller {} could not reach its call", self.id);
                }
            }
            None => warn!("Controller {} has no call to notify", self.id),
        }
    }

    /// Ask the media group to stop and the gateway to destroy the bridge
    /// endpoint. A collaborator that cannot be reached is logged and skipped
    /// so the remaining teardown still runs.
    async fn terminate_resources(&self) {
        if let Some(group) = self.context.media_group.as_ref() {
            if let Err(e) = group.stop().await {
                warn!("Controller {} failed to stop media group {}: {}", self.id, group.id(), e);
            }
        }
        if let Some(endpoint) = self.context.bridge_endpoint.as_ref() {
            match self.context.gateway.as_ref() {
                Some(gateway) => {
                    if let Err(e) = gateway.destroy_endpoint(endpoint).await {
                        warn!("Controller {} failed to destroy endpoint {}: {}", self.id, endpoint, e);
                    }
                }
                None => warn!("Controller {} has no gateway to destroy endpoint {}", self.id, endpoint),
            }
        }
    }

    /// Drop every handle still held. Failures to reach a collaborator are
    /// logged; the handles are forgotten regardless.
    pub(crate) async fn release_resources(&mut self) {
        if let Some(group) = self.context.media_group.take() {
            if let Err(e) = group.stop_observing(&self.id).await {
                warn!("Controller {} failed to stop observing media group: {}", self.id, e);
            }
            if let Err(e) = group.destroy().await {
                warn!("Controller {} failed to destroy media group: {}", self.id, e);
            }
        }
        if let Some(endpoint) = self.context.bridge_endpoint.take() {
            if let Some(gateway) = self.context.gateway.as_ref() {
                if let Err(e) = gateway
                    .stop_observing(ResourceRef::Endpoint(endpoint.clone()), &self.id)
                    .await
                {
                    warn!("Controller {} failed to stop observing endpoint {}: {}", self.id, endpoint, e);
                }
            }
        }
        self.context.connection = None;
        self.context.link = None;
        self.context.link_endpoint = None;
        self.context.link_mode = None;
    }
}
