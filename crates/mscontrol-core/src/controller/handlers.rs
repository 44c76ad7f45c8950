//! Message handlers
//!
//! Each handler decides, from the current state, whether a message moves
//! the state machine and where to. Commands to collaborators are issued by
//! the state table's entry and exit actions, not here, with a few
//! exceptions where the original resource is released by the event itself.

use tracing::{debug, error, info, warn};

use super::messages::{
    ConnectionStateChanged, ControllerMessage, CreateMediaSession, EndpointStateChanged,
    GatewayResponse, Join, LinkStateChanged, MediaGroupStateChanged,
};
use super::CallController;
use crate::errors::{ControllerError, Result};
use crate::observers::{Observer, ObserverEvent};
use crate::types::{
    CallState, Collect, ConnectionState, EndpointState, LinkState, MediaGroupState, ObserverId,
    Play, Record, ResourceRef, Stop,
};

/// States from which `CloseMediaSession` starts the teardown
const CLOSABLE_STATES: [CallState; 8] = [
    CallState::Pending,
    CallState::UpdatingRemoteConnection,
    CallState::Active,
    CallState::AcquiringInternalLink,
    CallState::UpdatingInternalLink,
    CallState::CreatingMediaGroup,
    CallState::AcquiringBridge,
    CallState::AcquiringMediaSession,
];

impl CallController {
    /// Handle one message.
    ///
    /// An error leaves the controller in the state it had reached when the
    /// error occurred; the message is not retried.
    pub async fn handle(&mut self, message: ControllerMessage) -> Result<()> {
        debug!(
            "Controller {} received {} in {:?}",
            self.id,
            message.kind(),
            self.fsm.state()
        );

        match &message {
            ControllerMessage::Observe(observer) => {
                self.on_observe(observer);
                Ok(())
            }
            ControllerMessage::StopObserving(observer) => {
                self.on_stop_observing(observer);
                Ok(())
            }
            ControllerMessage::CreateMediaSession(request) => {
                self.on_create_media_session(request, &message).await
            }
            ControllerMessage::CloseMediaSession => self.on_close_media_session(&message).await,
            ControllerMessage::UpdateMediaSession { remote_sdp } => {
                self.session.context.remote_sdp = Some(remote_sdp.clone());
                self.go(&message, CallState::UpdatingRemoteConnection).await
            }
            ControllerMessage::JoinBridge(join) | ControllerMessage::JoinConference(join) => {
                self.on_join(join, &message).await
            }
            ControllerMessage::Leave => self.on_leave(&message).await,
            ControllerMessage::Mute => self.go(&message, CallState::Muting).await,
            ControllerMessage::Unmute => self.go(&message, CallState::Unmuting).await,

            ControllerMessage::StartRecording(request) => {
                let media_group = self.session.context.media_group.as_ref();
                self.session.recorder.start(request.clone(), media_group).await
            }
            ControllerMessage::StopRecording(request) => {
                let media_group = self.session.context.media_group.as_ref();
                self.session
                    .recorder
                    .stop_recording(request.clone(), media_group)
                    .await
            }
            ControllerMessage::Stop(stop) => {
                let media_group = self.session.context.media_group.as_ref();
                self.session.recorder.stop(*stop, media_group).await
            }
            ControllerMessage::StopMediaGroup => self.on_stop_media_group().await,
            ControllerMessage::Record(record) => self.on_record(record).await,
            ControllerMessage::Play(play) => self.on_play(play).await,
            ControllerMessage::Collect(collect) => self.on_collect(collect).await,

            ControllerMessage::MediaGatewayAcquired(_) => {
                self.go(&message, CallState::AcquiringMediaGatewayInfo).await
            }
            ControllerMessage::GatewayResponse(response) => {
                self.on_gateway_response(response, &message).await
            }
            ControllerMessage::ConnectionStateChanged(changed) => {
                self.on_connection_state_changed(changed, &message).await
            }
            ControllerMessage::LinkStateChanged(changed) => {
                self.on_link_state_changed(changed, &message).await
            }
            ControllerMessage::EndpointStateChanged(changed) => {
                self.on_endpoint_state_changed(changed, &message).await
            }
            ControllerMessage::MediaGroupStateChanged(changed) => {
                self.on_media_group_state_changed(changed, &message).await
            }

            // The run loop stops on its own before handing this over
            ControllerMessage::Shutdown => Ok(()),
        }
    }

    fn is(&self, state: CallState) -> bool {
        self.fsm.is(state)
    }

    async fn go(&mut self, message: &ControllerMessage, target: CallState) -> Result<()> {
        let result = self
            .fsm
            .transition(&mut self.session, message, target)
            .await;
        if let Err(e) = &result {
            if e.is_illegal_transition() {
                error!("Controller {}: {} ({})", self.id, e, message.kind());
            }
        }
        result
    }

    fn on_observe(&self, observer: &Observer) {
        self.session.observers.subscribe(observer.clone());
        if !observer.notify(ObserverEvent::Observing(self.id.clone())) {
            warn!("Observer {} went away before its subscription was acknowledged", observer.id());
        }
    }

    fn on_stop_observing(&self, observer: &ObserverId) {
        if !self.session.observers.unsubscribe(observer) {
            debug!("Observer {} was not subscribed to {}", observer, self.id);
        }
    }

    async fn on_create_media_session(
        &mut self,
        request: &CreateMediaSession,
        message: &ControllerMessage,
    ) -> Result<()> {
        let context = &mut self.session.context;
        context.caller = request.caller.clone();
        context.connection_mode = request.connection_mode;
        context.outbound = request.outbound;
        context.remote_sdp = Some(request.remote_sdp.clone());
        context.webrtc = request.webrtc;
        context.call_id = request.call_id.clone();

        self.go(message, CallState::AcquiringMediaGateway).await
    }

    async fn on_close_media_session(&mut self, message: &ControllerMessage) -> Result<()> {
        let state = self.fsm.state();
        if CLOSABLE_STATES.contains(&state) {
            self.go(message, CallState::Stopping).await
        } else {
            debug!("Controller {} ignoring CloseMediaSession in {:?}", self.id, state);
            Ok(())
        }
    }

    async fn on_join(&mut self, join: &Join, message: &ControllerMessage) -> Result<()> {
        let context = &mut self.session.context;
        context.bridge_partner = join.requester.clone();
        context.link_endpoint = Some(join.endpoint.clone());
        context.link_mode = Some(join.mode);

        self.go(message, CallState::AcquiringInternalLink).await
    }

    async fn on_leave(&mut self, message: &ControllerMessage) -> Result<()> {
        let linked = self.session.context.link_endpoint.is_some();
        if (self.is(CallState::Active) && linked) || self.is(CallState::UpdatingInternalLink) {
            self.go(message, CallState::ClosingInternalLink).await
        } else {
            debug!("Controller {} not joined, ignoring Leave", self.id);
            Ok(())
        }
    }

    async fn on_stop_media_group(&self) -> Result<()> {
        match self.session.context.media_group.as_ref() {
            Some(group) if self.is(CallState::Active) => group.stop_media(Stop::default()).await,
            _ => Ok(()),
        }
    }

    async fn on_record(&mut self, record: &Record) -> Result<()> {
        if !self.is(CallState::Active) {
            return Ok(());
        }
        self.session.recorder.mark_recording();
        self.session.context.media_group()?.record(record.clone()).await
    }

    async fn on_play(&self, play: &Play) -> Result<()> {
        if !(self.is(CallState::Active) || self.is(CallState::Muting)) {
            return Ok(());
        }
        self.session.context.media_group()?.play(play.clone()).await
    }

    async fn on_collect(&mut self, collect: &Collect) -> Result<()> {
        if !self.is(CallState::Active) {
            return Ok(());
        }
        self.session.context.media_group()?.collect(collect.clone()).await?;
        self.session.recorder.mark_collecting();
        Ok(())
    }

    async fn on_gateway_response(
        &mut self,
        response: &GatewayResponse,
        message: &ControllerMessage,
    ) -> Result<()> {
        let state = self.fsm.state();
        match (state, response) {
            (CallState::AcquiringMediaGatewayInfo, GatewayResponse::Info(_)) => {
                self.go(message, CallState::AcquiringMediaSession).await
            }
            (CallState::AcquiringMediaSession, GatewayResponse::Session(_)) => {
                self.go(message, CallState::AcquiringBridge).await
            }
            (CallState::AcquiringBridge, GatewayResponse::BridgeEndpoint(endpoint)) => {
                self.session.context.bridge_endpoint = Some(endpoint.clone());
                let reply_to = self.session.self_ref()?;
                self.session
                    .context
                    .gateway()?
                    .observe(ResourceRef::Endpoint(endpoint.clone()), reply_to)
                    .await?;
                self.go(message, CallState::CreatingMediaGroup).await
            }
            (CallState::AcquiringRemoteConnection, GatewayResponse::Connection(_)) => {
                self.go(message, CallState::InitializingRemoteConnection).await
            }
            (CallState::AcquiringInternalLink, GatewayResponse::Link(_)) => {
                self.go(message, CallState::InitializingInternalLink).await
            }
            (
                CallState::AcquiringMediaGatewayInfo
                | CallState::AcquiringMediaSession
                | CallState::AcquiringBridge
                | CallState::AcquiringRemoteConnection
                | CallState::AcquiringInternalLink,
                _,
            ) => Err(ControllerError::unexpected_event(state, format!("{:?}", response))),
            _ => {
                warn!("Controller {} ignoring gateway response in {:?}", self.id, state);
                Ok(())
            }
        }
    }

    async fn on_connection_state_changed(
        &mut self,
        changed: &ConnectionStateChanged,
        message: &ControllerMessage,
    ) -> Result<()> {
        let state = self.fsm.state();
        match changed.state {
            ConnectionState::Closed => match state {
                CallState::InitializingRemoteConnection => {
                    self.go(message, CallState::OpeningRemoteConnection).await
                }
                CallState::OpeningRemoteConnection | CallState::UpdatingRemoteConnection => {
                    self.go(message, CallState::Failed).await
                }
                CallState::Muting | CallState::Unmuting => {
                    self.go(message, CallState::ClosingRemoteConnection).await
                }
                CallState::ClosingRemoteConnection => {
                    self.session.context.connection = None;
                    if self.session.context.link.is_some() {
                        self.go(message, CallState::ClosingInternalLink).await
                    } else {
                        self.go(message, CallState::Inactive).await
                    }
                }
                _ => {
                    debug!("Controller {} ignoring connection CLOSED in {:?}", self.id, state);
                    Ok(())
                }
            },
            ConnectionState::HalfOpen => self.go(message, CallState::Pending).await,
            ConnectionState::Open => self.go(message, CallState::Active).await,
        }
    }

    async fn on_link_state_changed(
        &mut self,
        changed: &LinkStateChanged,
        message: &ControllerMessage,
    ) -> Result<()> {
        let state = self.fsm.state();
        match (changed.state, state) {
            (LinkState::Closed, CallState::InitializingInternalLink) => {
                self.go(message, CallState::OpeningInternalLink).await
            }
            (LinkState::Closed, CallState::OpeningInternalLink) => {
                self.go(message, CallState::Stopping).await
            }
            (LinkState::Closed, CallState::ClosingInternalLink) => {
                if self.session.context.connection.is_some() {
                    self.go(message, CallState::Active).await
                } else {
                    self.go(message, CallState::Inactive).await
                }
            }
            (LinkState::Open, CallState::OpeningInternalLink) => {
                self.go(message, CallState::UpdatingInternalLink).await
            }
            (LinkState::Open, CallState::UpdatingInternalLink) => {
                self.go(message, CallState::Active).await
            }
            _ => {
                debug!(
                    "Controller {} ignoring link {:?} in {:?}",
                    self.id, changed.state, state
                );
                Ok(())
            }
        }
    }

    async fn on_endpoint_state_changed(
        &mut self,
        changed: &EndpointStateChanged,
        message: &ControllerMessage,
    ) -> Result<()> {
        if !self.is(CallState::Stopping) {
            return Ok(());
        }
        let tracked = self.session.context.bridge_endpoint.as_ref() == Some(&changed.endpoint);
        if !tracked || !matches!(changed.state, EndpointState::Destroyed | EndpointState::Failed) {
            return Ok(());
        }

        if changed.state == EndpointState::Failed {
            error!(
                "Controller {} could not destroy endpoint {} on the media server",
                self.id, changed.endpoint
            );
        }
        if let Some(gateway) = self.session.context.gateway.as_ref() {
            if let Err(e) = gateway
                .stop_observing(ResourceRef::Endpoint(changed.endpoint.clone()), &self.id)
                .await
            {
                warn!("Controller {} failed to stop observing endpoint {}: {}", self.id, changed.endpoint, e);
            }
        }
        self.session.context.bridge_endpoint = None;

        if self.session.context.media_group.is_none() && self.session.context.bridge_endpoint.is_none() {
            self.go(message, CallState::Inactive).await
        } else {
            info!("Controller {} bridge endpoint released, waiting for media group", self.id);
            Ok(())
        }
    }

    async fn on_media_group_state_changed(
        &mut self,
        changed: &MediaGroupStateChanged,
        message: &ControllerMessage,
    ) -> Result<()> {
        match changed.state {
            MediaGroupState::Active => {
                if self.is(CallState::CreatingMediaGroup) {
                    self.go(message, CallState::AcquiringRemoteConnection).await
                } else {
                    Ok(())
                }
            }
            MediaGroupState::Inactive => {
                if self.is(CallState::CreatingMediaGroup) {
                    self.go(message, CallState::Failed).await
                } else if self.is(CallState::Stopping) {
                    if let Some(group) = self.session.context.media_group.take() {
                        if let Err(e) = group.stop_observing(&self.id).await {
                            warn!("Controller {} failed to stop observing media group {}: {}", self.id, group.id(), e);
                        }
                        if let Err(e) = group.destroy().await {
                            warn!("Controller {} failed to destroy media group {}: {}", self.id, group.id(), e);
                        }
                    }

                    // The media group half of this check always holds here
                    if self.session.context.media_group.is_none()
                        && self.session.context.bridge_endpoint.is_none()
                    {
                        self.go(message, CallState::Inactive).await
                    } else {
                        info!("Controller {} media group released, waiting for bridge endpoint", self.id);
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
        }
    }
}
