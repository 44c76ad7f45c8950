#![allow(dead_code)]

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use rvoip_mscontrol_core::adapters::{BrokerRequest, MediaGroupRequest};
use rvoip_mscontrol_core::controller::{
    ConnectionStateChanged, CreateMediaSession, GatewayResponse, MediaGroupStateChanged,
};
use rvoip_mscontrol_core::recording::AudioDurationProbe;
use rvoip_mscontrol_core::types::{
    ConnectionIdentifier, ConnectionState, ConnectionId, EndpointId, GatewayInfo, MediaGroupState,
    MediaSessionId,
};
use rvoip_mscontrol_core::{
    CallController, CallNotification, CallState, CallerRef, ChannelMediaGateway,
    ChannelResourceBroker, ConnectionMode, ControllerConfig, ControllerMessage, ControllerRef,
    GatewayCommand, MediaGateway, Observer, ObserverEvent,
};

pub const REMOTE_SDP: &str = "v=0\r\no=remote 1 1 IN IP4 10.0.0.2\r\n";
pub const LOCAL_SDP: &str = "v=0\r\no=mms 1 1 IN IP4 10.0.0.1\r\n";
pub const SESSION: &str = "media-session-1";
pub const BRIDGE: &str = "endpoint-bridge-1";
pub const CONNECTION: &str = "connection-1";

/// A controller wired to channel adapters, driven message by message
pub struct Harness {
    pub controller: CallController,
    pub address: ControllerRef,
    pub gateway: ChannelMediaGateway,
    pub broker_rx: UnboundedReceiver<BrokerRequest>,
    pub gateway_rx: UnboundedReceiver<GatewayCommand>,
    pub group_rx: UnboundedReceiver<MediaGroupRequest>,
    pub caller: CallerRef,
    pub caller_rx: UnboundedReceiver<CallNotification>,
    pub observer_rx: UnboundedReceiver<ObserverEvent>,
}

impl Harness {
    pub async fn new() -> Self {
        let (broker, broker_rx) = ChannelResourceBroker::channel();
        let (controller, address) = CallController::new(Arc::new(broker), ControllerConfig::default());
        Self::assemble(controller, address, broker_rx).await
    }

    pub async fn with_probe(probe: Arc<dyn AudioDurationProbe>) -> Self {
        let (broker, broker_rx) = ChannelResourceBroker::channel();
        let (controller, address) =
            CallController::with_probe(Arc::new(broker), ControllerConfig::default(), probe);
        Self::assemble(controller, address, broker_rx).await
    }

    async fn assemble(
        mut controller: CallController,
        address: ControllerRef,
        broker_rx: UnboundedReceiver<BrokerRequest>,
    ) -> Self {
        let (gateway, gateway_rx, group_rx) = ChannelMediaGateway::channel();
        let (caller, caller_rx) = CallerRef::channel();
        let (observer, mut observer_rx) = Observer::channel();

        controller
            .handle(ControllerMessage::Observe(observer))
            .await
            .expect("Should accept observer");
        assert!(matches!(
            observer_rx.try_recv(),
            Ok(ObserverEvent::Observing(_))
        ));

        Self {
            controller,
            address,
            gateway,
            broker_rx,
            gateway_rx,
            group_rx,
            caller,
            caller_rx,
            observer_rx,
        }
    }

    pub fn state(&self) -> CallState {
        self.controller.state()
    }

    pub async fn send(&mut self, message: ControllerMessage) {
        let kind = message.kind();
        self.controller
            .handle(message)
            .await
            .unwrap_or_else(|e| panic!("Should handle {}: {}", kind, e));
    }

    pub fn gateway_commands(&mut self) -> Vec<GatewayCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.gateway_rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    pub fn group_requests(&mut self) -> Vec<MediaGroupRequest> {
        let mut requests = Vec::new();
        while let Ok(request) = self.group_rx.try_recv() {
            requests.push(request);
        }
        requests
    }

    pub fn observer_events(&mut self) -> Vec<ObserverEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.observer_rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn create_media_session(&self, outbound: bool) -> ControllerMessage {
        ControllerMessage::CreateMediaSession(CreateMediaSession {
            connection_mode: ConnectionMode::SendRecv,
            outbound,
            remote_sdp: REMOTE_SDP.to_string(),
            webrtc: false,
            call_id: None,
            caller: Some(self.caller.clone()),
        })
    }

    /// Uninitialized up to CreatingMediaGroup, with the media group created
    pub async fn drive_to_creating_media_group(&mut self, outbound: bool) {
        let create = self.create_media_session(outbound);
        self.send(create).await;
        assert_eq!(self.state(), CallState::AcquiringMediaGateway);
        self.broker_rx
            .try_recv()
            .expect("Should have asked the broker for a gateway");

        let gateway: Arc<dyn MediaGateway> = Arc::new(self.gateway.clone());
        self.send(ControllerMessage::MediaGatewayAcquired(gateway)).await;
        assert_eq!(self.state(), CallState::AcquiringMediaGatewayInfo);

        self.send(ControllerMessage::GatewayResponse(GatewayResponse::Info(GatewayInfo {
            name: "mms-1".to_string(),
            use_nat: true,
            external_ip: Some("203.0.113.7".parse().expect("valid ip")),
        })))
        .await;
        assert_eq!(self.state(), CallState::AcquiringMediaSession);

        self.send(ControllerMessage::GatewayResponse(GatewayResponse::Session(
            MediaSessionId::from(SESSION),
        )))
        .await;
        assert_eq!(self.state(), CallState::AcquiringBridge);

        self.send(ControllerMessage::GatewayResponse(GatewayResponse::BridgeEndpoint(
            EndpointId::from(BRIDGE),
        )))
        .await;
        assert_eq!(self.state(), CallState::CreatingMediaGroup);
    }

    /// Uninitialized up to OpeningRemoteConnection
    pub async fn drive_to_opening(&mut self, outbound: bool) {
        self.drive_to_creating_media_group(outbound).await;

        self.send(ControllerMessage::MediaGroupStateChanged(MediaGroupStateChanged {
            state: MediaGroupState::Active,
        }))
        .await;
        assert_eq!(self.state(), CallState::AcquiringRemoteConnection);

        self.send(ControllerMessage::GatewayResponse(GatewayResponse::Connection(
            ConnectionId::from(CONNECTION),
        )))
        .await;
        assert_eq!(self.state(), CallState::InitializingRemoteConnection);

        self.send(ControllerMessage::ConnectionStateChanged(ConnectionStateChanged::new(
            ConnectionState::Closed,
        )))
        .await;
        assert_eq!(self.state(), CallState::OpeningRemoteConnection);
    }

    /// Full acquisition sequence ending in Active; clears every channel
    pub async fn drive_to_active(&mut self, outbound: bool) {
        self.drive_to_opening(outbound).await;

        self.send(ControllerMessage::ConnectionStateChanged(opened(ConnectionState::Open)))
            .await;
        assert_eq!(self.state(), CallState::Active);

        self.gateway_commands();
        self.group_requests();
        self.observer_events();
    }
}

/// Connection event carrying the gateway's answer
pub fn opened(state: ConnectionState) -> ConnectionStateChanged {
    ConnectionStateChanged {
        state,
        descriptor: Some(LOCAL_SDP.to_string()),
        connection_identifier: Some(ConnectionIdentifier("1a2b".to_string())),
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rvoip_mscontrol_core=debug")
        .with_test_writer()
        .try_init();
}
