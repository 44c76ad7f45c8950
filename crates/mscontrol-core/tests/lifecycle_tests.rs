mod common;

use common::*;
use pretty_assertions::assert_eq;

use rvoip_mscontrol_core::adapters::MediaGroupCommand;
use rvoip_mscontrol_core::controller::{
    ConnectionStateChanged, EndpointStateChanged, GatewayResponse, MediaGroupStateChanged,
};
use rvoip_mscontrol_core::types::{
    ConnectionState, ConnectionId, EndpointId, EndpointState, GatewayInfo, MediaGroupState,
    MediaSessionInfo, ResourceRef, UpdateConnection,
};
use rvoip_mscontrol_core::{
    CallState, ConnectionMode, ControllerError, ControllerMessage, ControllerState,
    ControllerStateChanged, GatewayCommand, ObserverEvent,
};

fn state_changes(events: Vec<ObserverEvent>) -> Vec<ControllerStateChanged> {
    events
        .into_iter()
        .filter_map(|event| match event {
            ObserverEvent::StateChanged(changed) => Some(changed),
            _ => None,
        })
        .collect()
}

fn media_group_changed(state: MediaGroupState) -> ControllerMessage {
    ControllerMessage::MediaGroupStateChanged(MediaGroupStateChanged { state })
}

fn endpoint_changed(endpoint: &str, state: EndpointState) -> ControllerMessage {
    ControllerMessage::EndpointStateChanged(EndpointStateChanged {
        endpoint: EndpointId::from(endpoint),
        state,
    })
}

fn connection_changed(state: ConnectionState) -> ControllerMessage {
    ControllerMessage::ConnectionStateChanged(ConnectionStateChanged::new(state))
}

#[tokio::test]
async fn test_outbound_call_reaches_active() {
    init_logging();
    let mut h = Harness::new().await;

    h.drive_to_opening(true).await;

    let commands = h.gateway_commands();
    assert!(matches!(commands[0], GatewayCommand::GetInfo { .. }));
    assert!(matches!(commands[1], GatewayCommand::CreateMediaSession { .. }));
    assert!(matches!(
        &commands[2],
        GatewayCommand::CreateBridgeEndpoint { session, .. } if session.0 == SESSION
    ));
    assert!(matches!(
        &commands[3],
        GatewayCommand::Observe { resource: ResourceRef::Endpoint(endpoint), .. } if endpoint.0 == BRIDGE
    ));
    assert!(matches!(commands[4], GatewayCommand::CreateMediaGroup { .. }));
    assert!(matches!(commands[5], GatewayCommand::CreateConnection { .. }));
    assert!(matches!(
        &commands[6],
        GatewayCommand::Observe { resource: ResourceRef::Connection(connection), .. } if connection.0 == CONNECTION
    ));
    assert!(matches!(
        &commands[7],
        GatewayCommand::InitializeConnection { connection, endpoint }
            if connection.0 == CONNECTION && endpoint.0 == BRIDGE
    ));
    // Outbound calls let the gateway make the offer
    match &commands[8] {
        GatewayCommand::OpenConnection { request, .. } => {
            assert_eq!(request.descriptor, None);
            assert_eq!(request.mode, ConnectionMode::SendRecv);
            assert!(!request.webrtc);
        }
        other => panic!("Should open the connection, got {:?}", other),
    }
    assert_eq!(commands.len(), 9);

    let group: Vec<MediaGroupCommand> = h.group_requests().into_iter().map(|r| r.command).collect();
    assert!(matches!(group[0], MediaGroupCommand::Observe(_)));
    assert_eq!(group[1], MediaGroupCommand::Start);

    h.send(ControllerMessage::ConnectionStateChanged(opened(ConnectionState::Open)))
        .await;
    assert_eq!(h.state(), CallState::Active);

    let changes = state_changes(h.observer_events());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].state, ControllerState::Active);
    assert_eq!(
        changes[0].session_info,
        Some(MediaSessionInfo {
            use_nat: true,
            external_ip: Some("203.0.113.7".parse().unwrap()),
            local_sdp: LOCAL_SDP.to_string(),
            remote_sdp: REMOTE_SDP.to_string(),
        })
    );

    let snapshot = h.controller.snapshot();
    assert!(snapshot.has_connection && snapshot.has_media_group && snapshot.has_bridge_endpoint);
    assert_eq!(snapshot.local_sdp.as_deref(), Some(LOCAL_SDP));
}

#[tokio::test]
async fn test_inbound_call_offers_remote_descriptor() {
    let mut h = Harness::new().await;
    h.drive_to_opening(false).await;

    let open = h
        .gateway_commands()
        .into_iter()
        .find_map(|command| match command {
            GatewayCommand::OpenConnection { request, .. } => Some(request),
            _ => None,
        })
        .expect("Should have opened the connection");
    assert_eq!(open.descriptor.as_deref(), Some(REMOTE_SDP));
    assert_eq!(open.mode, ConnectionMode::SendRecv);
}

#[tokio::test]
async fn test_close_from_active_reaches_inactive() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;

    h.send(ControllerMessage::CloseMediaSession).await;
    assert_eq!(h.state(), CallState::Stopping);

    let group: Vec<MediaGroupCommand> = h.group_requests().into_iter().map(|r| r.command).collect();
    assert_eq!(group, vec![MediaGroupCommand::Stop]);
    assert!(h.gateway_commands().iter().any(|c| matches!(
        c,
        GatewayCommand::DestroyEndpoint { endpoint } if endpoint.0 == BRIDGE
    )));

    // Media group confirms first; the bridge endpoint is still held
    h.send(media_group_changed(MediaGroupState::Inactive)).await;
    assert_eq!(h.state(), CallState::Stopping);
    let group: Vec<MediaGroupCommand> = h.group_requests().into_iter().map(|r| r.command).collect();
    assert!(matches!(group[0], MediaGroupCommand::StopObserving(_)));
    assert_eq!(group[1], MediaGroupCommand::Destroy);

    h.send(endpoint_changed(BRIDGE, EndpointState::Destroyed)).await;
    assert_eq!(h.state(), CallState::Inactive);

    let changes = state_changes(h.observer_events());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].state, ControllerState::Inactive);
    assert_eq!(changes[0].session_info, None);
    assert!(h.controller.snapshot().is_released());
}

#[tokio::test]
async fn test_endpoint_confirmation_first_then_media_group() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;
    h.send(ControllerMessage::CloseMediaSession).await;

    h.send(endpoint_changed(BRIDGE, EndpointState::Destroyed)).await;
    assert_eq!(h.state(), CallState::Stopping);
    assert!(h.gateway_commands().iter().any(|c| matches!(
        c,
        GatewayCommand::StopObserving { resource: ResourceRef::Endpoint(_), .. }
    )));

    h.send(media_group_changed(MediaGroupState::Inactive)).await;
    assert_eq!(h.state(), CallState::Inactive);
}

#[tokio::test]
async fn test_failed_endpoint_destruction_still_completes_teardown() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;
    h.send(ControllerMessage::CloseMediaSession).await;
    h.send(media_group_changed(MediaGroupState::Inactive)).await;

    h.send(endpoint_changed(BRIDGE, EndpointState::Failed)).await;
    assert_eq!(h.state(), CallState::Inactive);
}

#[tokio::test]
async fn test_endpoint_events_for_other_endpoints_are_ignored() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;
    h.send(ControllerMessage::CloseMediaSession).await;
    h.send(media_group_changed(MediaGroupState::Inactive)).await;

    h.send(endpoint_changed("endpoint-someone-else", EndpointState::Destroyed))
        .await;
    h.send(endpoint_changed(BRIDGE, EndpointState::Created)).await;
    assert_eq!(h.state(), CallState::Stopping);
    assert!(h.controller.snapshot().has_bridge_endpoint);
}

#[tokio::test]
async fn test_media_group_inactive_check_only_waits_on_bridge_endpoint() {
    // The media group handle is cleared right before the "both released"
    // check, so only the bridge endpoint can hold the controller in Stopping.
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;
    h.send(ControllerMessage::CloseMediaSession).await;

    h.send(media_group_changed(MediaGroupState::Inactive)).await;
    let snapshot = h.controller.snapshot();
    assert!(!snapshot.has_media_group);
    assert!(snapshot.has_bridge_endpoint);
    assert_eq!(snapshot.state, CallState::Stopping);

    // A repeated report with no media group left behaves the same way
    h.send(media_group_changed(MediaGroupState::Inactive)).await;
    assert_eq!(h.state(), CallState::Stopping);
}

#[tokio::test]
async fn test_connection_closed_while_opening_fails() {
    let mut h = Harness::new().await;
    h.drive_to_opening(true).await;
    h.gateway_commands();
    h.group_requests();

    h.send(connection_changed(ConnectionState::Closed)).await;
    assert_eq!(h.state(), CallState::Failed);

    let changes = state_changes(h.observer_events());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].state, ControllerState::Failed);

    let group: Vec<MediaGroupCommand> = h.group_requests().into_iter().map(|r| r.command).collect();
    assert_eq!(group[0], MediaGroupCommand::Stop);
    assert!(group.contains(&MediaGroupCommand::Destroy));
    assert!(h
        .gateway_commands()
        .iter()
        .any(|c| matches!(c, GatewayCommand::DestroyEndpoint { .. })));

    // Nothing is left behind after a terminal state
    assert!(h.controller.snapshot().is_released());
}

#[tokio::test]
async fn test_unreachable_media_group_does_not_block_failure_teardown() {
    let mut h = Harness::new().await;
    h.drive_to_opening(true).await;
    h.gateway_commands();
    h.group_rx.close();

    h.send(connection_changed(ConnectionState::Closed)).await;
    assert_eq!(h.state(), CallState::Failed);
    assert!(h.controller.snapshot().is_released());
    assert!(h.gateway_commands().iter().any(|c| matches!(
        c,
        GatewayCommand::DestroyEndpoint { endpoint } if endpoint.0 == BRIDGE
    )));
}

#[tokio::test]
async fn test_unreachable_media_group_does_not_block_stopping() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;
    h.group_rx.close();

    h.send(ControllerMessage::CloseMediaSession).await;
    assert_eq!(h.state(), CallState::Stopping);
    assert!(h
        .gateway_commands()
        .iter()
        .any(|c| matches!(c, GatewayCommand::DestroyEndpoint { .. })));

    h.send(media_group_changed(MediaGroupState::Inactive)).await;
    assert!(!h.controller.snapshot().has_media_group);

    h.send(endpoint_changed(BRIDGE, EndpointState::Destroyed)).await;
    assert_eq!(h.state(), CallState::Inactive);
    assert!(h.controller.snapshot().is_released());
}

#[tokio::test]
async fn test_unreachable_gateway_does_not_block_endpoint_release() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;
    h.send(ControllerMessage::CloseMediaSession).await;
    h.gateway_rx.close();

    h.send(endpoint_changed(BRIDGE, EndpointState::Destroyed)).await;
    assert!(!h.controller.snapshot().has_bridge_endpoint);

    h.send(media_group_changed(MediaGroupState::Inactive)).await;
    assert_eq!(h.state(), CallState::Inactive);
    assert!(h.controller.snapshot().is_released());
}

#[tokio::test]
async fn test_media_group_failure_while_creating_fails_and_releases() {
    let mut h = Harness::new().await;
    h.drive_to_creating_media_group(true).await;

    h.send(media_group_changed(MediaGroupState::Inactive)).await;
    assert_eq!(h.state(), CallState::Failed);
    assert!(h.controller.snapshot().is_released());
}

#[tokio::test]
async fn test_half_open_connection_publishes_pending() {
    let mut h = Harness::new().await;
    h.drive_to_opening(false).await;
    h.gateway_commands();

    h.send(ControllerMessage::ConnectionStateChanged(opened(ConnectionState::HalfOpen)))
        .await;
    assert_eq!(h.state(), CallState::Pending);

    let changes = state_changes(h.observer_events());
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].state, ControllerState::Pending);
    let info = changes[0].session_info.clone().expect("Should carry session info");
    assert_eq!(info.local_sdp, LOCAL_SDP);

    // Early media, then the final answer through a descriptor update
    h.send(ControllerMessage::UpdateMediaSession {
        remote_sdp: "v=0\r\no=remote 2 2 IN IP4 10.0.0.2\r\n".to_string(),
    })
    .await;
    assert_eq!(h.state(), CallState::UpdatingRemoteConnection);
    assert!(h.gateway_commands().iter().any(|c| matches!(
        c,
        GatewayCommand::UpdateConnection { request, .. }
            if request.descriptor.as_deref() == Some("v=0\r\no=remote 2 2 IN IP4 10.0.0.2\r\n")
    )));

    h.send(ControllerMessage::ConnectionStateChanged(opened(ConnectionState::Open)))
        .await;
    assert_eq!(h.state(), CallState::Active);
    let changes = state_changes(h.observer_events());
    assert_eq!(changes[0].state, ControllerState::Active);
}

#[tokio::test]
async fn test_update_failure_fails_the_call() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;

    h.send(ControllerMessage::UpdateMediaSession {
        remote_sdp: REMOTE_SDP.to_string(),
    })
    .await;
    h.send(connection_changed(ConnectionState::Closed)).await;
    assert_eq!(h.state(), CallState::Failed);
}

#[tokio::test]
async fn test_mute_and_unmute_update_connection_mode() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;
    let connection = ConnectionId::from(CONNECTION);

    h.send(ControllerMessage::Mute).await;
    assert_eq!(h.state(), CallState::Muting);
    assert_eq!(
        h.gateway_commands(),
        vec![GatewayCommand::UpdateConnection {
            connection: connection.clone(),
            request: UpdateConnection::mode(ConnectionMode::SendOnly),
        }]
    );

    h.send(ControllerMessage::ConnectionStateChanged(opened(ConnectionState::Open)))
        .await;
    assert_eq!(h.state(), CallState::Active);

    h.send(ControllerMessage::Unmute).await;
    assert_eq!(h.state(), CallState::Unmuting);
    assert_eq!(
        h.gateway_commands(),
        vec![GatewayCommand::UpdateConnection {
            connection,
            request: UpdateConnection::mode(ConnectionMode::SendRecv),
        }]
    );
}

#[tokio::test]
async fn test_connection_closed_while_muting_tears_down() {
    let mut h = Harness::new().await;
    h.drive_to_active(true).await;

    h.send(ControllerMessage::Mute).await;
    h.send(connection_changed(ConnectionState::Closed)).await;
    assert_eq!(h.state(), CallState::ClosingRemoteConnection);
    assert!(h
        .gateway_commands()
        .iter()
        .any(|c| matches!(c, GatewayCommand::CloseConnection { .. })));

    h.send(connection_changed(ConnectionState::Closed)).await;
    assert_eq!(h.state(), CallState::Inactive);
    assert!(h.controller.snapshot().is_released());

    let changes = state_changes(h.observer_events());
    assert_eq!(changes.last().map(|c| c.state), Some(ControllerState::Inactive));
}

#[tokio::test]
async fn test_close_media_session_ignored_outside_closable_states() {
    let mut h = Harness::new().await;

    h.send(ControllerMessage::CloseMediaSession).await;
    assert_eq!(h.state(), CallState::Uninitialized);

    let create = h.create_media_session(true);
    h.send(create).await;
    h.send(ControllerMessage::CloseMediaSession).await;
    assert_eq!(h.state(), CallState::AcquiringMediaGateway);

    let mut h = Harness::new().await;
    h.drive_to_opening(true).await;
    h.send(ControllerMessage::CloseMediaSession).await;
    assert_eq!(h.state(), CallState::OpeningRemoteConnection);
}

#[tokio::test]
async fn test_close_media_session_during_acquisition_stops() {
    let mut h = Harness::new().await;
    h.drive_to_creating_media_group(true).await;

    h.send(ControllerMessage::CloseMediaSession).await;
    assert_eq!(h.state(), CallState::Stopping);
}

#[tokio::test]
async fn test_illegal_transition_is_reported_and_state_kept() {
    let mut h = Harness::new().await;

    let err = h
        .controller
        .handle(ControllerMessage::Mute)
        .await
        .expect_err("Should reject Mute before the session exists");
    assert!(err.is_illegal_transition());
    assert_eq!(h.state(), CallState::Uninitialized);
}

#[tokio::test]
async fn test_mismatched_gateway_response_is_rejected() {
    let mut h = Harness::new().await;
    h.drive_to_creating_media_group(true).await;
    h.send(media_group_changed(MediaGroupState::Active)).await;
    assert_eq!(h.state(), CallState::AcquiringRemoteConnection);

    let err = h
        .controller
        .handle(ControllerMessage::GatewayResponse(GatewayResponse::Info(GatewayInfo {
            name: "mms-2".to_string(),
            use_nat: false,
            external_ip: None,
        })))
        .await
        .expect_err("Should reject gateway info while waiting for a connection");
    assert!(matches!(err, ControllerError::UnexpectedEvent { .. }));
    assert_eq!(h.state(), CallState::AcquiringRemoteConnection);
}
