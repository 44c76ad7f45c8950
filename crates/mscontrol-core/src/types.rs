//! Core types for mscontrol-core
//!
//! Identifiers, resource states reported by the media gateway, and the
//! command payloads exchanged with the gateway and the media group.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::errors::ControllerError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(format!(concat!($prefix, "-{}"), uuid::Uuid::new_v4()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

uuid_id!(
    /// Identity of one call controller instance
    ControllerId, "controller"
);
uuid_id!(
    /// Identity of an observer; the registry deduplicates on it
    ObserverId, "observer"
);
uuid_id!(
    /// Call the media session belongs to
    CallId, "call"
);
uuid_id!(AccountId, "account");
uuid_id!(RecordingId, "recording");
uuid_id!(
    /// Gateway-side media session
    MediaSessionId, "media-session"
);
uuid_id!(
    /// Gateway endpoint (bridge endpoint, conference endpoint, ...)
    EndpointId, "endpoint"
);
uuid_id!(ConnectionId, "connection");
uuid_id!(LinkId, "link");
uuid_id!(MediaGroupId, "media-group");

/// Connection identifier assigned by the gateway once a connection is open
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConnectionIdentifier(pub String);

impl fmt::Display for ConnectionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal lifecycle state of a call controller
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallState {
    Uninitialized,
    // Acquisition
    AcquiringMediaGateway,
    AcquiringMediaGatewayInfo,
    AcquiringMediaSession,
    AcquiringBridge,
    CreatingMediaGroup,
    // Remote connection
    AcquiringRemoteConnection,
    InitializingRemoteConnection,
    OpeningRemoteConnection,
    UpdatingRemoteConnection,
    Pending,
    Active,
    Muting,
    Unmuting,
    // Internal link (bridge / conference)
    AcquiringInternalLink,
    InitializingInternalLink,
    OpeningInternalLink,
    UpdatingInternalLink,
    ClosingInternalLink,
    // Teardown
    ClosingRemoteConnection,
    Stopping,
    Inactive,
    Failed,
}

impl CallState {
    pub const ALL: [CallState; 23] = [
        CallState::Uninitialized,
        CallState::AcquiringMediaGateway,
        CallState::AcquiringMediaGatewayInfo,
        CallState::AcquiringMediaSession,
        CallState::AcquiringBridge,
        CallState::CreatingMediaGroup,
        CallState::AcquiringRemoteConnection,
        CallState::InitializingRemoteConnection,
        CallState::OpeningRemoteConnection,
        CallState::UpdatingRemoteConnection,
        CallState::Pending,
        CallState::Active,
        CallState::Muting,
        CallState::Unmuting,
        CallState::AcquiringInternalLink,
        CallState::InitializingInternalLink,
        CallState::OpeningInternalLink,
        CallState::UpdatingInternalLink,
        CallState::ClosingInternalLink,
        CallState::ClosingRemoteConnection,
        CallState::Stopping,
        CallState::Inactive,
        CallState::Failed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Inactive | CallState::Failed)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Uninitialized => "uninitialized",
            CallState::AcquiringMediaGateway => "acquiring media gateway",
            CallState::AcquiringMediaGatewayInfo => "acquiring media gateway info",
            CallState::AcquiringMediaSession => "acquiring media session",
            CallState::AcquiringBridge => "acquiring media bridge",
            CallState::CreatingMediaGroup => "creating media group",
            CallState::AcquiringRemoteConnection => "acquiring connection",
            CallState::InitializingRemoteConnection => "initializing connection",
            CallState::OpeningRemoteConnection => "opening connection",
            CallState::UpdatingRemoteConnection => "updating connection",
            CallState::Pending => "pending",
            CallState::Active => "active",
            CallState::Muting => "muting",
            CallState::Unmuting => "unmuting",
            CallState::AcquiringInternalLink => "acquiring link",
            CallState::InitializingInternalLink => "initializing link",
            CallState::OpeningInternalLink => "opening link",
            CallState::UpdatingInternalLink => "updating link",
            CallState::ClosingInternalLink => "closing link",
            CallState::ClosingRemoteConnection => "closing connection",
            CallState::Stopping => "stopping",
            CallState::Inactive => "inactive",
            CallState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Externally broadcast lifecycle phase, coarser than [`CallState`]
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ControllerState {
    Active,
    Pending,
    Inactive,
    Failed,
}

/// MGCP connection mode
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConnectionMode {
    SendRecv,
    SendOnly,
    RecvOnly,
    Confrnce,
    Inactive,
}

impl Default for ConnectionMode {
    fn default() -> Self {
        ConnectionMode::Inactive
    }
}

impl FromStr for ConnectionMode {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sendrecv" => Ok(ConnectionMode::SendRecv),
            "sendonly" => Ok(ConnectionMode::SendOnly),
            "recvonly" => Ok(ConnectionMode::RecvOnly),
            "confrnce" => Ok(ConnectionMode::Confrnce),
            "inactive" => Ok(ConnectionMode::Inactive),
            other => Err(ControllerError::Configuration(format!(
                "Unknown connection mode: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            ConnectionMode::SendRecv => "sendrecv",
            ConnectionMode::SendOnly => "sendonly",
            ConnectionMode::RecvOnly => "recvonly",
            ConnectionMode::Confrnce => "confrnce",
            ConnectionMode::Inactive => "inactive",
        };
        f.write_str(mode)
    }
}

/// State reported by a gateway connection
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConnectionState {
    Closed,
    HalfOpen,
    Open,
}

/// State reported by a gateway link
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum LinkState {
    Closed,
    Open,
}

/// State reported by a gateway endpoint
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum EndpointState {
    Created,
    Destroyed,
    Failed,
}

/// State reported by a media group
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MediaGroupState {
    Active,
    Inactive,
}

/// Which side of a link an update applies to
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum LinkSide {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MediaType {
    AudioOnly,
    VideoOnly,
    AudioVideo,
}

/// Gateway facts needed to describe the session to signaling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub name: String,
    pub use_nat: bool,
    pub external_ip: Option<IpAddr>,
}

/// Session information broadcast with ACTIVE and PENDING
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSessionInfo {
    pub use_nat: bool,
    pub external_ip: Option<IpAddr>,
    pub local_sdp: String,
    pub remote_sdp: String,
}

/// Any gateway resource a controller can observe
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum ResourceRef {
    Endpoint(EndpointId),
    Connection(ConnectionId),
    Link(LinkId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenConnection {
    /// Remote descriptor; absent for outbound calls, where the gateway offers first
    pub descriptor: Option<String>,
    pub mode: ConnectionMode,
    pub webrtc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConnection {
    pub descriptor: Option<String>,
    pub mode: Option<ConnectionMode>,
}

impl UpdateConnection {
    pub fn descriptor(sdp: impl Into<String>) -> Self {
        Self {
            descriptor: Some(sdp.into()),
            mode: None,
        }
    }

    pub fn mode(mode: ConnectionMode) -> Self {
        Self {
            descriptor: None,
            mode: Some(mode),
        }
    }
}

/// Record request understood by the media group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Destination of the recording; the media server picks one when absent
    pub uri: Option<String>,
    pub timeout_secs: u32,
    pub max_length_secs: u32,
    pub finish_on_key: String,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Play {
    pub uris: Vec<String>,
    pub iterations: u32,
}

/// DTMF collection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collect {
    pub prompts: Vec<String>,
    pub timeout_secs: u32,
    pub finish_on_key: String,
    pub num_digits: Option<u32>,
}

/// Stop the current media operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stop {
    /// Persist a recording record when a recording is stopped
    pub create_record: bool,
}
