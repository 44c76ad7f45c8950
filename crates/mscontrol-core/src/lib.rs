//! # MSControl-Core
//!
//! Per-call media session control for RVoIP.
//!
//! This crate provides:
//! - A call controller that drives one call's media path on a media gateway:
//!   gateway, media session, bridge endpoint, media group, remote connection,
//!   and internal links used to join bridges and conferences
//! - A generic state machine over a YAML-defined transition table
//! - Facade traits for the media resource broker, the gateway and the media group,
//!   with channel-backed implementations
//! - An observer registry for controller lifecycle broadcasts
//! - Call recording with duration measurement and metadata persistence
//!
//! ## Architecture
//!
//! Each controller runs as its own task and handles its inbox one message
//! at a time. Collaborators never block it: commands go out through the
//! facades, answers come back as ordinary inbox messages and are matched to
//! the pending operation by the controller's current state.

pub mod adapters;
pub mod config;
pub mod controller;
pub mod errors;
pub mod logging;
pub mod observers;
pub mod recording;
pub mod state_machine;
pub mod state_table;
pub mod types;

pub use adapters::{
    ChannelMediaGateway, ChannelMediaGroup, ChannelResourceBroker, GatewayCommand, MediaGateway,
    MediaGroup, MediaGroupCommand, MediaResourceBroker,
};
pub use config::{ControllerConfig, RecordingConfig, RuntimeSettings};
pub use controller::{
    CallController, CallNotification, CallerRef, ContextSnapshot, ControllerMessage, ControllerRef,
};
pub use errors::{ControllerError, Result};
pub use logging::{setup_logging, LoggingConfig};
pub use observers::{ControllerStateChanged, Observer, ObserverEvent, ObserverRegistry};
pub use recording::{
    AudioDurationProbe, MemoryRecordingStore, Recording, RecordingStore, WavDurationProbe,
};
pub use state_machine::{ActionExecutor, StateMachine, Step};
pub use state_table::{Action, CallStateTable, TransitionTable, MASTER_TABLE};
pub use types::{CallState, ConnectionMode, ControllerState};
