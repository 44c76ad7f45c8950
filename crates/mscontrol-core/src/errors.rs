use thiserror::Error;

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Controller-related errors
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Unexpected event in state {state}: {event}")]
    UnexpectedEvent { state: String, event: String },

    #[error("Missing resource: {0}")]
    MissingResource(&'static str),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Media group error: {0}")]
    MediaGroup(String),

    #[error("Recording error: {0}")]
    Recording(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("State table error: {0}")]
    StateTable(String),

    #[error("Controller is no longer reachable")]
    Detached,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    pub fn illegal_transition<S: std::fmt::Debug>(from: S, to: S) -> Self {
        Self::IllegalTransition {
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        }
    }

    pub fn unexpected_event<S: std::fmt::Debug>(state: S, event: impl Into<String>) -> Self {
        Self::UnexpectedEvent {
            state: format!("{:?}", state),
            event: event.into(),
        }
    }

    /// True when the error is a protocol-contract violation of the state graph
    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, Self::IllegalTransition { .. })
    }
}
