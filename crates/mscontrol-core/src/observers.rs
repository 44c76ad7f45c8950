//! Observer registry
//!
//! Interested parties subscribe to a controller and receive its coarse
//! lifecycle changes (ACTIVE, PENDING, INACTIVE, FAILED). The registry is
//! the only controller state touched outside the controller's own message
//! loop, so it is backed by a concurrent map keyed by observer identity.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::types::{ControllerId, ControllerState, MediaSessionInfo, ObserverId};

/// Notification broadcast to observers when the controller changes phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStateChanged {
    pub controller: ControllerId,
    pub state: ControllerState,
    pub session_info: Option<MediaSessionInfo>,
}

/// Everything an observer can receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    /// Acknowledges a subscription
    Observing(ControllerId),
    StateChanged(ControllerStateChanged),
}

/// Addressable listener
#[derive(Debug, Clone)]
pub struct Observer {
    id: ObserverId,
    tx: mpsc::UnboundedSender<ObserverEvent>,
}

impl Observer {
    pub fn new(id: ObserverId, tx: mpsc::UnboundedSender<ObserverEvent>) -> Self {
        Self { id, tx }
    }

    /// Create an observer with a fresh identity and the receiving end of its mailbox
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ObserverEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ObserverId::new(), tx), rx)
    }

    pub fn id(&self) -> &ObserverId {
        &self.id
    }

    /// Deliver an event; returns false when the observer has gone away
    pub fn notify(&self, event: ObserverEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Set of observers, deduplicated by [`ObserverId`]
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    observers: DashMap<ObserverId, Observer>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Returns false if one with the same identity was
    /// already registered, in which case the registration is replaced.
    pub fn subscribe(&self, observer: Observer) -> bool {
        let id = observer.id.clone();
        let added = self.observers.insert(id.clone(), observer).is_none();
        debug!("Observer {} subscribed (new: {})", id, added);
        added
    }

    pub fn unsubscribe(&self, id: &ObserverId) -> bool {
        self.observers.remove(id).is_some()
    }

    pub fn contains(&self, id: &ObserverId) -> bool {
        self.observers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn clear(&self) {
        self.observers.clear();
    }

    /// Deliver `event` once to every registered observer.
    ///
    /// Observers whose mailbox is closed are dropped from the registry.
    pub fn broadcast(&self, event: ObserverEvent) {
        let mut gone = Vec::new();
        for entry in self.observers.iter() {
            if !entry.value().notify(event.clone()) {
                gone.push(entry.key().clone());
            }
        }
        for id in gone {
            warn!("Dropping observer {} with closed mailbox", id);
            self.observers.remove(&id);
        }
    }
}
