use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// Commands a call controller issues when it enters or leaves a state.
///
/// Each variant names one step toward the media gateway, the media group,
/// or the observers. The state table binds them to states; the
/// `state_machine::actions` module gives them meaning.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    // Acquisition
    RequestMediaGateway,
    RequestGatewayInfo,
    CreateMediaSession,
    CreateBridgeEndpoint,
    StartMediaGroup,

    // Remote connection
    CreateConnection,
    InitializeConnection,
    OpenConnection,
    UpdateRemoteDescriptor,
    MuteConnection,
    UnmuteConnection,
    CloseConnection,

    // Internal link
    CreateLink,
    InitializeLink,
    OpenLink,
    UpdateLink,
    CloseLink,
    DestroyLink,

    // Notifications
    PublishPending,
    PublishActive,
    PublishInactive,
    PublishFailed,

    // Teardown
    TerminateResources,
    ReleaseResources,
}

/// Entry and exit actions of one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDefinition<A> {
    pub on_entry: Vec<A>,
    pub on_exit: Vec<A>,
    pub terminal: bool,
}

impl<A> Default for StateDefinition<A> {
    fn default() -> Self {
        Self {
            on_entry: Vec::new(),
            on_exit: Vec::new(),
            terminal: false,
        }
    }
}

/// Fixed directed graph of legal transitions plus per-state actions.
///
/// Built once at load time and shared read-only between every state
/// machine that uses it.
#[derive(Debug, Clone)]
pub struct TransitionTable<S, A> {
    states: HashMap<S, StateDefinition<A>>,
    transitions: HashSet<(S, S)>,
}

impl<S, A> TransitionTable<S, A>
where
    S: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            transitions: HashSet::new(),
        }
    }

    pub fn insert_state(&mut self, state: S, definition: StateDefinition<A>) {
        self.states.insert(state, definition);
    }

    pub fn insert_transition(&mut self, from: S, to: S) {
        self.transitions.insert((from, to));
    }

    /// Whether `(from, to)` belongs to the legal-transition set
    pub fn is_legal(&self, from: S, to: S) -> bool {
        self.transitions.contains(&(from, to))
    }

    pub fn has_state(&self, state: S) -> bool {
        self.states.contains_key(&state)
    }

    pub fn on_entry(&self, state: S) -> &[A] {
        self.states
            .get(&state)
            .map(|d| d.on_entry.as_slice())
            .unwrap_or(&[])
    }

    pub fn on_exit(&self, state: S) -> &[A] {
        self.states
            .get(&state)
            .map(|d| d.on_exit.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_terminal(&self, state: S) -> bool {
        self.states.get(&state).map(|d| d.terminal).unwrap_or(false)
    }

    pub fn states(&self) -> impl Iterator<Item = S> + '_ {
        self.states.keys().copied()
    }

    pub fn transitions(&self) -> impl Iterator<Item = (S, S)> + '_ {
        self.transitions.iter().copied()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// States reachable from `from` in one step
    pub fn targets(&self, from: S) -> Vec<S> {
        self.transitions
            .iter()
            .filter(|(f, _)| *f == from)
            .map(|(_, t)| *t)
            .collect()
    }

    /// Check the table for consistency
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (from, to) in &self.transitions {
            if !self.states.contains_key(from) {
                errors.push(format!("Transition source {:?} is not a declared state", from));
            }
            if !self.states.contains_key(to) {
                errors.push(format!("Transition target {:?} is not a declared state", to));
            }
        }

        for (state, definition) in &self.states {
            if definition.terminal {
                continue;
            }
            if !self.transitions.iter().any(|(f, _)| f == state) {
                errors.push(format!("State {:?} has no exit transitions", state));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl<S, A> Default for TransitionTable<S, A>
where
    S: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
    enum Light {
        Red,
        Green,
        Off,
    }

    #[test]
    fn validate_reports_undeclared_and_dead_end_states() {
        let mut table: TransitionTable<Light, ()> = TransitionTable::new();
        table.insert_state(Light::Red, StateDefinition::default());
        table.insert_state(Light::Green, StateDefinition::default());
        table.insert_transition(Light::Red, Light::Off);

        let errors = table.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Off")));
        assert!(errors.iter().any(|e| e.contains("Green has no exit")));
    }

    #[test]
    fn terminal_states_need_no_exit() {
        let mut table: TransitionTable<Light, ()> = TransitionTable::new();
        table.insert_state(Light::Red, StateDefinition::default());
        table.insert_state(
            Light::Off,
            StateDefinition {
                terminal: true,
                ..Default::default()
            },
        );
        table.insert_transition(Light::Red, Light::Off);

        assert!(table.validate().is_ok());
        assert!(table.is_legal(Light::Red, Light::Off));
        assert!(!table.is_legal(Light::Off, Light::Red));
        assert_eq!(table.targets(Light::Red), vec![Light::Off]);
    }
}
