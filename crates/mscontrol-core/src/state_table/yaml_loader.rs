//! YAML loader for transition tables
//!
//! A table document lists the states with their entry/exit actions and,
//! per source state, the states it may move to:
//!
//! ```yaml
//! version: "1.0"
//! states:
//!   - name: Idle
//!   - name: Running
//!     on_entry: [Start]
//!     on_exit: [Stop]
//!   - name: Done
//!     terminal: true
//! transitions:
//!   - from: Idle
//!     to: [Running]
//!   - from: Running
//!     to: [Done]
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::Path;
use tracing::debug;

use super::types::{Action, StateDefinition, TransitionTable};
use crate::errors::{ControllerError, Result};
use crate::types::CallState;

/// Embedded default table for the call controller
const DEFAULT_TABLE: &str = include_str!("../../state_tables/call_controller.yaml");

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "S: DeserializeOwned, A: DeserializeOwned"))]
struct YamlStateTable<S, A> {
    #[serde(default)]
    version: Option<String>,
    states: Vec<YamlState<S, A>>,
    transitions: Vec<YamlTransition<S>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "S: DeserializeOwned, A: DeserializeOwned"))]
struct YamlState<S, A> {
    name: S,
    #[serde(default = "Vec::new")]
    on_entry: Vec<A>,
    #[serde(default = "Vec::new")]
    on_exit: Vec<A>,
    #[serde(default)]
    terminal: bool,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "S: DeserializeOwned"))]
struct YamlTransition<S> {
    from: S,
    to: Vec<S>,
}

pub struct YamlTableLoader;

impl YamlTableLoader {
    /// Load the call controller table shipped with the crate
    pub fn load_embedded_default() -> Result<TransitionTable<CallState, Action>> {
        Self::load_from_str(DEFAULT_TABLE)
    }

    /// Parse a table from YAML text
    pub fn load_from_str<S, A>(yaml: &str) -> Result<TransitionTable<S, A>>
    where
        S: Copy + Eq + Hash + Debug + DeserializeOwned,
        A: DeserializeOwned,
    {
        let raw: YamlStateTable<S, A> = serde_yaml::from_str(yaml)
            .map_err(|e| ControllerError::StateTable(format!("Failed to parse YAML: {}", e)))?;

        let mut table = TransitionTable::new();
        let state_count = raw.states.len();

        for state in raw.states {
            if table.has_state(state.name) {
                return Err(ControllerError::StateTable(format!(
                    "State {:?} declared twice",
                    state.name
                )));
            }
            table.insert_state(
                state.name,
                StateDefinition {
                    on_entry: state.on_entry,
                    on_exit: state.on_exit,
                    terminal: state.terminal,
                },
            );
        }

        for transition in raw.transitions {
            for to in transition.to {
                table.insert_transition(transition.from, to);
            }
        }

        debug!(
            "Loaded state table version {} with {} states and {} transitions",
            raw.version.as_deref().unwrap_or("unversioned"),
            state_count,
            table.transition_count()
        );

        Ok(table)
    }

    /// Parse a table from a YAML file
    pub fn load_from_file<S, A>(path: impl AsRef<Path>) -> Result<TransitionTable<S, A>>
    where
        S: Copy + Eq + Hash + Debug + DeserializeOwned,
        A: DeserializeOwned,
    {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }
}
