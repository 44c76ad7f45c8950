pub mod types;
pub mod yaml_loader;

pub use types::*;
pub use yaml_loader::YamlTableLoader;

use lazy_static::lazy_static;
use std::sync::Arc;

use crate::types::CallState;

/// Transition table specialised for the call controller
pub type CallStateTable = TransitionTable<CallState, Action>;

lazy_static! {
    /// The master state table - single source of truth for all transitions
    pub static ref MASTER_TABLE: Arc<CallStateTable> = Arc::new(build_master_table());
}

fn build_master_table() -> CallStateTable {
    let table = YamlTableLoader::load_embedded_default()
        .expect("Embedded default state table must be valid");

    if let Err(errors) = table.validate() {
        panic!("Invalid default state table: {:?}", errors);
    }

    tracing::debug!("Using embedded call controller state table");
    table
}
