pub mod executor;
pub mod actions;

pub use executor::{ActionExecutor, StateMachine, Step};
