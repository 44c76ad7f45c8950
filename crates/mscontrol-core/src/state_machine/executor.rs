use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{ControllerError, Result};
use crate::state_table::TransitionTable;

/// The transition being carried out while an action runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<S> {
    /// State that was exited
    pub from: S,
    /// State that was (or is about to be) entered
    pub to: S,
}

/// Runs the entry and exit actions declared in a [`TransitionTable`].
///
/// Actions may issue commands to external collaborators; the state machine
/// does not wait for their answers, only for the action itself to return.
#[async_trait]
pub trait ActionExecutor<S, A, E>: Send
where
    S: Send + Sync,
    A: Send + Sync,
    E: Send + Sync,
{
    async fn execute(&mut self, action: &A, step: Step<S>, event: &E) -> Result<()>;
}

/// Finite state machine over a fixed transition table
#[derive(Debug)]
pub struct StateMachine<S, A> {
    state: S,
    table: Arc<TransitionTable<S, A>>,
}

impl<S, A> StateMachine<S, A>
where
    S: Copy + Eq + Hash + Debug + Send + Sync,
    A: Debug + Send + Sync,
{
    pub fn new(initial: S, table: Arc<TransitionTable<S, A>>) -> Self {
        Self {
            state: initial,
            table,
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn is(&self, state: S) -> bool {
        self.state == state
    }

    pub fn table(&self) -> &Arc<TransitionTable<S, A>> {
        &self.table
    }

    /// Move to `target`, running the exit actions of the current state and
    /// then the entry actions of `target` with the same triggering event.
    ///
    /// Fails with `IllegalTransition` and leaves the state untouched when
    /// `(current, target)` is not in the table.
    pub async fn transition<E, X>(&mut self, executor: &mut X, event: &E, target: S) -> Result<()>
    where
        E: Send + Sync,
        X: ActionExecutor<S, A, E> + ?Sized,
    {
        let from = self.state;
        if !self.table.is_legal(from, target) {
            return Err(ControllerError::illegal_transition(from, target));
        }

        let step = Step { from, to: target };
        let table = Arc::clone(&self.table);

        for action in table.on_exit(from) {
            debug!("Exit action {:?} of {:?}", action, from);
            executor.execute(action, step, event).await?;
        }

        self.state = target;
        info!("Transition {:?} -> {:?}", from, target);

        for action in table.on_entry(target) {
            debug!("Entry action {:?} of {:?}", action, target);
            executor.execute(action, step, event).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_table::StateDefinition;

    #[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
    enum Door {
        Closed,
        Open,
        Locked,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Cmd {
        Chime,
        Latch,
    }

    #[derive(Default)]
    struct Log(Vec<(Cmd, Door, Door, &'static str)>);

    #[async_trait]
    impl ActionExecutor<Door, Cmd, &'static str> for Log {
        async fn execute(&mut self, action: &Cmd, step: Step<Door>, event: &&'static str) -> Result<()> {
            self.0.push((*action, step.from, step.to, *event));
            Ok(())
        }
    }

    fn table() -> Arc<TransitionTable<Door, Cmd>> {
        let mut table = TransitionTable::new();
        table.insert_state(Door::Closed, StateDefinition::default());
        table.insert_state(
            Door::Open,
            StateDefinition {
                on_entry: vec![Cmd::Chime],
                on_exit: vec![Cmd::Latch],
                terminal: false,
            },
        );
        table.insert_state(Door::Locked, StateDefinition::default());
        table.insert_transition(Door::Closed, Door::Open);
        table.insert_transition(Door::Open, Door::Closed);
        table.insert_transition(Door::Closed, Door::Locked);
        Arc::new(table)
    }

    #[tokio::test]
    async fn runs_exit_then_entry_with_the_same_event() {
        let mut fsm = StateMachine::new(Door::Closed, table());
        let mut log = Log::default();

        fsm.transition(&mut log, &"push", Door::Open).await.unwrap();
        fsm.transition(&mut log, &"pull", Door::Closed).await.unwrap();

        assert_eq!(fsm.state(), Door::Closed);
        assert_eq!(
            log.0,
            vec![
                (Cmd::Chime, Door::Closed, Door::Open, "push"),
                (Cmd::Latch, Door::Open, Door::Closed, "pull"),
            ]
        );
    }

    #[tokio::test]
    async fn illegal_transition_leaves_state_unchanged() {
        let mut fsm = StateMachine::new(Door::Closed, table());
        let mut log = Log::default();
        fsm.transition(&mut log, &"turn", Door::Locked).await.unwrap();

        let err = fsm.transition(&mut log, &"push", Door::Open).await.unwrap_err();
        assert!(err.is_illegal_transition());
        assert_eq!(fsm.state(), Door::Locked);
        assert!(log.0.is_empty());
    }
}
