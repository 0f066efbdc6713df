//! Execution states and the event-driven machine that moves between them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    #[default]
    Idle,
    Running,
    Waiting,
    Stopped,
    Emergency,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Stopped => "STOPPED",
            Self::Emergency => "EMERGENCY",
        })
    }
}

/// `from --event--> to`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub event: String,
}

type Handler = Box<dyn FnMut()>;

/// A small table-driven state machine.
///
/// Events are matched against the transition table in insertion order; the
/// first transition leaving the current state on that event wins. Direct
/// conversions bypass the table entirely and are how the executor models
/// the `Waiting` detour of a timed wait.
pub struct StateMachine {
    current: State,
    transitions: Vec<Transition>,
    entry_handlers: HashMap<State, Handler>,
    exit_handlers: HashMap<State, Handler>,
    actions: HashMap<State, Handler>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(State::Idle)
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}

impl StateMachine {
    pub fn new(initial: State) -> Self {
        Self {
            current: initial,
            transitions: Vec::new(),
            entry_handlers: HashMap::new(),
            exit_handlers: HashMap::new(),
            actions: HashMap::new(),
        }
    }

    /// A machine starting in `Idle` with the controller's start / stop /
    /// emergency / complete / reset table.
    pub fn with_standard_transitions() -> Self {
        use State::*;
        let mut machine = Self::new(Idle);
        for (from, to, event) in [
            (Idle, Running, "start"),
            (Running, Stopped, "stop"),
            (Running, Emergency, "emergency"),
            (Running, Idle, "complete"),
            (Waiting, Stopped, "stop"),
            (Waiting, Emergency, "emergency"),
            (Stopped, Idle, "reset"),
            (Emergency, Idle, "reset"),
        ] {
            machine.add_transition(from, to, event);
        }
        machine
    }

    pub fn current(&self) -> State {
        self.current
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn add_transition(&mut self, from: State, to: State, event: impl Into<String>) {
        self.transitions.push(Transition {
            from,
            to,
            event: event.into(),
        });
    }

    pub fn on_entry(&mut self, state: State, handler: impl FnMut() + 'static) {
        self.entry_handlers.insert(state, Box::new(handler));
    }

    pub fn on_exit(&mut self, state: State, handler: impl FnMut() + 'static) {
        self.exit_handlers.insert(state, Box::new(handler));
    }

    /// Registers the action run each time `state` is entered, after its
    /// entry handler.
    pub fn on_action(&mut self, state: State, action: impl FnMut() + 'static) {
        self.actions.insert(state, Box::new(action));
    }

    /// Resets the current state without running exit handlers. The entry
    /// handler of `state` still runs.
    pub fn set_initial_state(&mut self, state: State) {
        self.current = state;
        if let Some(handler) = self.entry_handlers.get_mut(&state) {
            handler();
        }
    }

    /// Moves to `state` unconditionally: exit handler of the old state,
    /// entry handler of the new one, then its action.
    pub fn convert_to(&mut self, state: State) {
        let old = self.current;
        if let Some(handler) = self.exit_handlers.get_mut(&old) {
            handler();
        }

        self.current = state;
        if let Some(handler) = self.entry_handlers.get_mut(&state) {
            handler();
        }
        if let Some(action) = self.actions.get_mut(&state) {
            action();
        }

        info!(from = %old, to = %state, "state transition");
    }

    /// Fires `event`. Returns `false` and leaves the state untouched when no
    /// transition matches.
    pub fn trigger(&mut self, event: &str) -> bool {
        let target = self
            .transitions
            .iter()
            .find(|t| t.from == self.current && t.event == event)
            .map(|t| t.to);

        match target {
            Some(to) => {
                self.convert_to(to);
                true
            }
            None => {
                warn!(event, state = %self.current, "no transition found");
                false
            }
        }
    }
}
