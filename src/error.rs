//! Execution-time errors.

use crate::state_machine::State;
use thiserror::Error;

/// Hard faults raised by a motion port. A fault aborts the motion that
/// caused it but leaves the port usable.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MotionFault {
    #[error("target {component} = {value} is outside workspace limits [{min}, {max}]")]
    OutOfWorkspace {
        component: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("joint count mismatch: expected {expected}, got {found}")]
    JointCountMismatch { expected: usize, found: usize },
}

/// Errors returned by the executor.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExecutionError {
    #[error("cannot start execution from state {0:?}")]
    NotRunning(State),

    #[error("{command} is missing its '{argument}' argument")]
    MissingArgument {
        command: String,
        argument: &'static str,
    },

    #[error("{command} failed: {source}")]
    Fault {
        command: String,
        #[source]
        source: MotionFault,
    },
}
