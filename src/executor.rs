//! Dispatches an instruction stream against a [`MotionPort`].
//!
//! The executor owns a [`StateMachine`] with the standard controller table.
//! A run starts with the `start` event, dispatches instructions for as long
//! as the machine stays `Running` and finishes with `complete`. Timed waits
//! detour through `Waiting` for their duration.
//!
//! Instructions that are not motions or waits (declarations, assignments,
//! branch markers) carry no runtime effect and are skipped.

use crate::error::{ExecutionError, MotionFault};
use crate::generator::{AXIS_INFORMATION, DURATION_TIME, Instruction, POSITION_INFORMATION};
use crate::motion::{MotionParameters, MotionPort, MotionType};
use crate::state_machine::{State, StateMachine};
use crate::value::Value;
use tracing::{debug, error, info};

/// Runtime category of an instruction command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Ptp,
    Lin,
    Circ,
    Spline,
    Wait,
}

impl CommandCategory {
    /// Returns `None` for commands the executor does not dispatch.
    pub fn from_command(command: &str) -> Option<Self> {
        Some(match command {
            "PTP" => Self::Ptp,
            "LIN" => Self::Lin,
            "CIRC" => Self::Circ,
            "SPLINE" => Self::Spline,
            "WAIT" => Self::Wait,
            _ => return None,
        })
    }

    pub fn motion_type(self) -> Option<MotionType> {
        match self {
            Self::Ptp => Some(MotionType::Ptp),
            Self::Lin => Some(MotionType::Lin),
            Self::Circ => Some(MotionType::Circ),
            Self::Spline => Some(MotionType::Spline),
            Self::Wait => None,
        }
    }
}

/// Outcome of one [`Executor::run`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionReport {
    /// Instructions handed to the motion port successfully.
    pub dispatched: usize,
    /// Commands that were not dispatched, in stream order.
    pub skipped: Vec<String>,
    /// Instructions that were dispatched but failed.
    pub faults: Vec<ExecutionError>,
    /// State of the machine once the run returned.
    pub final_state: State,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Runs instruction streams against a motion port, gated by a
/// [`StateMachine`].
pub struct Executor<P: MotionPort> {
    machine: StateMachine,
    port: P,
    parameters: MotionParameters,
}

impl<P: MotionPort> Executor<P> {
    /// Wraps `port` with an `Idle` machine and default motion parameters.
    pub fn new(port: P) -> Self {
        Self {
            machine: StateMachine::with_standard_transitions(),
            port,
            parameters: MotionParameters::default(),
        }
    }

    /// Replaces the dynamic limits used for every dispatched move.
    pub fn with_parameters(mut self, parameters: MotionParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameters(&self) -> &MotionParameters {
        &self.parameters
    }

    /// Current state of the controller machine.
    pub fn state(&self) -> State {
        self.machine.current()
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.machine
    }

    /// For registering entry / exit handlers and actions.
    pub fn state_machine_mut(&mut self) -> &mut StateMachine {
        &mut self.machine
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consumes the executor, handing back the motion port.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Runs `instructions` in order.
    ///
    /// Fails only if the machine cannot be started (e.g. it is `Stopped`
    /// and needs a `reset`). Motion faults are collected in the report and
    /// abort only the instruction that raised them.
    pub fn run(
        &mut self,
        instructions: &[Instruction],
    ) -> Result<ExecutionReport, ExecutionError> {
        if !self.machine.trigger("start") || self.machine.current() != State::Running {
            return Err(ExecutionError::NotRunning(self.machine.current()));
        }
        info!(instructions = instructions.len(), "execution started");

        let mut report = ExecutionReport::default();
        for (index, instruction) in instructions.iter().enumerate() {
            if self.machine.current() != State::Running {
                info!(index, state = %self.machine.current(), "execution interrupted");
                break;
            }

            let Some(category) = CommandCategory::from_command(&instruction.command) else {
                debug!(index, command = %instruction.command, "skipping instruction");
                report.skipped.push(instruction.command.clone());
                continue;
            };

            match self.dispatch(category, instruction) {
                Ok(()) => report.dispatched += 1,
                Err(err) => {
                    error!(index, %err, "instruction failed");
                    report.faults.push(err);
                }
            }
        }

        if self.machine.current() == State::Running {
            self.machine.trigger("complete");
        }
        report.final_state = self.machine.current();
        info!(
            dispatched = report.dispatched,
            faults = report.faults.len(),
            state = %report.final_state,
            "execution finished"
        );
        Ok(report)
    }

    fn dispatch(
        &mut self,
        category: CommandCategory,
        instruction: &Instruction,
    ) -> Result<(), ExecutionError> {
        let command = &instruction.command;
        let missing = |argument: &'static str| ExecutionError::MissingArgument {
            command: command.clone(),
            argument,
        };
        let fault = |source: MotionFault| ExecutionError::Fault {
            command: command.clone(),
            source,
        };

        let Some(motion) = category.motion_type() else {
            let seconds = instruction
                .arg(DURATION_TIME)
                .and_then(Value::as_number)
                .ok_or_else(|| missing(DURATION_TIME))?;

            self.machine.convert_to(State::Waiting);
            self.port.wait(seconds);
            self.machine.convert_to(State::Running);
            return Ok(());
        };

        if let Some(Value::Axis(axes)) = instruction.arg(AXIS_INFORMATION) {
            debug!(%command, %axes, "dispatching joint move");
            return self
                .port
                .move_joints(&axes.to_array(), &self.parameters)
                .map_err(fault);
        }

        let pose = instruction
            .arg(POSITION_INFORMATION)
            .and_then(Value::as_pose)
            .ok_or_else(|| missing(POSITION_INFORMATION))?;
        debug!(%command, %pose, "dispatching move");
        self.port
            .move_to_pose(pose, motion, &self.parameters)
            .map_err(fault)
    }

    /// Fires `stop` and halts the port. Returns whether the event matched.
    pub fn stop(&mut self) -> bool {
        let stopped = self.machine.trigger("stop");
        if stopped {
            self.port.stop();
        }
        stopped
    }

    /// Halts the port unconditionally, then fires `emergency`.
    pub fn emergency_stop(&mut self) -> bool {
        self.port.emergency_stop();
        self.machine.trigger("emergency")
    }

    /// Fires `reset`, returning the machine to `Idle` from `Stopped` or
    /// `Emergency`.
    pub fn reset(&mut self) -> bool {
        self.machine.trigger("reset")
    }

    /// Fires `start` outside of [`run`](Self::run), e.g. to drive the
    /// machine by hand.
    pub fn start(&mut self) -> bool {
        self.machine.trigger("start")
    }
}
