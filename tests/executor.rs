// tests/executor.rs
use pretty_assertions::assert_eq;
use robot_script::{
    CommandCategory, ExecutionError, Executor, Instruction, MotionConfig, MotionFault,
    MotionParameters, MotionPort, MotionType, POSITION_INFORMATION, Position, SimulatedMotion,
    State, Value, compile,
};

/// A port that records every call instead of moving anything.
#[derive(Debug, Default)]
struct RecordingPort {
    calls: Vec<Call>,
    pose: Position,
    joints: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Move(MotionType, Position, f64),
    Joints(Vec<f64>),
    Wait(f64),
    Stop,
    Emergency,
}

impl MotionPort for RecordingPort {
    fn move_to_pose(
        &mut self,
        target: Position,
        motion: MotionType,
        params: &MotionParameters,
    ) -> Result<(), MotionFault> {
        self.calls.push(Call::Move(motion, target, params.velocity));
        self.pose = target;
        Ok(())
    }

    fn move_joints(
        &mut self,
        joints: &[f64],
        _params: &MotionParameters,
    ) -> Result<(), MotionFault> {
        self.calls.push(Call::Joints(joints.to_vec()));
        self.joints = joints.to_vec();
        Ok(())
    }

    fn wait(&mut self, seconds: f64) {
        self.calls.push(Call::Wait(seconds));
    }

    fn stop(&mut self) {
        self.calls.push(Call::Stop);
    }

    fn emergency_stop(&mut self) {
        self.calls.push(Call::Emergency);
    }

    fn is_moving(&self) -> bool {
        false
    }

    fn current_pose(&self) -> Position {
        self.pose
    }

    fn current_joints(&self) -> Vec<f64> {
        self.joints.clone()
    }
}

fn instructions(source: &str) -> Vec<Instruction> {
    let compilation = compile(source);
    assert!(
        !compilation.has_errors(),
        "unexpected errors: {:?}",
        compilation.diagnostics
    );
    compilation.instructions
}

#[test]
fn test_command_categories() {
    assert_eq!(CommandCategory::from_command("PTP"), Some(CommandCategory::Ptp));
    assert_eq!(CommandCategory::from_command("WAIT"), Some(CommandCategory::Wait));
    assert_eq!(CommandCategory::from_command("IF_START"), None);
    assert_eq!(CommandCategory::from_command("ptp"), None);
    assert_eq!(CommandCategory::Wait.motion_type(), None);
    assert_eq!(CommandCategory::Lin.motion_type(), Some(MotionType::Lin));
}

#[test]
fn test_wait_dispatch() {
    let program = instructions("WAIT(2)\n");
    let mut executor = Executor::new(RecordingPort::default());

    let report = executor.run(&program).unwrap();
    assert_eq!(report.dispatched, 1);
    assert_eq!(executor.port().calls, vec![Call::Wait(2.0)]);
    assert_eq!(executor.state(), State::Idle);
    assert_eq!(report.final_state, State::Idle);
}

#[test]
fn test_full_program() {
    let source = "\
DEF main()
  DECL POS home = {x 0.0, y 0.0, z 500.0}
  DECL POS work = {x 200.0, y 100.0, z 300.0}
  DECL AXIS rest = {A2 -90.0, A3 90.0}
  DECL INT cycles = 2
  PTP home
  IF cycles > 1 THEN
    LIN work
    WAIT(0.5)
  ELSE
    CIRC work
  ENDIF
  PTP rest
END
";
    let program = instructions(source);
    let mut executor = Executor::new(RecordingPort::default());
    let report = executor.run(&program).unwrap();

    let home = Position::new(0.0, 0.0, 500.0, 0.0, 0.0, 0.0);
    let work = Position::new(200.0, 100.0, 300.0, 0.0, 0.0, 0.0);
    assert_eq!(
        executor.port().calls,
        vec![
            Call::Move(MotionType::Ptp, home, 100.0),
            Call::Move(MotionType::Lin, work, 100.0),
            Call::Wait(0.5),
            Call::Joints(vec![0.0, -90.0, 90.0, 0.0, 0.0, 0.0]),
        ]
    );
    assert_eq!(report.dispatched, 4);
    assert!(report.is_clean());
    assert!(report.skipped.contains(&"IF_START".to_string()));
    assert!(report.skipped.contains(&"POSITION_DECL".to_string()));
}

#[test]
fn test_parameters_are_forwarded() {
    let program = instructions("DECL POS p = {x 1.0}\nLIN p\n");
    let slow = MotionParameters {
        velocity: 10.0,
        ..MotionParameters::default()
    };
    let mut executor = Executor::new(RecordingPort::default()).with_parameters(slow);

    executor.run(&program).unwrap();
    assert_eq!(
        executor.port().calls,
        vec![Call::Move(
            MotionType::Lin,
            Position::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            10.0
        )]
    );
}

#[test]
fn test_cannot_run_while_stopped() {
    let mut executor = Executor::new(RecordingPort::default());
    assert!(executor.start());
    assert!(executor.stop());
    assert_eq!(executor.state(), State::Stopped);
    assert_eq!(executor.port().calls, vec![Call::Stop]);

    let err = executor.run(&instructions("WAIT(1)\n")).unwrap_err();
    assert_eq!(err, ExecutionError::NotRunning(State::Stopped));
    assert!(!executor.port().calls.contains(&Call::Wait(1.0)));

    assert!(executor.reset());
    assert!(executor.run(&instructions("WAIT(1)\n")).is_ok());
}

#[test]
fn test_emergency_stop_always_reaches_port() {
    let mut executor = Executor::new(RecordingPort::default());
    // No transition from Idle, but the port is still halted.
    assert!(!executor.emergency_stop());
    assert_eq!(executor.port().calls, vec![Call::Emergency]);

    executor.start();
    assert!(executor.emergency_stop());
    assert_eq!(executor.state(), State::Emergency);
    assert!(executor.run(&[]).is_err());
}

#[test]
fn test_stop_from_idle_is_rejected() {
    let mut executor = Executor::new(RecordingPort::default());
    assert!(!executor.stop());
    assert!(executor.port().calls.is_empty());
    assert_eq!(executor.state(), State::Idle);
}

#[test]
fn test_wait_passes_through_waiting_state() {
    let program = instructions("WAIT(1)\n");
    let mut executor = Executor::new(RecordingPort::default());

    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let s = seen.clone();
    executor
        .state_machine_mut()
        .on_entry(State::Waiting, move || s.borrow_mut().push(State::Waiting));
    let s = seen.clone();
    executor
        .state_machine_mut()
        .on_entry(State::Running, move || s.borrow_mut().push(State::Running));

    executor.run(&program).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![State::Running, State::Waiting, State::Running]
    );
}

#[test]
fn test_faults_abort_only_their_instruction() {
    let source = "\
DECL POS far = {x 5000.0}
DECL POS near = {x 10.0}
PTP far
PTP near
";
    let config = MotionConfig {
        time_scale: 0.0,
        ..MotionConfig::default()
    };
    let mut executor = Executor::new(SimulatedMotion::new(config));
    let report = executor.run(&instructions(source)).unwrap();

    assert_eq!(report.dispatched, 1);
    assert_eq!(report.faults.len(), 1);
    assert!(matches!(
        &report.faults[0],
        ExecutionError::Fault {
            source: MotionFault::OutOfWorkspace { component: "x", .. },
            ..
        }
    ));
    assert_eq!(executor.port().current_pose().x, 10.0);
    assert_eq!(executor.state(), State::Idle);
}

#[test]
fn test_missing_pose_argument() {
    let bare = vec![Instruction::new("LIN"), Instruction::new("WAIT")];
    let mut executor = Executor::new(RecordingPort::default());
    let report = executor.run(&bare).unwrap();

    assert_eq!(report.dispatched, 0);
    assert_eq!(
        report.faults,
        vec![
            ExecutionError::MissingArgument {
                command: "LIN".to_string(),
                argument: POSITION_INFORMATION,
            },
            ExecutionError::MissingArgument {
                command: "WAIT".to_string(),
                argument: "duration_time",
            },
        ]
    );
}

#[test]
fn test_hand_built_instructions() {
    let stream = vec![
        Instruction::new("PTP").with_arg(
            POSITION_INFORMATION,
            Value::Frame(Position::new(1.0, 2.0, 3.0, 0.0, 0.0, 0.0)),
        ),
        Instruction::new("SPLINE").with_arg(
            POSITION_INFORMATION,
            Value::Position(Position::new(4.0, 5.0, 6.0, 0.0, 0.0, 0.0)),
        ),
        Instruction::new("HALT"),
    ];
    let mut executor = Executor::new(RecordingPort::default());
    let report = executor.run(&stream).unwrap();

    assert_eq!(report.dispatched, 2);
    assert_eq!(report.skipped, vec!["HALT".to_string()]);
    assert!(matches!(
        executor.port().calls[1],
        Call::Move(MotionType::Spline, _, _)
    ));
}

#[test]
fn test_simulated_run_accumulates_time() {
    let source = "\
DECL POS a = {x 100.0}
DECL POS b = {x 100.0, y 200.0}
PTP a
WAIT(1)
LIN b
";
    let config = MotionConfig {
        time_scale: 0.0,
        ..MotionConfig::default()
    };
    let mut executor = Executor::new(SimulatedMotion::new(config));
    executor.run(&instructions(source)).unwrap();

    // 1 s to reach a, 1 s waiting, 2 s from a to b.
    assert_eq!(executor.port().simulated_time(), 4.0);
    let robot = executor.into_port();
    assert_eq!(robot.current_pose().y, 200.0);
}

#[test]
fn test_oversized_wait_completes_run() {
    let compilation = compile("WAIT(1.0e30)\n");
    assert!(!compilation.has_errors());

    let robot = SimulatedMotion::new(MotionConfig {
        time_scale: 1e-9,
        ..MotionConfig::default()
    });
    let mut executor = Executor::new(robot);
    let report = executor.run(&compilation.instructions).unwrap();

    assert_eq!(report.dispatched, 1);
    assert!(report.is_clean());
    assert_eq!(report.final_state, State::Idle);
    assert_eq!(executor.port().simulated_time(), 1.0e30);
}
