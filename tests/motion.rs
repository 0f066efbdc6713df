// tests/motion.rs
use pretty_assertions::assert_eq;
use robot_script::{
    MotionConfig, MotionFault, MotionParameters, MotionPort, MotionType, Position,
    SimulatedMotion,
};
use std::cell::RefCell;
use std::rc::Rc;

fn instant() -> SimulatedMotion {
    SimulatedMotion::new(MotionConfig {
        time_scale: 0.0,
        ..MotionConfig::default()
    })
}

#[test]
fn test_move_updates_pose_and_time() {
    let mut robot = instant();
    let target = Position::new(300.0, 400.0, 0.0, 0.0, 0.0, 90.0);

    robot
        .move_to_pose(target, MotionType::Lin, &MotionParameters::default())
        .unwrap();

    assert_eq!(robot.current_pose(), target);
    assert!(!robot.is_moving());
    // 500 mm at the default 100 mm/s.
    assert_eq!(robot.simulated_time(), 5.0);
}

#[test]
fn test_velocity_scales_travel_time() {
    let mut robot = instant();
    let fast = MotionParameters {
        velocity: 250.0,
        ..MotionParameters::default()
    };

    robot
        .move_to_pose(Position::new(0.0, 0.0, 500.0, 0.0, 0.0, 0.0), MotionType::Ptp, &fast)
        .unwrap();
    assert_eq!(robot.simulated_time(), 2.0);
}

#[test]
fn test_workspace_limits() {
    let mut robot = instant();
    let outside = Position::new(0.0, 1500.0, 0.0, 0.0, 0.0, 0.0);

    let err = robot
        .move_to_pose(outside, MotionType::Ptp, &MotionParameters::default())
        .unwrap_err();
    assert_eq!(
        err,
        MotionFault::OutOfWorkspace {
            component: "y",
            value: 1500.0,
            min: -1000.0,
            max: 1000.0,
        }
    );
    // A rejected move leaves the robot where it was.
    assert_eq!(robot.current_pose(), Position::default());

    let twisted = Position::new(0.0, 0.0, 0.0, 0.0, -190.0, 0.0);
    assert!(matches!(
        robot.move_to_pose(twisted, MotionType::Ptp, &MotionParameters::default()),
        Err(MotionFault::OutOfWorkspace { component: "b", .. })
    ));
}

#[test]
fn test_custom_workspace() {
    let mut robot = instant();
    robot.set_workspace_limits(
        Position::new(-10.0, -10.0, -10.0, -180.0, -180.0, -180.0),
        Position::new(10.0, 10.0, 10.0, 180.0, 180.0, 180.0),
    );
    assert!(robot.move_ptp(20.0, 0.0, 0.0).is_err());
    assert!(robot.move_ptp(5.0, 0.0, 0.0).is_ok());
}

#[test]
fn test_tool_offset_is_applied() {
    let mut robot = instant();
    robot.set_tool_offset(Position::new(0.0, 0.0, 50.0, 0.0, 0.0, 0.0));

    robot.move_linear(100.0, 0.0, 0.0).unwrap();
    assert_eq!(
        robot.current_pose(),
        Position::new(100.0, 0.0, 50.0, 0.0, 0.0, 0.0)
    );
}

#[test]
fn test_convenience_moves_keep_orientation() {
    let mut robot = instant();
    robot
        .move_to_pose(
            Position::new(0.0, 0.0, 0.0, 10.0, 20.0, 30.0),
            MotionType::Ptp,
            &MotionParameters::default(),
        )
        .unwrap();

    robot.move_circular(1.0, 2.0, 3.0).unwrap();
    assert_eq!(
        robot.current_pose(),
        Position::new(1.0, 2.0, 3.0, 10.0, 20.0, 30.0)
    );
}

#[test]
fn test_pose_callback() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut robot = instant();
    let s = seen.clone();
    robot.on_pose_changed(move |pose| s.borrow_mut().push(pose.x));

    robot.move_ptp(10.0, 0.0, 0.0).unwrap();
    robot.move_ptp(20.0, 0.0, 0.0).unwrap();
    assert_eq!(*seen.borrow(), vec![10.0, 20.0]);
}

#[test]
fn test_joint_moves() {
    let mut robot = instant();
    let params = MotionParameters::default();

    robot
        .move_joints(&[10.0, -50.0, 0.0, 0.0, 0.0, 0.0], &params)
        .unwrap();
    assert_eq!(robot.current_joints(), vec![10.0, -50.0, 0.0, 0.0, 0.0, 0.0]);
    // Largest joint delta (50) at 100 deg/s.
    assert_eq!(robot.simulated_time(), 0.5);

    let err = robot.move_joints(&[1.0, 2.0], &params).unwrap_err();
    assert_eq!(
        err,
        MotionFault::JointCountMismatch {
            expected: 6,
            found: 2
        }
    );
    assert_eq!(robot.current_joints().len(), 6);
}

#[test]
fn test_wait_accumulates_time() {
    let mut robot = instant();
    robot.wait(1.5);
    robot.wait(-3.0);
    assert_eq!(robot.simulated_time(), 1.5);
}

#[test]
fn test_stop_when_idle_is_harmless() {
    let mut robot = instant();
    robot.stop();
    robot.emergency_stop();
    assert!(!robot.is_moving());
}

#[test]
fn test_default_parameters() {
    let params = MotionParameters::default();
    assert_eq!(params.velocity, 100.0);
    assert_eq!(params.acceleration, 1000.0);
    assert_eq!(params.deceleration, 1000.0);
    assert_eq!(params.jerk, 5000.0);

    let config = MotionConfig::default();
    assert_eq!(config.workspace_max.x, 1000.0);
    assert_eq!(config.workspace_min.c, -180.0);
    assert_eq!(config.time_scale, 1.0);
}

#[test]
fn test_huge_wait_is_simulated_without_sleeping() {
    let mut robot = SimulatedMotion::new(MotionConfig {
        time_scale: 1e-9,
        ..MotionConfig::default()
    });

    // 1e21 seconds after scaling does not fit in a Duration.
    robot.wait(1.0e30);

    assert_eq!(robot.simulated_time(), 1.0e30);
    assert!(!robot.is_moving());
}
