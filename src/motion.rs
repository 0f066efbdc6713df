//! The motion port abstraction and a timing-accurate simulator behind it.
//!
//! The executor never talks to hardware directly. It drives a
//! [`MotionPort`], which a real controller implements against its axis
//! drivers and tests implement with [`SimulatedMotion`] or a recorder.

use crate::error::MotionFault;
use crate::value::Position;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of joints on the simulated arm.
pub const JOINT_COUNT: usize = 6;

/// Interpolation used to reach a Cartesian target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionType {
    /// Point-to-point: fastest joint interpolation, path unspecified.
    Ptp,
    /// Straight line in Cartesian space.
    Lin,
    /// Circular arc.
    Circ,
    Spline,
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ptp => "PTP",
            Self::Lin => "LIN",
            Self::Circ => "CIRC",
            Self::Spline => "SPLINE",
        })
    }
}

/// Dynamic limits for a single move.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionParameters {
    /// Path velocity in mm/s (deg/s for joint moves).
    pub velocity: f64,
    /// mm/s^2.
    pub acceleration: f64,
    /// mm/s^2.
    pub deceleration: f64,
    /// mm/s^3.
    pub jerk: f64,
}

impl Default for MotionParameters {
    fn default() -> Self {
        Self {
            velocity: 100.0,
            acceleration: 1000.0,
            deceleration: 1000.0,
            jerk: 5000.0,
        }
    }
}

/// Configuration of a [`SimulatedMotion`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Lower bound of every pose component a target may have.
    pub workspace_min: Position,
    /// Upper bound of every pose component a target may have.
    pub workspace_max: Position,
    /// Added component-wise to every Cartesian target after the limit check.
    pub tool_offset: Position,
    /// Multiplier applied to simulated durations before sleeping.
    /// `0.0` disables sleeping entirely. Default: 1.0 (real time).
    pub time_scale: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            workspace_min: Position::new(-1000.0, -1000.0, -1000.0, -180.0, -180.0, -180.0),
            workspace_max: Position::new(1000.0, 1000.0, 1000.0, 180.0, 180.0, 180.0),
            tool_offset: Position::default(),
            time_scale: 1.0,
        }
    }
}

/// Everything the executor needs from a motion backend.
///
/// Moves block until the (real or simulated) motion has finished. A
/// returned [`MotionFault`] means the move was rejected and the robot did
/// not move.
pub trait MotionPort {
    fn move_to_pose(
        &mut self,
        target: Position,
        motion: MotionType,
        params: &MotionParameters,
    ) -> Result<(), MotionFault>;

    fn move_joints(
        &mut self,
        joints: &[f64],
        params: &MotionParameters,
    ) -> Result<(), MotionFault>;

    /// Blocks for `seconds`.
    fn wait(&mut self, seconds: f64);

    fn stop(&mut self);

    fn emergency_stop(&mut self);

    fn is_moving(&self) -> bool;

    fn current_pose(&self) -> Position;

    fn current_joints(&self) -> Vec<f64>;

    /// Point-to-point move to `(x, y, z)` keeping the current orientation.
    fn move_ptp(&mut self, x: f64, y: f64, z: f64) -> Result<(), MotionFault> {
        let target = keep_orientation(self.current_pose(), x, y, z);
        self.move_to_pose(target, MotionType::Ptp, &MotionParameters::default())
    }

    /// Linear move to `(x, y, z)` keeping the current orientation.
    fn move_linear(&mut self, x: f64, y: f64, z: f64) -> Result<(), MotionFault> {
        let target = keep_orientation(self.current_pose(), x, y, z);
        self.move_to_pose(target, MotionType::Lin, &MotionParameters::default())
    }

    /// Circular move to `(x, y, z)` keeping the current orientation.
    fn move_circular(&mut self, x: f64, y: f64, z: f64) -> Result<(), MotionFault> {
        let target = keep_orientation(self.current_pose(), x, y, z);
        self.move_to_pose(target, MotionType::Circ, &MotionParameters::default())
    }
}

fn keep_orientation(current: Position, x: f64, y: f64, z: f64) -> Position {
    Position::from_parts(DVec3::new(x, y, z), current.orientation())
}

type PoseCallback = Box<dyn FnMut(&Position)>;

/// Simulated six-axis arm.
///
/// Travel time is the Euclidean distance to the target divided by the
/// velocity (largest joint delta for joint moves). The simulator sleeps for
/// that time scaled by [`MotionConfig::time_scale`] and accumulates the
/// unscaled total in [`simulated_time`](Self::simulated_time).
pub struct SimulatedMotion {
    config: MotionConfig,
    pose: Position,
    joints: Vec<f64>,
    moving: bool,
    simulated_time: f64,
    on_pose_changed: Option<PoseCallback>,
}

impl Default for SimulatedMotion {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl fmt::Debug for SimulatedMotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedMotion")
            .field("config", &self.config)
            .field("pose", &self.pose)
            .field("joints", &self.joints)
            .field("moving", &self.moving)
            .field("simulated_time", &self.simulated_time)
            .finish_non_exhaustive()
    }
}

impl SimulatedMotion {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            pose: Position::default(),
            joints: vec![0.0; JOINT_COUNT],
            moving: false,
            simulated_time: 0.0,
            on_pose_changed: None,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn set_tool_offset(&mut self, offset: Position) {
        self.config.tool_offset = offset;
    }

    pub fn set_workspace_limits(&mut self, min: Position, max: Position) {
        self.config.workspace_min = min;
        self.config.workspace_max = max;
    }

    /// Called with the new pose after every completed Cartesian move.
    pub fn on_pose_changed(&mut self, callback: impl FnMut(&Position) + 'static) {
        self.on_pose_changed = Some(Box::new(callback));
    }

    /// Seconds of motion and waiting simulated so far, before scaling.
    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    fn check_workspace(&self, target: &Position) -> Result<(), MotionFault> {
        let min = self.config.workspace_min.to_array();
        let max = self.config.workspace_max.to_array();

        for (i, value) in target.to_array().into_iter().enumerate() {
            if value < min[i] || value > max[i] {
                return Err(MotionFault::OutOfWorkspace {
                    component: Position::FIELDS[i],
                    value,
                    min: min[i],
                    max: max[i],
                });
            }
        }
        Ok(())
    }

    fn travel_time(distance: f64, params: &MotionParameters) -> f64 {
        // A non-positive velocity would never arrive; treat the move as instant.
        if params.velocity > 0.0 {
            distance / params.velocity
        } else {
            0.0
        }
    }

    fn pass_time(&mut self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            return;
        }
        self.simulated_time += seconds;

        let scaled = seconds * self.config.time_scale;
        if scaled <= 0.0 {
            return;
        }
        match Duration::try_from_secs_f64(scaled) {
            Ok(duration) => thread::sleep(duration),
            Err(_) => warn!(seconds = scaled, "duration too long to sleep, skipping"),
        }
    }
}

impl MotionPort for SimulatedMotion {
    fn move_to_pose(
        &mut self,
        target: Position,
        motion: MotionType,
        params: &MotionParameters,
    ) -> Result<(), MotionFault> {
        self.check_workspace(&target)?;

        let offset = self.config.tool_offset;
        let adjusted = Position::from_parts(
            target.translation() + offset.translation(),
            target.orientation() + offset.orientation(),
        );

        info!(%motion, from = %self.pose, to = %adjusted, "motion started");
        self.moving = true;

        let distance = self.pose.translation().distance(adjusted.translation());
        let seconds = Self::travel_time(distance, params);
        debug!(distance, seconds, "simulating move");
        self.pass_time(seconds);

        self.pose = adjusted;
        if let Some(callback) = self.on_pose_changed.as_mut() {
            callback(&self.pose);
        }

        self.moving = false;
        info!(%motion, "motion completed");
        Ok(())
    }

    fn move_joints(
        &mut self,
        joints: &[f64],
        params: &MotionParameters,
    ) -> Result<(), MotionFault> {
        if joints.len() != self.joints.len() {
            return Err(MotionFault::JointCountMismatch {
                expected: self.joints.len(),
                found: joints.len(),
            });
        }

        info!(?joints, "joint motion started");
        self.moving = true;

        let largest = self
            .joints
            .iter()
            .zip(joints)
            .map(|(current, target)| (target - current).abs())
            .fold(0.0, f64::max);
        let seconds = Self::travel_time(largest, params);
        debug!(largest, seconds, "simulating joint move");
        self.pass_time(seconds);

        self.joints = joints.to_vec();
        self.moving = false;
        info!("joint motion completed");
        Ok(())
    }

    fn wait(&mut self, seconds: f64) {
        info!(seconds, "waiting");
        self.pass_time(seconds);
    }

    fn stop(&mut self) {
        if self.moving {
            info!("stopping motion");
            self.moving = false;
        }
    }

    fn emergency_stop(&mut self) {
        warn!("emergency stop");
        self.stop();
    }

    fn is_moving(&self) -> bool {
        self.moving
    }

    fn current_pose(&self) -> Position {
        self.pose
    }

    fn current_joints(&self) -> Vec<f64> {
        self.joints.clone()
    }
}
