//! Boundary conditions of the trajectory: the kinematic state at both ends and
//! the policy defining which of them are pinned by the fixed control points.

use crate::trajectory_error::TrajectoryError;
use bitflags::bitflags;
use nalgebra::Vector3;
use std::fmt;

/// Position, velocity and acceleration of the point at one end of the trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
}

impl KinematicState {
    /// State at rest (zero velocity and acceleration) at the given position.
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            acceleration: Vector3::zeros(),
        }
    }

    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, acceleration: Vector3<f64>) -> Self {
        Self { position, velocity, acceleration }
    }
}

/// Kinematic state at the start and at the end of the trajectory. Supplied once per
/// trajectory request and never modified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryState {
    pub start: KinematicState,
    pub end: KinematicState,
}

impl BoundaryState {
    pub fn new(start: KinematicState, end: KinematicState) -> Self {
        Self { start, end }
    }

    /// Midpoint of the two boundary positions, used as the initial guess of the solver.
    pub fn midpoint(&self) -> Vector3<f64> {
        (self.start.position + self.end.position) / 2.0
    }

    /// The lower of the two boundary heights (third coordinate).
    pub fn floor(&self) -> f64 {
        self.start.position.z.min(self.end.position.z)
    }
}

bitflags! {
    /// Boundary derivatives pinned by the fixed control points. Each flag requires
    /// the lower order flag of the same end.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ConstraintFlags: u32 {
        const NONE =        0b0000_0000;

        const INIT_POS =    0b0000_0001;
        const INIT_VEL =    0b0000_0010;
        const INIT_ACC =    0b0000_0100;

        /// Zero jerk at the start of the trajectory.
        const INIT_JERK =   0b0000_1000;

        const END_POS =     0b0001_0000;
        const END_VEL =     0b0010_0000;
        const END_ACC =     0b0100_0000;

        /// Zero jerk at the end of the trajectory.
        const END_JERK =    0b1000_0000;

        const INIT = Self::INIT_POS.bits() | Self::INIT_VEL.bits() | Self::INIT_ACC.bits();
        const END = Self::END_POS.bits() | Self::END_VEL.bits() | Self::END_ACC.bits();
    }
}

impl ConstraintFlags {
    /// Number of control points pinned at the start of the curve.
    pub fn init_order(&self) -> usize {
        [Self::INIT_POS, Self::INIT_VEL, Self::INIT_ACC, Self::INIT_JERK]
            .iter()
            .filter(|flag| self.contains(**flag))
            .count()
    }

    /// Number of control points pinned at the end of the curve.
    pub fn end_order(&self) -> usize {
        [Self::END_POS, Self::END_VEL, Self::END_ACC, Self::END_JERK]
            .iter()
            .filter(|flag| self.contains(**flag))
            .count()
    }

    /// Checks that every pinned derivative also has all lower derivatives of the same
    /// end pinned and that at least one control point is fixed.
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        const REQUIREMENTS: &[(ConstraintFlags, ConstraintFlags, &str)] = &[
            (ConstraintFlags::INIT_VEL, ConstraintFlags::INIT_POS,
             "You cannot constrain initial velocity if initial position is not constrained"),
            (ConstraintFlags::INIT_ACC, ConstraintFlags::INIT_VEL,
             "You cannot constrain initial acceleration if initial velocity is not constrained"),
            (ConstraintFlags::INIT_JERK, ConstraintFlags::INIT_ACC,
             "You cannot constrain initial jerk if initial acceleration is not constrained"),
            (ConstraintFlags::END_VEL, ConstraintFlags::END_POS,
             "You cannot constrain final velocity if final position is not constrained"),
            (ConstraintFlags::END_ACC, ConstraintFlags::END_VEL,
             "You cannot constrain final acceleration if final velocity is not constrained"),
            (ConstraintFlags::END_JERK, ConstraintFlags::END_ACC,
             "You cannot constrain final jerk if final acceleration is not constrained"),
        ];

        for (flag, required, message) in REQUIREMENTS {
            if self.contains(*flag) && !self.contains(*required) {
                return Err(TrajectoryError::InconsistentConstraints(message.to_string()));
            }
        }
        if self.init_order() + self.end_order() == 0 {
            return Err(TrajectoryError::InconsistentConstraints(
                "At least one boundary control point must be fixed".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ConstraintFlags {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FLAG_MAP: &[(ConstraintFlags, &str)] = &[
            (ConstraintFlags::INIT_POS, "INIT_POS"),
            (ConstraintFlags::INIT_VEL, "INIT_VEL"),
            (ConstraintFlags::INIT_ACC, "INIT_ACC"),
            (ConstraintFlags::INIT_JERK, "INIT_JERK"),
            (ConstraintFlags::END_POS, "END_POS"),
            (ConstraintFlags::END_VEL, "END_VEL"),
            (ConstraintFlags::END_ACC, "END_ACC"),
            (ConstraintFlags::END_JERK, "END_JERK"),
        ];

        let names: Vec<&str> = FLAG_MAP
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(formatter, "NONE")
        } else {
            write!(formatter, "{}", names.join(" | "))
        }
    }
}

/// Which boundary receives the "tight" treatment. The policy is decided by the caller;
/// nothing in this crate infers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    /// Start pinned up to (zero) jerk, end pinned only by position.
    StartTight,
    /// End pinned up to (zero) jerk, start pinned only by position.
    EndTight,
    /// Position, velocity and acceleration pinned at both ends.
    #[default]
    Balanced,
    /// Any valid combination of flags.
    Custom(ConstraintFlags),
}

impl BoundaryPolicy {
    pub fn flags(&self) -> ConstraintFlags {
        match *self {
            BoundaryPolicy::StartTight => {
                ConstraintFlags::INIT | ConstraintFlags::INIT_JERK | ConstraintFlags::END_POS
            }
            BoundaryPolicy::EndTight => {
                ConstraintFlags::INIT_POS | ConstraintFlags::END | ConstraintFlags::END_JERK
            }
            BoundaryPolicy::Balanced => ConstraintFlags::INIT | ConstraintFlags::END,
            BoundaryPolicy::Custom(flags) => flags,
        }
    }

    /// Resolves the policy into validated flags.
    pub fn validated_flags(&self) -> Result<ConstraintFlags, TrajectoryError> {
        let flags = self.flags();
        flags.validate()?;
        Ok(flags)
    }
}
