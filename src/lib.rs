//! End-effector and center of mass trajectories as Bézier curves with a single free
//! control point.
//!
//! The boundary conditions (position, velocity and acceleration at both ends of the motion)
//! fix all control points of the curve except one. The remaining point is found by solving
//! a small quadratic program: the cost trades following a reference path against the
//! smoothness of the motion, and linear inequalities keep velocity, acceleration and jerk
//! within per-axis bounds at sampled instants.
//!
//! # Features
//!
//! - Boundary policies: tight at the start, tight at the end, balanced, or custom flags.
//! - Derivative bounds sampled uniformly in time or at the control points of the hodograph.
//! - Smoothness over velocity, acceleration or jerk, blended with the path-following term
//!   by a single weight in [0, 1].
//! - Any closure `Fn(f64) -> Vector3<f64>` can serve as a reference path. Fallible paths are
//!   supported and their failures are reported.
//! - The quadratic program backend is a trait, with an interior point implementation
//!   (Clarabel) provided.
//! - Export of the feasible region of the free point for `qhull`.
//! - Problems can be read from YAML files (feature `allow_filesystem`), with a command line
//!   tool `bezier-traj` to solve them.
//!
//! ## Example
//!
//! ```
//! use nalgebra::Vector3;
//! use bezier_end_effector::boundary::{BoundaryPolicy, BoundaryState, KinematicState};
//! use bezier_end_effector::cost::SmoothnessCriterion;
//! use bezier_end_effector::planner::{EndEffectorPlanner, PlannerConfig};
//!
//! let state = BoundaryState::new(
//!     KinematicState::at_rest(Vector3::new(0.0, 0.0, 0.1)),
//!     KinematicState::at_rest(Vector3::new(0.3, 0.1, 0.1)),
//! );
//! // Lift the foot in the middle of the step
//! let path = |u: f64| state.start.position.lerp(&state.end.position, u)
//!     + Vector3::new(0.0, 0.0, 0.1 * (std::f64::consts::PI * u).sin());
//!
//! let config = PlannerConfig { policy: BoundaryPolicy::StartTight, ..PlannerConfig::default() };
//! let planner = EndEffectorPlanner::new(config);
//! let result = planner.solve(&state, &path, 0.8, 0.7, SmoothnessCriterion::Jerk).unwrap();
//! if let Some(curve) = result.curve {
//!     println!("Apex: {:?}", curve.evaluate(0.4));
//! }
//! ```

pub mod trajectory_error;

pub mod boundary;
pub mod bezier;
pub mod control_points;
pub mod waypoints;

pub mod constraints;
pub mod cost;
pub mod reference_path;

pub mod qp;
pub mod planner;

pub mod qhull;

#[cfg(feature = "allow_filesystem")]
pub mod problem_from_file;
