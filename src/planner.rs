//! End-effector (or center of mass) trajectory generation: builds the constraint system
//! and the cost over the single free control point, solves the quadratic program and
//! reconstructs the curve.
//!
//! ```
//! use nalgebra::Vector3;
//! use bezier_end_effector::boundary::{BoundaryState, KinematicState};
//! use bezier_end_effector::planner::solve_end_effector;
//! use bezier_end_effector::reference_path::LinearPath;
//!
//! let state = BoundaryState::new(
//!     KinematicState::at_rest(Vector3::new(0.0, 0.0, 0.0)),
//!     KinematicState::at_rest(Vector3::new(1.0, 0.0, 0.0)),
//! );
//! let path = LinearPath::new(state.start.position, state.end.position);
//!
//! let result = solve_end_effector(&state, &path, 1.0, 1.0, true).unwrap();
//! assert!(result.success);
//! let curve = result.curve.unwrap();
//! assert!((curve.evaluate(0.5) - Vector3::new(0.5, 0.0, 0.0)).norm() < 1e-3);
//! ```

use crate::bezier::BezierCurve;
use crate::boundary::{BoundaryPolicy, BoundaryState};
use crate::constraints::{ConstraintSystem, DerivativeBounds};
use crate::control_points::ControlPointSequence;
use crate::cost::{
    compute_distance_cost, compute_smoothness_cost, CostModel, SmoothnessCriterion,
    DEFAULT_COST_SAMPLES,
};
use crate::qp::{ClarabelSolver, QpSolver, SolverOptions};
use crate::reference_path::ReferencePath;
use crate::trajectory_error::TrajectoryError;
use crate::waypoints::{
    compute_acceleration_waypoints, compute_jerk_waypoints, compute_velocity_waypoints,
    WaypointSampling, WaypointSet,
};
use nalgebra::{DMatrix, DVector, Vector3};
use tracing::debug;

/// Everything about a request that is not the boundary state, the path, the duration
/// or the weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerConfig {
    pub policy: BoundaryPolicy,
    pub bounds: DerivativeBounds,

    /// Instants where the derivative bounds are enforced.
    pub sampling: WaypointSampling,

    /// Number of instants of the discrete cost integrals.
    pub cost_samples: usize,

    pub solver: SolverOptions,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            policy: BoundaryPolicy::default(),
            bounds: DerivativeBounds::default(),
            sampling: WaypointSampling::default(),
            cost_samples: DEFAULT_COST_SAMPLES,
            solver: SolverOptions::default(),
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if self.cost_samples < 2 {
            return Err(TrajectoryError::InvalidConfiguration(format!(
                "at least 2 cost samples are required, got {}",
                self.cost_samples
            )));
        }
        if let WaypointSampling::Uniform { count } = self.sampling {
            if count < 2 {
                return Err(TrajectoryError::InvalidConfiguration(format!(
                    "at least 2 constraint samples are required, got {}",
                    count
                )));
            }
        }
        let bounds = [self.bounds.velocity, self.bounds.acceleration, self.bounds.jerk];
        if bounds.iter().flat_map(|b| b.iter()).any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(TrajectoryError::InvalidConfiguration(
                "derivative bounds must be finite and not negative".into(),
            ));
        }
        self.policy.validated_flags()?;
        Ok(())
    }
}

/// Outcome of a trajectory request. `x`, `curve` and `cost` are present only on success.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryResult {
    pub success: bool,
    pub x: Option<Vector3<f64>>,
    pub curve: Option<BezierCurve>,
    pub cost: Option<f64>,
}

impl TrajectoryResult {
    fn failure() -> Self {
        Self { success: false, x: None, curve: None, cost: None }
    }
}

/// The assembled quadratic program of a request, before solving.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryProblem {
    pub control_points: ControlPointSequence,
    pub constraints: ConstraintSystem,
    pub cost: CostModel,
    pub initial_guess: Vector3<f64>,
}

/// Trajectory generator with the given configuration and quadratic program backend.
/// Holds no per-request state, so one instance can serve requests from several threads
/// if the backend allows.
#[derive(Debug, Clone)]
pub struct EndEffectorPlanner<S: QpSolver = ClarabelSolver> {
    pub config: PlannerConfig,
    solver: S,
}

impl EndEffectorPlanner<ClarabelSolver> {
    pub fn new(config: PlannerConfig) -> Self {
        let solver = ClarabelSolver::new(config.solver);
        Self { config, solver }
    }
}

impl Default for EndEffectorPlanner<ClarabelSolver> {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl<S: QpSolver> EndEffectorPlanner<S> {
    /// Planner with a custom backend. `config.solver` is then only informative, the backend
    /// is expected to carry its own limits.
    pub fn with_solver(config: PlannerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Validates the request and assembles the quadratic program without solving it.
    pub fn build_problem<P: ReferencePath + ?Sized>(
        &self,
        state: &BoundaryState,
        path: &P,
        duration: f64,
        weight_distance: f64,
        smoothness: SmoothnessCriterion,
    ) -> Result<TrajectoryProblem, TrajectoryError> {
        if !(0.0..=1.0).contains(&weight_distance) {
            return Err(TrajectoryError::InvalidWeight(weight_distance));
        }
        self.config.validate()?;
        let control_points = ControlPointSequence::build(state, duration, self.config.policy)?;
        debug!(
            "Solving end effector, T = {}, flags {}, degree {}",
            duration,
            self.config.policy.flags(),
            control_points.degree()
        );

        let sampling = self.config.sampling;
        let jerk = WaypointSet::classify(compute_jerk_waypoints(&control_points, sampling));
        let acceleration = WaypointSet::classify(compute_acceleration_waypoints(&control_points, sampling));
        let velocity = WaypointSet::classify(compute_velocity_waypoints(&control_points, sampling));
        let constraints =
            ConstraintSystem::assemble(state, &acceleration, &velocity, &jerk, &self.config.bounds);
        debug!(
            "Constraints: {} rows, skipped waypoints: acc {} vel {} jerk {}",
            constraints.rows(),
            acceleration.non_informative.len(),
            velocity.non_informative.len(),
            jerk.non_informative.len()
        );

        let samples = self.config.cost_samples;
        let smooth = compute_smoothness_cost(&control_points, smoothness, samples);
        let distance = if weight_distance > 0.0 {
            Some(compute_distance_cost(&control_points, path, samples)?)
        } else {
            None
        };
        let cost = CostModel::combine(&smooth, distance.as_ref(), weight_distance);

        Ok(TrajectoryProblem {
            control_points,
            constraints,
            cost,
            initial_guess: state.midpoint(),
        })
    }

    /// Computes the trajectory from `state.start` to `state.end` over `duration` seconds.
    /// `weight_distance` in [0, 1] trades path following (1) against smoothness (0).
    ///
    /// Configuration problems and path failures are errors. An infeasible or unsolved
    /// quadratic program is a result with `success` false.
    pub fn solve<P: ReferencePath + ?Sized>(
        &self,
        state: &BoundaryState,
        path: &P,
        duration: f64,
        weight_distance: f64,
        smoothness: SmoothnessCriterion,
    ) -> Result<TrajectoryResult, TrajectoryError> {
        let problem = self.build_problem(state, path, duration, weight_distance, smoothness)?;
        Ok(self.solve_problem(&problem))
    }

    /// Solves an assembled problem and reconstructs the curve.
    pub fn solve_problem(&self, problem: &TrajectoryProblem) -> TrajectoryResult {
        let h = DMatrix::from_column_slice(3, 3, problem.cost.h.as_slice());
        let g = DVector::from_column_slice(problem.cost.g.as_slice());
        let guess = DVector::from_column_slice(problem.initial_guess.as_slice());
        let result = self.solver.solve_qp(
            &problem.constraints.a,
            &problem.constraints.b,
            &h,
            &g,
            &guess,
        );

        if !result.success || result.x.len() != 3 {
            debug!("End effector QP failed");
            return TrajectoryResult::failure();
        }
        let x = Vector3::new(result.x[0], result.x[1], result.x[2]);
        debug!("Solved, x = {:?}, cost {}", x, result.cost);
        TrajectoryResult {
            success: true,
            x: Some(x),
            curve: Some(problem.control_points.curve(&x)),
            cost: Some(result.cost),
        }
    }
}

/// Trajectory with the default configuration. `use_velocity_cost` selects velocity
/// smoothness, jerk smoothness otherwise.
pub fn solve_end_effector<P: ReferencePath + ?Sized>(
    state: &BoundaryState,
    path: &P,
    duration: f64,
    weight_distance: f64,
    use_velocity_cost: bool,
) -> Result<TrajectoryResult, TrajectoryError> {
    EndEffectorPlanner::default().solve(
        state,
        path,
        duration,
        weight_distance,
        SmoothnessCriterion::from_velocity_flag(use_velocity_cost),
    )
}
