//! Quadratic cost `0.5 x' H x + g' x` over the free control point, trading path following
//! against smoothness of the motion.

use crate::bezier::BezierCurve;
use crate::control_points::ControlPointSequence;
use crate::reference_path::ReferencePath;
use crate::trajectory_error::TrajectoryError;
use crate::waypoints::{uniform_instants, waypoint_at, ACCELERATION, JERK, POSITION, VELOCITY};
use nalgebra::{Matrix3, Vector3};
use tracing::trace;

/// Number of instants sampled for the discrete cost integrals by default.
pub const DEFAULT_COST_SAMPLES: usize = 50;

/// Which derivative magnitude the smoothness term penalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothnessCriterion {
    #[default]
    Velocity,
    Acceleration,
    Jerk,
}

impl SmoothnessCriterion {
    /// Velocity if requested, jerk otherwise.
    pub fn from_velocity_flag(use_velocity: bool) -> Self {
        if use_velocity {
            SmoothnessCriterion::Velocity
        } else {
            SmoothnessCriterion::Jerk
        }
    }

    pub fn order(&self) -> usize {
        match self {
            SmoothnessCriterion::Velocity => VELOCITY,
            SmoothnessCriterion::Acceleration => ACCELERATION,
            SmoothnessCriterion::Jerk => JERK,
        }
    }
}

/// Quadratic objective over the free control point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub h: Matrix3<f64>,
    pub g: Vector3<f64>,
}

impl Default for CostModel {
    fn default() -> Self {
        Self { h: Matrix3::zeros(), g: Vector3::zeros() }
    }
}

impl CostModel {
    /// Value of `0.5 x' H x + g' x`.
    pub fn evaluate(&self, x: &Vector3<f64>) -> f64 {
        0.5 * x.dot(&(self.h * x)) + self.g.dot(x)
    }

    /// Divides through by `H[0][0]`. All the terms built here have a diagonal `H` with the
    /// same value on every axis, so this brings them to a common scale. A zero `H` (the
    /// free point has no influence) is left as is.
    pub fn normalized(self) -> Self {
        let norm = self.h[(0, 0)];
        if norm.abs() <= f64::EPSILON {
            return self;
        }
        Self { h: self.h / norm, g: self.g / norm }
    }

    /// `(1 - w) * smooth + w * path`. Without the path term, the smoothness term is
    /// returned scaled by `(1 - w)`.
    pub fn combine(smooth: &CostModel, path: Option<&CostModel>, weight_distance: f64) -> Self {
        let weight_smooth = 1.0 - weight_distance;
        let mut h = smooth.h * weight_smooth;
        let mut g = smooth.g * weight_smooth;
        if let Some(path) = path {
            h += path.h * weight_distance;
            g += path.g * weight_distance;
        }
        Self { h, g }
    }

    fn accumulate(&mut self, coefficient: &Matrix3<f64>, residual: &Vector3<f64>) {
        let transposed = coefficient.transpose();
        self.h += transposed * coefficient;
        self.g += transposed * residual;
    }
}

/// Discrete integral of the squared magnitude of the `order`-th derivative over `samples`
/// evenly spaced instants, normalized.
pub fn compute_derivative_cost(sequence: &ControlPointSequence, order: usize, samples: usize) -> CostModel {
    let mut cost = CostModel::default();
    for u in uniform_instants(samples) {
        let waypoint = waypoint_at(sequence, order, u);
        if waypoint.is_informative() {
            cost.accumulate(waypoint.coefficient(), waypoint.offset());
        }
    }
    trace!("derivative {} cost H[0][0] = {}", order, cost.h[(0, 0)]);
    cost.normalized()
}

pub fn compute_velocity_cost(sequence: &ControlPointSequence, samples: usize) -> CostModel {
    compute_derivative_cost(sequence, VELOCITY, samples)
}

pub fn compute_acceleration_cost(sequence: &ControlPointSequence, samples: usize) -> CostModel {
    compute_derivative_cost(sequence, ACCELERATION, samples)
}

pub fn compute_jerk_cost(sequence: &ControlPointSequence, samples: usize) -> CostModel {
    compute_derivative_cost(sequence, JERK, samples)
}

pub fn compute_smoothness_cost(sequence: &ControlPointSequence, criterion: SmoothnessCriterion,
                               samples: usize) -> CostModel {
    compute_derivative_cost(sequence, criterion.order(), samples)
}

/// Discrete integral of the squared distance between the curve and the reference path,
/// both sampled at the same normalized instants, normalized. The path is evaluated at every
/// instant, a failure anywhere fails the cost. Only instants where the curve depends on the
/// free point contribute.
pub fn compute_distance_cost<P: ReferencePath + ?Sized>(
    sequence: &ControlPointSequence,
    path: &P,
    samples: usize,
) -> Result<CostModel, TrajectoryError> {
    let mut cost = CostModel::default();
    for u in uniform_instants(samples) {
        let reference = path.position(u).map_err(TrajectoryError::PathEvaluation)?;
        let waypoint = waypoint_at(sequence, POSITION, u);
        if !waypoint.is_informative() {
            continue;
        }
        cost.accumulate(waypoint.coefficient(), &(waypoint.offset() - reference));
    }
    trace!("distance cost H[0][0] = {}", cost.h[(0, 0)]);
    Ok(cost.normalized())
}

/// Sum of squared distances between `count` samples of the curve and of the path.
pub fn path_error<P: ReferencePath + ?Sized>(
    curve: &BezierCurve,
    path: &P,
    count: usize,
) -> Result<f64, TrajectoryError> {
    let mut error = 0.0;
    for u in uniform_instants(count) {
        let reference = path.position(u).map_err(TrajectoryError::PathEvaluation)?;
        error += (curve.evaluate(u * curve.duration()) - reference).norm_squared();
    }
    Ok(error)
}
