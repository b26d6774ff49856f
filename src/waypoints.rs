//! Affine representation of curve derivatives as functions of the free control point.
//!
//! Every derivative of the trajectory is linear in its control points. With all points
//! but one fixed, the value of a derivative at some instant is `coefficient * x + offset`
//! where `x` is the free control point. Such a pair is called a waypoint here.

use crate::bezier::{derivative_weights, hodograph_weights};
use crate::control_points::ControlPointSequence;
use nalgebra::{Matrix3, Vector3};

/// Derivative order of the position itself.
pub const POSITION: usize = 0;
pub const VELOCITY: usize = 1;
pub const ACCELERATION: usize = 2;
pub const JERK: usize = 3;

/// Number of instants sampled for derivative bounds by default.
pub const NUM_DISCRETIZATION: usize = 11;

/// Weights below this fraction of the largest weight of the same waypoint are roundoff
/// of the Bernstein sums.
const RELATIVE_WEIGHT_EPSILON: f64 = 1e-10;

/// Affine map from the free control point to a derivative value at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    coefficient: Matrix3<f64>,
    offset: Vector3<f64>,
}

impl Waypoint {
    pub fn new(coefficient: Matrix3<f64>, offset: Vector3<f64>) -> Self {
        Self { coefficient, offset }
    }

    /// Builds the waypoint from per control point weights: the free slot weight becomes
    /// the (diagonal) coefficient, the fixed points sum into the offset. A free slot weight
    /// that is roundoff relative to the largest weight is taken as exactly zero.
    pub fn from_weights(sequence: &ControlPointSequence, weights: &[f64]) -> Self {
        let largest = weights.iter().fold(0.0_f64, |m, w| m.max(w.abs()));
        let mut free = weights[sequence.free_index()];
        if free.abs() <= largest * RELATIVE_WEIGHT_EPSILON {
            free = 0.0;
        }
        let coefficient = Matrix3::identity() * free;
        let offset = sequence
            .fixed()
            .map(|(index, point)| point * weights[index])
            .sum();
        Self { coefficient, offset }
    }

    pub fn coefficient(&self) -> &Matrix3<f64> {
        &self.coefficient
    }

    pub fn offset(&self) -> &Vector3<f64> {
        &self.offset
    }

    /// Derivative value for the given free control point.
    pub fn value(&self, x: &Vector3<f64>) -> Vector3<f64> {
        self.coefficient * x + self.offset
    }

    /// A waypoint whose coefficient is zero (up to machine epsilon) does not depend on the
    /// free control point and tells nothing about it.
    pub fn is_informative(&self) -> bool {
        self.coefficient.iter().any(|c| c.abs() > f64::EPSILON)
    }
}

/// Where derivatives are evaluated to obtain waypoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaypointSampling {
    /// `count` evenly spaced instants over the trajectory, both ends included.
    Uniform { count: usize },
    /// Control points of the derivative curve. By the convex hull property, bounding
    /// them bounds the derivative over the whole trajectory.
    ControlPolygon,
}

impl Default for WaypointSampling {
    fn default() -> Self {
        WaypointSampling::Uniform { count: NUM_DISCRETIZATION }
    }
}

/// Evenly spaced normalized instants in [0, 1], both ends included. Needs at least 2.
pub fn uniform_instants(count: usize) -> impl Iterator<Item = f64> {
    let step = 1.0 / (count.max(2) - 1) as f64;
    (0..count).map(move |i| i as f64 * step)
}

/// Waypoint of the `order`-th derivative at normalized instant `u`.
pub fn waypoint_at(sequence: &ControlPointSequence, order: usize, u: f64) -> Waypoint {
    let weights = derivative_weights(sequence.degree(), order, sequence.duration(), u);
    Waypoint::from_weights(sequence, &weights)
}

/// Waypoints of the `order`-th derivative under the given sampling.
pub fn compute_waypoints(sequence: &ControlPointSequence, order: usize, sampling: WaypointSampling)
                         -> Vec<Waypoint> {
    match sampling {
        WaypointSampling::Uniform { count } => uniform_instants(count)
            .map(|u| waypoint_at(sequence, order, u))
            .collect(),
        WaypointSampling::ControlPolygon => {
            hodograph_weights(sequence.degree(), order, sequence.duration())
                .iter()
                .map(|weights| Waypoint::from_weights(sequence, weights))
                .collect()
        }
    }
}

pub fn compute_velocity_waypoints(sequence: &ControlPointSequence, sampling: WaypointSampling)
                                  -> Vec<Waypoint> {
    compute_waypoints(sequence, VELOCITY, sampling)
}

pub fn compute_acceleration_waypoints(sequence: &ControlPointSequence, sampling: WaypointSampling)
                                      -> Vec<Waypoint> {
    compute_waypoints(sequence, ACCELERATION, sampling)
}

pub fn compute_jerk_waypoints(sequence: &ControlPointSequence, sampling: WaypointSampling)
                              -> Vec<Waypoint> {
    compute_waypoints(sequence, JERK, sampling)
}

/// Waypoints split into those that depend on the free control point and those that do not.
/// Only the informative ones take part in constraint and cost assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointSet {
    pub informative: Vec<Waypoint>,
    pub non_informative: Vec<Waypoint>,
}

impl WaypointSet {
    pub fn classify(waypoints: Vec<Waypoint>) -> Self {
        let (informative, non_informative): (Vec<Waypoint>, Vec<Waypoint>) =
            waypoints.into_iter().partition(|waypoint| waypoint.is_informative());
        Self { informative, non_informative }
    }

    pub fn len(&self) -> usize {
        self.informative.len() + self.non_informative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryPolicy, BoundaryState, KinematicState};

    fn sequence(policy: BoundaryPolicy) -> ControlPointSequence {
        let state = BoundaryState::new(
            KinematicState::new(
                Vector3::new(0.0, 0.0, 0.2),
                Vector3::new(0.3, 0.1, 0.0),
                Vector3::new(0.0, -0.5, 1.0),
            ),
            KinematicState::new(
                Vector3::new(1.0, 0.5, 0.1),
                Vector3::new(0.0, 0.2, -0.3),
                Vector3::new(0.4, 0.0, 0.0),
            ),
        );
        ControlPointSequence::build(&state, 2.0, policy).unwrap()
    }

    #[test]
    fn test_waypoint_matches_curve() {
        let sequence = sequence(BoundaryPolicy::Balanced);
        let x = Vector3::new(0.7, -0.3, 0.6);
        let curve = sequence.curve(&x);
        for order in [POSITION, VELOCITY, ACCELERATION, JERK] {
            for u in uniform_instants(7) {
                let waypoint = waypoint_at(&sequence, order, u);
                let expected = curve.derivate(u * 2.0, order);
                assert!((waypoint.value(&x) - expected).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn test_boundary_instants_not_informative() {
        let sequence = sequence(BoundaryPolicy::Balanced);
        // Velocity and acceleration at both ends only depend on fixed points
        for order in [VELOCITY, ACCELERATION] {
            assert!(!waypoint_at(&sequence, order, 0.0).is_informative());
            assert!(!waypoint_at(&sequence, order, 1.0).is_informative());
            assert!(waypoint_at(&sequence, order, 0.3).is_informative());
        }
        // Symmetric weights of the free point cancel in the middle
        assert!(!waypoint_at(&sequence, VELOCITY, 0.5).is_informative());
        assert!(waypoint_at(&sequence, ACCELERATION, 0.5).is_informative());
        // Jerk at the ends already depends on the free point
        assert!(waypoint_at(&sequence, JERK, 0.0).is_informative());
    }

    #[test]
    fn test_classification_is_disjoint_and_complete() {
        let sequence = sequence(BoundaryPolicy::Balanced);
        let waypoints = compute_velocity_waypoints(&sequence, WaypointSampling::default());
        let set = WaypointSet::classify(waypoints);
        assert_eq!(set.len(), NUM_DISCRETIZATION);
        // Both ends and the middle
        assert_eq!(set.non_informative.len(), 3);
        assert!(set.informative.iter().all(|w| w.is_informative()));
        assert!(set.non_informative.iter().all(|w| !w.is_informative()));
    }

    #[test]
    fn test_control_polygon_sampling() {
        let sequence = sequence(BoundaryPolicy::Balanced);
        let velocity = compute_velocity_waypoints(&sequence, WaypointSampling::ControlPolygon);
        assert_eq!(velocity.len(), 6);
        // Only the two hodograph points touching the free slot depend on it
        let set = WaypointSet::classify(velocity);
        assert_eq!(set.informative.len(), 2);

        let x = Vector3::new(0.5, 0.5, 0.5);
        let hodograph = sequence.curve(&x).derivative();
        let polygon = compute_velocity_waypoints(&sequence, WaypointSampling::ControlPolygon);
        for (waypoint, point) in polygon.iter().zip(hodograph.control_points()) {
            assert!((waypoint.value(&x) - point).norm() < 1e-12);
        }
    }

    #[test]
    fn test_jerk_waypoints_start_tight() {
        let sequence = sequence(BoundaryPolicy::StartTight);
        let jerk = compute_jerk_waypoints(&sequence, WaypointSampling::Uniform { count: 3 });
        // Zero start jerk is pinned, the point at t = 0 does not depend on x
        assert!(!jerk[0].is_informative());
        assert!(jerk[0].offset().norm() < 1e-9);
        assert!(jerk[1].is_informative());
    }

    #[test]
    fn test_roundoff_weight_not_informative() {
        let sequence = sequence(BoundaryPolicy::Balanced);
        let mut weights = vec![-35.5, 106.7, -106.7, 0.0, 0.0, 0.0, 0.0];
        weights[sequence.free_index()] = 1.7763568394002505e-15;
        let waypoint = Waypoint::from_weights(&sequence, &weights);
        assert!(!waypoint.is_informative());
        assert_eq!(waypoint.coefficient(), &Matrix3::zeros());

        weights[sequence.free_index()] = 1e-3;
        assert!(Waypoint::from_weights(&sequence, &weights).is_informative());
    }

    #[test]
    fn test_middle_jerk_not_informative() {
        // The jerk weight of the free point is mathematically zero at u = 0.5
        for duration in [0.7, 1.5, 3.0] {
            let state = BoundaryState::new(
                KinematicState::at_rest(Vector3::zeros()),
                KinematicState::at_rest(Vector3::new(1.0, 0.0, 0.0)),
            );
            let sequence = ControlPointSequence::build(&state, duration, BoundaryPolicy::Balanced).unwrap();
            assert!(!waypoint_at(&sequence, JERK, 0.5).is_informative(), "T = {}", duration);
        }
    }

    #[test]
    fn test_acceleration_waypoints_count() {
        let sequence = sequence(BoundaryPolicy::EndTight);
        let acc = compute_acceleration_waypoints(&sequence, WaypointSampling::Uniform { count: 5 });
        assert_eq!(acc.len(), 5);
    }
}
