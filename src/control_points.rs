//! Fixed control points derived from the boundary conditions, and reconstruction of the
//! final curve once the free control point is known.

use crate::bezier::BezierCurve;
use crate::boundary::{BoundaryPolicy, BoundaryState, ConstraintFlags, KinematicState};
use crate::trajectory_error::TrajectoryError;
use nalgebra::Vector3;

/// A control point is either fixed by the boundary conditions or is the single decision
/// variable of the quadratic program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlPoint {
    Fixed(Vector3<f64>),
    Free,
}

/// Ordered control points of the trajectory with exactly one free slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPointSequence {
    points: Vec<ControlPoint>,
    free_index: usize,
    duration: f64,
}

/// Control points pinning position, velocity, acceleration and zero jerk (as many as
/// `order` asks) at one end. For the end of the curve, velocity comes from the incoming
/// direction so the velocity terms are negated; `sign` carries that. Points are returned
/// starting from the boundary itself.
fn boundary_points(state: &KinematicState, order: usize, degree: usize, duration: f64, sign: f64)
                   -> Vec<Vector3<f64>> {
    let n = degree as f64;
    let t = duration;
    let c = state.position;
    let v = state.velocity * sign;
    let a = state.acceleration;

    let mut points = Vec::with_capacity(order);
    if order >= 1 {
        points.push(c);
    }
    if order >= 2 {
        points.push(c + v * t / n);
    }
    if order >= 3 {
        points.push((c * (n * n - n) + v * (2.0 * n * t - 2.0 * t) + a * t * t) / (n * (n - 1.0)));
    }
    if order >= 4 {
        points.push(
            (c * (n * n - n) + v * (3.0 * n * t - 3.0 * t) + a * (3.0 * t * t)) / (n * (n - 1.0)),
        );
    }
    points
}

impl ControlPointSequence {
    /// Builds the control points for the given boundary state and duration under the
    /// given policy. The curve degree equals the number of fixed points, so the closed
    /// forms always reproduce the requested boundary derivatives exactly.
    pub fn build(state: &BoundaryState, duration: f64, policy: BoundaryPolicy)
                 -> Result<Self, TrajectoryError> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(TrajectoryError::InvalidDuration(duration));
        }
        let flags = policy.validated_flags()?;
        Ok(Self::from_flags(state, duration, flags))
    }

    /// Same as `build` but with already validated flags.
    pub(crate) fn from_flags(state: &BoundaryState, duration: f64, flags: ConstraintFlags) -> Self {
        let init_order = flags.init_order();
        let end_order = flags.end_order();
        let degree = init_order + end_order;

        let mut points: Vec<ControlPoint> = boundary_points(&state.start, init_order, degree, duration, 1.0)
            .into_iter()
            .map(ControlPoint::Fixed)
            .collect();
        let free_index = points.len();
        points.push(ControlPoint::Free);
        points.extend(
            boundary_points(&state.end, end_order, degree, duration, -1.0)
                .into_iter()
                .rev()
                .map(ControlPoint::Fixed),
        );

        Self { points, free_index, duration }
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn free_index(&self) -> usize {
        self.free_index
    }

    pub fn degree(&self) -> usize {
        self.points.len() - 1
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Fixed points with their index in the sequence.
    pub fn fixed(&self) -> impl Iterator<Item = (usize, Vector3<f64>)> + '_ {
        self.points.iter().enumerate().filter_map(|(i, point)| match point {
            ControlPoint::Fixed(p) => Some((i, *p)),
            ControlPoint::Free => None,
        })
    }

    /// All control points with `x` substituted into the free slot.
    pub fn with_free(&self, x: &Vector3<f64>) -> Vec<Vector3<f64>> {
        self.points
            .iter()
            .map(|point| match point {
                ControlPoint::Fixed(p) => *p,
                ControlPoint::Free => *x,
            })
            .collect()
    }

    /// Reconstructs the trajectory for the solved free control point.
    pub fn curve(&self, x: &Vector3<f64>) -> BezierCurve {
        BezierCurve::new(self.with_free(x), self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving_state() -> BoundaryState {
        BoundaryState::new(
            KinematicState::new(
                Vector3::new(0.1, -0.2, 0.3),
                Vector3::new(0.5, 0.2, -0.1),
                Vector3::new(-1.0, 0.4, 2.0),
            ),
            KinematicState::new(
                Vector3::new(1.2, 0.8, 0.5),
                Vector3::new(-0.3, 0.6, 0.2),
                Vector3::new(0.7, -1.5, 0.3),
            ),
        )
    }

    fn assert_close(a: &Vector3<f64>, b: &Vector3<f64>) {
        assert!((a - b).norm() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_balanced_layout() {
        let sequence = ControlPointSequence::build(&moving_state(), 1.5, BoundaryPolicy::Balanced).unwrap();
        assert_eq!(sequence.degree(), 6);
        assert_eq!(sequence.free_index(), 3);
        assert_eq!(sequence.fixed().count(), 6);
    }

    #[test]
    fn test_start_tight_layout() {
        let sequence = ControlPointSequence::build(&moving_state(), 1.5, BoundaryPolicy::StartTight).unwrap();
        assert_eq!(sequence.degree(), 5);
        assert_eq!(sequence.free_index(), 4);
        assert_eq!(sequence.points()[5], ControlPoint::Fixed(moving_state().end.position));
    }

    #[test]
    fn test_end_tight_layout() {
        let sequence = ControlPointSequence::build(&moving_state(), 1.5, BoundaryPolicy::EndTight).unwrap();
        assert_eq!(sequence.degree(), 5);
        assert_eq!(sequence.free_index(), 1);
        assert_eq!(sequence.points()[0], ControlPoint::Fixed(moving_state().start.position));
    }

    #[test]
    fn test_boundary_derivatives_reproduced() {
        let state = moving_state();
        let duration = 1.5;
        let x = Vector3::new(0.4, 0.4, 0.9);
        for policy in [BoundaryPolicy::Balanced, BoundaryPolicy::StartTight, BoundaryPolicy::EndTight] {
            let curve = ControlPointSequence::build(&state, duration, policy).unwrap().curve(&x);
            let flags = policy.flags();
            assert_close(&curve.evaluate(0.0), &state.start.position);
            assert_close(&curve.evaluate(duration), &state.end.position);
            if flags.contains(ConstraintFlags::INIT_ACC) {
                assert_close(&curve.derivate(0.0, 1), &state.start.velocity);
                assert_close(&curve.derivate(0.0, 2), &state.start.acceleration);
            }
            if flags.contains(ConstraintFlags::INIT_JERK) {
                assert_close(&curve.derivate(0.0, 3), &Vector3::zeros());
            }
            if flags.contains(ConstraintFlags::END_ACC) {
                assert_close(&curve.derivate(duration, 1), &state.end.velocity);
                assert_close(&curve.derivate(duration, 2), &state.end.acceleration);
            }
            if flags.contains(ConstraintFlags::END_JERK) {
                assert!(curve.derivate(duration, 3).norm() < 1e-6);
            }
        }
    }

    #[test]
    fn test_invalid_duration() {
        let result = ControlPointSequence::build(&moving_state(), 0.0, BoundaryPolicy::Balanced);
        assert!(matches!(result, Err(TrajectoryError::InvalidDuration(_))));
        let result = ControlPointSequence::build(&moving_state(), f64::NAN, BoundaryPolicy::Balanced);
        assert!(matches!(result, Err(TrajectoryError::InvalidDuration(_))));
    }

    #[test]
    fn test_with_free_substitutes_slot() {
        let sequence = ControlPointSequence::build(&moving_state(), 1.0, BoundaryPolicy::Balanced).unwrap();
        let x = Vector3::new(9.0, 9.0, 9.0);
        let points = sequence.with_free(&x);
        assert_eq!(points.len(), 7);
        assert_eq!(points[sequence.free_index()], x);
    }
}
