//! Linear inequality system `A x <= b` bounding the derivatives of the trajectory.

use crate::boundary::BoundaryState;
use crate::trajectory_error::TrajectoryError;
use crate::waypoints::{Waypoint, WaypointSet};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

/// Dimension of the Cartesian space and of the free control point.
pub const DIM_POINT: usize = 3;

/// Symmetric per-axis bounds on the derivatives: `-bound <= derivative <= bound`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivativeBounds {
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
    pub jerk: Vector3<f64>,
}

impl Default for DerivativeBounds {
    fn default() -> Self {
        Self {
            velocity: Vector3::repeat(500.0),
            acceleration: Vector3::repeat(500.0),
            jerk: Vector3::repeat(10000.0),
        }
    }
}

impl DerivativeBounds {
    /// Builds bounds from arbitrary length slices, as read from configuration.
    /// Each slice must have exactly the dimension of the point.
    pub fn from_slices(velocity: &[f64], acceleration: &[f64], jerk: &[f64])
                       -> Result<Self, TrajectoryError> {
        Ok(Self {
            velocity: to_vector3(velocity)?,
            acceleration: to_vector3(acceleration)?,
            jerk: to_vector3(jerk)?,
        })
    }
}

pub(crate) fn to_vector3(values: &[f64]) -> Result<Vector3<f64>, TrajectoryError> {
    if values.len() != DIM_POINT {
        return Err(TrajectoryError::InvalidLength { expected: DIM_POINT, found: values.len() });
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

/// Stacked linear inequalities over the free control point.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSystem {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
}

impl ConstraintSystem {
    /// Assembles the system for the given classified waypoints. For acceleration, velocity
    /// and jerk in this order, an upper block `coefficient * x <= bound - offset` is added
    /// for every informative waypoint, followed by the lower blocks
    /// `-coefficient * x <= bound + offset`. The last block keeps the third coordinate of
    /// the free point above the lower of the two boundary heights.
    pub fn assemble(
        state: &BoundaryState,
        acceleration: &WaypointSet,
        velocity: &WaypointSet,
        jerk: &WaypointSet,
        bounds: &DerivativeBounds,
    ) -> Self {
        let blocks = acceleration.informative.len()
            + velocity.informative.len()
            + jerk.informative.len();
        // *2 for lower and upper bound of each, +1 block for the height constraint
        let rows = (2 * blocks + 1) * DIM_POINT;
        let mut a = DMatrix::zeros(rows, DIM_POINT);
        let mut b = DVector::zeros(rows);
        let mut block = 0;

        let mut put = |coefficient: &Matrix3<f64>, rhs: &Vector3<f64>| {
            a.fixed_view_mut::<DIM_POINT, DIM_POINT>(block * DIM_POINT, 0).copy_from(coefficient);
            b.fixed_rows_mut::<DIM_POINT>(block * DIM_POINT).copy_from(rhs);
            block += 1;
        };

        for (waypoints, bound) in [
            (&acceleration.informative, &bounds.acceleration),
            (&velocity.informative, &bounds.velocity),
            (&jerk.informative, &bounds.jerk),
        ] {
            for waypoint in waypoints {
                put(waypoint.coefficient(), &(bound - waypoint.offset()));
            }
            for waypoint in waypoints {
                put(&-waypoint.coefficient(), &(bound + waypoint.offset()));
            }
        }

        // Keep x[z] above the lower of the initial and final heights.
        let mut floor = Matrix3::zeros();
        floor[(DIM_POINT - 1, DIM_POINT - 1)] = -1.0;
        put(&floor, &Vector3::new(0.0, 0.0, -state.floor()));

        Self { a, b }
    }

    /// Number of scalar inequalities.
    pub fn rows(&self) -> usize {
        self.a.nrows()
    }

    /// True if `x` satisfies every row within the given tolerance.
    pub fn is_satisfied(&self, x: &Vector3<f64>, tolerance: f64) -> bool {
        let lhs = &self.a * DVector::from_column_slice(x.as_slice());
        lhs.iter().zip(self.b.iter()).all(|(l, r)| *l <= *r + tolerance)
    }

    /// Largest violation of any row by `x`, zero when all rows are satisfied.
    pub fn max_violation(&self, x: &Vector3<f64>) -> f64 {
        let lhs = &self.a * DVector::from_column_slice(x.as_slice());
        lhs.iter()
            .zip(self.b.iter())
            .fold(0.0, |worst, (l, r)| f64::max(worst, l - r))
    }

    /// Scales every row to a unit norm normal. Rows with a zero normal are left untouched
    /// and their count is returned.
    pub fn normalize(&mut self) -> usize {
        let mut zero_rows = 0;
        for i in 0..self.a.nrows() {
            let norm = self.a.row(i).norm();
            if norm <= f64::EPSILON {
                zero_rows += 1;
                continue;
            }
            self.a.row_mut(i).unscale_mut(norm);
            self.b[i] /= norm;
        }
        zero_rows
    }
}

/// Count of rows the assembler produces for the given waypoint sets.
pub fn expected_rows(acceleration: &[Waypoint], velocity: &[Waypoint], jerk: &[Waypoint]) -> usize {
    let informative = |waypoints: &[Waypoint]| waypoints.iter().filter(|w| w.is_informative()).count();
    2 * DIM_POINT * (informative(acceleration) + informative(velocity) + informative(jerk)) + DIM_POINT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryPolicy, KinematicState};
    use crate::control_points::ControlPointSequence;
    use crate::waypoints::{
        compute_acceleration_waypoints, compute_jerk_waypoints, compute_velocity_waypoints,
        WaypointSampling,
    };

    fn state() -> BoundaryState {
        BoundaryState::new(
            KinematicState::new(
                Vector3::new(0.0, 0.0, 0.3),
                Vector3::new(0.2, 0.0, 0.0),
                Vector3::zeros(),
            ),
            KinematicState::at_rest(Vector3::new(1.0, 0.5, 0.2)),
        )
    }

    fn waypoint_sets(sampling: WaypointSampling) -> (Vec<Waypoint>, Vec<Waypoint>, Vec<Waypoint>) {
        let sequence = ControlPointSequence::build(&state(), 1.0, BoundaryPolicy::Balanced).unwrap();
        (
            compute_acceleration_waypoints(&sequence, sampling),
            compute_velocity_waypoints(&sequence, sampling),
            compute_jerk_waypoints(&sequence, sampling),
        )
    }

    #[test]
    fn test_row_count() {
        for sampling in [WaypointSampling::default(), WaypointSampling::ControlPolygon] {
            let (acc, vel, jerk) = waypoint_sets(sampling);
            let expected = expected_rows(&acc, &vel, &jerk);
            let k = [&acc, &vel, &jerk]
                .iter()
                .map(|set| set.iter().filter(|w| w.is_informative()).count())
                .sum::<usize>();
            let system = ConstraintSystem::assemble(
                &state(),
                &WaypointSet::classify(acc),
                &WaypointSet::classify(vel),
                &WaypointSet::classify(jerk),
                &DerivativeBounds::default(),
            );
            assert_eq!(system.rows(), 6 * k + 3);
            assert_eq!(system.rows(), expected);
            assert_eq!(system.b.len(), system.rows());
        }
    }

    #[test]
    fn test_non_informative_waypoints_skipped() {
        let informative = Waypoint::new(Matrix3::identity() * 2.0, Vector3::new(1.0, 1.0, 1.0));
        let empty = Waypoint::new(Matrix3::zeros(), Vector3::new(100.0, 100.0, 100.0));
        let system = ConstraintSystem::assemble(
            &state(),
            &WaypointSet::classify(vec![informative, empty]),
            &WaypointSet::classify(vec![empty]),
            &WaypointSet::default(),
            &DerivativeBounds::default(),
        );
        assert_eq!(system.rows(), 9);
        // Upper acceleration block
        assert_eq!(system.a[(0, 0)], 2.0);
        assert_eq!(system.b[0], 499.0);
        // Lower acceleration block
        assert_eq!(system.a[(3, 0)], -2.0);
        assert_eq!(system.b[3], 501.0);
    }

    #[test]
    fn test_jerk_rows_use_jerk_bounds() {
        let velocity = Waypoint::new(Matrix3::identity(), Vector3::zeros());
        let jerk = Waypoint::new(Matrix3::identity() * 3.0, Vector3::new(5.0, 5.0, 5.0));
        let bounds = DerivativeBounds {
            velocity: Vector3::repeat(1.0),
            acceleration: Vector3::repeat(2.0),
            jerk: Vector3::repeat(40.0),
        };
        let system = ConstraintSystem::assemble(
            &state(),
            &WaypointSet::default(),
            &WaypointSet::classify(vec![velocity]),
            &WaypointSet::classify(vec![jerk]),
            &bounds,
        );
        // velocity upper, velocity lower, jerk upper, jerk lower, floor
        assert_eq!(system.rows(), 15);
        assert_eq!(system.a[(6, 0)], 3.0);
        assert_eq!(system.b[6], 35.0);
        assert_eq!(system.a[(9, 0)], -3.0);
        assert_eq!(system.b[9], 45.0);
    }

    #[test]
    fn test_floor_block() {
        let system = ConstraintSystem::assemble(
            &state(),
            &WaypointSet::default(),
            &WaypointSet::default(),
            &WaypointSet::default(),
            &DerivativeBounds::default(),
        );
        assert_eq!(system.rows(), 3);
        assert_eq!(system.a[(2, 2)], -1.0);
        assert!((system.b[2] + 0.2).abs() < 1e-15);
        assert!(system.is_satisfied(&Vector3::new(0.0, 0.0, 0.25), 0.0));
        assert!(!system.is_satisfied(&Vector3::new(0.0, 0.0, 0.1), 1e-9));
        assert!((system.max_violation(&Vector3::new(0.0, 0.0, 0.1)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_normalize() {
        let mut system = ConstraintSystem::assemble(
            &state(),
            &WaypointSet::classify(vec![Waypoint::new(Matrix3::identity() * 4.0, Vector3::zeros())]),
            &WaypointSet::default(),
            &WaypointSet::default(),
            &DerivativeBounds::default(),
        );
        let zero_rows = system.normalize();
        // The floor block has two zero rows
        assert_eq!(zero_rows, 2);
        assert_eq!(system.a[(0, 0)], 1.0);
        assert_eq!(system.b[0], 125.0);
    }

    #[test]
    fn test_bounds_from_slices() {
        let bounds = DerivativeBounds::from_slices(&[1.0, 2.0, 3.0], &[4.0; 3], &[5.0; 3]).unwrap();
        assert_eq!(bounds.velocity, Vector3::new(1.0, 2.0, 3.0));
        let wrong = DerivativeBounds::from_slices(&[1.0, 2.0], &[4.0; 3], &[5.0; 3]);
        assert!(matches!(
            wrong,
            Err(TrajectoryError::InvalidLength { expected: 3, found: 2 })
        ));
    }
}
