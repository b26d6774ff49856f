//! Quadratic program backend.
//!
//! The trajectory code only needs `min 0.5 x' H x + g' x  s.t.  A x <= b`. Any solver able
//! to answer that can be plugged in through [`QpSolver`]; [`ClarabelSolver`] is provided.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT::NonnegativeConeT,
};
use nalgebra::{DMatrix, DVector};
use std::time::Duration;
use tracing::{debug, warn};

/// Entries below this magnitude are not stored in the sparse matrices.
const SPARSE_EPSILON: f64 = 1e-15;

/// Rows whose normal is below this fraction of the largest normal are treated as zero rows.
const RELATIVE_ROW_EPSILON: f64 = 1e-10;

/// Outcome of a quadratic program. `x` and `cost` are only meaningful when `success` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct QpResult {
    pub success: bool,
    pub x: DVector<f64>,
    pub cost: f64,
}

impl QpResult {
    pub fn failure(dimension: usize) -> Self {
        Self { success: false, x: DVector::zeros(dimension), cost: f64::INFINITY }
    }
}

/// Solves `min 0.5 x' H x + g' x  s.t.  A x <= b`. `initial_guess` is a hint that backends
/// may ignore.
pub trait QpSolver {
    fn solve_qp(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        h: &DMatrix<f64>,
        g: &DVector<f64>,
        initial_guess: &DVector<f64>,
    ) -> QpResult;
}

/// Limits passed to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub max_iterations: u32,

    /// Wall clock budget of a single solve. None means unlimited.
    pub time_limit: Option<Duration>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            time_limit: None,
        }
    }
}

/// Interior point backend based on the Clarabel solver. Being an interior point method, it
/// does not use the initial guess.
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    pub options: SolverOptions,
}

impl ClarabelSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl QpSolver for ClarabelSolver {
    fn solve_qp(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        h: &DMatrix<f64>,
        g: &DVector<f64>,
        _initial_guess: &DVector<f64>,
    ) -> QpResult {
        let n = h.ncols();

        // Rows with a zero normal cannot be handled by the cone, they either always hold
        // or make the problem infeasible. A normal that is tiny next to the largest one is
        // roundoff and counts as zero; dividing by it would blow up the bound.
        let norms: Vec<f64> = (0..a.nrows()).map(|i| a.row(i).norm()).collect();
        let largest = norms.iter().fold(0.0_f64, |m, n| m.max(*n));
        let threshold = SPARSE_EPSILON.max(largest * RELATIVE_ROW_EPSILON);
        let mut kept = Vec::with_capacity(a.nrows());
        for (i, &norm) in norms.iter().enumerate() {
            if norm <= threshold {
                if b[i] < 0.0 {
                    debug!("Zero row {} with negative bound {}, infeasible", i, b[i]);
                    return QpResult::failure(n);
                }
            } else {
                kept.push((i, norm));
            }
        }

        // Unit normals keep the rows on a comparable scale.
        let mut a_kept = DMatrix::zeros(kept.len(), n);
        let mut b_kept = Vec::with_capacity(kept.len());
        for (row, (i, norm)) in kept.iter().enumerate() {
            a_kept.row_mut(row).copy_from(&(a.row(*i) / *norm));
            b_kept.push(b[*i] / norm);
        }

        let p_csc = dmatrix_to_csc_upper_tri(h);
        let a_csc = dmatrix_to_csc(&a_kept);
        let q: Vec<f64> = g.iter().copied().collect();
        let cones = if kept.is_empty() { Vec::new() } else { vec![NonnegativeConeT(kept.len())] };

        let settings = match DefaultSettingsBuilder::default()
            .max_iter(self.options.max_iterations)
            .time_limit(self.options.time_limit.map_or(f64::INFINITY, |limit| limit.as_secs_f64()))
            .verbose(false)
            .build()
        {
            Ok(settings) => settings,
            Err(err) => {
                warn!("Invalid QP solver settings: {:?}", err);
                return QpResult::failure(n);
            }
        };

        let mut solver = match DefaultSolver::new(&p_csc, &q, &a_csc, &b_kept, &cones, settings) {
            Ok(solver) => solver,
            Err(err) => {
                warn!("QP solver rejected the problem: {:?}", err);
                return QpResult::failure(n);
            }
        };
        solver.solve();

        let solution = &solver.solution;
        let success = matches!(solution.status, SolverStatus::Solved | SolverStatus::AlmostSolved);
        debug!(
            "QP {} rows: {:?} after {} iterations",
            kept.len(),
            solution.status,
            solution.iterations
        );
        if !success {
            return QpResult::failure(n);
        }
        QpResult {
            success,
            x: DVector::from_column_slice(&solution.x),
            cost: solution.obj_val,
        }
    }
}

/// Full matrix in compressed sparse column form.
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > SPARSE_EPSILON {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Upper triangle of a symmetric matrix in compressed sparse column form.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows.saturating_sub(1)) {
            let v = m[(i, j)];
            if v.abs() > SPARSE_EPSILON {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_problem(a: DMatrix<f64>, b: DVector<f64>, g: DVector<f64>) -> QpResult {
        let h = DMatrix::identity(3, 3);
        let guess = DVector::zeros(3);
        ClarabelSolver::default().solve_qp(&a, &b, &h, &g, &guess)
    }

    #[test]
    fn test_unconstrained_minimum() {
        // Only a far away constraint, minimum at -g
        let a = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![100.0]);
        let g = DVector::from_vec(vec![-1.0, 2.0, -3.0]);
        let result = identity_problem(a, b, g);
        assert!(result.success);
        let expected = DVector::from_vec(vec![1.0, -2.0, 3.0]);
        assert!((result.x - expected).norm() < 1e-6);
        assert!((result.cost + 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_active_constraint() {
        // min 0.5 |x|^2 - x0  s.t. x0 <= 0.25
        let a = DMatrix::from_row_slice(1, 3, &[2.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![0.5]);
        let g = DVector::from_vec(vec![-1.0, 0.0, 0.0]);
        let result = identity_problem(a, b, g);
        assert!(result.success);
        assert!((result.x[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        // x0 <= -1 and -x0 <= -1
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, -1.0, 0.0, 0.0]);
        let b = DVector::from_vec(vec![-1.0, -1.0]);
        let g = DVector::zeros(3);
        let result = identity_problem(a, b, g);
        assert!(!result.success);
    }

    #[test]
    fn test_zero_rows() {
        let a = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let g = DVector::from_vec(vec![1.0, 0.0, 0.0]);

        let satisfied = identity_problem(a.clone(), DVector::from_vec(vec![0.0, 0.0, 10.0]), g.clone());
        assert!(satisfied.success);
        assert!((satisfied.x[0] + 1.0).abs() < 1e-6);

        let violated = identity_problem(a, DVector::from_vec(vec![0.0, -1.0, 10.0]), g);
        assert!(!violated.success);
    }

    #[test]
    fn test_roundoff_row_ignored() {
        // A row carrying only roundoff next to regular rows must not reach the backend
        let a = DMatrix::from_row_slice(3, 3, &[
            1.7763568394002505e-15, 0.0, 0.0,
            30.0, 0.0, 0.0,
            0.0, 0.0, -1.0,
        ]);
        let b = DVector::from_vec(vec![9996.833, 500.0, 0.0]);
        let g = DVector::from_vec(vec![-0.2, -0.2, -0.1]);
        let result = identity_problem(a.clone(), b, g.clone());
        assert!(result.success);
        let expected = DVector::from_vec(vec![0.2, 0.2, 0.1]);
        assert!((result.x - expected).norm() < 1e-6);

        // Same row with a negative bound cannot hold
        let b = DVector::from_vec(vec![-1.0, 500.0, 0.0]);
        assert!(!identity_problem(a, b, g).success);
    }

    #[test]
    fn test_csc_upper_triangle() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 3.0]);
        let csc = dmatrix_to_csc_upper_tri(&m);
        assert_eq!(csc.colptr, vec![0, 1, 3]);
        assert_eq!(csc.rowval, vec![0, 0, 1]);
        assert_eq!(csc.nzval, vec![1.0, 2.0, 3.0]);
    }
}
