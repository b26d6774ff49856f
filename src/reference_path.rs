//! Reference paths the trajectory tries to follow. A path maps normalized time in [0, 1]
//! to a point in space.

use anyhow::{ensure, Result};
use nalgebra::Vector3;

pub trait ReferencePath {
    /// Point of the path at normalized time `u` in [0, 1]. Implementations that may fail
    /// (lookup in external data, etc) report it here; trajectory generation then fails.
    fn position(&self, u: f64) -> Result<Vector3<f64>>;
}

/// Any infallible closure is a path.
impl<F> ReferencePath for F
where
    F: Fn(f64) -> Vector3<f64>,
{
    fn position(&self, u: f64) -> Result<Vector3<f64>> {
        Ok(self(u))
    }
}

/// Wraps a fallible closure.
pub struct FallibleFn<F>(pub F);

impl<F> ReferencePath for FallibleFn<F>
where
    F: Fn(f64) -> Result<Vector3<f64>>,
{
    fn position(&self, u: f64) -> Result<Vector3<f64>> {
        (self.0)(u)
    }
}

/// Straight segment between two points, traversed at constant speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPath {
    pub from: Vector3<f64>,
    pub to: Vector3<f64>,
}

impl LinearPath {
    pub fn new(from: Vector3<f64>, to: Vector3<f64>) -> Self {
        Self { from, to }
    }
}

impl ReferencePath for LinearPath {
    fn position(&self, u: f64) -> Result<Vector3<f64>> {
        Ok(self.from.lerp(&self.to, u))
    }
}

/// Piecewise linear path through the given points. Every segment takes the same share of
/// the normalized time.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylinePath {
    points: Vec<Vector3<f64>>,
}

impl PolylinePath {
    pub fn new(points: Vec<Vector3<f64>>) -> Result<Self> {
        ensure!(points.len() >= 2, "Polyline path needs at least 2 points, got {}", points.len());
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }
}

impl ReferencePath for PolylinePath {
    fn position(&self, u: f64) -> Result<Vector3<f64>> {
        ensure!(u.is_finite(), "Path parameter must be finite, got {}", u);
        let segments = self.points.len() - 1;
        let scaled = u.clamp(0.0, 1.0) * segments as f64;
        let segment = (scaled.floor() as usize).min(segments - 1);
        let local = scaled - segment as f64;
        Ok(self.points[segment].lerp(&self.points[segment + 1], local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_path() {
        let path = |u: f64| Vector3::new(u, 2.0 * u, 0.0);
        assert_eq!(path.position(0.5).unwrap(), Vector3::new(0.5, 1.0, 0.0));
    }

    #[test]
    fn test_linear_path() {
        let path = LinearPath::new(Vector3::zeros(), Vector3::new(2.0, 0.0, 4.0));
        assert_eq!(path.position(0.25).unwrap(), Vector3::new(0.5, 0.0, 1.0));
    }

    #[test]
    fn test_polyline_path() {
        let path = PolylinePath::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(path.position(0.0).unwrap(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(path.position(0.25).unwrap(), Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(path.position(0.75).unwrap(), Vector3::new(1.0, 0.5, 0.0));
        assert_eq!(path.position(1.0).unwrap(), Vector3::new(1.0, 1.0, 0.0));
        assert!(path.position(f64::NAN).is_err());
    }

    #[test]
    fn test_polyline_needs_two_points() {
        assert!(PolylinePath::new(vec![Vector3::zeros()]).is_err());
    }
}
