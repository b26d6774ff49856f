//! Bezier curve over a time interval [0, T] with 3D control points.

use nalgebra::Vector3;

/// Binomial coefficient C(n, k) as a floating point number.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Bernstein basis polynomial B_i^n(u).
pub fn bernstein(n: usize, i: usize, u: f64) -> f64 {
    if i > n {
        return 0.0;
    }
    binomial(n, i) * u.powi(i as i32) * (1.0 - u).powi((n - i) as i32)
}

/// Falling factorial n * (n-1) * ... * (n-k+1), the factor each differentiation of the
/// Bernstein basis brings in.
fn falling_factorial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64)
}

/// Weights of every control point in the `order`-th time derivative of a curve of the given
/// degree and duration, evaluated at normalized time `u` in [0, 1].
///
/// The derivative value is `sum(weights[j] * P_j)`. For orders above the degree all
/// weights are zero.
pub fn derivative_weights(degree: usize, order: usize, duration: f64, u: f64) -> Vec<f64> {
    let mut weights = vec![0.0; degree + 1];
    if order > degree {
        return weights;
    }
    let scale = falling_factorial(degree, order) / duration.powi(order as i32);
    let reduced = degree - order;
    for i in 0..=reduced {
        let basis = bernstein(reduced, i, u);
        if basis == 0.0 {
            continue;
        }
        // Forward difference of order k: sum over m of (-1)^(k-m) C(k, m) P_(i+m)
        for m in 0..=order {
            let sign = if (order - m) % 2 == 0 { 1.0 } else { -1.0 };
            weights[i + m] += scale * basis * sign * binomial(order, m);
        }
    }
    weights
}

/// Weights of every control point in the control points of the `order`-th hodograph.
/// Row `i` describes hodograph control point `i`.
pub fn hodograph_weights(degree: usize, order: usize, duration: f64) -> Vec<Vec<f64>> {
    if order > degree {
        return Vec::new();
    }
    let scale = falling_factorial(degree, order) / duration.powi(order as i32);
    (0..=degree - order)
        .map(|i| {
            let mut weights = vec![0.0; degree + 1];
            for m in 0..=order {
                let sign = if (order - m) % 2 == 0 { 1.0 } else { -1.0 };
                weights[i + m] = scale * sign * binomial(order, m);
            }
            weights
        })
        .collect()
}

/// Bezier curve defined over [0, T]. Time passed to the evaluation methods is the real
/// time, not the normalized parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve {
    control_points: Vec<Vector3<f64>>,
    duration: f64,
}

impl BezierCurve {
    /// Creates the curve. Panics if there are no control points or the duration is not
    /// positive, both are programming errors.
    pub fn new(control_points: Vec<Vector3<f64>>, duration: f64) -> Self {
        assert!(!control_points.is_empty(), "Bezier curve needs at least one control point");
        assert!(duration > 0.0, "Bezier curve duration must be positive: {}", duration);
        Self { control_points, duration }
    }

    pub fn degree(&self) -> usize {
        self.control_points.len() - 1
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn control_points(&self) -> &[Vector3<f64>] {
        &self.control_points
    }

    /// Position at time `t` in [0, T], computed with de Casteljau's algorithm.
    pub fn evaluate(&self, t: f64) -> Vector3<f64> {
        let u = t / self.duration;
        let mut points = self.control_points.clone();
        for level in (1..points.len()).rev() {
            for i in 0..level {
                points[i] = points[i].lerp(&points[i + 1], u);
            }
        }
        points[0]
    }

    /// The hodograph: the curve of the first time derivative. The derivative of a constant
    /// curve is the constant zero curve.
    pub fn derivative(&self) -> BezierCurve {
        let n = self.degree();
        if n == 0 {
            return BezierCurve::new(vec![Vector3::zeros()], self.duration);
        }
        let factor = n as f64 / self.duration;
        let points = self
            .control_points
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) * factor)
            .collect();
        BezierCurve::new(points, self.duration)
    }

    /// Curve of the `order`-th time derivative.
    pub fn derivative_of_order(&self, order: usize) -> BezierCurve {
        (0..order).fold(self.clone(), |curve, _| curve.derivative())
    }

    /// Value of the `order`-th time derivative at time `t`.
    pub fn derivate(&self, t: f64, order: usize) -> Vector3<f64> {
        self.derivative_of_order(order).evaluate(t)
    }

    /// Samples `count` evenly spaced positions over [0, T], both ends included.
    pub fn sample(&self, count: usize) -> Vec<Vector3<f64>> {
        match count {
            0 => Vec::new(),
            1 => vec![self.evaluate(0.0)],
            _ => (0..count)
                .map(|i| self.evaluate(self.duration * i as f64 / (count - 1) as f64))
                .collect(),
        }
    }
}
