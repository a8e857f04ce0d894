//! Safeguarded one-dimensional Newton iteration.
//!
//! Newton steps are taken while they stay inside a maintained sign-change
//! bracket and shrink it fast enough; otherwise the iteration falls back to
//! bisection. Convergence is therefore guaranteed for any continuous
//! residual once a bracket is known, and the iteration budget bounds the
//! work per root.

use serde::{Deserialize, Serialize};

use super::SolverError;

/// Convergence controls for a single root find.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootSettings {
    /// Iteration budget; exceeding it is a [`SolverError::NonConvergence`].
    pub max_iterations: usize,
    /// Step-size tolerance relative to `max(1, |x|)`.
    pub x_tolerance: f64,
    /// Absolute tolerance on the residual, in the residual's own unit.
    pub residual_tolerance: f64,
}

impl Default for RootSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            x_tolerance: 1e-12,
            residual_tolerance: 1e-10,
        }
    }
}

/// A converged root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// Residual evaluated at `x`.
    pub residual: f64,
    pub iterations: usize,
}

/// Find a root of `f` inside `bracket`, starting from `seed`.
///
/// `f` returns `(value, derivative)`. The residual at the two bracket ends
/// must differ in sign; infinite values are allowed as long as their sign is
/// meaningful. The seed is clamped into the bracket.
pub fn safeguarded_newton<F>(
    mut f: F,
    bracket: (f64, f64),
    seed: f64,
    settings: &RootSettings,
) -> Result<Root, SolverError>
where
    F: FnMut(f64) -> (f64, f64),
{
    let (a, b) = bracket;
    let (fa, _) = f(a);
    let (fb, _) = f(b);
    if fa.is_nan() || fb.is_nan() {
        return Err(SolverError::NonFinite { x: if fa.is_nan() { a } else { b } });
    }
    if fa == 0.0 {
        return Ok(Root { x: a, residual: 0.0, iterations: 0 });
    }
    if fb == 0.0 {
        return Ok(Root { x: b, residual: 0.0, iterations: 0 });
    }
    if fa.signum() == fb.signum() {
        return Err(SolverError::NoBracket { lower: a, upper: b });
    }

    // Orient so that f(lo) < 0 < f(hi).
    let (mut lo, mut hi) = if fa < 0.0 { (a, b) } else { (b, a) };

    let mut x = seed.clamp(a.min(b), a.max(b));
    let mut dx_old = (b - a).abs();
    let mut dx = dx_old;
    let (mut fx, mut dfx) = f(x);

    for iteration in 1..=settings.max_iterations {
        if fx.is_nan() {
            return Err(SolverError::NonFinite { x });
        }
        if fx.abs() <= settings.residual_tolerance {
            return Ok(Root { x, residual: fx, iterations: iteration - 1 });
        }

        let newton_usable = fx.is_finite()
            && dfx.is_finite()
            && dfx != 0.0
            && ((x - hi) * dfx - fx) * ((x - lo) * dfx - fx) < 0.0
            && (2.0 * fx).abs() <= (dx_old * dfx).abs();

        if newton_usable {
            dx_old = dx;
            dx = fx / dfx;
            x -= dx;
        } else {
            dx_old = dx;
            dx = 0.5 * (hi - lo);
            x = lo + dx;
        }

        (fx, dfx) = f(x);
        if dx.abs() <= settings.x_tolerance * x.abs().max(1.0) {
            if fx.is_nan() {
                return Err(SolverError::NonFinite { x });
            }
            return Ok(Root { x, residual: fx, iterations: iteration });
        }

        if fx < 0.0 {
            lo = x;
        } else {
            hi = x;
        }
    }

    Err(SolverError::NonConvergence {
        max_iter: settings.max_iterations,
        residual: fx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_root_of_two() {
        let root = safeguarded_newton(
            |x| (x * x - 2.0, 2.0 * x),
            (0.0, 2.0),
            1.0,
            &RootSettings::default(),
        )
        .unwrap();
        assert!((root.x - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!(root.iterations < 10);
    }

    #[test]
    fn test_reversed_bracket_and_decreasing_function() {
        let root = safeguarded_newton(
            |x| (3.0 - x, -1.0),
            (10.0, -10.0),
            0.0,
            &RootSettings::default(),
        )
        .unwrap();
        assert!((root.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_bracket() {
        let err = safeguarded_newton(
            |x| (x * x + 1.0, 2.0 * x),
            (-1.0, 1.0),
            0.0,
            &RootSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::NoBracket { .. }));
    }

    #[test]
    fn test_bad_derivative_falls_back_to_bisection() {
        // A derivative that always points the wrong way.
        let root = safeguarded_newton(
            |x| (x.powi(3) - 0.5, -1.0),
            (0.0, 1.0),
            0.9,
            &RootSettings::default(),
        )
        .unwrap();
        assert!((root.x - 0.5_f64.cbrt()).abs() < 1e-10);
    }

    #[test]
    fn test_infinite_endpoint_is_usable() {
        let root = safeguarded_newton(
            |x| {
                let v = (x * 100.0).exp() - 2.0;
                (v, 100.0 * (x * 100.0).exp())
            },
            (-1.0, 10.0),
            5.0,
            &RootSettings::default(),
        )
        .unwrap();
        assert!((root.x - 2.0_f64.ln() / 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_iteration_budget_is_enforced() {
        let settings = RootSettings {
            max_iterations: 3,
            x_tolerance: 0.0,
            residual_tolerance: 0.0,
        };
        let err = safeguarded_newton(|x| (x.powi(3) - 0.5, -1.0), (0.0, 1.0), 0.9, &settings)
            .unwrap_err();
        assert!(matches!(err, SolverError::NonConvergence { max_iter: 3, .. }));
    }
}
