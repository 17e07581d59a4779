//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

/// Upper bound on the Newton iterations used to locate the roots of a single rule.
const MAX_ROOT_ITERATIONS: usize = 100;

/// Values `(P_n(x), P_{n-1}(x))` of the Legendre polynomials of degrees `n` and `n - 1`.
///
/// `P_{-1}` is taken to be zero.
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    //  k P_k(x) = (2k - 1) x P_{k-1}(x) - (k - 1) P_{k-2}(x)
    (1..=n).fold((1.0, 0.0), |(current, previous), k| {
        let k = k as f64;
        (((2.0 * k - 1.0) * x * current - (k - 1.0) * previous) / k, current)
    })
}

/// Derivative of `P_n` from the pair returned by [`legendre_pair`]. Undefined at `|x| = 1`.
fn legendre_derivative(n: usize, x: f64, (p_n, p_prev): (f64, f64)) -> f64 {
    n as f64 * (x * p_n - p_prev) / (x * x - 1.0)
}

/// Runs the Newton-type iteration `x <- x + step(x)` until the step vanishes.
fn refine_root(mut x: f64, step: impl Fn(f64) -> f64) -> f64 {
    for _ in 0..MAX_ROOT_ITERATIONS {
        let dx = step(x);
        x += dx;
        if dx.abs() <= 1e-15 {
            break;
        }
    }
    x
}

/// Builds an `n`-point rule, symmetric about the origin, in ascending order.
///
/// `node(i)` returns the `i`-th point in descending order, for `i < (n + 1) / 2`, together with
/// its weight. The mirrored half follows by symmetry and a middle point is snapped to zero.
fn symmetric_rule(n: usize, node: impl Fn(usize) -> (f64, f64)) -> Rule<1> {
    let mut points = vec![[0.0]; n];
    let mut weights = vec![0.0; n];
    for i in 0..(n + 1) / 2 {
        let (x, w) = node(i);
        points[n - 1 - i] = [x];
        points[i] = [-x];
        weights[n - 1 - i] = w;
        weights[i] = w;
    }
    if n % 2 == 1 {
        points[n / 2] = [0.0];
    }
    (weights, points)
}

/// Gauss quadrature for the reference interval [-1, 1].
///
/// Returns the [Gauss quadrature rule] with the given number of points, sorted in ascending order.
/// Given `n` points, the rule integrates polynomials of order up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
///
/// [Gauss quadrature rule]: https://en.wikipedia.org/wiki/Gaussian_quadrature
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    symmetric_rule(n, |i| {
        // Roots of P_n, starting from the asymptotic estimate of the i-th largest root
        let guess = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let x = refine_root(guess, |x| {
            let pair = legendre_pair(n, x);
            -pair.0 / legendre_derivative(n, x, pair)
        });
        let dp = legendre_derivative(n, x, legendre_pair(n, x));
        (x, 2.0 / ((1.0 - x * x) * dp * dp))
    })
}

/// Gauss-Lobatto-Legendre quadrature for the reference interval [-1, 1].
///
/// The points are sorted in ascending order and include both endpoints. Given `n >= 2` points,
/// the rule integrates polynomials of order up to `2 n - 3` exactly. Returns `None` if fewer than
/// two points are requested.
pub fn try_gauss_lobatto(num_points: usize) -> Option<Rule<1>> {
    if num_points < 2 {
        return None;
    }

    let n = num_points;
    let degree = n - 1;
    let (weights, mut points) = symmetric_rule(n, |i| {
        // Interior points are the roots of P'_{n-1}. Newton on (1 - x^2) P'_{n-1} from the
        // Chebyshev-Gauss-Lobatto points only involves P_{n-1} and P_{n-2} and keeps the
        // endpoints fixed.
        let guess = (PI * i as f64 / degree as f64).cos();
        let x = refine_root(guess, |x| {
            let (p, p_prev) = legendre_pair(degree, x);
            -(x * p - p_prev) / (n as f64 * p)
        });
        let (p, _) = legendre_pair(degree, x);
        (x, 2.0 / ((degree * n) as f64 * p * p))
    });

    points[0] = [-1.0];
    points[n - 1] = [1.0];

    Some((weights, points))
}

/// Same as [`try_gauss_lobatto`], but panics if fewer than two points are requested.
pub fn gauss_lobatto(num_points: usize) -> Rule<1> {
    try_gauss_lobatto(num_points).expect("Gauss-Lobatto rules require at least two points")
}

/// Maps a rule on the reference interval `[-1, 1]` affinely onto the interval `[a, b]`.
pub fn map_to_interval(rule: &Rule<1>, a: f64, b: f64) -> Rule<1> {
    let half_length = 0.5 * (b - a);
    let midpoint = 0.5 * (a + b);
    let (weights, points) = rule;
    let mapped_weights = weights.iter().map(|w| half_length * w).collect();
    let mapped_points = points
        .iter()
        .map(|&[x]| [half_length * x + midpoint])
        .collect();
    (mapped_weights, mapped_points)
}
