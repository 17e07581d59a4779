//! Tensor-product rules for the reference quadrilateral and hexahedron.
//!
//! Points are enumerated with the first axis varying fastest, which matches the lexicographic
//! ordering of integration points used by the control-volume master elements.

use crate::univariate::gauss;
use crate::{Point, Rule};

/// Forms the `D`-dimensional tensor product of a one-dimensional rule.
///
/// The weight of each point is the product of the per-axis weights.
pub fn tensor_product<const D: usize>(rule1d: &Rule<1>) -> Rule<D> {
    let (weights1d, points1d) = rule1d;
    let n = weights1d.len();
    let total = n.pow(D as u32);

    let mut weights = Vec::with_capacity(total);
    let mut points = Vec::with_capacity(total);
    for linear in 0..total {
        let mut remainder = linear;
        let mut weight = 1.0;
        let mut point: Point<D> = [0.0; D];
        for coord in point.iter_mut() {
            let q = remainder % n;
            remainder /= n;
            weight *= weights1d[q];
            *coord = points1d[q][0];
        }
        weights.push(weight);
        points.push(point);
    }

    (weights, points)
}

/// A Gauss rule for the reference quadrilateral with the given number of points per axis.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    tensor_product(&gauss(num_points_per_dim))
}

/// A Gauss rule for the reference hexahedron with the given number of points per axis.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    tensor_product(&gauss(num_points_per_dim))
}
