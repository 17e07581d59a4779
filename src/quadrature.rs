//! Sub-interval quadrature for control-volume master elements.
//!
//! Each reference axis `[-1, 1]` is partitioned by the *sub-control-surface* cut locations into
//! one sub-interval per node. Volume integrals over a node's dual volume and flux integrals over
//! the faces between dual volumes are both built from a 1D Gauss rule mapped affinely into these
//! sub-intervals.
use crate::error::ConfigurationError;
use crate::Real;
use cvfem_quadrature::univariate::gauss;
use cvfem_quadrature::{QuadratureType, Rule1d};
use nalgebra::convert;

/// Errors returned by quadrature methods.
pub use cvfem_quadrature::Error as QuadratureError;

fn convert_rule<T: Real>(rule: Rule1d) -> (Vec<T>, Vec<T>) {
    let (weights, points) = rule;
    let weights = weights.into_iter().map(convert).collect();
    let points = points.into_iter().map(|[x]| convert(x)).collect();
    (weights, points)
}

/// Tensor-product quadrature on the sub-intervals of a polynomial order `p` element.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorProductQuadratureRule<T> {
    quadrature_type: QuadratureType,
    poly_order: usize,
    abscissae: Vec<T>,
    weights: Vec<T>,
    scs_loc: Vec<T>,
    scs_end_loc: Vec<T>,
}

impl<T: Real> TensorProductQuadratureRule<T> {
    /// Creates the rule for the named 1D family and polynomial order.
    ///
    /// Each sub-interval receives `p / 2 + 1` points, which integrates a polynomial of degree `p`
    /// exactly over the sub-interval.
    pub fn new(name: &str, poly_order: usize) -> Result<Self, ConfigurationError> {
        let quadrature_type: QuadratureType = name.parse()?;
        if poly_order == 0 {
            return Err(QuadratureError::NoRuleAvailable.into());
        }

        let (weights, abscissae) = convert_rule(quadrature_type.rule(poly_order / 2 + 1));
        let (_, scs_loc) = convert_rule::<T>(gauss(poly_order));

        let mut scs_end_loc = Vec::with_capacity(poly_order + 2);
        scs_end_loc.push(-T::one());
        scs_end_loc.extend_from_slice(&scs_loc);
        scs_end_loc.push(T::one());

        Ok(Self {
            quadrature_type,
            poly_order,
            abscissae,
            weights,
            scs_loc,
            scs_end_loc,
        })
    }

    pub fn quadrature_type(&self) -> QuadratureType {
        self.quadrature_type
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    /// Number of 1D points per sub-interval.
    pub fn num_quad(&self) -> usize {
        self.abscissae.len()
    }

    /// 1D points of the underlying rule on `[-1, 1]`.
    pub fn abscissae(&self) -> &[T] {
        &self.abscissae
    }

    /// 1D weights of the underlying rule on `[-1, 1]`.
    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Interior sub-control-surface locations, in ascending order.
    pub fn scs_loc(&self) -> &[T] {
        &self.scs_loc
    }

    /// Sub-control-surface locations including the endpoints `-1` and `1`.
    ///
    /// Node `i` of an axis lies inside `[scs_end_loc[i], scs_end_loc[i + 1]]`.
    pub fn scs_end_loc(&self) -> &[T] {
        &self.scs_end_loc
    }

    /// Location of the `q`-th point mapped into the sub-interval of the given 1D node.
    pub fn gauss_point_location(&self, node_ordinal: usize, q: usize) -> T {
        let a = self.scs_end_loc[node_ordinal];
        let b = self.scs_end_loc[node_ordinal + 1];
        let half = T::one() / (T::one() + T::one());
        half * ((b - a) * self.abscissae[q] + (a + b))
    }

    /// Weight of the `q`-th point mapped into the sub-interval of the given 1D node.
    pub fn gauss_weight(&self, node_ordinal: usize, q: usize) -> T {
        let a = self.scs_end_loc[node_ordinal];
        let b = self.scs_end_loc[node_ordinal + 1];
        let half = T::one() / (T::one() + T::one());
        half * (b - a) * self.weights[q]
    }

    /// Product of the mapped weights across axes.
    ///
    /// # Panics
    ///
    /// Panics if the number of node ordinals and point indices differ.
    pub fn tensor_product_weight(&self, node_ordinals: &[usize], qs: &[usize]) -> T {
        assert_eq!(node_ordinals.len(), qs.len());
        node_ordinals
            .iter()
            .zip(qs)
            .fold(T::one(), |w, (&node, &q)| w * self.gauss_weight(node, q))
    }
}
