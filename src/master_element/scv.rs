use crate::element::{ElementDescription, ElementSignature, LagrangeBasis};
use crate::error::{ConfigurationError, DegenerateJacobianError};
use crate::master_element::{for_each_jacobian, multi_index, num_elements_in, MasterElement};
use crate::quadrature::TensorProductQuadratureRule;
use crate::Real;
use nalgebra::{DMatrix, DMatrixView};

/// Sub-control-volume master element.
///
/// Every node owns the dual volume given by the tensor product of its sub-intervals. Each dual
/// volume carries `num_quad^dim` integration points; integration points are ordered by owning
/// node ordinal, then by the tensor index of the point with the first axis fastest.
#[derive(Debug, Clone)]
pub struct HigherOrderScv<T: Real> {
    description: ElementDescription<T>,
    basis: LagrangeBasis<T>,
    integration_points: DMatrix<T>,
    ip_weights: Vec<T>,
    ip_node_map: Vec<usize>,
    shape_functions: DMatrix<T>,
    shape_derivatives: DMatrix<T>,
}

impl<T: Real> HigherOrderScv<T> {
    /// # Panics
    ///
    /// Panics if the polynomial orders of the description and quadrature rule differ.
    pub fn new(
        description: ElementDescription<T>,
        basis: LagrangeBasis<T>,
        quadrature: &TensorProductQuadratureRule<T>,
    ) -> Self {
        assert_eq!(description.poly_order(), quadrature.poly_order());
        let dim = description.dimension();
        let nq = quadrature.num_quad();
        let points_per_node = nq.pow(dim as u32);
        let nip = description.nodes_per_element() * points_per_node;

        let mut points = Vec::with_capacity(nip * dim);
        let mut ip_weights = Vec::with_capacity(nip);
        let mut ip_node_map = Vec::with_capacity(nip);
        for node in 0..description.nodes_per_element() {
            let t = description.tensor_indices(node);
            for q in 0..points_per_node {
                let qs = multi_index(q, nq, dim);
                points.extend((0..dim).map(|d| quadrature.gauss_point_location(t[d], qs[d])));
                ip_weights.push(quadrature.tensor_product_weight(t, &qs[..dim]));
                ip_node_map.push(node);
            }
        }

        let integration_points = DMatrix::from_vec(dim, nip, points);
        let shape_functions = basis.eval_basis_weights(DMatrixView::from(&integration_points));
        let shape_derivatives = basis.eval_deriv_weights(DMatrixView::from(&integration_points));

        Self {
            description,
            basis,
            integration_points,
            ip_weights,
            ip_node_map,
            shape_functions,
            shape_derivatives,
        }
    }

    pub fn from_signature(signature: &ElementSignature, quadrature_name: &str) -> Result<Self, ConfigurationError> {
        let description = ElementDescription::for_signature(signature)?;
        let basis = LagrangeBasis::from_description(&description);
        let quadrature = TensorProductQuadratureRule::new(quadrature_name, signature.poly_order)?;
        Ok(Self::new(description, basis, &quadrature))
    }

    /// The node whose dual volume contains each integration point.
    pub fn ip_node_map(&self) -> &[usize] {
        &self.ip_node_map
    }

    /// Computes the physical sub-volume `w * det(J)` of every integration point for a batch of
    /// elements, at `e * nip + ip`.
    pub fn determinant(&self, coords: &[T], volume: &mut [T]) -> Result<(), DegenerateJacobianError> {
        let dim = self.dimension();
        let npe = self.nodes_per_element();
        let nip = self.num_integration_points();
        let num_elements = num_elements_in(coords, dim, npe);
        assert_eq!(volume.len(), num_elements * nip);

        let weights = &self.ip_weights;
        for_each_jacobian(self.shape_derivatives(), coords, dim, npe, |e, ip, _, jacobian| {
            let det = jacobian.determinant();
            volume[e * nip + ip] = weights[ip] * det;
            det > T::zero() && det.is_finite()
        })
    }
}

impl<T: Real> MasterElement<T> for HigherOrderScv<T> {
    fn description(&self) -> &ElementDescription<T> {
        &self.description
    }

    fn basis(&self) -> &LagrangeBasis<T> {
        &self.basis
    }

    fn integration_points(&self) -> DMatrixView<T> {
        DMatrixView::from(&self.integration_points)
    }

    fn shape_functions(&self) -> DMatrixView<T> {
        DMatrixView::from(&self.shape_functions)
    }

    fn shape_derivatives(&self) -> DMatrixView<T> {
        DMatrixView::from(&self.shape_derivatives)
    }

    fn ip_weights(&self) -> &[T] {
        &self.ip_weights
    }
}
