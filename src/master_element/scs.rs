use crate::element::{ElementDescription, ElementSignature, LagrangeBasis};
use crate::error::{ConfigurationError, DegenerateJacobianError};
use crate::master_element::{for_each_jacobian, multi_index, num_elements_in, MasterElement};
use crate::quadrature::TensorProductQuadratureRule;
use crate::Real;
use nalgebra::{DMatrix, DMatrixView};

/// Sub-control-surface master element.
///
/// For every reference axis `d` and every interior cut location `s` along it, the face
/// `xi_d = scs_loc[s]` separates the dual volumes of node pairs whose tensor index along `d` is
/// `s` (left) and `s + 1` (right). The face is split into pieces aligned with the sub-intervals
/// of the remaining axes, each integrated with the tensor-product Gauss rule.
///
/// Integration points are ordered by axis, then cut location, then the tensor index of the
/// adjacent node along the remaining axes, then the Gauss point within that piece.
#[derive(Debug, Clone)]
pub struct HigherOrderScs<T: Real> {
    description: ElementDescription<T>,
    basis: LagrangeBasis<T>,
    integration_points: DMatrix<T>,
    ip_weights: Vec<T>,
    adjacent_nodes: Vec<[usize; 2]>,
    ip_directions: Vec<usize>,
    shape_functions: DMatrix<T>,
    shape_derivatives: DMatrix<T>,
}

impl<T: Real> HigherOrderScs<T> {
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
        let p = description.poly_order();
        let nq = quadrature.num_quad();
        let face_nodes = (p + 1).pow(dim as u32 - 1);
        let face_points = nq.pow(dim as u32 - 1);

        let mut points = Vec::new();
        let mut ip_weights = Vec::new();
        let mut adjacent_nodes = Vec::new();
        let mut ip_directions = Vec::new();
        for direction in 0..dim {
            let tangential: Vec<usize> = (0..dim).filter(|&axis| axis != direction).collect();
            for (s, &cut) in quadrature.scs_loc().iter().enumerate() {
                for m in 0..face_nodes {
                    let ms = multi_index(m, p + 1, dim - 1);
                    let mut left = [0; 3];
                    let mut right = [0; 3];
                    left[direction] = s;
                    right[direction] = s + 1;
                    for (k, &axis) in tangential.iter().enumerate() {
                        left[axis] = ms[k];
                        right[axis] = ms[k];
                    }
                    let pair = [
                        description.node_map(&left[..dim]),
                        description.node_map(&right[..dim]),
                    ];

                    for q in 0..face_points {
                        let qs = multi_index(q, nq, dim - 1);
                        for axis in 0..dim {
                            let coord = match tangential.iter().position(|&a| a == axis) {
                                Some(k) => quadrature.gauss_point_location(ms[k], qs[k]),
                                None => cut,
                            };
                            points.push(coord);
                        }
                        ip_weights.push(quadrature.tensor_product_weight(&ms[..dim - 1], &qs[..dim - 1]));
                        adjacent_nodes.push(pair);
                        ip_directions.push(direction);
                    }
                }
            }
        }

        let nip = ip_weights.len();
        let integration_points = DMatrix::from_vec(dim, nip, points);
        let shape_functions = basis.eval_basis_weights(DMatrixView::from(&integration_points));
        let shape_derivatives = basis.eval_deriv_weights(DMatrixView::from(&integration_points));

        Self {
            description,
            basis,
            integration_points,
            ip_weights,
            adjacent_nodes,
            ip_directions,
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

    /// The `[left, right]` node ordinals whose dual volumes share each integration point.
    pub fn adjacent_nodes(&self) -> &[[usize; 2]] {
        &self.adjacent_nodes
    }

    /// The reference axis each face integration point is normal to.
    pub fn ip_directions(&self) -> &[usize] {
        &self.ip_directions
    }

    /// Computes the area vector `w * det(J) * J^-T e_d` of every integration point for a batch of
    /// elements, at `(e * nip + ip) * dim + k`.
    ///
    /// Area vectors point from the left to the right node of the face.
    pub fn area_vectors(&self, coords: &[T], area_vectors: &mut [T]) -> Result<(), DegenerateJacobianError> {
        let dim = self.dimension();
        let npe = self.nodes_per_element();
        let nip = self.num_integration_points();
        let num_elements = num_elements_in(coords, dim, npe);
        assert_eq!(area_vectors.len(), num_elements * nip * dim);

        let weights = &self.ip_weights;
        let directions = &self.ip_directions;
        for_each_jacobian(self.shape_derivatives(), coords, dim, npe, |e, ip, _, jacobian| {
            let det = jacobian.determinant();
            let out = &mut area_vectors[(e * nip + ip) * dim..(e * nip + ip + 1) * dim];
            match jacobian.clone().try_inverse() {
                Some(inverse) if det > T::zero() && det.is_finite() => {
                    // Row d of J^-1 is column d of J^-T
                    let scale = weights[ip] * det;
                    for (k, a) in out.iter_mut().enumerate() {
                        *a = scale * inverse[(directions[ip], k)];
                    }
                    true
                }
                _ => {
                    out.fill(T::zero());
                    false
                }
            }
        })
    }
}

impl<T: Real> MasterElement<T> for HigherOrderScs<T> {
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
