//! Sub-control-volume and sub-control-surface master elements.
//!
//! A master element caches everything about an element family that does not depend on the
//! physical geometry: the integration points, basis values and reference derivatives at those
//! points, and the reference weights. Geometry-dependent quantities are computed for batches of
//! elements whose nodal coordinates are stored node-major (`dim` values per node, `npe` nodes per
//! element, elements back to back).
use crate::element::{ElementDescription, ElementSignature, LagrangeBasis};
use crate::error::DegenerateJacobianError;
use crate::Real;
use log::debug;
use nalgebra::{convert, DMatrix, DMatrixView, DVector};
use std::fmt::Debug;

mod repo;
mod scs;
mod scv;

pub use repo::MasterElementRepo;
pub use scs::HigherOrderScs;
pub use scv::HigherOrderScv;

/// Newton iterations stop once the update norm falls below this value relative to
/// `1 + |xi|`. Scalars coarser than `f64` use a multiple of their machine epsilon instead.
pub const NEWTON_TOLERANCE: f64 = 1e-12;
pub const MAX_NEWTON_ITERATIONS: usize = 50;

/// Result of mapping a physical point back to reference coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricLocation<T> {
    pub reference_coords: Vec<T>,
    /// `max_d |xi_d|`, or the largest representable value if the point could not be located.
    pub distance: T,
}

impl<T: Real> ParametricLocation<T> {
    /// Whether the point lies in the closed reference element, up to the given tolerance.
    pub fn is_inside(&self, tolerance: T) -> bool {
        self.distance <= T::one() + tolerance
    }
}

/// Operations shared by all master elements.
pub trait MasterElement<T: Real>: Debug + Send + Sync {
    fn description(&self) -> &ElementDescription<T>;

    fn basis(&self) -> &LagrangeBasis<T>;

    /// Reference coordinates of the integration points as a `dim x nip` matrix.
    fn integration_points(&self) -> DMatrixView<T>;

    /// Basis values at the integration points, `nip x npe`.
    fn shape_functions(&self) -> DMatrixView<T>;

    /// Reference derivatives at the integration points, `(nip * dim) x npe`.
    fn shape_derivatives(&self) -> DMatrixView<T>;

    /// Reference measure associated with each integration point.
    fn ip_weights(&self) -> &[T];

    fn signature(&self) -> ElementSignature {
        self.description().signature()
    }

    fn dimension(&self) -> usize {
        self.description().dimension()
    }

    fn nodes_per_element(&self) -> usize {
        self.description().nodes_per_element()
    }

    fn num_integration_points(&self) -> usize {
        self.ip_weights().len()
    }

    /// Computes physical basis gradients and Jacobian determinants for a batch of elements.
    ///
    /// `grad_op` receives `dim` derivatives per node per integration point per element, at
    /// `((e * nip + ip) * npe + n) * dim + d`, and `det_j` one determinant per integration point
    /// per element. Elements whose Jacobian is singular or has a non-positive determinant at some
    /// integration point are reported in the error, with zero gradients at the offending points;
    /// all other elements are still fully processed.
    fn grad_op(&self, coords: &[T], grad_op: &mut [T], det_j: &mut [T]) -> Result<(), DegenerateJacobianError> {
        let dim = self.dimension();
        let npe = self.nodes_per_element();
        let nip = self.num_integration_points();
        let num_elements = num_elements_in(coords, dim, npe);
        assert_eq!(grad_op.len(), num_elements * nip * npe * dim);
        assert_eq!(det_j.len(), num_elements * nip);

        let block = npe * dim;
        for_each_jacobian(self.shape_derivatives(), coords, dim, npe, |e, ip, deriv, jacobian| {
            let idx = e * nip + ip;
            let det = jacobian.determinant();
            det_j[idx] = det;
            let out = &mut grad_op[idx * block..(idx + 1) * block];
            match jacobian.clone().try_inverse() {
                Some(inverse) if det > T::zero() && det.is_finite() => {
                    let gradients = inverse.transpose() * deriv;
                    out.copy_from_slice(gradients.as_slice());
                    true
                }
                _ => {
                    out.fill(T::zero());
                    false
                }
            }
        })
    }

    /// Locates `point` in the element with the given nodal coordinates by Newton iteration
    /// from the reference centroid.
    ///
    /// Points that cannot be located (no convergence, singular Jacobian) are reported through a
    /// maximal `distance` rather than an error.
    fn is_in_element(&self, coords: &[T], point: &[T]) -> ParametricLocation<T> {
        let dim = self.dimension();
        let npe = self.nodes_per_element();
        assert_eq!(coords.len(), dim * npe);
        assert_eq!(point.len(), dim);

        let x = DMatrixView::from_slice(coords, dim, npe);
        let target = DVector::from_column_slice(point);
        let basis = self.basis();
        let floor: T = convert(NEWTON_TOLERANCE);
        let tolerance = floor.max(convert::<f64, T>(64.0) * T::default_epsilon());

        let mut xi = DVector::zeros(dim);
        let mut phi = DVector::zeros(npe);
        let mut dphi = DMatrix::zeros(dim, npe);
        let mut converged = false;
        for _ in 0..MAX_NEWTON_ITERATIONS {
            basis.populate_basis(phi.as_mut_slice(), xi.as_slice());
            basis.populate_basis_gradients(dphi.as_mut_slice(), xi.as_slice());
            let residual = &x * &phi - &target;
            let jacobian = &x * dphi.transpose();
            let Some(delta) = jacobian.lu().solve(&residual) else {
                break;
            };
            xi -= &delta;
            if !xi.iter().all(|v| v.is_finite()) {
                break;
            }
            if delta.norm() <= tolerance * (T::one() + xi.norm()) {
                converged = true;
                break;
            }
        }

        let distance = if converged {
            xi.iter().fold(T::zero(), |max, v| max.max(v.abs()))
        } else {
            debug!("Point {:?} could not be located within {} Newton iterations", point, MAX_NEWTON_ITERATIONS);
            T::max_value().unwrap_or_else(|| convert(f64::MAX))
        };

        ParametricLocation {
            reference_coords: xi.as_slice().to_vec(),
            distance,
        }
    }

    /// Interpolates `ncomp x npe` nodal values at a reference point into `out`.
    fn interpolate_point(&self, reference_coords: &[T], nodal_values: DMatrixView<T>, out: &mut [T]) {
        let npe = self.nodes_per_element();
        assert_eq!(nodal_values.ncols(), npe);
        assert_eq!(out.len(), nodal_values.nrows());
        let mut phi = DVector::zeros(npe);
        self.basis().populate_basis(phi.as_mut_slice(), reference_coords);
        let values = nodal_values * phi;
        out.copy_from_slice(values.as_slice());
    }
}

fn num_elements_in<T>(coords: &[T], dim: usize, npe: usize) -> usize {
    assert_eq!(
        coords.len() % (dim * npe),
        0,
        "Coordinates must hold a whole number of elements"
    );
    coords.len() / (dim * npe)
}

/// Visits the Jacobian `J = X D^T` at every integration point of every element.
///
/// The visitor returns whether the Jacobian is acceptable; elements with at least one rejected
/// Jacobian are collected into the error.
fn for_each_jacobian<T, F>(
    shape_derivatives: DMatrixView<T>,
    coords: &[T],
    dim: usize,
    npe: usize,
    mut visit: F,
) -> Result<(), DegenerateJacobianError>
where
    T: Real,
    F: FnMut(usize, usize, DMatrixView<T>, &DMatrix<T>) -> bool,
{
    let nip = shape_derivatives.nrows() / dim;
    let mut degenerate = Vec::new();
    for (e, element_coords) in coords.chunks_exact(dim * npe).enumerate() {
        let x = DMatrixView::from_slice(element_coords, dim, npe);
        let mut accepted = true;
        for ip in 0..nip {
            let deriv = shape_derivatives.rows(ip * dim, dim);
            let jacobian = &x * deriv.transpose();
            accepted &= visit(e, ip, deriv, &jacobian);
        }
        if !accepted {
            degenerate.push(e);
        }
    }

    if degenerate.is_empty() {
        Ok(())
    } else {
        Err(DegenerateJacobianError { elements: degenerate })
    }
}

/// Splits a linear index into `dim` digits of the given base, first digit fastest.
fn multi_index(linear: usize, base: usize, dim: usize) -> [usize; 3] {
    let mut digits = [0; 3];
    let mut remainder = linear;
    for digit in digits.iter_mut().take(dim) {
        *digit = remainder % base;
        remainder /= base;
    }
    digits
}
