use crate::element::ElementDescription;
use crate::Real;
use nalgebra::{DMatrix, DMatrixView};

/// Tensor-product nodal Lagrange basis.
///
/// The basis function of a node is the product over axes of the 1D Lagrange polynomials
/// associated with the node's tensor indices. Evaluation is not restricted to the reference
/// element, which allows extrapolation slightly outside of `[-1, 1]^dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeBasis<T> {
    dimension: usize,
    nodes_1d: Vec<T>,
    // prod_{j != i} (x_i - x_j) for each 1D node i
    denominators: Vec<T>,
    inverse_node_map: Vec<usize>,
}

impl<T: Real> LagrangeBasis<T> {
    /// Constructs the basis from tensor indices (`dimension` per node, node-major) and 1D nodes.
    ///
    /// # Panics
    ///
    /// Panics if the tensor indices do not describe whole nodes, refer to non-existent 1D nodes,
    /// or if the 1D nodes are not distinct.
    pub fn new(dimension: usize, inverse_node_map: Vec<usize>, nodes_1d: Vec<T>) -> Self {
        assert!(dimension > 0);
        assert_eq!(inverse_node_map.len() % dimension, 0);
        assert!(inverse_node_map.iter().all(|&i| i < nodes_1d.len()));

        let denominators: Vec<T> = nodes_1d
            .iter()
            .enumerate()
            .map(|(i, &x_i)| {
                nodes_1d
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .fold(T::one(), |prod, (_, &x_j)| prod * (x_i - x_j))
            })
            .collect();
        assert!(
            denominators.iter().all(|&d| d != T::zero()),
            "1D nodes must be distinct"
        );

        Self {
            dimension,
            nodes_1d,
            denominators,
            inverse_node_map,
        }
    }

    pub fn from_description(description: &ElementDescription<T>) -> Self {
        let inverse_node_map = description.inverse_node_map().flatten().copied().collect();
        Self::new(
            description.dimension(),
            inverse_node_map,
            description.node_locations_1d().to_vec(),
        )
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn num_nodes(&self) -> usize {
        self.inverse_node_map.len() / self.dimension
    }

    /// Basis values at each point (columns of a `dim x npts` matrix), as an `npts x npe` matrix.
    pub fn eval_basis_weights(&self, points: DMatrixView<T>) -> DMatrix<T> {
        assert_eq!(points.nrows(), self.dimension);
        let npe = self.num_nodes();
        let mut weights = DMatrix::zeros(points.ncols(), npe);
        let mut buffer = vec![T::zero(); npe];
        let mut xi = Vec::with_capacity(self.dimension);
        for (ip, point) in points.column_iter().enumerate() {
            xi.clear();
            xi.extend(point.iter().copied());
            self.populate_basis(&mut buffer, &xi);
            for (n, value) in buffer.iter().enumerate() {
                weights[(ip, n)] = *value;
            }
        }
        weights
    }

    /// Reference derivatives at each point as an `(npts * dim) x npe` matrix, whose row
    /// `ip * dim + d` holds the derivatives with respect to `xi_d` at point `ip`.
    pub fn eval_deriv_weights(&self, points: DMatrixView<T>) -> DMatrix<T> {
        assert_eq!(points.nrows(), self.dimension);
        let dim = self.dimension;
        let npe = self.num_nodes();
        let mut weights = DMatrix::zeros(points.ncols() * dim, npe);
        let mut buffer = vec![T::zero(); npe * dim];
        let mut xi = Vec::with_capacity(dim);
        for (ip, point) in points.column_iter().enumerate() {
            xi.clear();
            xi.extend(point.iter().copied());
            self.populate_basis_gradients(&mut buffer, &xi);
            for n in 0..npe {
                for d in 0..dim {
                    weights[(ip * dim + d, n)] = buffer[n * dim + d];
                }
            }
        }
        weights
    }

    /// Writes the value of every basis function at `point` into `basis`.
    pub fn populate_basis(&self, basis: &mut [T], point: &[T]) {
        assert_eq!(basis.len(), self.num_nodes());
        assert_eq!(point.len(), self.dimension);
        let n1d = self.nodes_1d.len();
        let values: Vec<T> = point
            .iter()
            .flat_map(|&x| (0..n1d).map(move |i| self.lagrange_value(i, x)))
            .collect();

        for (phi, indices) in basis.iter_mut().zip(self.inverse_node_map.chunks_exact(self.dimension)) {
            *phi = indices
                .iter()
                .enumerate()
                .fold(T::one(), |prod, (d, &i)| prod * values[d * n1d + i]);
        }
    }

    /// Writes the reference gradients of every basis function at `point` into `gradients`,
    /// laid out as a column-major `dim x npe` matrix.
    pub fn populate_basis_gradients(&self, gradients: &mut [T], point: &[T]) {
        let dim = self.dimension;
        assert_eq!(gradients.len(), self.num_nodes() * dim);
        assert_eq!(point.len(), dim);
        let n1d = self.nodes_1d.len();
        let mut values = Vec::with_capacity(dim * n1d);
        let mut derivatives = Vec::with_capacity(dim * n1d);
        for &x in point {
            for i in 0..n1d {
                values.push(self.lagrange_value(i, x));
                derivatives.push(self.lagrange_derivative(i, x));
            }
        }

        for (gradient, indices) in gradients
            .chunks_exact_mut(dim)
            .zip(self.inverse_node_map.chunks_exact(dim))
        {
            for (d, partial) in gradient.iter_mut().enumerate() {
                // Product rule: differentiate along axis d only
                *partial = indices.iter().enumerate().fold(T::one(), |prod, (e, &i)| {
                    let factor = if e == d {
                        derivatives[e * n1d + i]
                    } else {
                        values[e * n1d + i]
                    };
                    prod * factor
                });
            }
        }
    }

    fn lagrange_value(&self, i: usize, x: T) -> T {
        let numerator = self
            .nodes_1d
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .fold(T::one(), |prod, (_, &x_j)| prod * (x - x_j));
        numerator / self.denominators[i]
    }

    fn lagrange_derivative(&self, i: usize, x: T) -> T {
        let n = self.nodes_1d.len();
        let mut sum = T::zero();
        for k in (0..n).filter(|&k| k != i) {
            let mut prod = T::one();
            for (j, &x_j) in self.nodes_1d.iter().enumerate() {
                if j != i && j != k {
                    prod *= x - x_j;
                }
            }
            sum += prod;
        }
        sum / self.denominators[i]
    }
}
