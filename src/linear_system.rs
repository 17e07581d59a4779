//! The global linear system elements are assembled into.
use crate::mesh::ElementConnectivity;
use crate::Real;
use eyre::eyre;
use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use std::marker::PhantomData;

/// Concurrent scatter-add of dense element blocks into a global system.
pub trait ScatterAdd<T>: Sync {
    /// Adds a local system to the rows of the given global nodes.
    ///
    /// `lhs` and `rhs` are ordered node-major with the system's number of dofs per node.
    /// `sort_permutation` lists the local node indices ordered by ascending global node index.
    ///
    /// # Safety
    ///
    /// Calls that run concurrently must not share any global node.
    unsafe fn sum_into(&self, nodes: &[usize], sort_permutation: &[usize], lhs: &DMatrix<T>, rhs: &[T]);
}

/// A global system with node-major rows, `dofs_per_node` rows per node.
pub trait LinearSystem<T: Real> {
    type ScatterAccess<'a>: ScatterAdd<T>
    where
        Self: 'a;

    fn dofs_per_node(&self) -> usize;

    /// Allocates storage for every node pair that shares an element.
    fn build_elem_to_node_graph(&mut self, connectivity: &(dyn ElementConnectivity + Sync)) -> eyre::Result<()>;

    fn scatter_access(&mut self) -> Self::ScatterAccess<'_>;
}

/// A system backed by a CSR matrix and a dense right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrLinearSystem<T> {
    dofs_per_node: usize,
    matrix: CsrMatrix<T>,
    rhs: DVector<T>,
}

impl<T: Real> CsrLinearSystem<T> {
    /// An empty system; storage is allocated by
    /// [`build_elem_to_node_graph`](LinearSystem::build_elem_to_node_graph).
    pub fn new(num_nodes: usize, dofs_per_node: usize) -> Self {
        let n = num_nodes * dofs_per_node;
        Self {
            dofs_per_node,
            matrix: CsrMatrix::zeros(n, n),
            rhs: DVector::zeros(n),
        }
    }

    pub fn matrix(&self) -> &CsrMatrix<T> {
        &self.matrix
    }

    pub fn rhs(&self) -> &DVector<T> {
        &self.rhs
    }

    /// Zeroes all stored values, keeping the sparsity pattern.
    pub fn zero(&mut self) {
        self.matrix.values_mut().fill(T::zero());
        self.rhs.fill(T::zero());
    }

    pub fn into_parts(self) -> (CsrMatrix<T>, DVector<T>) {
        (self.matrix, self.rhs)
    }
}

impl<T: Real> LinearSystem<T> for CsrLinearSystem<T> {
    type ScatterAccess<'a> = CsrScatterAccess<'a, T>;

    fn dofs_per_node(&self) -> usize {
        self.dofs_per_node
    }

    fn build_elem_to_node_graph(&mut self, connectivity: &(dyn ElementConnectivity + Sync)) -> eyre::Result<()> {
        let sdim = self.dofs_per_node;
        let num_rows = sdim * connectivity.num_nodes();
        if num_rows != self.rhs.len() {
            return Err(eyre!(
                "Mesh has {} nodes, but the system was created for {}",
                connectivity.num_nodes(),
                self.rhs.len() / sdim
            ));
        }

        // Count number of (including duplicate) entries
        let num_total_entries = (0..connectivity.num_elements())
            .into_par_iter()
            .with_min_len(50)
            .map(|element| {
                let n = sdim * connectivity.element_nodes(element).len();
                n * n
            })
            .sum();

        let mut coordinates = Vec::with_capacity(num_total_entries);
        for element in 0..connectivity.num_elements() {
            let nodes = connectivity.element_nodes(element);
            for node_i in nodes {
                for node_j in nodes {
                    for i in 0..sdim {
                        for j in 0..sdim {
                            coordinates.push((sdim * node_i + i, sdim * node_j + j));
                        }
                    }
                }
            }
        }
        coordinates.par_sort_unstable();
        coordinates.dedup();

        let mut row_offsets = Vec::with_capacity(num_rows + 1);
        let mut column_indices = Vec::with_capacity(coordinates.len());
        row_offsets.push(0);
        let mut current_row = 0;
        for (i, j) in coordinates {
            // Loop to correctly handle consecutive empty rows
            while i > current_row {
                row_offsets.push(column_indices.len());
                current_row += 1;
            }
            column_indices.push(j);
        }
        while row_offsets.len() < num_rows + 1 {
            row_offsets.push(column_indices.len());
        }

        let pattern = SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, row_offsets, column_indices)
            .map_err(|err| eyre!("Invalid element-to-node graph: {err}"))?;
        debug!("Built element-to-node graph with {} rows and {} entries", num_rows, pattern.nnz());
        let values = vec![T::zero(); pattern.nnz()];
        self.matrix = CsrMatrix::try_from_pattern_and_values(pattern, values)
            .map_err(|err| eyre!("Invalid element-to-node graph: {err}"))?;
        self.rhs.fill(T::zero());
        Ok(())
    }

    fn scatter_access(&mut self) -> CsrScatterAccess<'_, T> {
        let num_rows = self.matrix.nrows();
        let (row_offsets, column_indices, values) = self.matrix.csr_data_mut();
        CsrScatterAccess {
            dofs_per_node: self.dofs_per_node,
            num_rows,
            row_offsets,
            column_indices,
            values: values.as_mut_ptr(),
            rhs: self.rhs.as_mut_slice().as_mut_ptr(),
            marker: PhantomData,
        }
    }
}

/// Unsynchronized access to the rows of a [`CsrLinearSystem`].
///
/// Soundness relies on the contract of [`ScatterAdd::sum_into`]: concurrent writers touch
/// disjoint rows.
pub struct CsrScatterAccess<'a, T> {
    dofs_per_node: usize,
    num_rows: usize,
    row_offsets: &'a [usize],
    column_indices: &'a [usize],
    values: *mut T,
    rhs: *mut T,
    marker: PhantomData<&'a mut T>,
}

unsafe impl<'a, T: 'a + Sync + Send> Sync for CsrScatterAccess<'a, T> {}
unsafe impl<'a, T: 'a + Send> Send for CsrScatterAccess<'a, T> {}

impl<'a, T: Real> ScatterAdd<T> for CsrScatterAccess<'a, T> {
    unsafe fn sum_into(&self, nodes: &[usize], sort_permutation: &[usize], lhs: &DMatrix<T>, rhs: &[T]) {
        let sdim = self.dofs_per_node;
        let n = nodes.len() * sdim;
        assert_eq!(nodes.len(), sort_permutation.len());
        assert_eq!(lhs.shape(), (n, n));
        assert_eq!(rhs.len(), n);

        for (local_node, &global_node) in nodes.iter().enumerate() {
            for i in 0..sdim {
                let local_row = sdim * local_node + i;
                let global_row = sdim * global_node + i;
                assert!(global_row < self.num_rows, "Node index out of bounds");

                let begin = self.row_offsets[global_row];
                let end = self.row_offsets[global_row + 1];
                let columns = &self.column_indices[begin..end];
                // The caller guarantees that no other thread accesses this row
                let values = std::slice::from_raw_parts_mut(self.values.add(begin), end - begin);
                add_element_row_to_csr_row(columns, values, nodes, sort_permutation, sdim, lhs, local_row);
                *self.rhs.add(global_row) += rhs[local_row];
            }
        }
    }
}

/// Adds a row of the local matrix to a CSR row in a single pass over the row's columns.
///
/// Visiting local nodes in order of ascending global index makes the global column indices
/// ascending as well.
fn add_element_row_to_csr_row<T: Real>(
    columns: &[usize],
    values: &mut [T],
    nodes: &[usize],
    sort_permutation: &[usize],
    sdim: usize,
    lhs: &DMatrix<T>,
    local_row: usize,
) {
    let mut position = 0;
    for &local_node in sort_permutation {
        let global_node = nodes[local_node];
        for j in 0..sdim {
            let global_col = sdim * global_node + j;
            while position < columns.len() && columns[position] < global_col {
                position += 1;
            }
            assert!(
                position < columns.len() && columns[position] == global_col,
                "Could not find column index associated with node in CSR row"
            );
            values[position] += lhs[(local_row, sdim * local_node + j)];
        }
    }
}
