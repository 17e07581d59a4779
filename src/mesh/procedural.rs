//! Basic procedural mesh generation routines.
use crate::element::{ElementDescription, ElementSignature};
use crate::mesh::ElementBlock;
use crate::Real;
use eyre::{eyre, WrapErr};
use numeric_literals::replace_float_literals;

/// Generates a structured high-order mesh of the axis-aligned box `[lower, upper]` with the given
/// number of cells along every axis.
///
/// Within each cell, nodes are placed at the Gauss-Lobatto-Legendre locations of the element
/// order. Global nodes are numbered lexicographically over the node lattice (first axis
/// fastest), and so are the elements.
pub fn create_box_element_block<T>(
    signature: ElementSignature,
    cells_per_dim: usize,
    lower: &[T],
    upper: &[T],
) -> eyre::Result<ElementBlock<T>>
where
    T: Real,
{
    let dim = signature.dimension();
    let p = signature.poly_order;
    if cells_per_dim == 0 {
        return Err(eyre!("At least one cell per dimension is required"));
    }
    if lower.len() != dim || upper.len() != dim {
        return Err(eyre!("Box corners must have {} coordinates", dim));
    }
    let description: ElementDescription<T> =
        ElementDescription::for_signature(&signature).wrap_err("Unsupported element signature for box mesh")?;

    let lattice_1d = cells_per_dim * p + 1;
    let num_nodes = lattice_1d.pow(dim as u32);
    let num_cells = cells_per_dim.pow(dim as u32);
    let two = T::one() + T::one();
    let cells = T::from_usize(cells_per_dim).ok_or_else(|| eyre!("Cell count does not fit in scalar"))?;

    let lattice_coordinate = |d: usize, index: usize| -> T {
        let cell = (index / p).min(cells_per_dim - 1);
        let local = index - cell * p;
        let h = (upper[d] - lower[d]) / cells;
        let offset = T::from_usize(cell).unwrap_or_else(T::zero);
        lower[d] + h * (offset + (description.node_locations_1d()[local] + T::one()) / two)
    };

    let mut coordinates = Vec::with_capacity(num_nodes * dim);
    for node in 0..num_nodes {
        let mut remainder = node;
        for d in 0..dim {
            coordinates.push(lattice_coordinate(d, remainder % lattice_1d));
            remainder /= lattice_1d;
        }
    }

    let npe = description.nodes_per_element();
    let mut connectivity = Vec::with_capacity(num_cells * npe);
    for cell in 0..num_cells {
        let mut cell_index = [0; 3];
        let mut remainder = cell;
        for c in cell_index.iter_mut().take(dim) {
            *c = remainder % cells_per_dim;
            remainder /= cells_per_dim;
        }
        for indices in description.inverse_node_map() {
            let global = indices
                .iter()
                .enumerate()
                .rev()
                .fold(0, |linear, (d, &t)| linear * lattice_1d + cell_index[d] * p + t);
            connectivity.push(global);
        }
    }

    ElementBlock::new(signature, connectivity, coordinates)
}

/// A structured mesh of the unit box `[0, 1]^dim`.
pub fn create_unit_box_element_block<T>(signature: ElementSignature, cells_per_dim: usize) -> eyre::Result<ElementBlock<T>>
where
    T: Real,
{
    let dim = signature.dimension();
    create_box_element_block(signature, cells_per_dim, &vec![T::zero(); dim], &vec![T::one(); dim])
}

/// Returns a smooth displacement that vanishes on the boundary of the unit box.
///
/// Every coordinate is shifted by `amplitude * prod_d sin(pi x_d)`. Amplitudes well below
/// `1 / (pi * dim)` keep all elements valid.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn sinusoidal_perturbation<T>(amplitude: T) -> impl Fn(&mut [T])
where
    T: Real,
{
    move |x: &mut [T]| {
        let bump = x
            .iter()
            .fold(1.0, |prod: T, &x_d| prod * (T::pi() * x_d).sin());
        for x_d in x.iter_mut() {
            *x_d += amplitude * bump;
        }
    }
}
