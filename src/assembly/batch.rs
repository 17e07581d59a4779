use crate::assembly::coloring::sequential_greedy_coloring;
use crate::kernel::{ElemDataRequests, MasterElementData, ScratchViews};
use crate::master_element::{HigherOrderScs, HigherOrderScv, MasterElement};
use crate::mesh::{ElementConnectivity, MeshPart};
use crate::simd::{interleave, LaneMatrix, LaneVector};
use crate::Real;
use eyre::eyre;
use nalgebra::DMatrix;
use std::ops::Range;
use std::sync::Arc;

/// Grouping of elements into batches of consecutive elements, and of batches into colors.
///
/// No two batches of the same color share a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    width: usize,
    num_elements: usize,
    batches: Vec<Range<usize>>,
    colors: Vec<Vec<usize>>,
}

impl BatchPlan {
    pub fn new(connectivity: &(dyn ElementConnectivity + Sync), width: usize) -> Self {
        assert!(width > 0, "Lane width must be positive");
        let num_elements = connectivity.num_elements();
        let batches: Vec<Range<usize>> = (0..num_elements)
            .step_by(width)
            .map(|start| start..(start + width).min(num_elements))
            .collect();

        let node_sets: Vec<Vec<usize>> = batches
            .iter()
            .map(|batch| {
                let mut nodes: Vec<usize> = batch
                    .clone()
                    .flat_map(|element| connectivity.element_nodes(element).iter().copied())
                    .collect();
                nodes.sort_unstable();
                nodes.dedup();
                nodes
            })
            .collect();
        let colors = sequential_greedy_coloring(&node_sets);

        Self {
            width,
            num_elements,
            batches,
            colors,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// The element range of every batch.
    pub fn batches(&self) -> &[Range<usize>] {
        &self.batches
    }

    /// The batch indices of every color.
    pub fn colors(&self) -> &[Vec<usize>] {
        &self.colors
    }
}

/// Per-thread buffers for processing one batch at a time.
#[derive(Debug)]
pub(crate) struct BatchWorkspace<T: Real> {
    pub scratch: ScratchViews<T>,
    pub lhs: LaneMatrix<T>,
    pub rhs: LaneVector<T>,
    pub local_lhs: DMatrix<T>,
    pub local_rhs: Vec<T>,
    pub sort_permutation: Vec<usize>,
    element_values: Vec<T>,
    element_output: Vec<T>,
    element_det_j: Vec<T>,
    element_coords: Vec<T>,
}

impl<T: Real> BatchWorkspace<T> {
    pub fn new(scv: Arc<HigherOrderScv<T>>, scs: Arc<HigherOrderScs<T>>, width: usize) -> Self {
        Self {
            scratch: ScratchViews::new(scv, scs, width),
            lhs: LaneMatrix::zeros(0, 0, width),
            rhs: LaneVector::zeros(0, width),
            local_lhs: DMatrix::zeros(0, 0),
            local_rhs: Vec::new(),
            sort_permutation: Vec::new(),
            element_values: Vec::new(),
            element_output: Vec::new(),
            element_det_j: Vec::new(),
            element_coords: Vec::new(),
        }
    }

    /// Gathers the requested data of the batch into the scratch views and zeroes the local
    /// system.
    ///
    /// Returns the lanes of elements with a degenerate Jacobian, in ascending order.
    pub fn gather<M>(
        &mut self,
        mesh: &M,
        elements: Range<usize>,
        requests: &ElemDataRequests,
        dofs_per_node: usize,
    ) -> eyre::Result<Vec<usize>>
    where
        M: MeshPart<T> + ?Sized,
    {
        let num_elements = elements.len();
        let dim = mesh.dimension();
        let npe = mesh.nodes_per_element();
        let scratch = &mut self.scratch;
        scratch.num_elements = num_elements;

        let coordinates = mesh.coordinates();
        self.element_coords.clear();
        for element in elements.clone() {
            for &node in mesh.element_nodes(element) {
                self.element_coords
                    .extend_from_slice(&coordinates[node * dim..(node + 1) * dim]);
            }
        }
        scratch.coordinates.reset(npe * dim);
        interleave(&mut scratch.coordinates, &self.element_coords, num_elements);

        for request in requests.fields() {
            let field = mesh
                .field(&request.name)
                .ok_or_else(|| eyre!("Requested field \"{}\" is missing", request.name))?;
            let ncomp = field.num_components();
            self.element_values.clear();
            for element in elements.clone() {
                for &node in mesh.element_nodes(element) {
                    self.element_values.extend_from_slice(field.node_values(node));
                }
            }
            let width = scratch.width();
            let lanes = scratch
                .fields
                .entry(request.name.clone())
                .or_insert_with(|| LaneVector::zeros(0, width));
            lanes.reset(npe * ncomp);
            interleave(lanes, &self.element_values, num_elements);
        }

        let mut degenerate = Vec::new();
        for &data in requests.master_element_data() {
            let (scv, scs) = (scratch.scv(), scratch.scs());
            let coords = &self.element_coords;
            let output = &mut self.element_output;
            let det_j = &mut self.element_det_j;
            let per_element = match data {
                MasterElementData::ScvVolume => {
                    let len = scv.num_integration_points();
                    output.resize(num_elements * len, T::zero());
                    record(scv.determinant(coords, output), &mut degenerate);
                    len
                }
                MasterElementData::ScsAreaVectors => {
                    let len = scs.num_integration_points() * dim;
                    output.resize(num_elements * len, T::zero());
                    record(scs.area_vectors(coords, output), &mut degenerate);
                    len
                }
                MasterElementData::ScvGradOp | MasterElementData::ScsGradOp => {
                    let master_element: &dyn MasterElement<T> = if data == MasterElementData::ScvGradOp {
                        scv
                    } else {
                        scs
                    };
                    let nip = master_element.num_integration_points();
                    let len = nip * npe * dim;
                    output.resize(num_elements * len, T::zero());
                    det_j.resize(num_elements * nip, T::zero());
                    record(master_element.grad_op(coords, output, det_j), &mut degenerate);
                    len
                }
            };

            let width = scratch.width();
            let lanes = scratch
                .master_element_data
                .entry(data)
                .or_insert_with(|| LaneVector::zeros(0, width));
            lanes.reset(per_element);
            interleave(lanes, output.as_slice(), num_elements);
        }
        degenerate.sort_unstable();
        degenerate.dedup();

        let n = npe * dofs_per_node;
        self.lhs.reset(n, n);
        self.rhs.reset(n);
        Ok(degenerate)
    }
}

fn record(result: Result<(), crate::error::DegenerateJacobianError>, degenerate: &mut Vec<usize>) {
    if let Err(err) = result {
        degenerate.extend(err.elements);
    }
}
