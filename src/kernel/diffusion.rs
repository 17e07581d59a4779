use crate::kernel::{ElemDataRequests, Kernel, MasterElementData, ScratchViews};
use crate::master_element::MasterElement;
use crate::simd::{LaneMatrix, LaneVector};
use crate::Real;
use itertools::izip;

/// Constant-diffusivity Laplacian discretized with sub-control-surface fluxes.
///
/// At every face integration point, the diffusive flux `-k grad(phi) . A` leaves the dual volume
/// of the left node and enters that of the right node. The right-hand side carries the residual
/// of the current field values, so rows of the local matrix sum to zero.
#[derive(Debug, Clone)]
pub struct ScsDiffusionKernel<T> {
    dof_name: String,
    num_components: usize,
    diffusivity: T,
}

impl<T: Real> ScsDiffusionKernel<T> {
    pub fn new(dof_name: impl Into<String>, num_components: usize, diffusivity: T) -> Self {
        Self {
            dof_name: dof_name.into(),
            num_components,
            diffusivity,
        }
    }
}

impl<T: Real> Kernel<T> for ScsDiffusionKernel<T> {
    fn data_requests(&self, requests: &mut ElemDataRequests) {
        requests
            .add_field(self.dof_name.clone(), self.num_components)
            .add_master_element_data(MasterElementData::ScsAreaVectors)
            .add_master_element_data(MasterElementData::ScsGradOp);
    }

    fn execute(&self, lhs: &mut LaneMatrix<T>, rhs: &mut LaneVector<T>, scratch: &ScratchViews<T>) {
        let scs = scratch.scs();
        let dim = scs.dimension();
        let npe = scs.nodes_per_element();
        let ncomp = self.num_components;
        let width = scratch.width();

        let areas = scratch.master_element_data(MasterElementData::ScsAreaVectors);
        let grad_op = scratch.master_element_data(MasterElementData::ScsGradOp);
        let phi = scratch.field(&self.dof_name);

        let mut lhsfac = vec![T::zero(); width];
        for (ip, &[left, right]) in scs.adjacent_nodes().iter().enumerate() {
            for n in 0..npe {
                lhsfac.fill(T::zero());
                for d in 0..dim {
                    let dndx = grad_op.lanes((ip * npe + n) * dim + d);
                    let area = areas.lanes(ip * dim + d);
                    for lane in 0..width {
                        lhsfac[lane] -= self.diffusivity * dndx[lane] * area[lane];
                    }
                }

                for c in 0..ncomp {
                    let col = n * ncomp + c;
                    let (il, ir) = (left * ncomp + c, right * ncomp + c);
                    let phi_n = phi.lanes(col);

                    let lhs_left = lhs.lanes_mut(il, col);
                    for lane in 0..width {
                        lhs_left[lane] += lhsfac[lane];
                    }
                    let lhs_right = lhs.lanes_mut(ir, col);
                    for lane in 0..width {
                        lhs_right[lane] -= lhsfac[lane];
                    }
                    for (r, &f, &value) in izip!(rhs.lanes_mut(il), &lhsfac, phi_n) {
                        *r -= f * value;
                    }
                    for (r, &f, &value) in izip!(rhs.lanes_mut(ir), &lhsfac, phi_n) {
                        *r += f * value;
                    }
                }
            }
        }
    }
}
