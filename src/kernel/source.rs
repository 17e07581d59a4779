use crate::kernel::{ElemDataRequests, Kernel, MasterElementData, ScratchViews};
use crate::master_element::MasterElement;
use crate::simd::{LaneMatrix, LaneVector};
use crate::Real;
use numeric_literals::replace_float_literals;

/// Manufactured source for steady heat conduction, integrated over sub-control volumes.
///
/// The source `k / 4 (2 a pi)^2 sum_d cos(2 a pi x_d)` balances the conduction of the
/// temperature `T = 1/4 sum_d cos(2 a pi x_d)` with conductivity `k`.
#[derive(Debug, Clone)]
pub struct SteadyThermalSourceKernel<T> {
    a: T,
    k: T,
}

impl<T: Real> Default for SteadyThermalSourceKernel<T> {
    fn default() -> Self {
        Self::new(T::one(), T::one())
    }
}

impl<T: Real> SteadyThermalSourceKernel<T> {
    pub fn new(a: T, k: T) -> Self {
        Self { a, k }
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn source(&self, x: &[T]) -> T {
        let omega = 2.0 * self.a * T::pi();
        let sum = x.iter().fold(T::zero(), |sum, &x_d| sum + (omega * x_d).cos());
        self.k / 4.0 * omega * omega * sum
    }

    /// The temperature field the source is manufactured for.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn exact_temperature(&self, x: &[T]) -> T {
        let omega = 2.0 * self.a * T::pi();
        x.iter().fold(T::zero(), |sum, &x_d| sum + (omega * x_d).cos()) / 4.0
    }
}

impl<T: Real> Kernel<T> for SteadyThermalSourceKernel<T> {
    fn data_requests(&self, requests: &mut ElemDataRequests) {
        requests.add_master_element_data(MasterElementData::ScvVolume);
    }

    fn execute(&self, _lhs: &mut LaneMatrix<T>, rhs: &mut LaneVector<T>, scratch: &ScratchViews<T>) {
        let scv = scratch.scv();
        let dim = scv.dimension();
        let npe = scv.nodes_per_element();
        let width = scratch.width();
        let shape_functions = scv.shape_functions();
        let coords = scratch.coordinates();
        let volume = scratch.master_element_data(MasterElementData::ScvVolume);

        let mut x_ip = vec![T::zero(); width * dim];
        for (ip, &node) in scv.ip_node_map().iter().enumerate() {
            x_ip.fill(T::zero());
            for n in 0..npe {
                let phi = shape_functions[(ip, n)];
                for d in 0..dim {
                    let x_n = coords.lanes(n * dim + d);
                    for lane in 0..width {
                        x_ip[lane * dim + d] += phi * x_n[lane];
                    }
                }
            }

            let vol = volume.lanes(ip);
            let residual = rhs.lanes_mut(node);
            for lane in 0..width {
                residual[lane] += self.source(&x_ip[lane * dim..(lane + 1) * dim]) * vol[lane];
            }
        }
    }
}
