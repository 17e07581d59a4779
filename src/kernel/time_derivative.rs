use crate::kernel::{ElemDataRequests, Kernel, MasterElementData, ScratchViews, TimeIntegrator};
use crate::simd::{LaneMatrix, LaneVector};
use crate::Real;
use eyre::eyre;

/// Lumped time derivative `rho d(phi)/dt` integrated over sub-control volumes.
///
/// Each SCV integration point contributes to the diagonal of its owning node only.
#[derive(Debug, Clone)]
pub struct ScvTimeDerivativeKernel<T> {
    dof_name: String,
    old_name: String,
    older_name: Option<String>,
    num_components: usize,
    density: T,
    time: TimeIntegrator<T>,
}

impl<T: Real> ScvTimeDerivativeKernel<T> {
    /// The current values and the values of the previous time level are read from the named
    /// fields. The level before that is only needed by second-order integrators; see
    /// [`Self::with_older_field`].
    pub fn new(dof_name: impl Into<String>, old_name: impl Into<String>, num_components: usize, density: T) -> Self {
        Self {
            dof_name: dof_name.into(),
            old_name: old_name.into(),
            older_name: None,
            num_components,
            density,
            time: TimeIntegrator::steady(),
        }
    }

    pub fn with_older_field(mut self, older_name: impl Into<String>) -> Self {
        self.older_name = Some(older_name.into());
        self
    }
}

impl<T: Real> Kernel<T> for ScvTimeDerivativeKernel<T> {
    fn data_requests(&self, requests: &mut ElemDataRequests) {
        requests
            .add_field(self.dof_name.clone(), self.num_components)
            .add_field(self.old_name.clone(), self.num_components)
            .add_master_element_data(MasterElementData::ScvVolume);
        if let Some(older) = &self.older_name {
            requests.add_field(older.clone(), self.num_components);
        }
    }

    fn setup(&mut self, time: &TimeIntegrator<T>) -> eyre::Result<()> {
        if time.gamma[2] != T::zero() && self.older_name.is_none() {
            return Err(eyre!(
                "Time derivative of \"{}\" needs the field of the level before \"{}\" for this integrator",
                self.dof_name,
                self.old_name
            ));
        }
        self.time = *time;
        Ok(())
    }

    fn execute(&self, lhs: &mut LaneMatrix<T>, rhs: &mut LaneVector<T>, scratch: &ScratchViews<T>) {
        let [gamma1, gamma2, gamma3] = self.time.gamma;
        if gamma1 == T::zero() && gamma2 == T::zero() && gamma3 == T::zero() {
            return;
        }

        let ncomp = self.num_components;
        let width = scratch.width();
        let volume = scratch.master_element_data(MasterElementData::ScvVolume);
        let phi = scratch.field(&self.dof_name);
        let phi_old = scratch.field(&self.old_name);
        let phi_older = self.older_name.as_deref().map(|name| scratch.field(name));
        let scale = self.density / self.time.time_step;

        for (ip, &node) in scratch.scv().ip_node_map().iter().enumerate() {
            let vol = volume.lanes(ip);
            for c in 0..ncomp {
                let i = node * ncomp + c;
                let (current, old) = (phi.lanes(i), phi_old.lanes(i));

                let diagonal = lhs.lanes_mut(i, i);
                for lane in 0..width {
                    diagonal[lane] += scale * gamma1 * vol[lane];
                }

                let residual = rhs.lanes_mut(i);
                for lane in 0..width {
                    let mut dphi = gamma1 * current[lane] + gamma2 * old[lane];
                    if let Some(older) = phi_older {
                        dphi += gamma3 * older.lanes(i)[lane];
                    }
                    residual[lane] -= scale * dphi * vol[lane];
                }
            }
        }
    }
}
