//! The contract between physics kernels and the assembly algorithm.
//!
//! A kernel declares the element data it reads through [`ElemDataRequests`]. For every batch of
//! elements, the assembly gathers exactly those data into lane-major [`ScratchViews`], zeroes the
//! local system and hands it to each kernel in turn. Kernels only ever add to the local system.
//!
//! Local systems are ordered node-major: row `n * ndof + c` belongs to component `c` of the node
//! with ordinal `n`.
use crate::master_element::{HigherOrderScs, HigherOrderScv};
use crate::simd::{LaneMatrix, LaneVector};
use crate::Real;
use rustc_hash::FxHashMap;
use std::sync::Arc;

mod diffusion;
mod source;
mod time_derivative;

pub use diffusion::ScsDiffusionKernel;
pub use source::SteadyThermalSourceKernel;
pub use time_derivative::ScvTimeDerivativeKernel;

/// Geometry-dependent master element quantities a kernel may request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MasterElementData {
    /// Physical sub-control volumes, one per SCV integration point.
    ScvVolume,
    /// Physical basis gradients at SCV integration points.
    ScvGradOp,
    /// Area vectors at SCS integration points.
    ScsAreaVectors,
    /// Physical basis gradients at SCS integration points.
    ScsGradOp,
}

/// A nodal field read by a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequest {
    pub name: String,
    pub num_components: usize,
}

/// The union of the data requested by the kernels of one algorithm.
///
/// Nodal coordinates are always gathered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElemDataRequests {
    fields: Vec<FieldRequest>,
    master_element_data: Vec<MasterElementData>,
}

impl ElemDataRequests {
    pub fn add_field(&mut self, name: impl Into<String>, num_components: usize) -> &mut Self {
        let request = FieldRequest {
            name: name.into(),
            num_components,
        };
        if !self.fields.contains(&request) {
            self.fields.push(request);
        }
        self
    }

    pub fn add_master_element_data(&mut self, data: MasterElementData) -> &mut Self {
        if !self.master_element_data.contains(&data) {
            self.master_element_data.push(data);
        }
        self
    }

    pub fn fields(&self) -> &[FieldRequest] {
        &self.fields
    }

    pub fn master_element_data(&self) -> &[MasterElementData] {
        &self.master_element_data
    }

    pub fn contains(&self, data: MasterElementData) -> bool {
        self.master_element_data.contains(&data)
    }

    pub fn merge(&mut self, other: &ElemDataRequests) {
        for field in &other.fields {
            self.add_field(field.name.clone(), field.num_components);
        }
        for &data in &other.master_element_data {
            self.add_master_element_data(data);
        }
    }
}

/// Time level information handed to kernels before every assembly pass.
///
/// The time derivative at the new level is approximated as
/// `(gamma[0] phi^{n+1} + gamma[1] phi^n + gamma[2] phi^{n-1}) / dt`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TimeIntegrator<T> {
    pub time: T,
    pub time_step: T,
    pub gamma: [T; 3],
}

impl<T: Real> TimeIntegrator<T> {
    /// No time derivative contributions.
    pub fn steady() -> Self {
        Self {
            time: T::zero(),
            time_step: T::one(),
            gamma: [T::zero(); 3],
        }
    }

    /// First-order backward Euler.
    pub fn bdf1(time: T, time_step: T) -> Self {
        Self {
            time,
            time_step,
            gamma: [T::one(), -T::one(), T::zero()],
        }
    }

    /// Second-order backward differences with a constant time step.
    pub fn bdf2(time: T, time_step: T) -> Self {
        let half = T::one() / (T::one() + T::one());
        Self {
            time,
            time_step,
            gamma: [T::one() + half, -(T::one() + T::one()), half],
        }
    }
}

/// Lane-major element data gathered for one batch.
///
/// Layouts, per lane:
///
/// - coordinates: `n * dim + d`;
/// - fields: `n * ncomp + c`;
/// - SCV volumes: `ip`;
/// - area vectors: `ip * dim + d`;
/// - gradient operators: `(ip * npe + n) * dim + d`.
#[derive(Debug, Clone)]
pub struct ScratchViews<T: Real> {
    pub(crate) num_elements: usize,
    pub(crate) coordinates: LaneVector<T>,
    pub(crate) fields: FxHashMap<String, LaneVector<T>>,
    pub(crate) master_element_data: FxHashMap<MasterElementData, LaneVector<T>>,
    scv: Arc<HigherOrderScv<T>>,
    scs: Arc<HigherOrderScs<T>>,
}

impl<T: Real> ScratchViews<T> {
    pub(crate) fn new(scv: Arc<HigherOrderScv<T>>, scs: Arc<HigherOrderScs<T>>, width: usize) -> Self {
        Self {
            num_elements: 0,
            coordinates: LaneVector::zeros(0, width),
            fields: FxHashMap::default(),
            master_element_data: FxHashMap::default(),
            scv,
            scs,
        }
    }

    /// Number of lanes, including padding.
    pub fn width(&self) -> usize {
        self.coordinates.width()
    }

    /// Number of lanes holding actual elements.
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn scv(&self) -> &HigherOrderScv<T> {
        &self.scv
    }

    pub fn scs(&self) -> &HigherOrderScs<T> {
        &self.scs
    }

    pub fn coordinates(&self) -> &LaneVector<T> {
        &self.coordinates
    }

    pub fn try_field(&self, name: &str) -> Option<&LaneVector<T>> {
        self.fields.get(name)
    }

    /// # Panics
    ///
    /// Panics if the field was not requested.
    pub fn field(&self, name: &str) -> &LaneVector<T> {
        self.try_field(name)
            .unwrap_or_else(|| panic!("Field \"{name}\" was not requested"))
    }

    pub fn try_master_element_data(&self, data: MasterElementData) -> Option<&LaneVector<T>> {
        self.master_element_data.get(&data)
    }

    /// # Panics
    ///
    /// Panics if the data was not requested.
    pub fn master_element_data(&self, data: MasterElementData) -> &LaneVector<T> {
        self.try_master_element_data(data)
            .unwrap_or_else(|| panic!("{data:?} was not requested"))
    }
}

/// A contribution to the local element system.
pub trait Kernel<T: Real>: Send + Sync {
    /// Registers the data read by [`Kernel::execute`].
    fn data_requests(&self, requests: &mut ElemDataRequests);

    /// Called once at the start of every assembly pass, after its inputs were validated.
    ///
    /// An error aborts the pass before any element is processed.
    fn setup(&mut self, _time: &TimeIntegrator<T>) -> eyre::Result<()> {
        Ok(())
    }

    /// Adds the contribution of every lane of the batch to `lhs` and `rhs`.
    fn execute(&self, lhs: &mut LaneMatrix<T>, rhs: &mut LaneVector<T>, scratch: &ScratchViews<T>);
}
