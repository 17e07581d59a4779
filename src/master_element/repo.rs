use crate::element::ElementSignature;
use crate::error::ConfigurationError;
use crate::master_element::{HigherOrderScs, HigherOrderScv};
use crate::Real;
use cvfem_quadrature::QuadratureType;
use log::debug;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Thread-safe cache that builds each master element at most once per signature.
#[derive(Debug)]
pub struct MasterElementRepo<T: Real> {
    quadrature_type: QuadratureType,
    scv: Mutex<FxHashMap<ElementSignature, Arc<HigherOrderScv<T>>>>,
    scs: Mutex<FxHashMap<ElementSignature, Arc<HigherOrderScs<T>>>>,
}

impl<T: Real> Default for MasterElementRepo<T> {
    fn default() -> Self {
        Self::with_quadrature_type(QuadratureType::GaussLegendre)
    }
}

impl<T: Real> MasterElementRepo<T> {
    /// Creates an empty repository whose master elements use the named quadrature family.
    pub fn new(quadrature_name: &str) -> Result<Self, ConfigurationError> {
        let quadrature_type: QuadratureType = quadrature_name.parse()?;
        Ok(Self::with_quadrature_type(quadrature_type))
    }

    pub fn with_quadrature_type(quadrature_type: QuadratureType) -> Self {
        Self {
            quadrature_type,
            scv: Mutex::new(FxHashMap::default()),
            scs: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn quadrature_type(&self) -> QuadratureType {
        self.quadrature_type
    }

    pub fn scv(&self, signature: &ElementSignature) -> Result<Arc<HigherOrderScv<T>>, ConfigurationError> {
        let mut cache = self.scv.lock();
        if let Some(scv) = cache.get(signature) {
            return Ok(Arc::clone(scv));
        }
        debug!("Building SCV master element for {:?}", signature);
        let scv = Arc::new(HigherOrderScv::from_signature(signature, self.quadrature_type.name())?);
        cache.insert(*signature, Arc::clone(&scv));
        Ok(scv)
    }

    pub fn scs(&self, signature: &ElementSignature) -> Result<Arc<HigherOrderScs<T>>, ConfigurationError> {
        let mut cache = self.scs.lock();
        if let Some(scs) = cache.get(signature) {
            return Ok(Arc::clone(scs));
        }
        debug!("Building SCS master element for {:?}", signature);
        let scs = Arc::new(HigherOrderScs::from_signature(signature, self.quadrature_type.name())?);
        cache.insert(*signature, Arc::clone(&scs));
        Ok(scs)
    }
}
