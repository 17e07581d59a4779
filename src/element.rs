//! Reference element layouts and nodal bases.
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

mod basis;
mod description;

pub use basis::LagrangeBasis;
pub use description::{ElementDescription, MAX_POLY_ORDER};

/// Tensor-product reference topologies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    Quad,
    Hex,
}

impl Topology {
    pub fn dimension(&self) -> usize {
        match self {
            Self::Quad => 2,
            Self::Hex => 3,
        }
    }

    /// The number of vertices of the lowest-order element.
    pub fn num_vertices(&self) -> usize {
        match self {
            Self::Quad => 4,
            Self::Hex => 8,
        }
    }

    /// The tensor-product topology of the given spatial dimension.
    pub fn from_dimension(dimension: usize, poly_order: usize) -> Result<Self, ConfigurationError> {
        match dimension {
            2 => Ok(Self::Quad),
            3 => Ok(Self::Hex),
            _ => Err(ConfigurationError::UnsupportedTopology { dimension, poly_order }),
        }
    }
}

/// Identifies a family of elements sharing one master element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementSignature {
    pub topology: Topology,
    pub poly_order: usize,
}

impl ElementSignature {
    pub fn new(topology: Topology, poly_order: usize) -> Self {
        Self { topology, poly_order }
    }

    pub fn quad(poly_order: usize) -> Self {
        Self::new(Topology::Quad, poly_order)
    }

    pub fn hex(poly_order: usize) -> Self {
        Self::new(Topology::Hex, poly_order)
    }

    pub fn dimension(&self) -> usize {
        self.topology.dimension()
    }

    pub fn nodes_per_element(&self) -> usize {
        (self.poly_order + 1).pow(self.dimension() as u32)
    }
}
