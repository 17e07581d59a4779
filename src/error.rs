//! Error types shared across the crate.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Errors returned by quadrature rule construction.
pub use cvfem_quadrature::Error as QuadratureError;

/// Invalid setup detected when constructing descriptions, rules, master elements or algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// No node layout exists for the given dimension and polynomial order.
    UnsupportedTopology { dimension: usize, poly_order: usize },
    /// The requested quadrature rule is not available.
    Quadrature(QuadratureError),
    /// A relaxation factor was not strictly positive.
    InvalidRelaxationFactor { dof_name: String },
    /// Lane widths must be in the range `1 ..= MAX_SIMD_WIDTH`.
    InvalidSimdWidth(usize),
    /// Equations must carry at least one degree of freedom per node.
    InvalidDofsPerNode(usize),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedTopology { dimension, poly_order } => write!(
                f,
                "No element layout for dimension {dimension} and polynomial order {poly_order}"
            ),
            Self::Quadrature(err) => write!(f, "Quadrature rule unavailable: {err}"),
            Self::InvalidRelaxationFactor { dof_name } => {
                write!(f, "Relaxation factor for \"{dof_name}\" must be strictly positive")
            }
            Self::InvalidSimdWidth(width) => write!(f, "Invalid lane width {width}"),
            Self::InvalidDofsPerNode(n) => write!(f, "Invalid number of dofs per node: {n}"),
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Quadrature(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QuadratureError> for ConfigurationError {
    fn from(err: QuadratureError) -> Self {
        Self::Quadrature(err)
    }
}

/// One or more elements of a batch have a singular or non-positive Jacobian determinant at some
/// integration point.
///
/// The indices refer to positions within the batch handed to the master element, in ascending
/// order and without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegenerateJacobianError {
    pub elements: Vec<usize>,
}

impl Display for DegenerateJacobianError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Degenerate Jacobian in {} element(s): {:?}",
            self.elements.len(),
            self.elements
        )
    }
}

impl Error for DegenerateJacobianError {}
