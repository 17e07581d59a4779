//! Configuration consumed by the assembly algorithm.
//!
//! All types deserialize with defaults for missing fields, so case-setup layers can load them
//! from any serde format. Validation happens when the configuration is turned into runtime
//! objects, and fails with [`ConfigurationError`].
use crate::error::ConfigurationError;
use crate::simd::{DEFAULT_SIMD_WIDTH, MAX_SIMD_WIDTH};
use crate::Real;
use nalgebra::DMatrix;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// The equation whose diagonal is never relaxed.
pub const RELAXATION_EXEMPT_DOF: &str = "pressure";

/// Per-equation solution controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionOptions<T> {
    /// Relaxation factor by dof name. Equations without an entry use a factor of one.
    pub relaxation_factors: FxHashMap<String, T>,
}

impl<T> Default for SolutionOptions<T> {
    fn default() -> Self {
        Self {
            relaxation_factors: FxHashMap::default(),
        }
    }
}

impl<T: Real> SolutionOptions<T> {
    pub fn with_relaxation_factor(mut self, dof_name: impl Into<String>, factor: T) -> Self {
        self.relaxation_factors.insert(dof_name.into(), factor);
        self
    }

    pub fn relaxation_factor(&self, dof_name: &str) -> T {
        self.relaxation_factors
            .get(dof_name)
            .copied()
            .unwrap_or_else(T::one)
    }
}

/// What the assembly does with elements that have a degenerate Jacobian.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DegenerateElementPolicy {
    /// Assemble the element anyway and log a warning.
    #[default]
    Warn,
    /// Leave the element out of the global system.
    Skip,
    /// Fail the assembly pass.
    Abort,
}

/// Controls for the batched assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Number of elements per batch.
    pub simd_width: usize,
    /// Process the batches of one color concurrently.
    pub parallel: bool,
    pub degenerate_element_policy: DegenerateElementPolicy,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            simd_width: DEFAULT_SIMD_WIDTH,
            parallel: true,
            degenerate_element_policy: DegenerateElementPolicy::default(),
        }
    }
}

impl AssemblyConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.simd_width == 0 || self.simd_width > MAX_SIMD_WIDTH {
            return Err(ConfigurationError::InvalidSimdWidth(self.simd_width));
        }
        Ok(())
    }
}

/// The unknown an algorithm assembles for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationSystem {
    pub dof_name: String,
    pub dofs_per_node: usize,
}

impl EquationSystem {
    pub fn new(dof_name: impl Into<String>, dofs_per_node: usize) -> Result<Self, ConfigurationError> {
        let equation = Self {
            dof_name: dof_name.into(),
            dofs_per_node,
        };
        equation.validate()?;
        Ok(equation)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.dofs_per_node == 0 {
            return Err(ConfigurationError::InvalidDofsPerNode(self.dofs_per_node));
        }
        Ok(())
    }
}

/// Diagonal under-relaxation applied to local element matrices before scattering.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DiagonalRelaxation<T> {
    Exempt,
    Factor(T),
}

impl<T: Real> DiagonalRelaxation<T> {
    /// Resolves the relaxation for an equation.
    ///
    /// The exempt equation never reads its factor, so an invalid factor configured for it is
    /// not an error.
    pub fn for_dof(dof_name: &str, options: &SolutionOptions<T>) -> Result<Self, ConfigurationError> {
        if dof_name == RELAXATION_EXEMPT_DOF {
            return Ok(Self::Exempt);
        }
        let factor = options.relaxation_factor(dof_name);
        if factor > T::zero() && factor.is_finite() {
            Ok(Self::Factor(factor))
        } else {
            Err(ConfigurationError::InvalidRelaxationFactor {
                dof_name: dof_name.to_string(),
            })
        }
    }

    /// Divides every diagonal entry of `lhs` by the relaxation factor.
    pub fn apply(&self, lhs: &mut DMatrix<T>) {
        if let Self::Factor(factor) = *self {
            if factor != T::one() {
                for i in 0..lhs.nrows().min(lhs.ncols()) {
                    lhs[(i, i)] /= factor;
                }
            }
        }
    }
}
