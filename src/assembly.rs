//! Batched, colored assembly of element kernels into a global linear system.
//!
//! The per-pass pipeline is: gather the requested element data of a batch into lane-major
//! scratch views, run every kernel on the batch, then split the batch into per-element local
//! systems, relax their diagonals and scatter them into the global system.
mod algorithm;
mod batch;
pub mod coloring;

pub use algorithm::{AssembleElemSolverAlgorithm, AssemblyReport};
pub use batch::BatchPlan;
