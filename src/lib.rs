//! High-order control-volume finite element (CVFEM) master elements and batched elemental
//! assembly.
//!
//! The crate is organized bottom-up:
//!
//! - [`element`]: tensor-product node layouts and nodal Lagrange bases on quadrilaterals and
//!   hexahedra of arbitrary polynomial order.
//! - [`quadrature`]: sub-interval Gauss rules and the sub-control-surface cut locations.
//! - [`master_element`]: sub-control-volume (SCV) and sub-control-surface (SCS) master elements.
//! - [`kernel`]: the contract physics kernels implement, along with a few reference kernels.
//! - [`assembly`]: lane-batched, colored parallel assembly into a [`linear_system::LinearSystem`].

pub mod assembly;
pub mod config;
pub mod element;
pub mod error;
pub mod kernel;
pub mod linear_system;
pub mod master_element;
pub mod mesh;
pub mod quadrature;
pub mod simd;

pub extern crate cvfem_quadrature;
pub extern crate nalgebra;

use nalgebra::RealField;

/// Scalar type used by all numerical routines in the crate.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
