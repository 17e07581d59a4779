//! Quadrature rules for the reference interval, quadrilateral and hexahedron.
//!
//! The main purpose of this crate is to support the `cvfem` library. The rules are plain `f64`
//! weights and points, so they may be used completely independently of `cvfem`.
//!
//! All reference domains are `[-1, 1]^D`.

use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable,
    /// The rule name does not correspond to any known family of rules.
    UnknownRule(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable => {
                write!(f, "There is no quadrature rule satisfying the requirements available")
            }
            Self::UnknownRule(name) => {
                write!(f, "Unknown quadrature rule \"{name}\"")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Families of one-dimensional rules that higher-dimensional rules can be built from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum QuadratureType {
    /// Gauss-Legendre rules, see [`univariate::gauss`].
    GaussLegendre,
}

impl QuadratureType {
    /// The canonical name of the rule family.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GaussLegendre => "GaussLegendre",
        }
    }

    /// Returns the one-dimensional rule of this family with the given number of points.
    ///
    /// # Panics
    ///
    /// Panics if zero points are requested.
    pub fn rule(&self, num_points: usize) -> Rule1d {
        match self {
            Self::GaussLegendre => univariate::gauss(num_points),
        }
    }
}

impl FromStr for QuadratureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GaussLegendre" => Ok(Self::GaussLegendre),
            other => Err(Error::UnknownRule(other.to_string())),
        }
    }
}

impl Display for QuadratureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, p)| w * f(p))
        .sum()
}
