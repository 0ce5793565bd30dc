//! Geometry Module
//!
//! Deterministic wellbore geometry. All math here is pure volumetrics,
//! no policy involved.
//!
//! - `annulus_capacity()` / `cylinder_capacity()` - bbl/ft capacities
//! - `texas_factor()` - depth excess multiplier
//! - `resolve_casing_id()` - OD → ID with fallback precedence

pub mod capacity;
pub mod pipe_spec;

pub use capacity::{
    annulus_capacity, annulus_capacity_with, cylinder_capacity, cylinder_capacity_with,
    texas_factor, texas_factor_with, CAPACITY_DIVISOR, FT3_PER_BBL,
};
pub use pipe_spec::{nominal_id, resolve_casing_id, IdSource, PipeSpecLookup, StandardPipeSpecs};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{what} must be a finite positive diameter (got {value})")]
    InvalidDiameter { what: &'static str, value: f64 },

    #[error("slurry yield must be > 0 ft3/sk (got {0})")]
    InvalidYield(f64),
}

/// Reject NaN, infinite and non-positive diameters.
pub fn checked_diameter(what: &'static str, value: f64) -> Result<f64, GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GeometryError::InvalidDiameter { what, value })
    }
}
