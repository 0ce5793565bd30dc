//! Shared data structures for the plugging kernel.
//!
//! - Inputs: `WellFacts` (normalized well facts), `Policy` (resolved rules)
//! - Working set: `Step` with `RegulatoryPurpose` / `MechanicalType`
//! - Output: `Plan` with steps, violations, totals and audit trace

mod facts;
mod plan;
mod policy;
mod recipe;
mod step;
mod violation;

pub use facts::*;
pub use plan::*;
pub use policy::*;
pub use recipe::*;
pub use step::*;
pub use violation::*;
