//! wellplug: Well-Plugging Policy Kernel
//!
//! Deterministic plug-and-abandon plans from normalized well facts and a
//! resolved regulatory policy.
//!
//! ## Architecture
//!
//! - **Types**: well facts, policy, plan steps and the output plan
//! - **Geometry**: capacities, depth excess factor, pipe-spec ID lookup
//! - **Kernel**: staged pipeline (generators → barriers → overrides →
//!   classify → merge → materials → validate)
//! - **Config**: engineering constants from `kernel_config.toml`
//! - **Providers**: policy / facts sources used by the CLI

pub mod config;
pub mod geometry;
pub mod kernel;
pub mod providers;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, KernelConfig};

// Re-export the kernel entry points
pub use kernel::{generate_plan, generate_plan_with, KernelError};

// Re-export commonly used types
pub use types::{
    MechanicalType, Plan, Policy, RegulatoryPurpose, Severity, Step, Violation, WellFacts,
};

// Re-export providers
pub use providers::{
    FactsProvider, JsonFactsProvider, PolicyProvider, ProviderError, StaticPolicyProvider,
};
