//! Kernel Configuration Module
//!
//! Engineering constants loaded from TOML. Regulatory values live in the
//! policy; this module covers the math around them.
//!
//! ## Loading Order
//!
//! 1. `WELLPLUG_CONFIG` environment variable (path to TOML file)
//! 2. `kernel_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The kernel never reads global state; the config is passed in:
//!
//! ```ignore
//! let config = KernelConfig::load();
//! let plan = wellplug::kernel::generate_plan(&facts, &policy, &config)?;
//! ```

mod kernel_config;
pub mod defaults;
pub mod validation;

pub use kernel_config::*;
