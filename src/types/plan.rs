//! The assembled plugging plan returned to callers.

use super::recipe::Rounding;
use super::step::Step;
use super::violation::Violation;
use serde::{Deserialize, Serialize};

/// Version tag stamped on every plan.
pub const KERNEL_VERSION: &str = "wellplug-kernel/1.0";

/// A condition that limited what the kernel could produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub missing: Vec<String>,
}

/// Non-regulatory diagnostic recorded while building the plan
/// (fallback recipe used, enrichment stage skipped, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub stage: String,
    pub code: String,
    pub message: String,
}

/// Deterministic audit trail of what each stage did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MaterialsTotals {
    pub total_sacks: u32,
    pub total_bbl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub kernel_version: String,
    pub policy_id: String,
    pub jurisdiction: Option<String>,
    pub district: Option<String>,
    pub policy_complete: bool,
    pub constraints: Vec<Constraint>,
    pub steps: Vec<Step>,
    pub violations: Vec<Violation>,
    pub materials_totals: MaterialsTotals,
    pub rounding_policy: Rounding,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub trace: Vec<TraceEntry>,
}

impl Plan {
    pub fn steps_of(&self, purpose: super::step::RegulatoryPurpose) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(move |s| s.purpose == purpose)
    }

    pub fn has_violation(&self, code: &str) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }
}
