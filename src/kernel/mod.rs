//! Policy Kernel
//!
//! Turns `(WellFacts, Policy, KernelConfig)` into a [`Plan`]. The kernel is a
//! pure function: no I/O, no global state, equal inputs give equal output.
//!
//! ## Pipeline
//!
//! | # | Stage | Kind |
//! |---|-------|------|
//! | 1 | requirement generators | core |
//! | 2 | mechanical-barrier awareness | soft |
//! | 3 | CIBP detector | soft |
//! | 4 | district formation plugs | core |
//! | 5 | caller step overrides | core |
//! | 6 | geometry/recipe defaults | core |
//! | 7 | district tagging + instructions | soft |
//! | 8 | plug-type classification | core |
//! | 9 | long-plug merge | core |
//! | 10 | materials | core |
//! | 11 | cement-class annotation | soft |
//! | 12 | notes aggregation | soft |
//! | 13 | validation | core |

pub mod casing_context;
pub mod classify;
pub mod defaults;
pub mod district;
pub mod enrichment;
pub mod generators;
pub mod materials;
pub mod mechanical;
pub mod merge;
pub mod overrides;
pub mod stage;
pub mod validate;

pub use casing_context::{
    ActiveCasing, CasingContext, CasingContextKind, CasingResolver, OpenAnnulus,
    PerforationDecision,
};
pub use classify::determine_plug_type;
pub use merge::{merge_plugs, MergeParams};
pub use stage::{run_stages, Stage, StageError, StageKind};

use crate::config::defaults::{CONSTRAINT_POLICY_INCOMPLETE, REQUIRED_KNOBS};
use crate::config::{ConfigError, KernelConfig};
use crate::geometry::{PipeSpecLookup, StandardPipeSpecs};
use crate::types::{
    Constraint, Finding, MaterialsTotals, Plan, Policy, Step, TraceEntry, Violation, WellFacts,
    KERNEL_VERSION,
};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },

    #[error("invalid kernel configuration: {0}")]
    Config(#[from] ConfigError),
}

// ============================================================================
// Context & draft
// ============================================================================

/// Read-only inputs shared by every stage.
pub struct KernelContext<'a> {
    pub facts: &'a WellFacts,
    pub policy: &'a Policy,
    pub config: &'a KernelConfig,
    pub pipe_specs: &'a dyn PipeSpecLookup,
}

impl<'a> KernelContext<'a> {
    pub fn new(
        facts: &'a WellFacts,
        policy: &'a Policy,
        config: &'a KernelConfig,
        pipe_specs: &'a dyn PipeSpecLookup,
    ) -> Self {
        Self {
            facts,
            policy,
            config,
            pipe_specs,
        }
    }

    pub fn casing(&self) -> CasingResolver<'a> {
        let config: &'a KernelConfig = self.config;
        CasingResolver::new(self.facts, self.pipe_specs, &config.geometry)
    }

    /// Numeric policy knob, else the supplied engineering default.
    pub fn knob_or(&self, knob: &str, default: f64) -> f64 {
        self.policy.knob_f64(knob).unwrap_or(default)
    }
}

/// A step removed by a superseding operation, restorable if that operation
/// is later dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SupersededStep {
    pub by: u32,
    pub step: Step,
}

/// Working state threaded through the stages.
#[derive(Debug, Clone, Default)]
pub struct PlanDraft {
    pub steps: Vec<Step>,
    pub superseded: Vec<SupersededStep>,
    pub violations: Vec<Violation>,
    pub findings: Vec<Finding>,
    pub notes: Vec<String>,
    pub trace: Vec<TraceEntry>,
    next_id: u32,
}

impl PlanDraft {
    pub fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Add a step, assigning an id when it has none. Returns the id.
    pub fn push(&mut self, mut step: Step) -> u32 {
        if step.id == 0 {
            step.id = self.next_id();
        } else {
            self.next_id = self.next_id.max(step.id);
        }
        let id = step.id;
        self.steps.push(step);
        id
    }

    pub fn trace(&mut self, stage: &str, message: impl Into<String>) {
        self.trace.push(TraceEntry {
            stage: stage.to_string(),
            message: message.into(),
        });
    }

    pub fn violation(&mut self, violation: Violation) {
        warn!(code = %violation.code, severity = %violation.severity, "{}", violation.message);
        self.violations.push(violation);
    }

    pub fn finding(&mut self, stage: &str, code: &str, message: impl Into<String>) {
        self.findings.push(Finding {
            stage: stage.to_string(),
            code: code.to_string(),
            message: message.into(),
        });
    }

    /// Remove and return every step matching `pred`, preserving order.
    pub fn take_steps(&mut self, pred: impl Fn(&Step) -> bool) -> Vec<Step> {
        let (taken, kept): (Vec<Step>, Vec<Step>) =
            std::mem::take(&mut self.steps).into_iter().partition(|s| pred(s));
        self.steps = kept;
        taken
    }

    /// Put back every step parked by `by`.
    pub fn restore_superseded(&mut self, by: u32) -> usize {
        let (restore, keep): (Vec<SupersededStep>, Vec<SupersededStep>) =
            std::mem::take(&mut self.superseded)
                .into_iter()
                .partition(|s| s.by == by);
        self.superseded = keep;
        let count = restore.len();
        self.steps.extend(restore.into_iter().map(|s| s.step));
        count
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Stage order of a full plan run.
pub fn default_pipeline() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(generators::GenerateRequirementSteps),
        Box::new(mechanical::MechanicalAwareness),
        Box::new(mechanical::CibpDetector),
        Box::new(district::DistrictFormationPlugs),
        Box::new(overrides::StepOverrides),
        Box::new(defaults::ApplyDefaults),
        Box::new(district::DistrictTagging),
        Box::new(classify::ClassifyPlugTypes),
        Box::new(merge::MergeLongPlugs),
        Box::new(materials::CalculateMaterials),
        Box::new(enrichment::AnnotateCementClass),
        Box::new(enrichment::AggregateNotes),
        Box::new(validate::ValidatePlan),
    ]
}

/// Generate a plan using the built-in API 5CT pipe-spec tables.
pub fn generate_plan(
    facts: &WellFacts,
    policy: &Policy,
    config: &KernelConfig,
) -> Result<Plan, KernelError> {
    let specs = StandardPipeSpecs {
        weight_tolerance_ppf: config.geometry.weight_match_tolerance_ppf,
    };
    generate_plan_with(facts, policy, config, &specs)
}

/// Generate a plan with a caller-supplied pipe-spec collaborator.
pub fn generate_plan_with(
    facts: &WellFacts,
    policy: &Policy,
    config: &KernelConfig,
    pipe_specs: &dyn PipeSpecLookup,
) -> Result<Plan, KernelError> {
    config.validate()?;

    let mut plan = Plan {
        kernel_version: KERNEL_VERSION.to_string(),
        policy_id: policy.policy_id.clone(),
        jurisdiction: policy.jurisdiction.clone(),
        district: policy.district.clone(),
        policy_complete: policy.complete,
        constraints: Vec::new(),
        steps: Vec::new(),
        violations: Vec::new(),
        materials_totals: MaterialsTotals::default(),
        rounding_policy: policy.rounding(),
        findings: Vec::new(),
        notes: Vec::new(),
        trace: Vec::new(),
    };

    if !policy.complete {
        let constraint = policy_incomplete_constraint(policy);
        info!(
            policy_id = %policy.policy_id,
            missing = ?constraint.missing,
            "Policy incomplete, no steps generated"
        );
        plan.constraints.push(constraint);
        return Ok(plan);
    }

    let ctx = KernelContext::new(facts, policy, config, pipe_specs);
    let draft = run_stages(&default_pipeline(), &ctx, PlanDraft::default())?;
    let plan = assemble(plan, draft);
    info!(
        policy_id = %plan.policy_id,
        steps = plan.steps.len(),
        violations = plan.violations.len(),
        total_sacks = plan.materials_totals.total_sacks,
        "Plan generated"
    );
    Ok(plan)
}

fn policy_incomplete_constraint(policy: &Policy) -> Constraint {
    let missing: Vec<String> = if policy.missing_knobs.is_empty() {
        REQUIRED_KNOBS
            .iter()
            .filter(|k| !policy.has_knob(k))
            .map(|k| (*k).to_string())
            .collect()
    } else {
        policy.missing_knobs.clone()
    };
    Constraint {
        code: CONSTRAINT_POLICY_INCOMPLETE.to_string(),
        message: "policy is incomplete; no plugging steps were generated".to_string(),
        missing,
    }
}

fn assemble(mut plan: Plan, draft: PlanDraft) -> Plan {
    let PlanDraft {
        mut steps,
        violations,
        findings,
        notes,
        trace,
        ..
    } = draft;

    // Sequential ids in final order
    for (i, step) in steps.iter_mut().enumerate() {
        step.id = u32::try_from(i + 1).unwrap_or(u32::MAX);
    }

    let total_sacks = steps.iter().filter_map(|s| s.sacks).sum();
    let total_bbl: f64 = steps
        .iter()
        .filter_map(|s| s.materials.as_ref())
        .map(|m| m.slurry.total_bbl)
        .sum();

    plan.materials_totals = MaterialsTotals {
        total_sacks,
        total_bbl: round_to(total_bbl, 2),
    };
    plan.steps = steps;
    plan.violations = violations;
    plan.findings = findings;
    plan.notes = notes;
    plan.trace = trace;
    plan
}

/// Round to a fixed number of decimals for reporting.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
