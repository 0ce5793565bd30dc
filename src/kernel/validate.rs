//! Final plan validation
//!
//! Runs last. Structural faults (inverted or non-finite intervals) abort the
//! run; everything else is either cleaned up or reported as a violation.

use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use crate::config::defaults::{V_BELOW_BARRIER_REMOVED, V_BELOW_MINIMUM};
use crate::types::{BarrierKind, RegulatoryPurpose, Severity, Step, StepOrigin, Violation};
use std::collections::HashSet;
use tracing::debug;

pub struct ValidatePlan;

impl ValidatePlan {
    fn check_structure(steps: &[Step]) -> Result<(), StageError> {
        for step in steps {
            if !(step.top_ft.is_finite() && step.bottom_ft.is_finite()) {
                return Err(StageError::invalid_step(step, "depths must be finite"));
            }
            if step.top_ft > step.bottom_ft {
                return Err(StageError::invalid_step(
                    step,
                    format!("top {} ft is below bottom {} ft", step.top_ft, step.bottom_ft),
                ));
            }
        }
        Ok(())
    }

    /// Drop formation plugs that land on the same rounded interval as an
    /// earlier one for the same formation.
    fn dedup_formation_plugs(draft: &mut PlanDraft, rounding_ft: f64) -> usize {
        let snap = |v: f64| ((v / rounding_ft).round() * rounding_ft) as i64;
        let mut seen: HashSet<(String, i64, i64)> = HashSet::new();
        let before = draft.steps.len();
        draft.steps.retain(|s| {
            if s.purpose != RegulatoryPurpose::FormationTopPlug {
                return true;
            }
            let formation = s.formation.as_deref().unwrap_or_default().to_lowercase();
            seen.insert((formation, snap(s.top_ft), snap(s.bottom_ft)))
        });
        before - draft.steps.len()
    }

    fn remove_below_barrier(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
        let Some(barrier_ft) = ctx
            .facts
            .shallowest_barrier(&[BarrierKind::Cibp, BarrierKind::CementRetainer])
        else {
            return;
        };
        let removed = draft.take_steps(|s| {
            matches!(
                s.origin,
                StepOrigin::Auto | StepOrigin::District | StepOrigin::Override
            ) && s.bottom_ft > barrier_ft
        });
        for step in removed {
            draft.violation(
                Violation::new(
                    V_BELOW_BARRIER_REMOVED,
                    Severity::Minor,
                    format!(
                        "{} at {:.0}-{:.0} ft lies below the existing barrier at {barrier_ft:.0} ft and was removed",
                        step.purpose, step.top_ft, step.bottom_ft
                    ),
                )
                .with_citations(step.regulatory_basis.clone())
                .with_context("barrier_depth_ft", barrier_ft)
                .with_context("step_bottom_ft", step.bottom_ft),
            );
        }
    }

    fn flag_below_minimum(draft: &mut PlanDraft, minimum: u32) {
        let short: Vec<(u32, RegulatoryPurpose, u32)> = draft
            .steps
            .iter()
            .filter(|s| s.purpose.is_cement_bearing() && !s.purpose.is_minimum_exempt())
            .filter_map(|s| s.sacks.filter(|n| *n < minimum).map(|n| (s.id, s.purpose, n)))
            .collect();
        for (id, purpose, sacks) in short {
            draft.violation(
                Violation::new(
                    V_BELOW_MINIMUM,
                    Severity::Minor,
                    format!("step {id} ({purpose}) calls for {sacks} sacks, below the {minimum}-sack minimum"),
                )
                .with_context("step_id", id)
                .with_context("sacks", sacks),
            );
        }
    }
}

impl Stage for ValidatePlan {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        Self::check_structure(&draft.steps)?;
        let duplicates = Self::dedup_formation_plugs(&mut draft, ctx.config.validation.dedup_rounding_ft);
        let before = draft.violations.len();
        Self::remove_below_barrier(ctx, &mut draft);
        let removed = draft.violations.len() - before;
        Self::flag_below_minimum(&mut draft, ctx.config.materials.minimum_sacks);

        debug!(duplicates, removed, "Plan validated");
        draft.trace(
            self.name(),
            format!("{duplicates} duplicate formation plug(s) dropped, {removed} step(s) below barrier removed"),
        );
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::geometry::StandardPipeSpecs;
    use crate::types::{Policy, WellFacts};
    use serde_json::json;

    fn run(facts: &WellFacts, draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let policy = Policy::default();
        let config = KernelConfig::default();
        let specs = StandardPipeSpecs::default();
        let ctx = KernelContext::new(facts, &policy, &config, &specs);
        ValidatePlan.apply(&ctx, draft)
    }

    fn formation(name: &str, top: f64, bottom: f64) -> Step {
        let mut s = Step::new(RegulatoryPurpose::FormationTopPlug, top, bottom);
        s.formation = Some(name.to_string());
        s.sacks = Some(30);
        s
    }

    #[test]
    fn test_near_duplicate_formation_plugs_collapse() {
        let mut draft = PlanDraft::default();
        let first = draft.push(formation("San Andres", 4150.0, 4250.0));
        draft.push(formation("san andres", 4152.0, 4248.0));
        draft.push(formation("Wolfcamp", 4150.0, 4250.0));
        let draft = run(&WellFacts::default(), draft).expect("validate");
        assert_eq!(draft.steps.len(), 2);
        assert_eq!(draft.steps[0].id, first);
    }

    #[test]
    fn test_steps_below_existing_barrier_removed() {
        let facts = WellFacts::from_json(json!({
            "existing_mechanical_barriers": ["CIBP"],
            "existing_cibp_ft": 5000.0
        }))
        .expect("facts");
        let mut draft = PlanDraft::default();
        draft.push(Step::new(RegulatoryPurpose::CibpCap, 4980.0, 5000.0).with_origin(StepOrigin::Auto));
        draft.push(Step::new(RegulatoryPurpose::CementPlug, 6000.0, 6100.0).with_origin(StepOrigin::Override));
        draft.push(Step::new(RegulatoryPurpose::CementPlug, 7000.0, 7100.0));

        let draft = run(&facts, draft).expect("validate");
        assert_eq!(draft.steps.len(), 2, "generated steps are kept");
        assert_eq!(draft.violations.len(), 1);
        assert_eq!(draft.violations[0].code, V_BELOW_BARRIER_REMOVED);
        assert_eq!(draft.violations[0].severity, Severity::Minor);
    }

    #[test]
    fn test_short_step_flagged_not_removed() {
        let mut draft = PlanDraft::default();
        let mut short = Step::new(RegulatoryPurpose::SqueezeViaPerf, 3000.0, 3050.0);
        short.sacks = Some(12);
        draft.push(short);
        let mut cap = Step::new(RegulatoryPurpose::CibpCap, 4980.0, 5000.0);
        cap.sacks = Some(3);
        draft.push(cap);

        let draft = run(&WellFacts::default(), draft).expect("validate");
        assert_eq!(draft.steps.len(), 2);
        assert_eq!(draft.violations.len(), 1);
        assert_eq!(draft.violations[0].code, V_BELOW_MINIMUM);
    }

    #[test]
    fn test_inverted_interval_is_fatal() {
        let mut draft = PlanDraft::default();
        let mut bad = Step::new(RegulatoryPurpose::CementPlug, 100.0, 200.0);
        bad.top_ft = 300.0;
        draft.push(bad);
        assert!(matches!(
            run(&WellFacts::default(), draft),
            Err(StageError::InvalidStep { .. })
        ));
    }
}
