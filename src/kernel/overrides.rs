//! Caller-supplied step overrides
//!
//! Explicit edits from `policy.steps_overrides`. Everything injected here is
//! marked `origin = override` so the validator can police it.

use super::generators::{place, squeeze_cap_ft, upgrade_to_squeeze};
use super::mechanical::MechanicalAwareness;
use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use crate::types::{BarrierKind, MechanicalType, RegulatoryPurpose, Step, StepOrigin};
use tracing::debug;

pub struct StepOverrides;

impl StepOverrides {
    const NAME: &'static str = "step_overrides";

    fn checked_interval(key: &str, top_ft: f64, bottom_ft: f64) -> Result<(), StageError> {
        if !(top_ft.is_finite() && bottom_ft.is_finite()) || top_ft < 0.0 || top_ft >= bottom_ft {
            return Err(StageError::invalid_policy(
                key,
                format!("{top_ft}-{bottom_ft} ft is not a valid interval"),
            ));
        }
        Ok(())
    }
}

impl Stage for StepOverrides {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let Some(overrides) = &ctx.policy.steps_overrides else {
            return Ok(draft);
        };

        if let Some(len) = overrides.cibp_cap_length_ft {
            if !len.is_finite() || len <= 0.0 {
                return Err(StageError::invalid_policy(
                    "steps_overrides.cibp_cap_length_ft",
                    format!("must be > 0 (got {len})"),
                ));
            }
            for cap in draft.steps.iter_mut().filter(|s| s.purpose.is_mechanical_cap()) {
                cap.set_detail("cap_length_before_override_ft", cap.length_ft());
                cap.top_ft = (cap.bottom_ft - len).max(0.0);
            }
        }

        let default_cap = squeeze_cap_ft(ctx);
        for sq in &overrides.squeeze_via_perf {
            Self::checked_interval("steps_overrides.squeeze_via_perf", sq.top_ft, sq.bottom_ft)?;
            let mut step = Step::new(RegulatoryPurpose::SqueezeViaPerf, sq.top_ft, sq.bottom_ft)
                .with_origin(StepOrigin::Override)
                .with_citations(sq.citation_keys.clone());
            step = place(ctx, step);
            upgrade_to_squeeze(&mut step, sq.cap_length_ft.unwrap_or(default_cap), "caller override");
            if let Some(sacks) = sq.sacks {
                step.set_detail("sacks_override", sacks);
            }
            draft.push(step);
        }

        let resolver = ctx.casing();
        for pc in &overrides.perf_circulate {
            Self::checked_interval("steps_overrides.perf_circulate", pc.top_ft, pc.bottom_ft)?;
            let mut step = Step::new(RegulatoryPurpose::PerfCirculate, pc.top_ft, pc.bottom_ft)
                .with_origin(StepOrigin::Override)
                .with_citations(pc.citation_keys.clone());
            step.plug_type = Some(MechanicalType::PerfAndCirculatePlug);
            step.tag_required = pc.tag_required;
            step.annulus = resolver
                .casing_context_at_depth(pc.bottom_ft)
                .squeeze_annulus();
            draft.push(place(ctx, step));
        }
        if !overrides.perf_circulate.is_empty() {
            if let Some(cibp_ft) = ctx.facts.shallowest_barrier(&[BarrierKind::Cibp]) {
                MechanicalAwareness::drop_blocked_circulation(&mut draft, cibp_ft);
            }
        }

        for cp in &overrides.cement_plugs {
            Self::checked_interval("steps_overrides.cement_plugs", cp.top_ft, cp.bottom_ft)?;
            let mut step = Step::new(RegulatoryPurpose::CementPlug, cp.top_ft, cp.bottom_ft)
                .with_origin(StepOrigin::Override)
                .with_citations(cp.citation_keys.clone());
            step.tag_required = cp.tag_required;
            draft.push(place(ctx, step));
        }

        let injected = overrides.squeeze_via_perf.len()
            + overrides.perf_circulate.len()
            + overrides.cement_plugs.len();
        debug!(injected, "Step overrides applied");
        draft.trace(Self::NAME, format!("{injected} override step(s) injected"));
        Ok(draft)
    }
}
