//! Mechanical-barrier awareness and CIBP detector
//!
//! Both stages are soft: a fault (e.g. a CIBP declared with no depth) skips
//! the stage and leaves the generated steps untouched.

use super::generators::place;
use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use crate::config::defaults::*;
use crate::types::{BarrierKind, RegulatoryPurpose, Severity, Step, StepOrigin, Violation};
use tracing::{debug, info};

// ============================================================================
// Mechanical awareness
// ============================================================================

pub struct MechanicalAwareness;

impl MechanicalAwareness {
    const NAME: &'static str = "mechanical_awareness";

    /// Drop circulation jobs that would have to pass the CIBP.
    pub(crate) fn drop_blocked_circulation(draft: &mut PlanDraft, cibp_ft: f64) {
        let blocked = draft.take_steps(|s| s.purpose.circulates_to_surface() && s.bottom_ft >= cibp_ft);
        for step in blocked {
            let restored = draft.restore_superseded(step.id);
            draft.violation(
                Violation::new(
                    V_PERF_CIRCULATE_BLOCKED,
                    Severity::Info,
                    format!(
                        "{} {:.0}-{:.0} ft removed: existing CIBP at {cibp_ft:.0} ft blocks circulation",
                        step.purpose, step.top_ft, step.bottom_ft
                    ),
                )
                .with_citations(step.regulatory_basis.clone())
                .with_context("cibp_ft", cibp_ft)
                .with_context("restored_steps", restored),
            );
            draft.trace(
                Self::NAME,
                format!("dropped {} (restored {restored} superseded step(s))", step.purpose),
            );
        }
    }

    fn ensure_cibp_cap(ctx: &KernelContext<'_>, draft: &mut PlanDraft, cibp_ft: f64) {
        if ctx.facts.existing_cibp_cap_ft.is_some_and(|c| c > 0.0) {
            draft.trace(Self::NAME, format!("CIBP at {cibp_ft:.0} ft has a documented cap"));
            return;
        }
        let tolerance = ctx.config.barriers.cap_match_tolerance_ft;
        let capped = draft.steps.iter().any(|s| {
            s.purpose.is_mechanical_cap() && (s.bottom_ft - cibp_ft).abs() <= tolerance
        });
        if capped {
            return;
        }
        let len = ctx.knob_or(KNOB_EXISTING_CIBP_CAP_FT, ctx.config.barriers.existing_cibp_cap_ft);
        let mut cap = Step::new(RegulatoryPurpose::CibpCap, (cibp_ft - len).max(0.0), cibp_ft)
            .with_origin(StepOrigin::Auto)
            .with_citations(ctx.policy.citations(KNOB_EXISTING_CIBP_CAP_FT));
        cap.set_detail("cibp_depth_ft", cibp_ft);
        draft.push(place(ctx, cap));
        info!(cibp_ft, cap_ft = len, "Cap added above existing CIBP");
        draft.trace(Self::NAME, format!("added {len:.0} ft cap above existing CIBP at {cibp_ft:.0} ft"));
    }

    /// Isolation plug centred on each packer / DV tool not already covered.
    fn isolate_tools(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
        let len = ctx.knob_or(KNOB_TOOL_ISOLATION_FT, ctx.config.barriers.tool_isolation_plug_ft);
        let tools: Vec<(BarrierKind, f64)> = ctx
            .facts
            .existing_mechanical_barriers
            .iter()
            .filter(|b| matches!(b.kind, BarrierKind::Packer | BarrierKind::DvTool))
            .filter_map(|b| b.depth_ft.map(|d| (b.kind, d)))
            .collect();
        for (kind, depth) in tools {
            let covered = draft
                .steps
                .iter()
                .any(|s| s.purpose.is_cement_bearing() && s.spans_depth(depth));
            if covered {
                continue;
            }
            let mut step = Step::new(
                RegulatoryPurpose::MechanicalIsolationPlug,
                (depth - len / 2.0).max(0.0),
                depth + len / 2.0,
            )
            .with_origin(StepOrigin::Auto)
            .with_citations(ctx.policy.citations(KNOB_TOOL_ISOLATION_FT));
            step.set_detail("tool", format!("{kind:?}"));
            step.set_detail("tool_depth_ft", depth);
            draft.push(place(ctx, step));
            draft.trace(Self::NAME, format!("isolation plug centred on {kind:?} at {depth:.0} ft"));
        }
    }
}

impl Stage for MechanicalAwareness {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Soft
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let facts = ctx.facts;
        if let Some(b) = facts
            .existing_mechanical_barriers
            .iter()
            .find(|b| b.kind == BarrierKind::Cibp && b.depth_ft.is_none())
        {
            return Err(StageError::BarrierWithoutDepth {
                kind: format!("{:?}", b.kind),
            });
        }

        if let Some(cibp_ft) = facts.shallowest_barrier(&[BarrierKind::Cibp]) {
            Self::drop_blocked_circulation(&mut draft, cibp_ft);
            Self::ensure_cibp_cap(ctx, &mut draft, cibp_ft);
        }
        Self::isolate_tools(ctx, &mut draft);
        Ok(draft)
    }
}

// ============================================================================
// CIBP detector
// ============================================================================

/// Synthesizes a bridge plug + cap above exposed perforations when the well
/// declares no barrier at all.
pub struct CibpDetector;

impl CibpDetector {
    const NAME: &'static str = "cibp_detector";
}

impl Stage for CibpDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> StageKind {
        StageKind::Soft
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let facts = ctx.facts;
        let barriers = &ctx.config.barriers;
        if !facts.existing_mechanical_barriers.is_empty() {
            return Ok(draft);
        }
        let Some(exposure) = facts
            .shallowest_perforation_top()
            .or_else(|| facts.shallowest_formation_top())
        else {
            return Ok(draft);
        };
        let Some(shoe) = facts.production_shoe_ft else {
            draft.trace(Self::NAME, "production shoe unknown; exposure not evaluated");
            return Ok(draft);
        };
        // Exposed: the perforation/top lies inside the production string
        if exposure > shoe {
            return Ok(draft);
        }

        let window = barriers.detector_window_ft;
        let covered = draft.steps.iter().any(|s| {
            s.purpose.is_barrier() && s.overlaps(exposure - window, exposure + window)
        });
        if covered {
            draft.trace(Self::NAME, format!("barrier already within {window:.0} ft of {exposure:.0} ft"));
            return Ok(draft);
        }

        let mut depth = exposure - barriers.detector_offset_ft;
        if let Some(kop) = facts.kop_md_ft() {
            depth = depth.min(kop - barriers.detector_offset_ft);
        }
        if !depth.is_finite() || depth <= 0.0 {
            return Err(StageError::invalid_policy(
                "cibp_detector",
                format!("computed CIBP depth {depth} is not below surface"),
            ));
        }
        let cap_len = ctx.knob_or(KNOB_CIBP_CAP_LENGTH_FT, barriers.detector_cap_ft);
        let citations = ctx.policy.citations(KNOB_CIBP_CAP_LENGTH_FT);

        let mut bridge = Step::point(RegulatoryPurpose::BridgePlug, depth)
            .with_origin(StepOrigin::Auto)
            .with_citations(citations.clone());
        bridge.set_detail("exposure_depth_ft", exposure);
        draft.push(place(ctx, bridge));
        let mut cap = Step::new(RegulatoryPurpose::CibpCap, (depth - cap_len).max(0.0), depth)
            .with_origin(StepOrigin::Auto)
            .with_citations(citations);
        cap.set_detail("cibp_depth_ft", depth);
        draft.push(place(ctx, cap));

        let removed = draft
            .take_steps(|s| s.purpose == RegulatoryPurpose::ProductiveHorizonIsolationPlug)
            .len();
        debug!(exposure, depth, cap_len, removed, "CIBP synthesized above exposed interval");
        draft.trace(
            Self::NAME,
            format!(
                "synthesized CIBP at {depth:.0} ft with {cap_len:.0} ft cap; removed {removed} productive-horizon plug(s)"
            ),
        );
        Ok(draft)
    }
}
