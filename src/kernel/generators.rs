//! Requirement step generators
//!
//! One function per regulatory requirement. Each reads its policy knob(s),
//! looks at the facts, and either pushes steps, records a violation, or does
//! nothing. Generators never see each other's output except where a rule is
//! explicitly defined in terms of earlier steps (UQW vs GAU plugs,
//! perf-and-circulate superseding shallow plugs).

use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft, SupersededStep};
use crate::config::defaults::*;
use crate::types::{
    AnnulusGeometry, MechanicalType, RegulatoryPurpose, Severity, SqueezeSpec, Step, Violation,
};
use tracing::debug;

const STAGE: &str = "generators";

// ============================================================================
// Shared helpers
// ============================================================================

/// Attach geometry context, bore ID and hole size from the casing program.
pub(crate) fn place(ctx: &KernelContext<'_>, mut step: Step) -> Step {
    let mid = (step.top_ft + step.bottom_ft) / 2.0;
    let g = ctx.casing().step_geometry(mid);
    step.geometry_context = step.geometry_context.or(Some(g.context));
    step.casing_id_in = step.casing_id_in.or(g.casing_id_in);
    step.hole_size_in = step.hole_size_in.or(g.hole_size_in);
    step
}

/// Turn an interval step into perforate / squeeze / cap. The current
/// interval becomes the perforations and the cap sits above it.
pub(crate) fn upgrade_to_squeeze(step: &mut Step, cap_length_ft: f64, reason: &str) {
    step.squeeze = Some(SqueezeSpec {
        perf_top_ft: step.top_ft,
        perf_bottom_ft: step.bottom_ft,
        cap_length_ft,
    });
    step.top_ft = (step.top_ft - cap_length_ft).max(0.0);
    step.plug_type = Some(MechanicalType::PerfAndSqueezePlug);
    step.set_detail("perforation_required", true);
    step.set_detail("perforation_reason", reason);
}

pub(crate) fn squeeze_cap_ft(ctx: &KernelContext<'_>) -> f64 {
    ctx.knob_or(KNOB_SQUEEZE_CAP_LENGTH_FT, ctx.config.plugs.squeeze_cap_length_ft)
}

// ============================================================================
// Generators
// ============================================================================

/// Plug across the surface casing shoe: [shoe - min, shoe].
pub fn surface_shoe(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let policy = ctx.policy;
    let facts = ctx.facts;
    let Some(min_ft) = policy.knob_f64(KNOB_SURFACE_SHOE_MIN_FT) else {
        return;
    };
    let citations = policy.citations(KNOB_SURFACE_SHOE_MIN_FT);

    match facts.surface_shoe_ft {
        Some(shoe) => {
            let step = Step::new(
                RegulatoryPurpose::SurfaceCasingShoePlug,
                (shoe - min_ft).max(0.0),
                shoe,
            )
            .with_citations(citations.clone());
            draft.push(place(ctx, step));
            draft.trace(STAGE, format!("surface shoe plug {:.0}-{shoe:.0} ft", shoe - min_ft));
        }
        None => draft.violation(
            Violation::new(
                V_SURFACE_SHOE_UNKNOWN,
                Severity::Major,
                "surface casing shoe depth is unknown; surface shoe plug cannot be placed",
            )
            .with_citations(citations.clone()),
        ),
    }

    if policy.knob_bool(KNOB_SURFACE_COVERAGE_CHECK) == Some(true) {
        if let (Some(uqw), Some(shoe)) = (facts.uqw_base_ft, facts.surface_shoe_ft) {
            if uqw > shoe {
                draft.violation(
                    Violation::new(
                        V_SURFACE_COVERAGE,
                        Severity::Major,
                        format!("surface casing shoe ({shoe:.0} ft) is shallower than UQW base ({uqw:.0} ft)"),
                    )
                    .with_citations(policy.citations(KNOB_SURFACE_COVERAGE_CHECK))
                    .with_context("surface_shoe_ft", shoe)
                    .with_context("uqw_base_ft", uqw),
                );
            }
        }
    }
}

/// Bridge plug + cap for a planned CIBP, or a top-up cap on an existing one.
pub fn cibp_and_cap(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let facts = ctx.facts;
    let Some(len) = ctx.policy.knob_f64(KNOB_CEMENT_ABOVE_CIBP_MIN_FT) else {
        return;
    };
    let citations = ctx.policy.citations(KNOB_CEMENT_ABOVE_CIBP_MIN_FT);

    if let Some(depth) = facts.cibp_planned_ft {
        let bridge = Step::point(RegulatoryPurpose::BridgePlug, depth)
            .with_citations(citations.clone());
        draft.push(place(ctx, bridge));
        let mut cap = Step::new(RegulatoryPurpose::CibpCap, (depth - len).max(0.0), depth)
            .with_citations(citations);
        cap.set_detail("cibp_depth_ft", depth);
        draft.push(place(ctx, cap));
        draft.trace(STAGE, format!("planned CIBP at {depth:.0} ft with {len:.0} ft cap"));
        return;
    }

    let Some(depth) = facts.existing_cibp_ft else {
        return;
    };
    let existing = facts.existing_cibp_cap_ft.unwrap_or(0.0).max(0.0);
    if existing >= len {
        draft.trace(
            STAGE,
            format!("existing CIBP cap ({existing:.0} ft) already meets {len:.0} ft"),
        );
        return;
    }
    let mut cap = Step::new(
        RegulatoryPurpose::CibpCap,
        (depth - len).max(0.0),
        depth - existing,
    )
    .with_citations(citations);
    cap.set_detail("cibp_depth_ft", depth);
    if existing > 0.0 {
        cap.set_detail("top_up", true);
        cap.set_detail("existing_cap_ft", existing);
    }
    draft.push(place(ctx, cap));
    draft.trace(
        STAGE,
        format!("cap on existing CIBP at {depth:.0} ft topped up to {len:.0} ft"),
    );
}

/// One UQW isolation plug per GAU protect interval.
pub fn gau_protect_intervals(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let citations = ctx.policy.citations(KNOB_UQW_ISOLATION_MIN_LEN_FT);
    for interval in &ctx.facts.gau_protect_intervals {
        let mut step = Step::new(
            RegulatoryPurpose::UqwIsolationPlug,
            interval.top_ft,
            interval.bottom_ft,
        )
        .with_citations(citations.clone());
        step.set_detail("gau_protect_interval", true);
        draft.push(place(ctx, step));
    }
}

/// Band centred on the UQW base. Skipped when a GAU plug already spans it.
pub fn uqw_isolation(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let facts = ctx.facts;
    let policy = ctx.policy;
    let citations = policy.citations(KNOB_UQW_ISOLATION_MIN_LEN_FT);

    let (Some(base), Some(len)) = (facts.uqw_base_ft, policy.knob_f64(KNOB_UQW_ISOLATION_MIN_LEN_FT))
    else {
        if facts.duqw_isolation_required {
            draft.violation(
                Violation::new(
                    V_UQW_MISSING,
                    Severity::Major,
                    "DUQW isolation is required but the UQW base or isolation length is unknown",
                )
                .with_citations(citations)
                .with_context("uqw_base_known", facts.uqw_base_ft.is_some()),
            );
        }
        return;
    };

    let top = (base - len / 2.0).max(0.0);
    let bottom = base + len / 2.0;
    let covered = draft.steps.iter().any(|s| {
        s.detail_flag("gau_protect_interval") && s.top_ft <= top && s.bottom_ft >= bottom
    });
    if covered {
        draft.trace(STAGE, format!("UQW band {top:.0}-{bottom:.0} ft covered by GAU plug"));
        return;
    }
    let mut step = Step::new(RegulatoryPurpose::UqwIsolationPlug, top, bottom).with_citations(citations);
    step.set_detail("uqw_base_ft", base);
    draft.push(place(ctx, step));
}

/// Surface plug [0, len]; records the casing cut depth.
pub fn top_plug(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let policy = ctx.policy;
    let Some(len) = policy.knob_f64(KNOB_TOP_PLUG_LENGTH_FT) else {
        return;
    };
    let mut step = Step::new(RegulatoryPurpose::TopPlug, 0.0, len)
        .with_citations(policy.citations(KNOB_TOP_PLUG_LENGTH_FT));
    if let Some(cut) = policy.knob_f64(KNOB_CASING_CUT_BELOW_SURFACE_FT) {
        step.set_detail("casing_cut_below_surface_ft", cut);
        for citation in policy.citations(KNOB_CASING_CUT_BELOW_SURFACE_FT) {
            step.add_citation(citation);
        }
    }
    draft.push(place(ctx, step));
}

/// Plug straddling the intermediate shoe; squeezed when nothing is behind pipe.
pub fn intermediate_shoe(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let Some(shoe) = ctx.facts.intermediate_shoe_ft else {
        return;
    };
    let half = ctx.knob_or(
        KNOB_INTERMEDIATE_SHOE_MIN_FT,
        ctx.config.plugs.intermediate_shoe_half_length_ft,
    );
    let mut step = Step::new(
        RegulatoryPurpose::IntermediateCasingShoePlug,
        (shoe - half).max(0.0),
        shoe + half,
    )
    .with_citations(ctx.policy.citations(KNOB_INTERMEDIATE_SHOE_MIN_FT));

    let decision = ctx.casing().requires_perforation(step.top_ft, step.bottom_ft);
    step = place(ctx, step);
    if decision.required {
        upgrade_to_squeeze(&mut step, squeeze_cap_ft(ctx), &decision.reason);
    }
    draft.push(step);
}

/// Perforate below the surface shoe and circulate cement to surface when the
/// intermediate string is hung inside surface casing with no useful cement.
pub fn perf_circulate_to_surface(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let facts = ctx.facts;
    let policy = ctx.policy;
    let plugs = &ctx.config.plugs;
    if policy.knob_bool(KNOB_PERF_CIRCULATE_ENABLED) == Some(false) {
        return;
    }
    let Some(shoe) = facts.surface_shoe_ft else {
        return;
    };
    let resolver = ctx.casing();
    let (Some(surface), Some(intermediate)) = (resolver.named("surface"), resolver.named("intermediate"))
    else {
        return;
    };
    if !(intermediate.od_in < surface.od_in && intermediate.top_ft <= 0.0) {
        return;
    }

    let toc = intermediate.cement_top_ft;
    let toc_trigger = toc.map_or(true, |t| t > plugs.perf_circulate_toc_limit_ft);
    let threshold = ctx.knob_or(KNOB_SHALLOW_UQW_THRESHOLD_FT, plugs.shallow_uqw_threshold_ft);
    let shallow_uqw = facts.uqw_base_ft.is_some_and(|b| b <= threshold);
    if !(toc_trigger || shallow_uqw) {
        return;
    }

    let perf_depth = shoe + plugs.perf_circulate_below_shoe_ft;
    let mut step = Step::new(RegulatoryPurpose::PerfCirculateToSurface, 0.0, perf_depth)
        .with_citations(policy.citations(KNOB_PERF_CIRCULATE_ENABLED));
    step.plug_type = Some(MechanicalType::PerfAndCirculatePlug);
    step.annulus = Some(AnnulusGeometry {
        outer_id_in: surface.id_in,
        inner_od_in: intermediate.od_in,
    });
    step.set_detail("perforation_depth_ft", perf_depth);
    step.set_detail(
        "trigger",
        if toc_trigger {
            "intermediate_toc_unknown_or_deep"
        } else {
            "shallow_uqw"
        },
    );
    let id = draft.push(place(ctx, step));

    let parked = draft.take_steps(|s| {
        matches!(
            s.purpose,
            RegulatoryPurpose::SurfaceCasingShoePlug
                | RegulatoryPurpose::TopPlug
                | RegulatoryPurpose::UqwIsolationPlug
        ) && s.bottom_ft <= perf_depth
    });
    let superseded = parked.len();
    draft
        .superseded
        .extend(parked.into_iter().map(|step| SupersededStep { by: id, step }));
    debug!(perf_depth, superseded, "Perf-and-circulate to surface placed");
    draft.trace(
        STAGE,
        format!("perf-and-circulate to surface from {perf_depth:.0} ft superseded {superseded} step(s)"),
    );
}

/// Isolation above the producing interval top.
pub fn productive_horizon(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let Some(interval) = ctx.facts.producing_interval else {
        return;
    };
    let offset = ctx.knob_or(
        KNOB_PRODUCTIVE_HORIZON_FT,
        ctx.config.plugs.productive_horizon_offset_ft,
    );
    let top = (interval.top_ft - offset).max(0.0);
    let bottom = interval.top_ft;
    let mut step = Step::new(RegulatoryPurpose::ProductiveHorizonIsolationPlug, top, bottom)
        .with_citations(ctx.policy.citations(KNOB_PRODUCTIVE_HORIZON_FT));
    step.set_detail("producing_interval_top_ft", interval.top_ft);

    let decision = ctx.casing().requires_perforation(top, bottom);
    step = place(ctx, step);
    if decision.required {
        upgrade_to_squeeze(&mut step, squeeze_cap_ft(ctx), &decision.reason);
    }
    draft.push(step);
}

/// One plug per annular gap flagged on the wellbore schematic.
pub fn annular_gaps(ctx: &KernelContext<'_>, draft: &mut PlanDraft) {
    let resolver = ctx.casing();
    for gap in &ctx.facts.annular_gaps {
        let mut step = Step::new(RegulatoryPurpose::AnnularGapPlug, gap.top_ft, gap.bottom_ft);
        if let Some(desc) = &gap.description {
            step.set_detail("gap_description", desc.as_str());
        }
        let decision = resolver.requires_perforation(step.top_ft, step.bottom_ft);
        step = place(ctx, step);
        if decision.required {
            upgrade_to_squeeze(&mut step, squeeze_cap_ft(ctx), &decision.reason);
        }
        draft.push(step);
    }
}

/// Explicit plug ladder stacked upward from the base depth.
pub fn proposal_ladder(ctx: &KernelContext<'_>, draft: &mut PlanDraft) -> Result<(), StageError> {
    let Some(proposal) = &ctx.policy.proposal else {
        return Ok(());
    };
    let (Some(count), Some(segment), Some(spacing)) =
        (proposal.plug_count, proposal.segment_length_ft, proposal.spacing_ft)
    else {
        draft.trace(STAGE, "proposal ignored: plug_count, segment_length_ft and spacing_ft are all required");
        return Ok(());
    };
    if !segment.is_finite() || segment <= 0.0 {
        return Err(StageError::invalid_policy(
            "proposal.segment_length_ft",
            format!("must be > 0 (got {segment})"),
        ));
    }
    if !spacing.is_finite() || spacing < 0.0 {
        return Err(StageError::invalid_policy(
            "proposal.spacing_ft",
            format!("must be >= 0 (got {spacing})"),
        ));
    }
    let Some(base) = proposal.base_depth_ft.or(ctx.facts.production_shoe_ft) else {
        draft.trace(STAGE, "proposal ignored: no base depth and no production shoe");
        return Ok(());
    };

    let mut bottom = base;
    let mut placed = 0u32;
    while placed < count && bottom > 0.0 {
        let top = (bottom - segment).max(0.0);
        let mut step = Step::new(RegulatoryPurpose::CementPlug, top, bottom)
            .with_citations(proposal.citation_keys.clone());
        step.set_detail("proposal_index", placed);
        draft.push(place(ctx, step));
        placed += 1;
        bottom = top - spacing;
    }
    if placed < count {
        draft.violation(
            Violation::new(
                V_PROPOSAL_TRUNCATED,
                Severity::Minor,
                format!("proposal ladder reached surface after {placed} of {count} plugs"),
            )
            .with_citations(proposal.citation_keys.clone())
            .with_context("placed", placed)
            .with_context("requested", count),
        );
    }
    draft.trace(STAGE, format!("proposal ladder placed {placed} plug(s) from {base:.0} ft"));
    Ok(())
}

// ============================================================================
// Stage
// ============================================================================

pub struct GenerateRequirementSteps;

impl Stage for GenerateRequirementSteps {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        surface_shoe(ctx, &mut draft);
        cibp_and_cap(ctx, &mut draft);
        gau_protect_intervals(ctx, &mut draft);
        uqw_isolation(ctx, &mut draft);
        top_plug(ctx, &mut draft);
        intermediate_shoe(ctx, &mut draft);
        perf_circulate_to_surface(ctx, &mut draft);
        productive_horizon(ctx, &mut draft);
        annular_gaps(ctx, &mut draft);
        proposal_ladder(ctx, &mut draft)?;
        debug!(steps = draft.steps.len(), violations = draft.violations.len(), "Requirement steps generated");
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::geometry::StandardPipeSpecs;
    use crate::types::{CasingStringFact, DepthInterval, Policy, WellFacts};
    use serde_json::json;

    fn run(facts: &WellFacts, policy: &Policy) -> PlanDraft {
        let config = KernelConfig::default();
        let specs = StandardPipeSpecs::default();
        let ctx = KernelContext::new(facts, policy, &config, &specs);
        GenerateRequirementSteps
            .apply(&ctx, PlanDraft::default())
            .expect("generators should not fail")
    }

    fn policy(requirements: serde_json::Value) -> Policy {
        serde_json::from_value(json!({"policy_id": "test", "requirements": requirements}))
            .expect("policy")
    }

    fn casing(name: &str, od: f64, bottom: f64, toc: Option<f64>) -> CasingStringFact {
        CasingStringFact {
            name: name.to_string(),
            od_in: od,
            weight_ppf: None,
            id_in: None,
            top_ft: 0.0,
            bottom_ft: bottom,
            hole_size_in: None,
            cement_top_ft: toc,
            cement_status: None,
        }
    }

    #[test]
    fn test_surface_shoe_interval() {
        let facts = WellFacts {
            surface_shoe_ft: Some(1200.0),
            ..WellFacts::default()
        };
        let draft = run(&facts, &policy(json!({"surface_casing_shoe_plug_min_ft": {"value": 50}})));
        assert_eq!(draft.steps.len(), 1);
        assert_eq!(draft.steps[0].top_ft, 1150.0);
        assert_eq!(draft.steps[0].bottom_ft, 1200.0);
    }

    #[test]
    fn test_surface_shoe_unknown_and_coverage() {
        let draft = run(
            &WellFacts::default(),
            &policy(json!({"surface_casing_shoe_plug_min_ft": {"value": 50}})),
        );
        assert!(draft.steps.is_empty());
        assert_eq!(draft.violations[0].code, V_SURFACE_SHOE_UNKNOWN);
        assert_eq!(draft.violations[0].severity, Severity::Major);

        let facts = WellFacts {
            surface_shoe_ft: Some(300.0),
            uqw_base_ft: Some(450.0),
            ..WellFacts::default()
        };
        let draft = run(
            &facts,
            &policy(json!({
                "surface_casing_shoe_plug_min_ft": {"value": 50},
                "surface_casing_coverage_check": {"value": true}
            })),
        );
        assert!(draft.violations.iter().any(|v| v.code == V_SURFACE_COVERAGE));
    }

    #[test]
    fn test_planned_cibp_gets_plug_and_cap() {
        let facts = WellFacts {
            cibp_planned_ft: Some(7000.0),
            ..WellFacts::default()
        };
        let draft = run(&facts, &policy(json!({"cement_above_cibp_min_ft": {"value": 100}})));
        assert_eq!(draft.steps.len(), 2);
        assert_eq!(draft.steps[0].purpose, RegulatoryPurpose::BridgePlug);
        assert_eq!(draft.steps[0].depth_ft, Some(7000.0));
        assert_eq!((draft.steps[1].top_ft, draft.steps[1].bottom_ft), (6900.0, 7000.0));
    }

    #[test]
    fn test_existing_cibp_cap_is_topped_up_never_stacked() {
        let p = policy(json!({"cement_above_cibp_min_ft": {"value": 100}}));
        let facts = WellFacts {
            existing_cibp_ft: Some(5000.0),
            existing_cibp_cap_ft: Some(20.0),
            ..WellFacts::default()
        };
        let draft = run(&facts, &p);
        assert_eq!(draft.steps.len(), 1);
        assert_eq!((draft.steps[0].top_ft, draft.steps[0].bottom_ft), (4900.0, 4980.0));

        let facts = WellFacts {
            existing_cibp_cap_ft: Some(100.0),
            ..facts
        };
        assert!(run(&facts, &p).steps.is_empty());
    }

    #[test]
    fn test_uqw_skipped_when_gau_plug_spans_band() {
        let facts = WellFacts {
            uqw_base_ft: Some(400.0),
            gau_protect_intervals: vec![DepthInterval::new(300.0, 500.0)],
            ..WellFacts::default()
        };
        let draft = run(&facts, &policy(json!({"uqw_isolation_min_len_ft": {"value": 100}})));
        assert_eq!(draft.steps.len(), 1);
        assert!(draft.steps[0].detail_flag("gau_protect_interval"));
    }

    #[test]
    fn test_duqw_missing_is_major() {
        let facts = WellFacts {
            duqw_isolation_required: true,
            ..WellFacts::default()
        };
        let draft = run(&facts, &policy(json!({"uqw_isolation_min_len_ft": {"value": 100}})));
        assert!(draft.steps.is_empty());
        assert_eq!(draft.violations[0].code, V_UQW_MISSING);
        assert_eq!(draft.violations[0].severity, Severity::Major);
    }

    #[test]
    fn test_top_plug_records_casing_cut() {
        let draft = run(
            &WellFacts::default(),
            &policy(json!({
                "top_plug_length_ft": {"value": 10},
                "casing_cut_below_surface_ft": {"value": 3}
            })),
        );
        assert_eq!((draft.steps[0].top_ft, draft.steps[0].bottom_ft), (0.0, 10.0));
        assert_eq!(draft.steps[0].detail_f64("casing_cut_below_surface_ft"), Some(3.0));
    }

    #[test]
    fn test_intermediate_shoe_upgraded_to_squeeze() {
        let facts = WellFacts {
            intermediate_shoe_ft: Some(4500.0),
            casing_strings: vec![
                casing("surface", 13.375, 1200.0, Some(0.0)),
                casing("intermediate", 9.625, 4500.0, Some(3000.0)),
                casing("production", 5.5, 9500.0, Some(7000.0)),
            ],
            ..WellFacts::default()
        };
        let draft = run(&facts, &Policy::default());
        let step = &draft.steps[0];
        assert_eq!(step.plug_type, Some(MechanicalType::PerfAndSqueezePlug));
        let sq = step.squeeze.expect("squeeze spec");
        assert_eq!((sq.perf_top_ft, sq.perf_bottom_ft), (4450.0, 4550.0));
        assert_eq!(step.top_ft, 4400.0);
    }

    #[test]
    fn test_perf_circulate_supersedes_shallow_plugs() {
        let facts = WellFacts {
            surface_shoe_ft: Some(1200.0),
            uqw_base_ft: Some(300.0),
            casing_strings: vec![
                casing("surface", 13.375, 1200.0, Some(0.0)),
                casing("intermediate", 9.625, 4500.0, None),
            ],
            ..WellFacts::default()
        };
        let draft = run(
            &facts,
            &policy(json!({
                "surface_casing_shoe_plug_min_ft": {"value": 50},
                "top_plug_length_ft": {"value": 10},
                "uqw_isolation_min_len_ft": {"value": 100}
            })),
        );
        assert_eq!(draft.steps.len(), 1);
        let circ = &draft.steps[0];
        assert_eq!(circ.purpose, RegulatoryPurpose::PerfCirculateToSurface);
        assert_eq!((circ.top_ft, circ.bottom_ft), (0.0, 1250.0));
        let annulus = circ.annulus.expect("annulus");
        assert_eq!(annulus.outer_id_in, 12.615);
        assert_eq!(annulus.inner_od_in, 9.625);
        assert_eq!(draft.superseded.len(), 3);
    }

    #[test]
    fn test_perf_circulate_not_triggered_when_cemented_to_surface() {
        let facts = WellFacts {
            surface_shoe_ft: Some(1200.0),
            uqw_base_ft: Some(900.0),
            casing_strings: vec![
                casing("surface", 13.375, 1200.0, Some(0.0)),
                casing("intermediate", 9.625, 4500.0, Some(50.0)),
            ],
            ..WellFacts::default()
        };
        let draft = run(&facts, &Policy::default());
        assert!(draft.steps.iter().all(|s| s.purpose != RegulatoryPurpose::PerfCirculateToSurface));
    }

    #[test]
    fn test_productive_horizon_squeeze_and_simple() {
        let mut facts = WellFacts {
            producing_interval: Some(DepthInterval::new(8000.0, 8200.0)),
            casing_strings: vec![casing("production", 5.5, 9000.0, Some(8500.0))],
            ..WellFacts::default()
        };
        let draft = run(&facts, &Policy::default());
        let step = &draft.steps[0];
        assert_eq!(step.plug_type, Some(MechanicalType::PerfAndSqueezePlug));
        assert_eq!((step.top_ft, step.bottom_ft), (7900.0, 8000.0));

        facts.casing_strings[0].cement_top_ft = Some(6000.0);
        let draft = run(&facts, &Policy::default());
        let step = &draft.steps[0];
        assert!(step.squeeze.is_none());
        assert_eq!((step.top_ft, step.bottom_ft), (7950.0, 8000.0));
    }

    #[test]
    fn test_proposal_requires_all_three_values() {
        let mut p = Policy::default();
        p.proposal = Some(crate::types::Proposal {
            plug_count: Some(3),
            segment_length_ft: Some(100.0),
            spacing_ft: None,
            base_depth_ft: Some(5000.0),
            citation_keys: Vec::new(),
        });
        assert!(run(&WellFacts::default(), &p).steps.is_empty());
    }

    #[test]
    fn test_proposal_ladder_stacks_upward_and_stops_at_surface() {
        let mut p = Policy::default();
        p.proposal = Some(crate::types::Proposal {
            plug_count: Some(4),
            segment_length_ft: Some(100.0),
            spacing_ft: Some(150.0),
            base_depth_ft: Some(500.0),
            citation_keys: vec!["proposal".to_string()],
        });
        let draft = run(&WellFacts::default(), &p);
        let intervals: Vec<(f64, f64)> = draft.steps.iter().map(|s| (s.top_ft, s.bottom_ft)).collect();
        // third plug would start at 0 ft; the ladder stops at surface
        assert_eq!(intervals, vec![(400.0, 500.0), (150.0, 250.0)]);
        assert!(draft.violations.iter().any(|v| v.code == V_PROPOSAL_TRUNCATED));
    }
}
