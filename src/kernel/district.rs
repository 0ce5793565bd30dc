//! District overrides
//!
//! Two stages share the district rules:
//! - [`DistrictFormationPlugs`] (core) appends required formation-top plugs
//! - [`DistrictTagging`] (soft) applies tag rules and operational instructions

use super::classify::determine_plug_type;
use super::generators::place;
use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use crate::config::defaults::V_FORMATION_TOP_UNKNOWN;
use crate::types::{RegulatoryPurpose, Severity, Step, StepOrigin, Violation, WellFacts};
use tracing::debug;

/// Formation top depth by name; exact match first, then case-insensitive.
pub fn formation_top_ft(facts: &WellFacts, formation: &str) -> Option<f64> {
    facts.formation_tops_map.get(formation).copied().or_else(|| {
        facts
            .formation_tops_map
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(formation))
            .map(|(_, depth)| *depth)
    })
}

// ============================================================================
// Formation-top plugs
// ============================================================================

pub struct DistrictFormationPlugs;

impl Stage for DistrictFormationPlugs {
    fn name(&self) -> &'static str {
        "district_formation_plugs"
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let rules = &ctx.policy.district_overrides.formation_tops;
        if rules.is_empty() {
            return Ok(draft);
        }
        let toc = ctx.casing().production_toc_ft();

        for rule in rules {
            let Some(depth) = formation_top_ft(ctx.facts, &rule.formation) else {
                draft.violation(
                    Violation::new(
                        V_FORMATION_TOP_UNKNOWN,
                        Severity::Minor,
                        format!("required formation top '{}' not found in well facts", rule.formation),
                    )
                    .with_citations(rule.citation_keys.clone())
                    .with_context("formation", rule.formation.as_str()),
                );
                continue;
            };
            let len = rule
                .min_length_ft
                .unwrap_or(ctx.config.plugs.formation_plug_length_ft);
            if !len.is_finite() || len <= 0.0 {
                return Err(StageError::invalid_policy(
                    "district_overrides.formation_tops.min_length_ft",
                    format!("'{}' length must be > 0 (got {len})", rule.formation),
                ));
            }
            let mut step = Step::new(
                RegulatoryPurpose::FormationTopPlug,
                (depth - len / 2.0).max(0.0),
                depth + len / 2.0,
            )
            .with_origin(StepOrigin::District)
            .with_citations(rule.citation_keys.clone());
            step.formation = Some(rule.formation.clone());
            step.tag_required = rule.tag_required;
            step.set_detail("formation_top_ft", depth);
            step = place(ctx, step);
            step.plug_type = determine_plug_type(&step, toc);
            draft.push(step);
            draft.trace(
                self.name(),
                format!("formation plug for {} at {depth:.0} ft", rule.formation),
            );
        }
        Ok(draft)
    }
}

// ============================================================================
// Tagging & instructions
// ============================================================================

pub struct DistrictTagging;

impl DistrictTagging {
    fn is_zone_isolation(purpose: RegulatoryPurpose) -> bool {
        matches!(
            purpose,
            RegulatoryPurpose::ProductiveHorizonIsolationPlug
                | RegulatoryPurpose::CibpCap
                | RegulatoryPurpose::BridgePlugCap
        )
    }
}

impl Stage for DistrictTagging {
    fn name(&self) -> &'static str {
        "district_tagging"
    }

    fn kind(&self) -> StageKind {
        StageKind::Soft
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let overrides = &ctx.policy.district_overrides;
        let tag = &overrides.tag;

        if let Some(bad) = overrides
            .protect_intervals
            .iter()
            .find(|i| !(i.top_ft.is_finite() && i.bottom_ft.is_finite()) || i.top_ft > i.bottom_ft)
        {
            return Err(StageError::invalid_policy(
                "district_overrides.protect_intervals",
                format!("interval {}-{} is not a valid depth range", bad.top_ft, bad.bottom_ft),
            ));
        }

        let mut tagged = 0usize;
        for step in &mut draft.steps {
            let before = step.tag_required;

            if tag.surface_shoe_in_open_hole
                && step.purpose == RegulatoryPurpose::SurfaceCasingShoePlug
                && (ctx.facts.surface_shoe_in_open_hole || step.is_open_hole())
            {
                step.tag_required = true;
            }
            if tag.protect_intervals
                && step.purpose.is_cement_bearing()
                && overrides
                    .protect_intervals
                    .iter()
                    .any(|i| i.overlaps(step.top_ft, step.bottom_ft))
            {
                step.tag_required = true;
            }
            if tag.enhanced_recovery
                && Self::is_zone_isolation(step.purpose)
                && overrides
                    .enhanced_recovery_zone
                    .is_some_and(|z| z.applies(step.top_ft, step.bottom_ft))
            {
                step.tag_required = true;
            }
            if step.tag_required && !before {
                tagged += 1;
            }

            let texts = [
                overrides.operational_instructions.get(step.purpose.as_str()),
                overrides.operational_instructions.get("*"),
            ];
            for text in texts.into_iter().flatten() {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                match &mut step.special_instructions {
                    Some(existing) if existing.contains(text) => {}
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(text);
                    }
                    None => step.special_instructions = Some(text.to_string()),
                }
            }
        }
        debug!(tagged, "District tag rules applied");
        draft.trace(self.name(), format!("{tagged} step(s) newly tagged"));
        Ok(draft)
    }
}
