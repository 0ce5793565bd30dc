//! Plug-type classifier
//!
//! Assigns the mechanical placement method of each step from its depth
//! relative to the production top of cement. Must run before merge, which
//! only inspects `plug_type`.

use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use crate::types::{MechanicalType, RegulatoryPurpose, Step};
use tracing::debug;

/// Decision order:
/// 1. circulates to surface → perf-and-circulate (absolute precedence)
/// 2. mechanical cap → dumbbell
/// 3. surface top plug → spot
/// 4. bridge plug / retainer → none
/// 5. TOC unknown → perf-and-squeeze
/// 6. reference depth shallower than TOC → perf-and-squeeze, else spot
pub fn determine_plug_type(step: &Step, production_toc_ft: Option<f64>) -> Option<MechanicalType> {
    if step.purpose.circulates_to_surface() {
        return Some(MechanicalType::PerfAndCirculatePlug);
    }
    if step.purpose.is_mechanical_cap() {
        return Some(MechanicalType::DumbbellPlug);
    }
    if step.purpose == RegulatoryPurpose::TopPlug {
        return Some(MechanicalType::SpotPlug);
    }
    if !step.purpose.is_cement_bearing() {
        return None;
    }
    match production_toc_ft {
        None => Some(MechanicalType::PerfAndSqueezePlug),
        Some(toc) if step.reference_depth_ft() < toc => Some(MechanicalType::PerfAndSqueezePlug),
        Some(_) => Some(MechanicalType::SpotPlug),
    }
}

pub struct ClassifyPlugTypes;

impl Stage for ClassifyPlugTypes {
    fn name(&self) -> &'static str {
        "classify"
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let toc = ctx.casing().production_toc_ft();
        let mut assigned = 0usize;
        for step in &mut draft.steps {
            if step.purpose.circulates_to_surface() {
                step.plug_type = Some(MechanicalType::PerfAndCirculatePlug);
                continue;
            }
            if step.plug_type.is_some() {
                continue;
            }
            step.plug_type = determine_plug_type(step, toc);
            if step.plug_type.is_some() {
                assigned += 1;
            }
        }
        debug!(assigned, production_toc_ft = ?toc, "Plug types classified");
        draft.trace(
            self.name(),
            format!(
                "classified {assigned} step(s) against production TOC {}",
                toc.map_or_else(|| "unknown".to_string(), |t| format!("{t:.0} ft"))
            ),
        );
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plug(top: f64, bottom: f64) -> Step {
        Step::new(RegulatoryPurpose::CementPlug, top, bottom)
    }

    #[test]
    fn test_depth_against_toc() {
        // plug topped at 5200 sits above a 6000 ft TOC: no cement behind pipe
        assert_eq!(
            determine_plug_type(&plug(5200.0, 5300.0), Some(6000.0)),
            Some(MechanicalType::PerfAndSqueezePlug)
        );
        assert_eq!(
            determine_plug_type(&plug(6500.0, 6600.0), Some(6000.0)),
            Some(MechanicalType::SpotPlug)
        );
        // reference depth is the bottom
        assert_eq!(
            determine_plug_type(&plug(5950.0, 6000.0), Some(6000.0)),
            Some(MechanicalType::SpotPlug)
        );
    }

    #[test]
    fn test_unknown_toc_is_conservative() {
        assert_eq!(
            determine_plug_type(&plug(8000.0, 8100.0), None),
            Some(MechanicalType::PerfAndSqueezePlug)
        );
    }

    #[test]
    fn test_purpose_precedence() {
        let circ = Step::new(RegulatoryPurpose::PerfCirculateToSurface, 0.0, 1250.0);
        assert_eq!(determine_plug_type(&circ, Some(0.0)), Some(MechanicalType::PerfAndCirculatePlug));
        let cap = Step::new(RegulatoryPurpose::CibpCap, 4980.0, 5000.0);
        assert_eq!(determine_plug_type(&cap, None), Some(MechanicalType::DumbbellPlug));
        let top = Step::new(RegulatoryPurpose::TopPlug, 0.0, 10.0);
        assert_eq!(determine_plug_type(&top, Some(6000.0)), Some(MechanicalType::SpotPlug));
        let bp = Step::point(RegulatoryPurpose::BridgePlug, 5000.0);
        assert_eq!(determine_plug_type(&bp, Some(6000.0)), None);
    }
}
