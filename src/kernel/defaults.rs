//! Geometry and recipe defaults
//!
//! Fills gaps left by the generators from `preferences.geometry_defaults`,
//! keyed by purpose wire name with `"*"` as the catch-all. Explicit values
//! are never overwritten.

use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use crate::types::{GeometryDefaults, SlurryRecipe, Step};
use tracing::debug;

pub const FINDING_RECIPE_FALLBACK: &str = "default_recipe_fallback";

/// Merge one defaults record into a step, honouring the context key rules:
/// open hole accepts stinger OD/ID and excess; cased accepts casing ID,
/// stinger OD and excess.
pub fn merge_geometry_defaults(step: &mut Step, defaults: &GeometryDefaults) {
    if step.is_open_hole() {
        step.stinger_od_in = step.stinger_od_in.or(defaults.stinger_od_in);
        step.stinger_id_in = step.stinger_id_in.or(defaults.stinger_id_in);
    } else {
        step.casing_id_in = step.casing_id_in.or(defaults.casing_id_in);
        step.stinger_od_in = step.stinger_od_in.or(defaults.stinger_od_in);
    }
    step.annular_excess = step.annular_excess.or(defaults.annular_excess);
}

pub struct ApplyDefaults;

impl Stage for ApplyDefaults {
    fn name(&self) -> &'static str {
        "defaults"
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let prefs = &ctx.policy.preferences;
        let recipe = match &prefs.default_recipe {
            Some(r) if r.is_usable() => r.clone(),
            Some(r) => {
                return Err(StageError::invalid_policy(
                    "preferences.default_recipe.yield_ft3_per_sk",
                    format!("must be > 0 (got {})", r.yield_ft3_per_sk),
                ))
            }
            None => SlurryRecipe::class_h_fallback(),
        };
        let fallback = prefs.default_recipe.is_none();
        let wildcard = prefs.geometry_defaults.get("*");

        let mut fallback_count = 0usize;
        for step in &mut draft.steps {
            if let Some(d) = prefs.geometry_defaults.get(step.purpose.as_str()) {
                merge_geometry_defaults(step, d);
            }
            if let Some(d) = wildcard {
                merge_geometry_defaults(step, d);
            }
            if !step.purpose.is_cement_bearing() {
                continue;
            }
            if step.recipe.is_none() {
                step.recipe = Some(recipe.clone());
                if fallback {
                    fallback_count += 1;
                }
            }
            if let Some(r) = step.recipe.as_mut() {
                if r.rounding.is_none() {
                    r.rounding = prefs.rounding_policy;
                }
            }
        }

        if fallback_count > 0 {
            draft.finding(
                self.name(),
                FINDING_RECIPE_FALLBACK,
                format!(
                    "policy supplies no default recipe; Class H neat (15.6 ppg, 1.18 ft3/sk) used for {fallback_count} step(s)"
                ),
            );
        }
        debug!(fallback_count, "Defaults applied");
        Ok(draft)
    }
}
