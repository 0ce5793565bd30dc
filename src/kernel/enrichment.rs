//! Enrichment stages. Both are soft: a fault skips the stage and keeps the
//! plan as it was.

use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use tracing::debug;

pub const DETAIL_CEMENT_CLASS: &str = "cement_class";

/// Copies the recipe's API class onto each cement step.
pub struct AnnotateCementClass;

impl Stage for AnnotateCementClass {
    fn name(&self) -> &'static str {
        "cement_class"
    }

    fn kind(&self) -> StageKind {
        StageKind::Soft
    }

    fn apply(&self, _ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let mut annotated = 0usize;
        for step in draft.steps.iter_mut().filter(|s| s.purpose.is_cement_bearing()) {
            let Some(recipe) = &step.recipe else {
                continue;
            };
            let class = recipe.class.trim().to_string();
            if class.is_empty() {
                return Err(StageError::invalid_step(step, "recipe has no cement class"));
            }
            step.set_detail(DETAIL_CEMENT_CLASS, class);
            annotated += 1;
        }
        debug!(annotated, "Cement class annotated");
        Ok(draft)
    }
}

/// Collects distinct special instructions into the plan notes.
pub struct AggregateNotes;

impl Stage for AggregateNotes {
    fn name(&self) -> &'static str {
        "notes"
    }

    fn kind(&self) -> StageKind {
        StageKind::Soft
    }

    fn apply(&self, _ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let mut notes = std::mem::take(&mut draft.notes);
        for text in draft
            .steps
            .iter()
            .filter_map(|s| s.special_instructions.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            if !notes.iter().any(|n| n == text) {
                notes.push(text.to_string());
            }
        }
        draft.notes = notes;
        Ok(draft)
    }
}
