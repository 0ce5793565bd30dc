//! Stage trait and pipeline runner
//!
//! Every pass of the kernel is a [`Stage`] that takes the working draft by
//! value and hands back the next one.
//!
//! ## Failure semantics
//!
//! - **Core** stages are load-bearing: an error aborts plan generation with
//!   [`KernelError::Stage`].
//! - **Soft** stages are enrichment: an error is recorded as a finding, the
//!   draft from before the stage is kept, and the pipeline continues.

use super::{KernelContext, KernelError, PlanDraft};
use crate::geometry::GeometryError;
use crate::types::RegulatoryPurpose;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Core,
    Soft,
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("{kind} declared without a depth")]
    BarrierWithoutDepth { kind: String },

    #[error("step {id} ({purpose}): {reason}")]
    InvalidStep {
        id: u32,
        purpose: RegulatoryPurpose,
        reason: String,
    },

    #[error("invalid policy value '{key}': {reason}")]
    InvalidPolicy { key: String, reason: String },

    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

impl StageError {
    pub fn invalid_step(step: &crate::types::Step, reason: impl Into<String>) -> Self {
        StageError::InvalidStep {
            id: step.id,
            purpose: step.purpose,
            reason: reason.into(),
        }
    }

    pub fn invalid_policy(key: &str, reason: impl Into<String>) -> Self {
        StageError::InvalidPolicy {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// One pass of the plugging kernel.
pub trait Stage: Send + Sync {
    /// Stage name recorded in trace entries and findings
    fn name(&self) -> &'static str;

    fn kind(&self) -> StageKind;

    fn apply(&self, ctx: &KernelContext<'_>, draft: PlanDraft) -> Result<PlanDraft, StageError>;
}

/// Run stages in order, applying core/soft failure semantics.
pub fn run_stages(
    stages: &[Box<dyn Stage>],
    ctx: &KernelContext<'_>,
    mut draft: PlanDraft,
) -> Result<PlanDraft, KernelError> {
    for stage in stages {
        let before = draft.steps.len();
        draft = match stage.kind() {
            StageKind::Core => stage
                .apply(ctx, draft)
                .map_err(|source| KernelError::Stage {
                    stage: stage.name(),
                    source,
                })?,
            StageKind::Soft => {
                let snapshot = draft.clone();
                match stage.apply(ctx, draft) {
                    Ok(next) => next,
                    Err(e) => {
                        warn!(stage = stage.name(), error = %e, "Soft stage failed, keeping prior draft");
                        let mut kept = snapshot;
                        kept.finding(stage.name(), "stage_skipped", e.to_string());
                        kept
                    }
                }
            }
        };
        debug!(
            stage = stage.name(),
            steps_before = before,
            steps_after = draft.steps.len(),
            "Stage complete"
        );
    }
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::geometry::StandardPipeSpecs;
    use crate::types::{Policy, Step, WellFacts};

    struct AddCement;
    struct Broken(StageKind);

    impl Stage for AddCement {
        fn name(&self) -> &'static str {
            "add_cement"
        }
        fn kind(&self) -> StageKind {
            StageKind::Core
        }
        fn apply(&self, _ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
            draft.push(Step::new(RegulatoryPurpose::CementPlug, 100.0, 200.0));
            Ok(draft)
        }
    }

    impl Stage for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn kind(&self) -> StageKind {
            self.0
        }
        fn apply(&self, _ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
            // Mutate before failing; the runner must discard this for soft stages
            draft.steps.clear();
            Err(StageError::invalid_policy("tag", "bad interval"))
        }
    }

    fn run(stages: Vec<Box<dyn Stage>>) -> Result<PlanDraft, KernelError> {
        let facts = WellFacts::default();
        let policy = Policy::default();
        let config = KernelConfig::default();
        let specs = StandardPipeSpecs::default();
        let ctx = KernelContext::new(&facts, &policy, &config, &specs);
        run_stages(&stages, &ctx, PlanDraft::default())
    }

    #[test]
    fn test_soft_failure_keeps_prior_draft() {
        let draft = run(vec![Box::new(AddCement), Box::new(Broken(StageKind::Soft))])
            .expect("soft failure must not abort");
        assert_eq!(draft.steps.len(), 1);
        assert_eq!(draft.findings.len(), 1);
        assert_eq!(draft.findings[0].stage, "broken");
        assert_eq!(draft.findings[0].code, "stage_skipped");
    }

    #[test]
    fn test_core_failure_propagates() {
        let err = run(vec![Box::new(AddCement), Box::new(Broken(StageKind::Core))])
            .expect_err("core failure must abort");
        assert!(matches!(err, KernelError::Stage { stage: "broken", .. }));
    }
}
