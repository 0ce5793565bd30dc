//! Long-plug merge
//!
//! Adjacent compatible plugs are combined into one cement job while the
//! combined estimate stays under the sack ceiling, the span under
//! `merge.max_length_ft` and the member count under `merge.max_members`.
//!
//! Merged steps carry their own estimate and member count in `details`, so
//! running the merge again over its own output changes nothing.

use super::stage::{Stage, StageError, StageKind};
use super::{KernelContext, PlanDraft};
use crate::config::KernelConfig;
use crate::geometry::annulus_capacity_with;
use crate::types::{
    GeometryContext, LongPlugMerge, RegulatoryPurpose, Step, StepOrigin,
};
use serde_json::json;
use tracing::debug;

pub const DETAIL_MERGED: &str = "merged";
pub const DETAIL_MERGED_FROM: &str = "merged_from";
pub const DETAIL_MERGED_COUNT: &str = "merged_count";
pub const DETAIL_ESTIMATED_SACKS: &str = "estimated_sacks";

/// Float slack on the sack ceiling comparison.
const SACK_EPS: f64 = 1e-6;

pub struct MergeParams<'a> {
    pub rules: &'a LongPlugMerge,
    pub max_length_ft: f64,
    pub max_members: usize,
    pub capacity_divisor: f64,
    pub ft3_per_bbl: f64,
}

impl<'a> MergeParams<'a> {
    pub fn new(rules: &'a LongPlugMerge, config: &KernelConfig) -> Self {
        Self {
            rules,
            max_length_ft: config.merge.max_length_ft,
            max_members: config.merge.max_members,
            capacity_divisor: config.materials.capacity_divisor,
            ft3_per_bbl: config.materials.ft3_per_bbl,
        }
    }

    fn is_mergeable_purpose(&self, purpose: RegulatoryPurpose) -> bool {
        let listed = self
            .rules
            .types
            .iter()
            .any(|t| RegulatoryPurpose::parse(t) == Some(purpose));
        let cross = self.rules.cross_type_merge
            && matches!(
                purpose,
                RegulatoryPurpose::SurfaceCasingShoePlug | RegulatoryPurpose::TopPlug
            );
        listed || cross
    }

    /// Slurry ft3 per foot of plug.
    fn area_ft3_per_ft(&self, step: &Step) -> Option<f64> {
        let bore = step.bore_diameter_in()?;
        let inner = step.stinger_od_in.unwrap_or(0.0);
        let bbl_per_ft = annulus_capacity_with(bore, inner, self.capacity_divisor);
        (bbl_per_ft > 0.0).then_some(bbl_per_ft * self.ft3_per_bbl)
    }

    fn sacks_per_ft(&self, step: &Step) -> Option<f64> {
        let area = self.area_ft3_per_ft(step)?;
        let recipe = step.recipe.as_ref().filter(|r| r.is_usable())?;
        let excess = step.annular_excess.unwrap_or(0.0);
        Some(area * (1.0 + excess) / recipe.yield_ft3_per_sk)
    }

    /// Estimated sacks for one step (no depth factor).
    pub fn estimate_sacks(&self, step: &Step) -> Option<f64> {
        if let Some(est) = step.detail_f64(DETAIL_ESTIMATED_SACKS) {
            return Some(est);
        }
        Some(step.length_ft() * self.sacks_per_ft(step)?)
    }

    /// Cement needed to bridge the gap between a buffer bottom and a candidate.
    fn gap_fill(&self, buffer_bottom_ft: f64, candidate: &Step) -> f64 {
        let gap = (candidate.top_ft - buffer_bottom_ft).max(0.0);
        if gap == 0.0 {
            return 0.0;
        }
        self.sacks_per_ft(candidate).map_or(0.0, |per_ft| gap * per_ft)
    }

    fn ceiling(&self, tagged: bool) -> f64 {
        if tagged {
            self.rules.sack_limit_with_tag
        } else {
            self.rules.sack_limit_no_tag
        }
    }
}

fn member_count(step: &Step) -> usize {
    step.details
        .get(DETAIL_MERGED_COUNT)
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(1)
}

fn sort_deepest_first(steps: &mut [Step]) {
    steps.sort_by(|a, b| {
        b.bottom_ft
            .total_cmp(&a.bottom_ft)
            .then_with(|| b.top_ft.total_cmp(&a.top_ft))
    });
}

#[derive(Default)]
struct Buffer {
    members: Vec<Step>,
    sacks: f64,
    count: usize,
}

impl Buffer {
    fn start(step: Step, sacks: f64) -> Self {
        let count = member_count(&step);
        Self {
            members: vec![step],
            sacks,
            count,
        }
    }

    fn top_ft(&self) -> f64 {
        self.members.iter().map(|s| s.top_ft).fold(f64::INFINITY, f64::min)
    }

    fn bottom_ft(&self) -> f64 {
        self.members
            .iter()
            .map(|s| s.bottom_ft)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn tagged(&self) -> bool {
        self.members.iter().any(|s| s.tag_required)
    }

    fn incompatible_with(&self, candidate: &Step) -> bool {
        let Some(ct) = candidate.plug_type else {
            return true;
        };
        self.members
            .iter()
            .filter_map(|m| m.plug_type)
            .any(|mt| mt.incompatible_with(ct))
    }

    fn flush(self, preserve_tagging: bool, out: &mut Vec<Step>) {
        let Buffer {
            mut members,
            sacks,
            count,
        } = self;
        if members.len() == 1 {
            out.append(&mut members);
            return;
        }
        if members.is_empty() {
            return;
        }
        out.push(collapse(members, sacks, count, preserve_tagging));
    }
}

/// Combine buffered members into one `cement_plug`.
fn collapse(members: Vec<Step>, sacks: f64, count: usize, preserve_tagging: bool) -> Step {
    let top = members.iter().map(|s| s.top_ft).fold(f64::INFINITY, f64::min);
    let bottom = members
        .iter()
        .map(|s| s.bottom_ft)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut merged = Step::new(RegulatoryPurpose::CementPlug, top, bottom)
        .with_origin(StepOrigin::Merged)
        .with_citations(members.iter().flat_map(|m| m.regulatory_basis.iter().cloned()));
    merged.id = members.iter().map(|m| m.id).min().unwrap_or(0);
    merged.tag_required = preserve_tagging && members.iter().any(|m| m.tag_required);
    merged.plug_type = members
        .iter()
        .filter_map(|m| m.plug_type)
        .max_by_key(|t| t.precedence());

    let touches_surface = members.iter().any(|m| {
        matches!(
            m.purpose,
            RegulatoryPurpose::SurfaceCasingShoePlug | RegulatoryPurpose::TopPlug
        )
    });
    merged.geometry_context = if touches_surface {
        Some(GeometryContext::CasedSurface)
    } else {
        members.iter().find_map(|m| m.geometry_context)
    };
    merged.casing_id_in = members.iter().find_map(|m| m.casing_id_in);
    merged.hole_size_in = members.iter().find_map(|m| m.hole_size_in);
    merged.stinger_od_in = members.iter().find_map(|m| m.stinger_od_in);
    merged.stinger_id_in = members.iter().find_map(|m| m.stinger_id_in);
    merged.annular_excess = members.iter().find_map(|m| m.annular_excess);
    merged.recipe = members.iter().find_map(|m| m.recipe.clone());

    let mut instructions: Vec<&str> = Vec::new();
    for text in members.iter().filter_map(|m| m.special_instructions.as_deref()) {
        if !instructions.contains(&text) {
            instructions.push(text);
        }
    }
    if !instructions.is_empty() {
        merged.special_instructions = Some(instructions.join(" "));
    }

    let mut trace = Vec::new();
    for m in &members {
        match m.details.get(DETAIL_MERGED_FROM).and_then(serde_json::Value::as_array) {
            Some(inner) => trace.extend(inner.iter().cloned()),
            None => trace.push(json!({
                "id": m.id,
                "type": m.purpose.as_str(),
                "top_ft": m.top_ft,
                "bottom_ft": m.bottom_ft,
                "formation": m.formation,
            })),
        }
    }
    merged.set_detail(DETAIL_MERGED, true);
    merged.set_detail(DETAIL_MERGED_FROM, trace);
    merged.set_detail(DETAIL_MERGED_COUNT, count);
    merged.set_detail(DETAIL_ESTIMATED_SACKS, sacks);
    merged
}

/// Merge adjacent compatible plugs. Output is ordered deepest first.
pub fn merge_plugs(steps: Vec<Step>, params: &MergeParams<'_>) -> Vec<Step> {
    let mut steps = steps;
    if !params.rules.enabled {
        sort_deepest_first(&mut steps);
        return steps;
    }

    let (mut candidates, mut out): (Vec<Step>, Vec<Step>) = steps.into_iter().partition(|s| {
        (params.is_mergeable_purpose(s.purpose) || s.detail_flag(DETAIL_MERGED))
            && s.plug_type.is_some()
            && s.top_ft.is_finite()
            && s.bottom_ft.is_finite()
            && params.estimate_sacks(s).is_some()
    });
    candidates.sort_by(|a, b| {
        a.top_ft
            .total_cmp(&b.top_ft)
            .then_with(|| a.bottom_ft.total_cmp(&b.bottom_ft))
    });

    let preserve = params.rules.preserve_tagging;
    let mut buffer = Buffer::default();
    for candidate in candidates {
        let sacks = params.estimate_sacks(&candidate).unwrap_or(0.0);
        if buffer.members.is_empty() {
            buffer = Buffer::start(candidate, sacks);
            continue;
        }
        if !buffer.incompatible_with(&candidate) {
            let combined_sacks = buffer.sacks + params.gap_fill(buffer.bottom_ft(), &candidate) + sacks;
            let combined_len =
                buffer.bottom_ft().max(candidate.bottom_ft) - buffer.top_ft().min(candidate.top_ft);
            let combined_count = buffer.count + member_count(&candidate);
            let ceiling = params.ceiling(buffer.tagged() || candidate.tag_required);

            if combined_sacks <= ceiling + SACK_EPS
                && combined_len <= params.max_length_ft
                && combined_count <= params.max_members
            {
                buffer.members.push(candidate);
                buffer.sacks = combined_sacks;
                buffer.count = combined_count;
                continue;
            }
        }
        std::mem::take(&mut buffer).flush(preserve, &mut out);
        buffer = Buffer::start(candidate, sacks);
    }
    buffer.flush(preserve, &mut out);

    sort_deepest_first(&mut out);
    out
}

pub struct MergeLongPlugs;

impl Stage for MergeLongPlugs {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let params = MergeParams::new(&ctx.policy.preferences.long_plug_merge, ctx.config);
        let before = draft.steps.len();
        draft.steps = merge_plugs(std::mem::take(&mut draft.steps), &params);
        let merged = draft.steps.iter().filter(|s| s.detail_flag(DETAIL_MERGED)).count();
        debug!(before, after = draft.steps.len(), merged, "Long-plug merge complete");
        draft.trace(
            self.name(),
            format!("{before} step(s) in, {} out, {merged} merged plug(s)", draft.steps.len()),
        );
        Ok(draft)
    }
}
