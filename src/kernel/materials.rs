//! Materials calculator
//!
//! Prices every cement-bearing step in barrels, cubic feet and sacks.
//!
//! | Placement | Volume |
//! |-----------|--------|
//! | generic (spot / dumbbell) | length × annulus(bore, stinger) × (1+excess) × depth factor |
//! | perforate & squeeze | perf length × squeeze annulus × depth factor + cap × inside capacity × cap multiplier |
//! | merged squeeze | per casing segment, each priced with its local context |
//! | perforate & circulate | length × annulus × depth factor × top-off, sacks to the nearest increment |
//!
//! Steps whose geometry cannot be resolved keep `materials = None` and
//! `sacks = None` with `details.calculation_gap` explaining why.

use super::casing_context::{CasingContextKind, CasingResolver};
use super::generators::squeeze_cap_ft;
use super::merge::DETAIL_MERGED;
use super::stage::{Stage, StageError, StageKind};
use super::{round_to, KernelContext, PlanDraft};
use crate::config::MaterialsConfig;
use crate::geometry::{
    annulus_capacity_with, checked_diameter, cylinder_capacity_with, texas_factor_with,
    GeometryError,
};
use crate::types::{
    Materials, MechanicalType, RegulatoryPurpose, Rounding, SlurryRecipe, SlurryVolume,
    SqueezeSpec, Step,
};
use tracing::{debug, warn};

pub const DETAIL_CALCULATION_GAP: &str = "calculation_gap";
pub const DETAIL_ORIGINAL_SACKS: &str = "original_sacks";
pub const DETAIL_EXPANDED_FOR_MINIMUM: &str = "expanded_for_minimum";
pub const DETAIL_SACKS_OVERRIDE: &str = "sacks_override";
pub const FINDING_CALCULATION_GAP: &str = "calculation_gap";

const GAL_PER_BBL: f64 = 42.0;

enum PriceError {
    /// Geometry missing; the step is emitted without materials
    Gap(String),
    Fatal(StageError),
}

impl From<GeometryError> for PriceError {
    fn from(e: GeometryError) -> Self {
        PriceError::Fatal(StageError::Geometry(e))
    }
}

fn gap(reason: impl Into<String>) -> PriceError {
    PriceError::Gap(reason.into())
}

#[derive(Debug, Clone, Copy)]
enum SackRounding {
    Recipe(Rounding),
    Increment(u32),
}

impl SackRounding {
    fn apply(self, raw: f64) -> f64 {
        match self {
            SackRounding::Recipe(r) => r.apply(raw),
            SackRounding::Increment(n) => {
                let n = f64::from(n.max(1));
                (raw / n).round() * n
            }
        }
    }
}

struct Priced {
    bbl: f64,
    explain: String,
    rounding: SackRounding,
}

struct Pricer<'a> {
    cfg: &'a MaterialsConfig,
    resolver: CasingResolver<'a>,
    /// Cap above the perforations when a squeeze step carries no spec
    cap_length_ft: f64,
}

impl<'a> Pricer<'a> {
    fn depth_factor(&self, bottom_ft: f64) -> f64 {
        texas_factor_with(bottom_ft, self.cfg.texas_excess_per_kft)
    }

    fn annulus(&self, outer_id_in: f64, inner_od_in: f64) -> f64 {
        annulus_capacity_with(outer_id_in, inner_od_in, self.cfg.capacity_divisor)
    }

    fn required(what: &'static str, value: Option<f64>) -> Result<f64, PriceError> {
        let v = value.ok_or_else(|| gap(format!("{what} unknown")))?;
        Ok(checked_diameter(what, v)?)
    }

    fn stinger_od(step: &Step) -> Result<f64, PriceError> {
        Ok(step
            .stinger_od_in
            .map(|d| checked_diameter("stinger OD", d))
            .transpose()?
            .unwrap_or(0.0))
    }

    fn price(&self, step: &Step) -> Result<Priced, PriceError> {
        let circulates = step.purpose.circulates_to_surface()
            || step.plug_type == Some(MechanicalType::PerfAndCirculatePlug);
        if circulates {
            return self.circulation(step);
        }
        if step.plug_type == Some(MechanicalType::PerfAndSqueezePlug) {
            let rounding = SackRounding::Recipe(
                step.recipe
                    .as_ref()
                    .and_then(|r| r.rounding)
                    .unwrap_or(Rounding::Up),
            );
            let (bbl, explain) = if step.detail_flag(DETAIL_MERGED) && step.squeeze.is_none() {
                self.segmented_squeeze(step)?
            } else {
                self.squeeze(step)?
            };
            return Ok(Priced { bbl, explain, rounding });
        }
        self.generic(step)
    }

    fn generic(&self, step: &Step) -> Result<Priced, PriceError> {
        let what = if step.is_open_hole() { "hole size" } else { "casing ID" };
        let bore = Self::required(what, step.bore_diameter_in())?;
        let stinger = Self::stinger_od(step)?;
        let capacity = self.annulus(bore, stinger);
        if capacity <= 0.0 {
            return Err(gap(format!("stinger {stinger}\" fills bore {bore}\"")));
        }
        let excess = step.annular_excess.unwrap_or(0.0);
        if !excess.is_finite() || excess < 0.0 {
            return Err(PriceError::Fatal(StageError::invalid_step(
                step,
                format!("annular excess must be >= 0 (got {excess})"),
            )));
        }
        let tf = self.depth_factor(step.bottom_ft);
        let len = step.length_ft();
        Ok(Priced {
            bbl: len * capacity * (1.0 + excess) * tf,
            explain: format!(
                "{len:.0} ft x {capacity:.4} bbl/ft ({bore}\" bore, {stinger}\" stinger) x {:.2} excess x {tf:.2} depth factor",
                1.0 + excess
            ),
            rounding: SackRounding::Recipe(
                step.recipe
                    .as_ref()
                    .and_then(|r| r.rounding)
                    .unwrap_or(Rounding::Nearest),
            ),
        })
    }

    fn squeeze(&self, step: &Step) -> Result<(f64, String), PriceError> {
        let spec = step.squeeze.unwrap_or(SqueezeSpec {
            perf_top_ft: step.top_ft,
            perf_bottom_ft: step.bottom_ft,
            cap_length_ft: self.cap_length_ft,
        });
        let mid = (spec.perf_top_ft + spec.perf_bottom_ft) / 2.0;
        let context = self.resolver.casing_context_at_depth(mid);
        let (squeeze_cap, target) = match context.squeeze_annulus().or(step.annulus) {
            Some(ann) => {
                let outer = checked_diameter("annulus outer ID", ann.outer_id_in)?;
                let inner = checked_diameter("annulus inner OD", ann.inner_od_in)?;
                (self.annulus(outer, inner), format!("{outer}\" x {inner}\""))
            }
            None if context.kind == CasingContextKind::OpenHole => {
                let hole = Self::required(
                    "hole size",
                    self.resolver.step_geometry(mid).hole_size_in.or(step.hole_size_in),
                )?;
                (
                    cylinder_capacity_with(hole, self.cfg.capacity_divisor),
                    format!("{hole}\" open hole"),
                )
            }
            None => return Err(gap(format!("no squeeze annulus at {mid:.0} ft"))),
        };
        let tf = self.depth_factor(step.bottom_ft);
        let squeeze_bbl = spec.perf_length_ft() * squeeze_cap * tf;

        let what = if step.is_open_hole() { "hole size" } else { "casing ID" };
        let bore = Self::required(what, step.bore_diameter_in())?;
        let stinger = Self::stinger_od(step)?;
        let inside_cap = self.annulus(bore, stinger);
        let cap_bbl = spec.cap_length_ft * inside_cap * self.cfg.squeeze_cap_multiplier;
        if squeeze_bbl + cap_bbl <= 0.0 {
            return Err(gap("squeeze geometry has no capacity"));
        }

        let explain = format!(
            "squeeze {:.0} ft x {squeeze_cap:.4} bbl/ft ({target}) x {tf:.2} depth factor + cap {:.0} ft x {inside_cap:.4} bbl/ft x {}",
            spec.perf_length_ft(),
            spec.cap_length_ft,
            self.cfg.squeeze_cap_multiplier
        );
        Ok((squeeze_bbl + cap_bbl, explain))
    }

    /// Merged squeeze plugs crossing shoes or TOCs: each segment is priced
    /// with the casing context at its midpoint.
    fn segmented_squeeze(&self, step: &Step) -> Result<(f64, String), PriceError> {
        let mut cuts = vec![step.top_ft];
        cuts.extend(
            self.resolver
                .boundaries()
                .into_iter()
                .filter(|b| *b > step.top_ft && *b < step.bottom_ft),
        );
        cuts.push(step.bottom_ft);

        let mut bbl = 0.0;
        let mut parts = Vec::new();
        for w in cuts.windows(2) {
            let (top, bottom) = (w[0], w[1]);
            if bottom <= top {
                continue;
            }
            let mid = (top + bottom) / 2.0;
            let context = self.resolver.casing_context_at_depth(mid);
            let capacity = match context.kind {
                CasingContextKind::OpenHole => {
                    let hole = Self::required(
                        "hole size",
                        self.resolver.step_geometry(mid).hole_size_in.or(step.hole_size_in),
                    )?;
                    cylinder_capacity_with(hole, self.cfg.capacity_divisor)
                }
                _ => {
                    let ann = context
                        .squeeze_annulus()
                        .ok_or_else(|| gap(format!("no squeeze annulus at {mid:.0} ft")))?;
                    self.annulus(
                        checked_diameter("annulus outer ID", ann.outer_id_in)?,
                        checked_diameter("annulus inner OD", ann.inner_od_in)?,
                    )
                }
            };
            let tf = self.depth_factor(bottom);
            bbl += (bottom - top) * capacity * tf;
            parts.push(format!("{top:.0}-{bottom:.0} ft @ {capacity:.4} bbl/ft x {tf:.2}"));
        }
        if bbl <= 0.0 {
            return Err(gap("merged squeeze has no capacity"));
        }
        Ok((bbl, format!("segmented squeeze: {}", parts.join("; "))))
    }

    fn circulation(&self, step: &Step) -> Result<Priced, PriceError> {
        let ann = step
            .annulus
            .or_else(|| {
                self.resolver
                    .casing_context_at_depth(step.bottom_ft)
                    .squeeze_annulus()
            })
            .ok_or_else(|| gap("no annulus geometry for circulation"))?;
        let outer = checked_diameter("annulus outer ID", ann.outer_id_in)?;
        let inner = checked_diameter("annulus inner OD", ann.inner_od_in)?;
        let capacity = self.annulus(outer, inner);
        if capacity <= 0.0 {
            return Err(gap(format!("annulus {outer}\" x {inner}\" has no capacity")));
        }
        let tf = self.depth_factor(step.bottom_ft);
        let len = step.length_ft();
        let topoff = self.cfg.perf_circulate_topoff;
        Ok(Priced {
            bbl: len * capacity * tf * topoff,
            explain: format!(
                "{len:.0} ft x {capacity:.4} bbl/ft ({outer}\" x {inner}\") x {tf:.2} depth factor x {topoff} top-off"
            ),
            rounding: SackRounding::Increment(self.cfg.perf_circulate_sack_increment),
        })
    }

    /// Price one step in place.
    fn materials_for(&self, step: &mut Step) -> Result<(), PriceError> {
        let recipe = step
            .recipe
            .clone()
            .ok_or_else(|| gap("no slurry recipe"))?;
        if !recipe.is_usable() {
            return Err(GeometryError::InvalidYield(recipe.yield_ft3_per_sk).into());
        }
        let y = recipe.yield_ft3_per_sk;

        if let Some(n) = step
            .details
            .get(DETAIL_SACKS_OVERRIDE)
            .and_then(serde_json::Value::as_u64)
        {
            let sacks = u32::try_from(n).unwrap_or(u32::MAX);
            let ft3 = f64::from(sacks) * y;
            self.attach(step, &recipe, sacks, ft3, "caller-supplied sack count".to_string());
            return Ok(());
        }

        let mut priced = self.price(step)?;
        let mut ft3 = priced.bbl * self.cfg.ft3_per_bbl;
        let mut sacks = priced.rounding.apply(ft3 / y);
        let minimum = f64::from(self.cfg.minimum_sacks);

        if sacks < minimum && !step.purpose.is_minimum_exempt() {
            if step.purpose == RegulatoryPurpose::FormationTopPlug
                && !step.detail_flag(DETAIL_MERGED)
                && step.squeeze.is_none()
                && ft3 > 0.0
                && step.length_ft() > 0.0
            {
                let per_ft = ft3 / y / step.length_ft();
                expand_symmetric(step, minimum / per_ft);
                priced = self.price(step)?;
                ft3 = priced.bbl * self.cfg.ft3_per_bbl;
                sacks = priced.rounding.apply(ft3 / y);
            }
            if sacks < minimum {
                step.set_detail(DETAIL_ORIGINAL_SACKS, sacks);
                priced
                    .explain
                    .push_str(&format!("; raised from {sacks:.0} to {minimum:.0} sack minimum"));
                sacks = minimum;
                ft3 = minimum * y;
            }
        }

        self.attach(step, &recipe, sacks.max(0.0) as u32, ft3, priced.explain);
        Ok(())
    }

    fn attach(&self, step: &mut Step, recipe: &SlurryRecipe, sacks: u32, ft3: f64, explain: String) {
        let slurry = SlurryVolume {
            total_bbl: round_to(ft3 / self.cfg.ft3_per_bbl, 2),
            ft3: round_to(ft3, 2),
            sacks,
            water_bbl: round_to(f64::from(sacks) * recipe.water_gal_per_sk / GAL_PER_BBL, 2),
            additives: recipe.additives.clone(),
            explain,
        };
        step.sacks = Some(sacks);
        step.materials = Some(Materials { slurry });
    }
}

/// Widen an interval about its centre to at least `length_ft`, clamped at
/// surface. Endpoints snap outward to whole feet.
fn expand_symmetric(step: &mut Step, length_ft: f64) {
    if length_ft <= step.length_ft() {
        return;
    }
    let (top, bottom) = (step.top_ft, step.bottom_ft);
    let centre = (top + bottom) / 2.0;
    let new_top = (centre - length_ft / 2.0).max(0.0).floor();
    step.top_ft = new_top;
    step.bottom_ft = (new_top + length_ft).max(centre + length_ft / 2.0).ceil();
    step.set_detail(DETAIL_EXPANDED_FOR_MINIMUM, true);
    step.set_detail("original_top_ft", top);
    step.set_detail("original_bottom_ft", bottom);
}

pub struct CalculateMaterials;

impl Stage for CalculateMaterials {
    fn name(&self) -> &'static str {
        "materials"
    }

    fn kind(&self) -> StageKind {
        StageKind::Core
    }

    fn apply(&self, ctx: &KernelContext<'_>, mut draft: PlanDraft) -> Result<PlanDraft, StageError> {
        let pricer = Pricer {
            cfg: &ctx.config.materials,
            resolver: ctx.casing(),
            cap_length_ft: squeeze_cap_ft(ctx),
        };

        let mut gaps: Vec<(u32, RegulatoryPurpose, String)> = Vec::new();
        let mut priced = 0usize;
        for step in &mut draft.steps {
            step.materials = None;
            step.sacks = None;
            if !step.purpose.is_cement_bearing() {
                continue;
            }
            match pricer.materials_for(step) {
                Ok(()) => priced += 1,
                Err(PriceError::Gap(reason)) => {
                    warn!(step = step.id, purpose = %step.purpose, %reason, "Calculation gap");
                    step.set_detail(DETAIL_CALCULATION_GAP, reason.as_str());
                    gaps.push((step.id, step.purpose, reason));
                }
                Err(PriceError::Fatal(e)) => return Err(e),
            }
        }

        for (id, purpose, reason) in &gaps {
            draft.finding(
                self.name(),
                FINDING_CALCULATION_GAP,
                format!("step {id} ({purpose}) has no materials: {reason}"),
            );
        }
        debug!(priced, gaps = gaps.len(), "Materials calculated");
        draft.trace(
            self.name(),
            format!("{priced} step(s) priced, {} calculation gap(s)", gaps.len()),
        );
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::geometry::StandardPipeSpecs;
    use crate::types::{AnnulusGeometry, CasingStringFact, GeometryContext, Policy, WellFacts};

    fn casing(name: &str, od: f64, weight: f64, bottom: f64, hole: f64, toc: f64) -> CasingStringFact {
        CasingStringFact {
            name: name.to_string(),
            od_in: od,
            weight_ppf: Some(weight),
            id_in: None,
            top_ft: 0.0,
            bottom_ft: bottom,
            hole_size_in: Some(hole),
            cement_top_ft: Some(toc),
            cement_status: None,
        }
    }

    fn well() -> WellFacts {
        WellFacts {
            casing_strings: vec![
                casing("surface", 13.375, 48.0, 1200.0, 17.5, 0.0),
                casing("intermediate", 9.625, 40.0, 4500.0, 12.25, 2500.0),
                casing("production", 5.5, 17.0, 9500.0, 8.75, 6000.0),
            ],
            production_shoe_ft: Some(9500.0),
            ..WellFacts::default()
        }
    }

    fn cased(purpose: RegulatoryPurpose, top: f64, bottom: f64, plug_type: MechanicalType) -> Step {
        let mut s = Step::new(purpose, top, bottom);
        s.id = 1;
        s.plug_type = Some(plug_type);
        s.geometry_context = Some(GeometryContext::CasedProduction);
        s.casing_id_in = Some(4.892);
        s.recipe = Some(SlurryRecipe::class_h_fallback());
        s
    }

    fn run(facts: &WellFacts, steps: Vec<Step>) -> PlanDraft {
        let policy = Policy::default();
        let config = KernelConfig::default();
        let specs = StandardPipeSpecs::default();
        let ctx = KernelContext::new(facts, &policy, &config, &specs);
        let mut draft = PlanDraft::default();
        for s in steps {
            draft.push(s);
        }
        CalculateMaterials.apply(&ctx, draft).expect("materials")
    }

    #[test]
    fn test_generic_plug_bumped_to_minimum() {
        // 100 ft x 0.02325 bbl/ft x 1.6 = 3.72 bbl = 20.9 ft3 = 17.7 sk
        let draft = run(
            &well(),
            vec![cased(RegulatoryPurpose::CementPlug, 5000.0, 5100.0, MechanicalType::SpotPlug)],
        );
        let step = &draft.steps[0];
        assert_eq!(step.sacks, Some(25));
        assert_eq!(step.detail_f64(DETAIL_ORIGINAL_SACKS), Some(18.0));
        let slurry = &step.materials.as_ref().expect("materials").slurry;
        assert!((slurry.ft3 - 29.5).abs() < 1e-9);
        assert!(slurry.explain.contains("sack minimum"));
    }

    #[test]
    fn test_formation_plug_expands_instead_of_bumping() {
        let mut step = cased(RegulatoryPurpose::FormationTopPlug, 5000.0, 5100.0, MechanicalType::SpotPlug);
        step.formation = Some("San Andres".to_string());
        let draft = run(&well(), vec![step]);
        let step = &draft.steps[0];
        assert!(step.detail_flag(DETAIL_EXPANDED_FOR_MINIMUM));
        assert!(step.length_ft() > 100.0);
        assert!(((step.top_ft + step.bottom_ft) / 2.0 - 5050.0).abs() <= 1.0);
        assert_eq!(step.sacks, Some(25));
        assert!(step.details.get(DETAIL_ORIGINAL_SACKS).is_none());
    }

    #[test]
    fn test_exempt_cap_is_not_bumped() {
        let draft = run(
            &well(),
            vec![cased(RegulatoryPurpose::CibpCap, 4980.0, 5000.0, MechanicalType::DumbbellPlug)],
        );
        let sacks = draft.steps[0].sacks.expect("sacks");
        assert!(sacks < 25);
    }

    #[test]
    fn test_circulation_rounds_to_increment() {
        let mut step = cased(
            RegulatoryPurpose::PerfCirculateToSurface,
            0.0,
            1250.0,
            MechanicalType::PerfAndCirculatePlug,
        );
        step.annulus = Some(AnnulusGeometry {
            outer_id_in: 12.615,
            inner_od_in: 9.625,
        });
        let draft = run(&well(), vec![step]);
        let sacks = draft.steps[0].sacks.expect("sacks");
        assert_eq!(sacks % 5, 0);
        assert!(sacks > 100);
    }

    #[test]
    fn test_squeeze_rounds_up_and_includes_cap() {
        let mut step = cased(RegulatoryPurpose::SqueezeViaPerf, 2950.0, 3050.0, MechanicalType::PerfAndSqueezePlug);
        step.squeeze = Some(SqueezeSpec {
            perf_top_ft: 3000.0,
            perf_bottom_ft: 3050.0,
            cap_length_ft: 50.0,
        });
        let draft = run(&well(), vec![step]);
        let slurry = &draft.steps[0].materials.as_ref().expect("materials").slurry;
        assert!(slurry.explain.starts_with("squeeze 50 ft"));
        assert!(slurry.explain.contains("cap 50 ft"));
        assert!(draft.steps[0].sacks.expect("sacks") >= 25);
    }

    #[test]
    fn test_squeeze_without_spec_uses_configured_cap() {
        let step = cased(RegulatoryPurpose::CementPlug, 4150.0, 4250.0, MechanicalType::PerfAndSqueezePlug);
        let draft = run(&well(), vec![step]);
        let explain = &draft.steps[0].materials.as_ref().expect("materials").slurry.explain;
        assert!(explain.starts_with("squeeze 100 ft"));
        assert!(explain.contains("cap 50 ft"));
    }

    #[test]
    fn test_open_hole_squeeze_priced_from_hole_size() {
        let facts = WellFacts {
            casing_strings: vec![casing("production", 5.5, 17.0, 9000.0, 7.875, 6000.0)],
            ..WellFacts::default()
        };
        let mut step = Step::new(RegulatoryPurpose::ProductiveHorizonIsolationPlug, 9450.0, 9500.0);
        step.plug_type = Some(MechanicalType::PerfAndSqueezePlug);
        step.geometry_context = Some(GeometryContext::OpenHole);
        step.hole_size_in = Some(7.875);
        step.recipe = Some(SlurryRecipe::class_h_fallback());

        // 50 ft x 0.06024 x 2.0 + 50 ft x 0.06024 x 1.4 = 10.24 bbl = 48.7 sk
        let draft = run(&facts, vec![step]);
        let step = &draft.steps[0];
        assert_eq!(step.sacks, Some(49));
        assert!(!step.details.contains_key(DETAIL_CALCULATION_GAP));
        let explain = &step.materials.as_ref().expect("materials").slurry.explain;
        assert!(explain.contains("open hole"));
    }

    #[test]
    fn test_merged_squeeze_is_segmented() {
        let mut step = cased(RegulatoryPurpose::CementPlug, 4400.0, 4600.0, MechanicalType::PerfAndSqueezePlug);
        step.set_detail(DETAIL_MERGED, true);
        let draft = run(&well(), vec![step]);
        let explain = &draft.steps[0].materials.as_ref().expect("materials").slurry.explain;
        assert!(explain.starts_with("segmented squeeze"));
        assert!(explain.contains("4400-4500 ft"));
        assert!(explain.contains("4500-4600 ft"));
    }

    #[test]
    fn test_missing_geometry_is_a_gap() {
        let mut step = Step::new(RegulatoryPurpose::CementPlug, 100.0, 200.0);
        step.plug_type = Some(MechanicalType::SpotPlug);
        step.recipe = Some(SlurryRecipe::class_h_fallback());
        let draft = run(&WellFacts::default(), vec![step]);
        assert_eq!(draft.steps[0].sacks, None);
        assert!(draft.steps[0].materials.is_none());
        assert!(draft.steps[0].details.contains_key(DETAIL_CALCULATION_GAP));
        assert_eq!(draft.findings[0].code, FINDING_CALCULATION_GAP);
    }

    #[test]
    fn test_sacks_override_bypasses_calculation() {
        let mut step = cased(RegulatoryPurpose::SqueezeViaPerf, 2950.0, 3050.0, MechanicalType::PerfAndSqueezePlug);
        step.set_detail(DETAIL_SACKS_OVERRIDE, 40);
        let draft = run(&well(), vec![step]);
        assert_eq!(draft.steps[0].sacks, Some(40));
    }

    #[test]
    fn test_invalid_casing_id_is_fatal() {
        let mut step = cased(RegulatoryPurpose::CementPlug, 5000.0, 5100.0, MechanicalType::SpotPlug);
        step.casing_id_in = Some(-1.0);
        let policy = Policy::default();
        let config = KernelConfig::default();
        let specs = StandardPipeSpecs::default();
        let facts = well();
        let ctx = KernelContext::new(&facts, &policy, &config, &specs);
        let mut draft = PlanDraft::default();
        draft.push(step);
        assert!(matches!(
            CalculateMaterials.apply(&ctx, draft),
            Err(StageError::Geometry(GeometryError::InvalidDiameter { .. }))
        ));
    }
}
