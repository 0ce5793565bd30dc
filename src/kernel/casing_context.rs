//! Casing context decision tree
//!
//! Answers, for any depth: which strings are in the hole, which annuli are
//! still open to cement, and whether a plug there has to be placed by
//! perforating and squeezing.

use crate::config::GeometryConfig;
use crate::geometry::{resolve_casing_id, IdSource, PipeSpecLookup};
use crate::types::{AnnulusGeometry, CasingStringFact, CementStatus, GeometryContext, WellFacts};
use serde::Serialize;

/// A casing string present at the queried depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveCasing {
    pub name: String,
    pub od_in: f64,
    pub id_in: f64,
    #[serde(skip)]
    pub id_source: IdSource,
    pub top_ft: f64,
    pub bottom_ft: f64,
    pub hole_size_in: Option<f64>,
    pub cement_top_ft: Option<f64>,
    pub cement_status: CementStatus,
}

impl ActiveCasing {
    fn role(&self) -> GeometryContext {
        let name = self.name.to_ascii_lowercase();
        if name.contains("surface") || name.contains("conductor") {
            GeometryContext::CasedSurface
        } else if name.contains("intermediate") {
            GeometryContext::CasedIntermediate
        } else {
            GeometryContext::CasedProduction
        }
    }
}

/// An annulus cement can still be pumped into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAnnulus {
    pub inner: String,
    /// `None` when the outer wall is open hole
    pub outer: Option<String>,
    pub inner_od_in: f64,
    pub outer_id_in: Option<f64>,
    pub inner_status: CementStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CasingContextKind {
    OpenHole,
    OpenHoleSqueeze,
    AnnulusSqueeze,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CasingContext {
    pub kind: CasingContextKind,
    pub inner: Option<ActiveCasing>,
    pub outer: Option<ActiveCasing>,
    pub count: usize,
}

impl CasingContext {
    /// Annulus a squeeze at this depth pushes cement into.
    pub fn squeeze_annulus(&self) -> Option<AnnulusGeometry> {
        match self.kind {
            CasingContextKind::OpenHole => None,
            CasingContextKind::OpenHoleSqueeze => {
                let inner = self.inner.as_ref()?;
                Some(AnnulusGeometry {
                    outer_id_in: inner.hole_size_in?,
                    inner_od_in: inner.od_in,
                })
            }
            CasingContextKind::AnnulusSqueeze => {
                let inner = self.inner.as_ref()?;
                let outer = self.outer.as_ref()?;
                Some(AnnulusGeometry {
                    outer_id_in: outer.id_in,
                    inner_od_in: inner.od_in,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerforationDecision {
    pub required: bool,
    pub context: CasingContextKind,
    pub reason: String,
}

/// Geometry attached to a step placed at a given depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepGeometry {
    pub context: GeometryContext,
    pub casing_id_in: Option<f64>,
    pub hole_size_in: Option<f64>,
}

/// Casing queries bound to one well.
pub struct CasingResolver<'a> {
    facts: &'a WellFacts,
    lookup: &'a dyn PipeSpecLookup,
    geometry: &'a GeometryConfig,
}

impl<'a> CasingResolver<'a> {
    pub fn new(
        facts: &'a WellFacts,
        lookup: &'a dyn PipeSpecLookup,
        geometry: &'a GeometryConfig,
    ) -> Self {
        Self {
            facts,
            lookup,
            geometry,
        }
    }

    /// Cement top for a string, falling back to the well-level TOC facts.
    fn cement_top(&self, casing: &CasingStringFact) -> Option<f64> {
        casing.cement_top_ft.or_else(|| {
            let name = casing.name.to_ascii_lowercase();
            if name.contains("production") {
                self.facts.production_casing_toc_ft
            } else if name.contains("intermediate") {
                self.facts.intermediate_casing_toc_ft
            } else {
                None
            }
        })
    }

    fn status_at(&self, casing: &CasingStringFact, cement_top: Option<f64>, depth_ft: f64) -> CementStatus {
        if let Some(explicit) = casing.cement_status {
            return explicit;
        }
        match cement_top {
            None => CementStatus::Uncemented,
            Some(top) if top <= 0.0 => CementStatus::FullyCemented,
            Some(top) if top > depth_ft => CementStatus::Uncemented,
            Some(_) => CementStatus::Cemented,
        }
    }

    fn resolve(&self, casing: &CasingStringFact, depth_ft: f64) -> ActiveCasing {
        let (id_in, id_source) = resolve_casing_id(
            self.lookup,
            casing.od_in,
            casing.weight_ppf,
            casing.id_in,
            self.geometry.od_match_tolerance_in,
            self.geometry.fallback_casing_id_in,
        );
        let cement_top_ft = self.cement_top(casing);
        ActiveCasing {
            name: casing.name.clone(),
            od_in: casing.od_in,
            id_in,
            id_source,
            top_ft: casing.top_ft,
            bottom_ft: casing.bottom_ft,
            hole_size_in: casing.hole_size_in,
            cement_top_ft,
            cement_status: self.status_at(casing, cement_top_ft, depth_ft),
        }
    }

    /// A named string ("surface", "intermediate", ...) resolved at its shoe.
    pub fn named(&self, needle: &str) -> Option<ActiveCasing> {
        let casing = self.facts.casing_named(needle)?;
        Some(self.resolve(casing, casing.bottom_ft))
    }

    /// Strings present at `depth_ft`, innermost (smallest OD) first.
    pub fn active_casing_stack(&self, depth_ft: f64) -> Vec<ActiveCasing> {
        let mut stack: Vec<ActiveCasing> = self
            .facts
            .casing_strings
            .iter()
            .filter(|c| c.bottom_ft >= depth_ft && c.top_ft <= depth_ft)
            .map(|c| self.resolve(c, depth_ft))
            .collect();
        stack.sort_by(|a, b| a.od_in.total_cmp(&b.od_in).then_with(|| a.name.cmp(&b.name)));
        stack
    }

    /// Annuli cement can still reach at `depth_ft`, innermost first.
    ///
    /// A pair is listed only when its inner member is not cemented there;
    /// cement cannot flow through an annulus that is already full.
    pub fn uncemented_annuli(&self, depth_ft: f64) -> Vec<OpenAnnulus> {
        let stack = self.active_casing_stack(depth_ft);
        stack
            .iter()
            .enumerate()
            .filter(|(_, inner)| !inner.cement_status.is_cemented())
            .map(|(i, inner)| {
                let outer = stack.get(i + 1);
                OpenAnnulus {
                    inner: inner.name.clone(),
                    outer: outer.map(|o| o.name.clone()),
                    inner_od_in: inner.od_in,
                    outer_id_in: outer.map(|o| o.id_in).or(inner.hole_size_in),
                    inner_status: inner.cement_status,
                }
            })
            .collect()
    }

    pub fn casing_context_at_depth(&self, depth_ft: f64) -> CasingContext {
        let mut stack = self.active_casing_stack(depth_ft);
        let count = stack.len();
        let kind = match count {
            0 => CasingContextKind::OpenHole,
            1 => CasingContextKind::OpenHoleSqueeze,
            _ => CasingContextKind::AnnulusSqueeze,
        };
        let mut innermost = stack.drain(..).take(2);
        let inner = innermost.next();
        let outer = innermost.next();
        CasingContext {
            kind,
            inner,
            outer,
            count,
        }
    }

    /// Whether a plug over [top, bottom] must perforate to reach the annulus.
    pub fn requires_perforation(&self, top_ft: f64, bottom_ft: f64) -> PerforationDecision {
        let ctx = self.casing_context_at_depth(top_ft);
        let decision = |required: bool, reason: &str| PerforationDecision {
            required,
            context: ctx.kind,
            reason: reason.to_string(),
        };

        let Some(inner) = ctx.inner.as_ref() else {
            return decision(false, "open hole: cement contacts formation directly");
        };
        if self.facts.is_open_hole {
            return decision(false, "well flagged as open-hole completion");
        }
        if inner.cement_top_ft.is_some_and(|toc| toc <= bottom_ft) {
            return decision(false, "cement documented behind casing at/above interval bottom");
        }
        if self
            .facts
            .perforations
            .iter()
            .any(|p| p.overlaps(top_ft, bottom_ft))
        {
            return decision(false, "existing perforations already open the interval");
        }
        decision(
            true,
            &format!(
                "no cement documented behind {} across {:.0}-{:.0} ft",
                inner.name, top_ft, bottom_ft
            ),
        )
    }

    /// Production casing top of cement.
    pub fn production_toc_ft(&self) -> Option<f64> {
        if let Some(toc) = self.facts.production_casing_toc_ft {
            return Some(toc);
        }
        if let Some(toc) = self
            .facts
            .casing_named("production")
            .and_then(|c| c.cement_top_ft)
        {
            return Some(toc);
        }
        let shoe = self.facts.production_shoe_ft?;
        self.active_casing_stack(shoe)
            .first()
            .and_then(|c| c.cement_top_ft)
    }

    /// Context, bore ID and hole size for a step placed at `depth_ft`.
    pub fn step_geometry(&self, depth_ft: f64) -> StepGeometry {
        let stack = self.active_casing_stack(depth_ft);
        match stack.first() {
            Some(inner) => StepGeometry {
                context: inner.role(),
                casing_id_in: Some(inner.id_in),
                hole_size_in: inner.hole_size_in,
            },
            None => StepGeometry {
                context: GeometryContext::OpenHole,
                casing_id_in: None,
                hole_size_in: self.open_hole_size(depth_ft),
            },
        }
    }

    /// Hole size below the deepest casing shoe shallower than `depth_ft`.
    fn open_hole_size(&self, depth_ft: f64) -> Option<f64> {
        self.facts
            .casing_strings
            .iter()
            .filter(|c| c.bottom_ft <= depth_ft)
            .max_by(|a, b| a.bottom_ft.total_cmp(&b.bottom_ft))
            .and_then(|c| c.hole_size_in)
    }

    /// Depths where the annular geometry changes: every shoe and every TOC.
    pub fn boundaries(&self) -> Vec<f64> {
        let mut out: Vec<f64> = self
            .facts
            .casing_strings
            .iter()
            .flat_map(|c| [Some(c.bottom_ft), self.cement_top(c)])
            .flatten()
            .filter(|d| d.is_finite())
            .collect();
        out.sort_by(f64::total_cmp);
        out.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        out
    }
}
