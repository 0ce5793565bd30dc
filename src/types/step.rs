//! Plan steps.
//!
//! Two orthogonal vocabularies describe a step:
//! - [`RegulatoryPurpose`]: why the step exists (which rule produced it)
//! - [`MechanicalType`]: how cement is placed
//!
//! Classification and merge logic inspect only `MechanicalType`.

use super::recipe::SlurryRecipe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Regulatory purpose
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatoryPurpose {
    SurfaceCasingShoePlug,
    IntermediateCasingShoePlug,
    BridgePlug,
    CibpCap,
    BridgePlugCap,
    CementRetainer,
    UqwIsolationPlug,
    TopPlug,
    PerfCirculateToSurface,
    PerfCirculate,
    ProductiveHorizonIsolationPlug,
    AnnularGapPlug,
    FormationTopPlug,
    MechanicalIsolationPlug,
    SqueezeViaPerf,
    CementPlug,
}

impl RegulatoryPurpose {
    pub const ALL: [RegulatoryPurpose; 16] = [
        RegulatoryPurpose::SurfaceCasingShoePlug,
        RegulatoryPurpose::IntermediateCasingShoePlug,
        RegulatoryPurpose::BridgePlug,
        RegulatoryPurpose::CibpCap,
        RegulatoryPurpose::BridgePlugCap,
        RegulatoryPurpose::CementRetainer,
        RegulatoryPurpose::UqwIsolationPlug,
        RegulatoryPurpose::TopPlug,
        RegulatoryPurpose::PerfCirculateToSurface,
        RegulatoryPurpose::PerfCirculate,
        RegulatoryPurpose::ProductiveHorizonIsolationPlug,
        RegulatoryPurpose::AnnularGapPlug,
        RegulatoryPurpose::FormationTopPlug,
        RegulatoryPurpose::MechanicalIsolationPlug,
        RegulatoryPurpose::SqueezeViaPerf,
        RegulatoryPurpose::CementPlug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegulatoryPurpose::SurfaceCasingShoePlug => "surface_casing_shoe_plug",
            RegulatoryPurpose::IntermediateCasingShoePlug => "intermediate_casing_shoe_plug",
            RegulatoryPurpose::BridgePlug => "bridge_plug",
            RegulatoryPurpose::CibpCap => "cibp_cap",
            RegulatoryPurpose::BridgePlugCap => "bridge_plug_cap",
            RegulatoryPurpose::CementRetainer => "cement_retainer",
            RegulatoryPurpose::UqwIsolationPlug => "uqw_isolation_plug",
            RegulatoryPurpose::TopPlug => "top_plug",
            RegulatoryPurpose::PerfCirculateToSurface => "perf_circulate_to_surface",
            RegulatoryPurpose::PerfCirculate => "perf_circulate",
            RegulatoryPurpose::ProductiveHorizonIsolationPlug => "productive_horizon_isolation_plug",
            RegulatoryPurpose::AnnularGapPlug => "annular_gap_plug",
            RegulatoryPurpose::FormationTopPlug => "formation_top_plug",
            RegulatoryPurpose::MechanicalIsolationPlug => "mechanical_isolation_plug",
            RegulatoryPurpose::SqueezeViaPerf => "squeeze_via_perf",
            RegulatoryPurpose::CementPlug => "cement_plug",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Mechanical-only steps place no cement.
    pub fn is_cement_bearing(self) -> bool {
        !matches!(
            self,
            RegulatoryPurpose::BridgePlug | RegulatoryPurpose::CementRetainer
        )
    }

    /// Steps exempt from the minimum-sack floor.
    pub fn is_minimum_exempt(self) -> bool {
        matches!(
            self,
            RegulatoryPurpose::BridgePlugCap
                | RegulatoryPurpose::CibpCap
                | RegulatoryPurpose::BridgePlug
                | RegulatoryPurpose::CementRetainer
                | RegulatoryPurpose::PerfCirculateToSurface
        )
    }

    pub fn is_mechanical_cap(self) -> bool {
        matches!(self, RegulatoryPurpose::CibpCap | RegulatoryPurpose::BridgePlugCap)
    }

    pub fn is_barrier(self) -> bool {
        matches!(
            self,
            RegulatoryPurpose::BridgePlug
                | RegulatoryPurpose::CibpCap
                | RegulatoryPurpose::BridgePlugCap
                | RegulatoryPurpose::CementRetainer
        )
    }

    /// Perforate-and-circulate operations bring cement back to surface.
    pub fn circulates_to_surface(self) -> bool {
        matches!(
            self,
            RegulatoryPurpose::PerfCirculateToSurface | RegulatoryPurpose::PerfCirculate
        )
    }
}

impl std::fmt::Display for RegulatoryPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Mechanical type
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanicalType {
    SpotPlug,
    PerfAndSqueezePlug,
    PerfAndCirculatePlug,
    DumbbellPlug,
}

impl MechanicalType {
    /// Higher wins when members of a merged plug disagree.
    pub fn precedence(self) -> u8 {
        match self {
            MechanicalType::PerfAndCirculatePlug => 4,
            MechanicalType::PerfAndSqueezePlug => 3,
            MechanicalType::SpotPlug => 2,
            MechanicalType::DumbbellPlug => 1,
        }
    }

    /// Pairs that can never share one cement job. Symmetric.
    pub fn incompatible_with(self, other: MechanicalType) -> bool {
        use MechanicalType::*;
        matches!(
            (self, other),
            (SpotPlug, PerfAndSqueezePlug)
                | (PerfAndSqueezePlug, SpotPlug)
                | (PerfAndSqueezePlug, DumbbellPlug)
                | (DumbbellPlug, PerfAndSqueezePlug)
                | (SpotPlug, PerfAndCirculatePlug)
                | (PerfAndCirculatePlug, SpotPlug)
                | (PerfAndCirculatePlug, DumbbellPlug)
                | (DumbbellPlug, PerfAndCirculatePlug)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MechanicalType::SpotPlug => "spot_plug",
            MechanicalType::PerfAndSqueezePlug => "perf_and_squeeze_plug",
            MechanicalType::PerfAndCirculatePlug => "perf_and_circulate_plug",
            MechanicalType::DumbbellPlug => "dumbbell_plug",
        }
    }
}

// ============================================================================
// Geometry descriptors
// ============================================================================

/// Where the cement sits relative to the casing program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryContext {
    OpenHole,
    CasedProduction,
    CasedIntermediate,
    CasedSurface,
}

impl GeometryContext {
    pub fn is_open_hole(self) -> bool {
        self == GeometryContext::OpenHole
    }
}

/// Who put the step in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepOrigin {
    #[default]
    Generated,
    Auto,
    District,
    Override,
    Merged,
}

/// Explicit annulus for operations that cement behind pipe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnulusGeometry {
    pub outer_id_in: f64,
    pub inner_od_in: f64,
}

/// Perforate, squeeze behind pipe, then leave a cement cap inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SqueezeSpec {
    pub perf_top_ft: f64,
    pub perf_bottom_ft: f64,
    pub cap_length_ft: f64,
}

impl SqueezeSpec {
    pub fn perf_length_ft(&self) -> f64 {
        (self.perf_bottom_ft - self.perf_top_ft).max(0.0)
    }
}

/// Slurry volumes for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlurryVolume {
    pub total_bbl: f64,
    pub ft3: f64,
    pub sacks: u32,
    pub water_bbl: f64,
    pub additives: Vec<String>,
    pub explain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Materials {
    pub slurry: SlurryVolume,
}

// ============================================================================
// Step
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: u32,
    #[serde(rename = "type")]
    pub purpose: RegulatoryPurpose,
    pub plug_type: Option<MechanicalType>,
    #[serde(default)]
    pub origin: StepOrigin,
    pub top_ft: f64,
    pub bottom_ft: f64,
    /// Set for point operations (bridge plugs, retainers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_ft: Option<f64>,
    #[serde(default)]
    pub geometry_context: Option<GeometryContext>,
    #[serde(default)]
    pub casing_id_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_size_in: Option<f64>,
    #[serde(default)]
    pub stinger_od_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stinger_id_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annulus: Option<AnnulusGeometry>,
    #[serde(default)]
    pub annular_excess: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squeeze: Option<SqueezeSpec>,
    #[serde(default)]
    pub recipe: Option<SlurryRecipe>,
    #[serde(default)]
    pub regulatory_basis: Vec<String>,
    #[serde(default)]
    pub tag_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub materials: Option<Materials>,
    #[serde(default)]
    pub sacks: Option<u32>,
}

impl Step {
    /// An interval step; endpoints are ordered so `top_ft <= bottom_ft`.
    pub fn new(purpose: RegulatoryPurpose, top_ft: f64, bottom_ft: f64) -> Self {
        let (top_ft, bottom_ft) = if top_ft <= bottom_ft {
            (top_ft, bottom_ft)
        } else {
            (bottom_ft, top_ft)
        };
        Self {
            id: 0,
            purpose,
            plug_type: None,
            origin: StepOrigin::Generated,
            top_ft,
            bottom_ft,
            depth_ft: None,
            geometry_context: None,
            casing_id_in: None,
            hole_size_in: None,
            stinger_od_in: None,
            stinger_id_in: None,
            annulus: None,
            annular_excess: None,
            squeeze: None,
            recipe: None,
            regulatory_basis: Vec::new(),
            tag_required: false,
            formation: None,
            special_instructions: None,
            details: BTreeMap::new(),
            materials: None,
            sacks: None,
        }
    }

    /// A point operation such as setting a bridge plug.
    pub fn point(purpose: RegulatoryPurpose, depth_ft: f64) -> Self {
        let mut step = Self::new(purpose, depth_ft, depth_ft);
        step.depth_ft = Some(depth_ft);
        step
    }

    pub fn with_origin(mut self, origin: StepOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_citations<I, S>(mut self, citations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for c in citations {
            self.add_citation(c);
        }
        self
    }

    /// Append a citation, keeping first-seen order and dropping duplicates.
    pub fn add_citation(&mut self, citation: impl Into<String>) {
        let citation = citation.into();
        if !citation.is_empty() && !self.regulatory_basis.contains(&citation) {
            self.regulatory_basis.push(citation);
        }
    }

    pub fn set_detail(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.details.insert(key.to_string(), value.into());
    }

    pub fn detail_flag(&self, key: &str) -> bool {
        self.details
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn length_ft(&self) -> f64 {
        (self.bottom_ft - self.top_ft).max(0.0)
    }

    /// Depth used for TOC comparisons: bottom, else top.
    pub fn reference_depth_ft(&self) -> f64 {
        if self.bottom_ft.is_finite() {
            self.bottom_ft
        } else {
            self.top_ft
        }
    }

    pub fn overlaps(&self, top_ft: f64, bottom_ft: f64) -> bool {
        self.top_ft <= bottom_ft && self.bottom_ft >= top_ft
    }

    pub fn spans_depth(&self, depth_ft: f64) -> bool {
        depth_ft >= self.top_ft && depth_ft <= self.bottom_ft
    }

    pub fn is_open_hole(&self) -> bool {
        self.geometry_context.is_some_and(GeometryContext::is_open_hole)
    }

    /// Bore diameter the cement fills: casing ID when cased, hole size otherwise.
    pub fn bore_diameter_in(&self) -> Option<f64> {
        if self.is_open_hole() {
            self.hole_size_in.or(self.casing_id_in)
        } else {
            self.casing_id_in.or(self.hole_size_in)
        }
    }
}
