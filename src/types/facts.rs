//! Well facts: the normalized, read-only description of a wellbore.
//!
//! Upstream extraction hands us a JSON object where every key is either a
//! bare value or a `{value, provenance}` wrapper. The wrapper is stripped
//! exactly once in [`WellFacts::from_json`]; everything downstream reads
//! plain typed fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Provenance / Fact wrapper
// ============================================================================

/// Where an extracted value came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Provenance {
    /// Source document or form (e.g. "W-2", "GAU letter")
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    /// Extraction confidence 0.0-1.0
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// A single fact value with optional provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact<T> {
    pub value: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl<T> Fact<T> {
    pub fn bare(value: T) -> Self {
        Self {
            value,
            provenance: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FactsError {
    #[error("facts must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("malformed fact '{key}': {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("facts shape error: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Split a raw JSON value into its payload and provenance when it is a
/// `{value, provenance?}` wrapper. Objects with any other keys are payloads.
fn unwrap_fact(key: &str, raw: serde_json::Value) -> Result<Fact<serde_json::Value>, FactsError> {
    match raw {
        serde_json::Value::Object(mut map)
            if map.contains_key("value")
                && map.keys().all(|k| k == "value" || k == "provenance") =>
        {
            let provenance = match map.remove("provenance") {
                Some(serde_json::Value::Null) | None => None,
                Some(p) => Some(serde_json::from_value(p).map_err(|source| {
                    FactsError::Malformed {
                        key: key.to_string(),
                        source,
                    }
                })?),
            };
            let value = map.remove("value").unwrap_or(serde_json::Value::Null);
            Ok(Fact { value, provenance })
        }
        other => Ok(Fact::bare(other)),
    }
}

// ============================================================================
// Typed fact records
// ============================================================================

/// Cement status of a casing string at a given depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CementStatus {
    FullyCemented,
    Cemented,
    Uncemented,
    Unknown,
}

impl CementStatus {
    /// Cement cannot be pumped through an annulus that is already cemented.
    pub fn is_cemented(self) -> bool {
        matches!(self, CementStatus::FullyCemented | CementStatus::Cemented)
    }
}

/// A casing string as reported on completion records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasingStringFact {
    pub name: String,
    pub od_in: f64,
    #[serde(default)]
    pub weight_ppf: Option<f64>,
    /// Explicit ID; when absent it is resolved through the pipe-spec table
    #[serde(default)]
    pub id_in: Option<f64>,
    /// Hanger depth; 0 for strings run to surface
    #[serde(default)]
    pub top_ft: f64,
    pub bottom_ft: f64,
    #[serde(default)]
    pub hole_size_in: Option<f64>,
    #[serde(default)]
    pub cement_top_ft: Option<f64>,
    #[serde(default)]
    pub cement_status: Option<CementStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perforation {
    pub top_ft: f64,
    pub bottom_ft: f64,
    #[serde(default)]
    pub formation: Option<String>,
}

impl Perforation {
    pub fn overlaps(&self, top_ft: f64, bottom_ft: f64) -> bool {
        self.top_ft <= bottom_ft && self.bottom_ft >= top_ft
    }
}

/// A depth interval (top shallower than bottom).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthInterval {
    pub top_ft: f64,
    pub bottom_ft: f64,
}

impl DepthInterval {
    pub fn new(top_ft: f64, bottom_ft: f64) -> Self {
        Self { top_ft, bottom_ft }
    }

    pub fn contains(&self, depth_ft: f64) -> bool {
        depth_ft >= self.top_ft && depth_ft <= self.bottom_ft
    }

    pub fn overlaps(&self, top_ft: f64, bottom_ft: f64) -> bool {
        self.top_ft <= bottom_ft && self.bottom_ft >= top_ft
    }

    pub fn spans(&self, top_ft: f64, bottom_ft: f64) -> bool {
        self.top_ft <= top_ft && self.bottom_ft >= bottom_ft
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnularGap {
    pub top_ft: f64,
    pub bottom_ft: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Kick-off point of a deviated/horizontal well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KickOffPoint {
    #[serde(default)]
    pub md_ft: Option<f64>,
    #[serde(default)]
    pub tvd_ft: Option<f64>,
}

/// Kind of mechanical barrier already in the hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarrierKind {
    Cibp,
    Packer,
    DvTool,
    CementRetainer,
    Other,
}

impl BarrierKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "CIBP" | "BRIDGE_PLUG" => BarrierKind::Cibp,
            "PACKER" => BarrierKind::Packer,
            "DV_TOOL" | "DV" | "STAGE_TOOL" => BarrierKind::DvTool,
            "CEMENT_RETAINER" | "RETAINER" => BarrierKind::CementRetainer,
            _ => BarrierKind::Other,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BarrierEntry {
    Kind(String),
    Detailed {
        kind: String,
        #[serde(default)]
        depth_ft: Option<f64>,
    },
}

/// A mechanical barrier with its depth when known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MechanicalBarrier {
    pub kind: BarrierKind,
    pub depth_ft: Option<f64>,
}

fn deserialize_barriers<'de, D>(deserializer: D) -> Result<Vec<MechanicalBarrier>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = Vec::<BarrierEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|e| match e {
            BarrierEntry::Kind(kind) => MechanicalBarrier {
                kind: BarrierKind::parse(&kind),
                depth_ft: None,
            },
            BarrierEntry::Detailed { kind, depth_ft } => MechanicalBarrier {
                kind: BarrierKind::parse(&kind),
                depth_ft,
            },
        })
        .collect())
}

// ============================================================================
// WellFacts
// ============================================================================

/// All facts the kernel consumes for one well.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WellFacts {
    pub api14: Option<String>,
    pub county: Option<String>,
    pub field: Option<String>,

    pub surface_shoe_ft: Option<f64>,
    pub intermediate_shoe_ft: Option<f64>,
    pub production_shoe_ft: Option<f64>,
    pub production_casing_toc_ft: Option<f64>,
    pub intermediate_casing_toc_ft: Option<f64>,

    pub uqw_base_ft: Option<f64>,
    pub duqw_isolation_required: bool,
    pub gau_protect_intervals: Vec<DepthInterval>,

    pub casing_strings: Vec<CasingStringFact>,
    pub perforations: Vec<Perforation>,
    pub formation_tops_map: BTreeMap<String, f64>,

    #[serde(deserialize_with = "deserialize_barriers")]
    pub existing_mechanical_barriers: Vec<MechanicalBarrier>,
    pub existing_cibp_ft: Option<f64>,
    pub existing_cibp_cap_ft: Option<f64>,
    pub cibp_planned_ft: Option<f64>,
    pub packer_ft: Option<f64>,
    pub dv_tool_ft: Option<f64>,
    pub cement_retainer_ft: Option<f64>,

    pub kop: Option<KickOffPoint>,
    pub annular_gaps: Vec<AnnularGap>,
    pub producing_interval: Option<DepthInterval>,

    pub is_open_hole: bool,
    pub surface_shoe_in_open_hole: bool,

    /// Provenance per top-level key, captured at ingestion
    #[serde(skip)]
    pub provenance: BTreeMap<String, Provenance>,
}

impl WellFacts {
    /// Ingest a raw facts object, unwrapping `{value, provenance}` wrappers once.
    pub fn from_json(raw: serde_json::Value) -> Result<Self, FactsError> {
        let map = match raw {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Array(_) => return Err(FactsError::NotAnObject("array")),
            serde_json::Value::String(_) => return Err(FactsError::NotAnObject("string")),
            serde_json::Value::Number(_) => return Err(FactsError::NotAnObject("number")),
            serde_json::Value::Bool(_) => return Err(FactsError::NotAnObject("bool")),
        };

        let mut unwrapped = serde_json::Map::new();
        let mut provenance = BTreeMap::new();
        for (key, value) in map {
            let Fact { value, provenance: prov } = unwrap_fact(&key, value)?;
            if let Some(p) = prov {
                provenance.insert(key.clone(), p);
            }
            // Nulls mean "not extracted"; let serde defaults apply
            if !value.is_null() {
                unwrapped.insert(key, value);
            }
        }

        let mut facts: Self = serde_json::from_value(serde_json::Value::Object(unwrapped))?;
        facts.provenance = provenance;
        Ok(facts.normalized())
    }

    /// Fill barrier depths from the dedicated depth keys and record barriers
    /// implied by those keys.
    fn normalized(mut self) -> Self {
        let depth_keys = [
            (BarrierKind::Cibp, self.existing_cibp_ft),
            (BarrierKind::Packer, self.packer_ft),
            (BarrierKind::DvTool, self.dv_tool_ft),
            (BarrierKind::CementRetainer, self.cement_retainer_ft),
        ];
        for (kind, depth) in depth_keys {
            let Some(depth) = depth else { continue };
            match self
                .existing_mechanical_barriers
                .iter_mut()
                .find(|b| b.kind == kind && b.depth_ft.is_none())
            {
                Some(barrier) => barrier.depth_ft = Some(depth),
                None => {
                    if !self
                        .existing_mechanical_barriers
                        .iter()
                        .any(|b| b.kind == kind && b.depth_ft == Some(depth))
                    {
                        self.existing_mechanical_barriers.push(MechanicalBarrier {
                            kind,
                            depth_ft: Some(depth),
                        });
                    }
                }
            }
        }
        if self.existing_cibp_ft.is_none() {
            self.existing_cibp_ft = self.shallowest_barrier(&[BarrierKind::Cibp]);
        }
        self
    }

    /// Shallowest known depth among barriers of the given kinds.
    pub fn shallowest_barrier(&self, kinds: &[BarrierKind]) -> Option<f64> {
        self.existing_mechanical_barriers
            .iter()
            .filter(|b| kinds.contains(&b.kind))
            .filter_map(|b| b.depth_ft)
            .min_by(f64::total_cmp)
    }

    pub fn has_barrier(&self, kind: BarrierKind) -> bool {
        self.existing_mechanical_barriers.iter().any(|b| b.kind == kind)
    }

    pub fn shallowest_perforation_top(&self) -> Option<f64> {
        self.perforations
            .iter()
            .map(|p| p.top_ft)
            .min_by(f64::total_cmp)
    }

    pub fn shallowest_formation_top(&self) -> Option<f64> {
        self.formation_tops_map
            .values()
            .copied()
            .min_by(f64::total_cmp)
    }

    pub fn casing_named(&self, needle: &str) -> Option<&CasingStringFact> {
        let needle = needle.to_ascii_lowercase();
        self.casing_strings
            .iter()
            .find(|c| c.name.to_ascii_lowercase().contains(&needle))
    }

    pub fn kop_md_ft(&self) -> Option<f64> {
        self.kop.and_then(|k| k.md_ft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrapped_and_bare_values_unwrap_identically() {
        let facts = WellFacts::from_json(json!({
            "surface_shoe_ft": {"value": 1200.0, "provenance": {"source": "W-2", "page": 3}},
            "production_shoe_ft": 9500.0,
        }))
        .expect("facts should parse");

        assert_eq!(facts.surface_shoe_ft, Some(1200.0));
        assert_eq!(facts.production_shoe_ft, Some(9500.0));
        assert_eq!(
            facts.provenance.get("surface_shoe_ft").and_then(|p| p.source.as_deref()),
            Some("W-2")
        );
        assert!(!facts.provenance.contains_key("production_shoe_ft"));
    }

    #[test]
    fn test_payload_objects_with_other_keys_are_not_unwrapped() {
        let facts = WellFacts::from_json(json!({
            "kop": {"md_ft": 7200.0, "tvd_ft": 7150.0},
            "producing_interval": {"value": {"top_ft": 8000.0, "bottom_ft": 8200.0}},
        }))
        .expect("facts should parse");
        assert_eq!(facts.kop_md_ft(), Some(7200.0));
        assert_eq!(facts.producing_interval.map(|p| p.top_ft), Some(8000.0));
    }

    #[test]
    fn test_barrier_depth_keys_fill_declared_barriers() {
        let facts = WellFacts::from_json(json!({
            "existing_mechanical_barriers": ["CIBP", {"kind": "packer", "depth_ft": 6100.0}],
            "existing_cibp_ft": 5000.0,
        }))
        .expect("facts should parse");
        assert_eq!(facts.existing_mechanical_barriers.len(), 2);
        assert_eq!(facts.shallowest_barrier(&[BarrierKind::Cibp]), Some(5000.0));
        assert_eq!(facts.shallowest_barrier(&[BarrierKind::Packer]), Some(6100.0));
    }

    #[test]
    fn test_non_object_facts_rejected() {
        assert!(matches!(
            WellFacts::from_json(json!([1, 2])),
            Err(FactsError::NotAnObject("array"))
        ));
    }

    #[test]
    fn test_barrier_kind_parse_aliases() {
        assert_eq!(BarrierKind::parse("dv-tool"), BarrierKind::DvTool);
        assert_eq!(BarrierKind::parse("Bridge Plug"), BarrierKind::Cibp);
        assert_eq!(BarrierKind::parse("whipstock"), BarrierKind::Other);
    }
}
