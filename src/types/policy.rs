//! Resolved regulatory policy for one jurisdiction.
//!
//! Loading and resolution happen upstream; the kernel only reads this.

use super::facts::DepthInterval;
use super::recipe::{Rounding, SlurryRecipe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

/// One regulatory knob with its citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub value: serde_json::Value,
    #[serde(default, alias = "citations")]
    pub citation_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub policy_id: String,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default = "default_true")]
    pub complete: bool,
    /// Knobs the resolver could not fill; reported when `complete=false`
    #[serde(default)]
    pub missing_knobs: Vec<String>,
    #[serde(default)]
    pub requirements: BTreeMap<String, Requirement>,
    #[serde(default)]
    pub district_overrides: DistrictOverrides,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub proposal: Option<Proposal>,
    #[serde(default)]
    pub steps_overrides: Option<StepsOverrides>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            policy_id: String::new(),
            jurisdiction: None,
            district: None,
            complete: true,
            missing_knobs: Vec::new(),
            requirements: BTreeMap::new(),
            district_overrides: DistrictOverrides::default(),
            preferences: Preferences::default(),
            proposal: None,
            steps_overrides: None,
        }
    }
}

impl Policy {
    pub fn has_knob(&self, knob: &str) -> bool {
        self.requirements
            .get(knob)
            .is_some_and(|r| !r.value.is_null())
    }

    /// Numeric knob. Numeric strings ("50") are accepted.
    pub fn knob_f64(&self, knob: &str) -> Option<f64> {
        let value = &self.requirements.get(knob)?.value;
        match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|v: &f64| v.is_finite())
    }

    pub fn knob_bool(&self, knob: &str) -> Option<bool> {
        match &self.requirements.get(knob)?.value {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn citations(&self, knob: &str) -> Vec<String> {
        self.requirements
            .get(knob)
            .map(|r| r.citation_keys.clone())
            .unwrap_or_default()
    }

    pub fn rounding(&self) -> Rounding {
        self.preferences.rounding_policy.unwrap_or_default()
    }
}

// ============================================================================
// District overrides
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FormationTopRule {
    pub formation: String,
    #[serde(default)]
    pub min_length_ft: Option<f64>,
    #[serde(default)]
    pub tag_required: bool,
    #[serde(default, alias = "citations")]
    pub citation_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TagRules {
    /// Surface shoe plugs set in open hole must be tagged
    pub surface_shoe_in_open_hole: bool,
    /// Steps overlapping a protect interval must be tagged
    pub protect_intervals: bool,
    /// Zone-isolation plugs inside an enhanced-recovery zone must be tagged
    pub enhanced_recovery: bool,
}

/// Enhanced-recovery zone: either a district-wide flag or a depth window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnhancedRecoveryZone {
    Flag(bool),
    Interval(DepthInterval),
}

impl EnhancedRecoveryZone {
    pub fn applies(&self, top_ft: f64, bottom_ft: f64) -> bool {
        match self {
            EnhancedRecoveryZone::Flag(f) => *f,
            EnhancedRecoveryZone::Interval(i) => i.overlaps(top_ft, bottom_ft),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DistrictOverrides {
    pub formation_tops: Vec<FormationTopRule>,
    pub tag: TagRules,
    pub protect_intervals: Vec<DepthInterval>,
    pub enhanced_recovery_zone: Option<EnhancedRecoveryZone>,
    /// Instruction text keyed by purpose wire name, or "*" for every step
    pub operational_instructions: BTreeMap<String, String>,
}

// ============================================================================
// Preferences
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeometryDefaults {
    pub casing_id_in: Option<f64>,
    pub stinger_od_in: Option<f64>,
    pub stinger_id_in: Option<f64>,
    pub annular_excess: Option<f64>,
}

fn default_sack_limit_no_tag() -> f64 {
    50.0
}
fn default_sack_limit_with_tag() -> f64 {
    150.0
}
fn default_merge_types() -> Vec<String> {
    vec![
        "formation_top_plug".to_string(),
        "cement_plug".to_string(),
        "uqw_isolation_plug".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongPlugMerge {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sack_limit_no_tag")]
    pub sack_limit_no_tag: f64,
    #[serde(default = "default_sack_limit_with_tag")]
    pub sack_limit_with_tag: f64,
    #[serde(default = "default_merge_types")]
    pub types: Vec<String>,
    /// Also merge surface shoe and top plugs into neighbouring plugs
    #[serde(default)]
    pub cross_type_merge: bool,
    #[serde(default = "default_true")]
    pub preserve_tagging: bool,
}

impl Default for LongPlugMerge {
    fn default() -> Self {
        Self {
            enabled: true,
            sack_limit_no_tag: default_sack_limit_no_tag(),
            sack_limit_with_tag: default_sack_limit_with_tag(),
            types: default_merge_types(),
            cross_type_merge: false,
            preserve_tagging: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Preferences {
    pub geometry_defaults: BTreeMap<String, GeometryDefaults>,
    pub default_recipe: Option<SlurryRecipe>,
    pub rounding_policy: Option<Rounding>,
    pub long_plug_merge: LongPlugMerge,
}

// ============================================================================
// Proposal ladder & caller overrides
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Proposal {
    pub plug_count: Option<u32>,
    pub segment_length_ft: Option<f64>,
    pub spacing_ft: Option<f64>,
    pub base_depth_ft: Option<f64>,
    #[serde(alias = "citations")]
    pub citation_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqueezeOverride {
    pub top_ft: f64,
    pub bottom_ft: f64,
    /// Pre-computed sacks; bypasses the materials calculation
    #[serde(default)]
    pub sacks: Option<u32>,
    #[serde(default)]
    pub cap_length_ft: Option<f64>,
    #[serde(default, alias = "citations")]
    pub citation_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalOverride {
    pub top_ft: f64,
    pub bottom_ft: f64,
    #[serde(default)]
    pub tag_required: bool,
    #[serde(default, alias = "citations")]
    pub citation_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepsOverrides {
    pub cibp_cap_length_ft: Option<f64>,
    pub squeeze_via_perf: Vec<SqueezeOverride>,
    pub perf_circulate: Vec<IntervalOverride>,
    pub cement_plugs: Vec<IntervalOverride>,
}
