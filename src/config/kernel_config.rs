//! Kernel Configuration - engineering constants as operator-tunable TOML values
//!
//! Regulatory knobs come from the policy. This file holds the engineering
//! constants the kernel applies around them (capacity divisor, merge limits,
//! barrier offsets). Each struct implements `Default` with the field values
//! used in Texas P&A practice, so an absent config file changes nothing.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "WELLPLUG_CONFIG";

/// Config file looked up in the current working directory.
pub const LOCAL_CONFIG_FILE: &str = "kernel_config.toml";

// ============================================================================
// Config Provenance: tracks which keys the user explicitly set
// ============================================================================

/// Tracks which configuration keys were explicitly present in the user's TOML file.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvenance {
    /// Dotted key paths explicitly present in the user's TOML file
    pub explicit_keys: HashSet<String>,
}

impl ConfigProvenance {
    /// Example: `provenance.is_user_set("merge.max_length_ft")`
    pub fn is_user_set(&self, dotted_key: &str) -> bool {
        self.explicit_keys.contains(dotted_key)
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the plugging kernel.
///
/// Load with `KernelConfig::load()` which searches:
/// 1. `$WELLPLUG_CONFIG` env var
/// 2. `./kernel_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KernelConfig {
    /// Volumetric constants for slurry calculations
    #[serde(default)]
    pub materials: MaterialsConfig,

    /// Long-plug merge limits
    #[serde(default)]
    pub merge: MergeConfig,

    /// Mechanical barrier handling
    #[serde(default)]
    pub barriers: BarrierConfig,

    /// Plug placement offsets not carried by the policy
    #[serde(default)]
    pub plugs: PlugConfig,

    /// Casing geometry fallbacks
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Final validation pass
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl KernelConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        Self::load_with_provenance().0
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let (config, _provenance) = Self::load_from_file_with_provenance(path)?;
        Ok(config)
    }

    /// Load from a specific TOML file path, also returning provenance
    /// so callers can distinguish user-set values from defaults.
    pub fn load_from_file_with_provenance(
        path: &Path,
    ) -> Result<(Self, ConfigProvenance), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str_with_provenance(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })
    }

    /// Parse a TOML document: typo warnings first, then serde, then validation.
    pub fn from_toml_str_with_provenance(
        contents: &str,
    ) -> Result<(Self, ConfigProvenance), ConfigError> {
        let typo_warnings = super::validation::validate_unknown_keys(contents);
        for w in &typo_warnings {
            warn!("{}", w);
        }

        let provenance = ConfigProvenance {
            explicit_keys: super::validation::walk_toml_keys(
                &contents
                    .parse::<toml::Value>()
                    .unwrap_or(toml::Value::Table(Default::default())),
                "",
            )
            .into_iter()
            .collect(),
        };

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok((config, provenance))
    }

    /// Same search order as `load()` but also returns which keys the user set.
    pub fn load_with_provenance() -> (Self, ConfigProvenance) {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file_with_provenance(&p) {
                    Ok((config, provenance)) => {
                        info!(path = %p.display(), keys = provenance.explicit_keys.len(), "Loaded kernel config from WELLPLUG_CONFIG");
                        return (config, provenance);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from WELLPLUG_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "WELLPLUG_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./kernel_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file_with_provenance(&local) {
                Ok((config, provenance)) => {
                    info!("Loaded kernel config from ./kernel_config.toml");
                    return (config, provenance);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./kernel_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults: no file, so nothing is user-set
        info!("No kernel_config.toml found, using built-in defaults");
        (Self::default(), ConfigProvenance::default())
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Kernel config saved");
        Ok(())
    }

    /// Validate all constants for internal consistency.
    ///
    /// Rules:
    /// - Divisors and yields must be strictly positive
    /// - Multipliers must be >= 1.0 (never reduce cement below geometric volume)
    /// - Merge limits must allow at least one member
    /// - All values must be finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let m = &self.materials;
        Self::check_positive(m.capacity_divisor, "materials.capacity_divisor", &mut errors);
        Self::check_positive(m.ft3_per_bbl, "materials.ft3_per_bbl", &mut errors);
        if m.texas_excess_per_kft < 0.0 {
            errors.push("materials.texas_excess_per_kft must be >= 0".to_string());
        }
        Self::check_multiplier(m.squeeze_cap_multiplier, "materials.squeeze_cap_multiplier", &mut errors);
        Self::check_multiplier(m.perf_circulate_topoff, "materials.perf_circulate_topoff", &mut errors);
        if m.perf_circulate_sack_increment == 0 {
            errors.push("materials.perf_circulate_sack_increment must be > 0".to_string());
        }
        if m.minimum_sacks == 0 {
            errors.push("materials.minimum_sacks must be > 0".to_string());
        }

        let mg = &self.merge;
        Self::check_positive(mg.max_length_ft, "merge.max_length_ft", &mut errors);
        if mg.max_members == 0 {
            errors.push("merge.max_members must be > 0".to_string());
        }

        let b = &self.barriers;
        Self::check_positive(b.existing_cibp_cap_ft, "barriers.existing_cibp_cap_ft", &mut errors);
        Self::check_positive(b.tool_isolation_plug_ft, "barriers.tool_isolation_plug_ft", &mut errors);
        Self::check_positive(b.detector_cap_ft, "barriers.detector_cap_ft", &mut errors);

        let g = &self.geometry;
        Self::check_positive(g.fallback_casing_id_in, "geometry.fallback_casing_id_in", &mut errors);
        if g.od_match_tolerance_in < 0.0 {
            errors.push("geometry.od_match_tolerance_in must be >= 0".to_string());
        }

        if self.validation.dedup_rounding_ft <= 0.0 {
            errors.push("validation.dedup_rounding_ft must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // Reject NaN/Inf anywhere (sweep all f64 fields via serialization)
        if let Ok(s) = toml::to_string(self) {
            if s.contains("nan") || s.contains("inf") {
                errors.push(
                    "Config contains NaN or Inf values; all constants must be finite numbers"
                        .to_string(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} must be a finite value > 0 (got {value})"));
        }
    }

    fn check_multiplier(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value < 1.0 {
            errors.push(format!("{name} must be >= 1.0 (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(_, e) => Some(e),
            ConfigError::Serialize(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

// ============================================================================
// Materials
// ============================================================================

/// Volumetric constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialsConfig {
    /// bbl/ft = D² / divisor for D in inches
    #[serde(default = "default_capacity_divisor")]
    pub capacity_divisor: f64,

    #[serde(default = "default_ft3_per_bbl")]
    pub ft3_per_bbl: f64,

    /// Excess added per started 1000 ft of depth (TAC §3.14(d)(11))
    #[serde(default = "default_texas_excess")]
    pub texas_excess_per_kft: f64,

    /// Multiplier on the inside-casing cap of a perforate-and-squeeze job
    #[serde(default = "default_squeeze_cap_multiplier")]
    pub squeeze_cap_multiplier: f64,

    /// Operational top-off on perforate-and-circulate volumes
    #[serde(default = "default_perf_circulate_topoff")]
    pub perf_circulate_topoff: f64,

    /// Perforate-and-circulate sacks are rounded to this increment
    #[serde(default = "default_perf_circulate_increment")]
    pub perf_circulate_sack_increment: u32,

    #[serde(default = "default_minimum_sacks")]
    pub minimum_sacks: u32,
}

fn default_capacity_divisor() -> f64 { 1029.4 }
fn default_ft3_per_bbl() -> f64 { 5.6146 }
fn default_texas_excess() -> f64 { 0.10 }
fn default_squeeze_cap_multiplier() -> f64 { 1.4 }
fn default_perf_circulate_topoff() -> f64 { 1.05 }
fn default_perf_circulate_increment() -> u32 { 5 }
fn default_minimum_sacks() -> u32 { 25 }

impl Default for MaterialsConfig {
    fn default() -> Self {
        Self {
            capacity_divisor: default_capacity_divisor(),
            ft3_per_bbl: default_ft3_per_bbl(),
            texas_excess_per_kft: default_texas_excess(),
            squeeze_cap_multiplier: default_squeeze_cap_multiplier(),
            perf_circulate_topoff: default_perf_circulate_topoff(),
            perf_circulate_sack_increment: default_perf_circulate_increment(),
            minimum_sacks: default_minimum_sacks(),
        }
    }
}

// ============================================================================
// Merge
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_merge_max_length")]
    pub max_length_ft: f64,

    #[serde(default = "default_merge_max_members")]
    pub max_members: usize,
}

fn default_merge_max_length() -> f64 { 1250.0 }
fn default_merge_max_members() -> usize { 3 }

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_length_ft: default_merge_max_length(),
            max_members: default_merge_max_members(),
        }
    }
}

// ============================================================================
// Barriers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierConfig {
    /// Cap placed on an existing CIBP when the policy names no length
    #[serde(default = "default_existing_cibp_cap")]
    pub existing_cibp_cap_ft: f64,

    /// Isolation plug length centred on a packer or DV tool
    #[serde(default = "default_tool_isolation_plug")]
    pub tool_isolation_plug_ft: f64,

    /// Window around the exposure depth searched for an existing barrier
    #[serde(default = "default_detector_window")]
    pub detector_window_ft: f64,

    /// Synthesized CIBP is set this far above the exposure depth / KOP
    #[serde(default = "default_detector_offset")]
    pub detector_offset_ft: f64,

    /// Synthesized CIBP cap length when the policy names none
    #[serde(default = "default_detector_cap")]
    pub detector_cap_ft: f64,

    /// A cap whose bottom is within this distance of a CIBP sits on it
    #[serde(default = "default_cap_match_tolerance")]
    pub cap_match_tolerance_ft: f64,
}

fn default_existing_cibp_cap() -> f64 { 20.0 }
fn default_tool_isolation_plug() -> f64 { 100.0 }
fn default_detector_window() -> f64 { 100.0 }
fn default_detector_offset() -> f64 { 50.0 }
fn default_detector_cap() -> f64 { 100.0 }
fn default_cap_match_tolerance() -> f64 { 10.0 }

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            existing_cibp_cap_ft: default_existing_cibp_cap(),
            tool_isolation_plug_ft: default_tool_isolation_plug(),
            detector_window_ft: default_detector_window(),
            detector_offset_ft: default_detector_offset(),
            detector_cap_ft: default_detector_cap(),
            cap_match_tolerance_ft: default_cap_match_tolerance(),
        }
    }
}

// ============================================================================
// Plug placement
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlugConfig {
    /// Intermediate shoe plug extends this far above and below the shoe
    #[serde(default = "default_intermediate_half_length")]
    pub intermediate_shoe_half_length_ft: f64,

    /// Circulation perforations are shot this far below the surface shoe
    #[serde(default = "default_perf_below_shoe")]
    pub perf_circulate_below_shoe_ft: f64,

    /// Intermediate TOC deeper than this triggers perf-and-circulate
    #[serde(default = "default_perf_circulate_toc_limit")]
    pub perf_circulate_toc_limit_ft: f64,

    /// UQW base at or above this depth counts as shallow
    #[serde(default = "default_shallow_uqw")]
    pub shallow_uqw_threshold_ft: f64,

    /// Isolation interval above the producing interval top
    #[serde(default = "default_productive_offset")]
    pub productive_horizon_offset_ft: f64,

    /// Cement cap left inside casing above squeeze perforations
    #[serde(default = "default_squeeze_cap_length")]
    pub squeeze_cap_length_ft: f64,

    /// Formation top plug length (centred on the top)
    #[serde(default = "default_formation_plug_length")]
    pub formation_plug_length_ft: f64,
}

fn default_intermediate_half_length() -> f64 { 50.0 }
fn default_perf_below_shoe() -> f64 { 50.0 }
fn default_perf_circulate_toc_limit() -> f64 { 100.0 }
fn default_shallow_uqw() -> f64 { 500.0 }
fn default_productive_offset() -> f64 { 50.0 }
fn default_squeeze_cap_length() -> f64 { 50.0 }
fn default_formation_plug_length() -> f64 { 100.0 }

impl Default for PlugConfig {
    fn default() -> Self {
        Self {
            intermediate_shoe_half_length_ft: default_intermediate_half_length(),
            perf_circulate_below_shoe_ft: default_perf_below_shoe(),
            perf_circulate_toc_limit_ft: default_perf_circulate_toc_limit(),
            shallow_uqw_threshold_ft: default_shallow_uqw(),
            productive_horizon_offset_ft: default_productive_offset(),
            squeeze_cap_length_ft: default_squeeze_cap_length(),
            formation_plug_length_ft: default_formation_plug_length(),
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Used when a casing ID cannot be resolved at all (5-1/2" 17 lb/ft)
    #[serde(default = "default_fallback_casing_id")]
    pub fallback_casing_id_in: f64,

    /// OD fuzzy-match window against the nominal table
    #[serde(default = "default_od_tolerance")]
    pub od_match_tolerance_in: f64,

    /// Weight match window against the pipe-spec table
    #[serde(default = "default_weight_tolerance")]
    pub weight_match_tolerance_ppf: f64,
}

fn default_fallback_casing_id() -> f64 { 4.892 }
fn default_od_tolerance() -> f64 { 0.05 }
fn default_weight_tolerance() -> f64 { 0.25 }

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            fallback_casing_id_in: default_fallback_casing_id(),
            od_match_tolerance_in: default_od_tolerance(),
            weight_match_tolerance_ppf: default_weight_tolerance(),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Formation plug endpoints are rounded to this before duplicate detection
    #[serde(default = "default_dedup_rounding")]
    pub dedup_rounding_ft: f64,
}

fn default_dedup_rounding() -> f64 { 10.0 }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            dedup_rounding_ft: default_dedup_rounding(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = KernelConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: KernelConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.materials.capacity_divisor, 1029.4);
        assert_eq!(config.materials.minimum_sacks, 25);
        assert_eq!(config.merge.max_length_ft, 1250.0);
        assert_eq!(config.merge.max_members, 3);
        assert_eq!(config.barriers.existing_cibp_cap_ft, 20.0);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[merge]
max_members = 2

[barriers]
existing_cibp_cap_ft = 35.0
"#;
        let config: KernelConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.merge.max_members, 2);
        assert_eq!(config.barriers.existing_cibp_cap_ft, 35.0);
        // Non-overridden values retain defaults
        assert_eq!(config.merge.max_length_ft, 1250.0);
        assert_eq!(config.materials.squeeze_cap_multiplier, 1.4);
    }

    #[test]
    fn test_validation_catches_shrinking_multiplier() {
        let mut config = KernelConfig::default();
        config.materials.perf_circulate_topoff = 0.9;
        let result = config.validate();
        assert!(result.is_err(), "Multiplier below 1.0 should fail validation");
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("perf_circulate_topoff")));
        }
    }

    #[test]
    fn test_validation_catches_zero_members() {
        let mut config = KernelConfig::default();
        config.merge.max_members = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = KernelConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let roundtripped: KernelConfig =
            toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(original, roundtripped);
    }

    #[test]
    fn test_provenance_tracks_explicit_keys() {
        let (_, provenance) = KernelConfig::from_toml_str_with_provenance(
            "[materials]\nminimum_sacks = 30\n",
        )
        .expect("valid TOML");
        assert!(provenance.is_user_set("materials"));
        assert!(provenance.is_user_set("materials.minimum_sacks"));
        assert!(!provenance.is_user_set("materials.capacity_divisor"));
    }

    #[test]
    fn test_provenance_default_has_zero_keys() {
        assert!(ConfigProvenance::default().explicit_keys.is_empty());
    }
}
