//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for KernelConfig.
///
/// Derived from the serialized defaults so new fields are picked up
/// automatically.
pub fn known_config_keys() -> HashSet<String> {
    toml::Value::try_from(super::KernelConfig::default())
        .map(|v| walk_toml_keys(&v, "").into_iter().collect())
        .unwrap_or_default()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
/// Ties resolve alphabetically so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, k)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed KernelConfig.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent use; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::KernelConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let m = &config.materials;

    // 1029.4 is exact for bbl/ft with inches; anything far off is a unit mistake
    if m.capacity_divisor < 900.0 || m.capacity_divisor > 1100.0 {
        errors.push(format!(
            "materials.capacity_divisor = {:.1} is outside plausible range (900-1100)",
            m.capacity_divisor
        ));
    }

    if (m.ft3_per_bbl - 5.6146).abs() > 0.01 {
        warnings.push(ValidationWarning {
            field: "materials.ft3_per_bbl".to_string(),
            message: format!(
                "ft3_per_bbl = {:.4} differs from the standard 5.6146",
                m.ft3_per_bbl
            ),
            suggestion: None,
        });
    }

    // A per-1000-ft excess above 50% would double volumes by 2000 ft
    if m.texas_excess_per_kft > 0.5 {
        warnings.push(ValidationWarning {
            field: "materials.texas_excess_per_kft".to_string(),
            message: format!(
                "texas_excess_per_kft = {:.2} is unusually large (typical 0.10)",
                m.texas_excess_per_kft
            ),
            suggestion: None,
        });
    }

    if m.minimum_sacks > 200 {
        warnings.push(ValidationWarning {
            field: "materials.minimum_sacks".to_string(),
            message: format!("minimum_sacks = {} is unusually large", m.minimum_sacks),
            suggestion: None,
        });
    }

    // Casing IDs: 1-36 inches covers tubing to conductor
    let id = config.geometry.fallback_casing_id_in;
    if !(1.0..=36.0).contains(&id) {
        errors.push(format!(
            "geometry.fallback_casing_id_in = {id:.3} is outside physical range (1-36 inches)"
        ));
    }

    if config.geometry.od_match_tolerance_in > 0.25 {
        warnings.push(ValidationWarning {
            field: "geometry.od_match_tolerance_in".to_string(),
            message: format!(
                "od_match_tolerance_in = {:.3} may match the wrong nominal size",
                config.geometry.od_match_tolerance_in
            ),
            suggestion: None,
        });
    }

    if config.merge.max_length_ft > 5000.0 {
        warnings.push(ValidationWarning {
            field: "merge.max_length_ft".to_string(),
            message: format!(
                "max_length_ft = {:.0} allows very long single cement jobs",
                config.merge.max_length_ft
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
