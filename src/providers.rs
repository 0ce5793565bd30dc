//! Input providers
//!
//! The kernel never touches storage. These collaborators hand it a resolved
//! [`Policy`] and normalized [`WellFacts`]:
//!
//! - [`PolicyProvider`] - policy lookup by district / county / field
//! - [`FactsProvider`] - already-normalized facts by API-14 number
//!
//! File-backed implementations are provided for the CLI and tests.

use crate::types::{FactsError, Policy, WellFacts};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid facts in {path}: {source}")]
    Facts {
        path: PathBuf,
        #[source]
        source: FactsError,
    },

    #[error("no facts found for well {0}")]
    NotFound(String),
}

/// Resolves the policy that applies to a well's location.
pub trait PolicyProvider {
    fn policy_for(
        &self,
        district: Option<&str>,
        county: Option<&str>,
        field: Option<&str>,
    ) -> Option<Policy>;
}

/// Supplies normalized facts for a well.
pub trait FactsProvider {
    fn facts_for(&self, api14: &str) -> Result<WellFacts, ProviderError>;
}

// ============================================================================
// Static policy map
// ============================================================================

/// In-memory policies keyed `district/county/field`; empty segments are
/// wildcards. Lookup walks from the most specific key to the fallback.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicyProvider {
    policies: BTreeMap<String, Policy>,
    fallback: Option<Policy>,
}

impl StaticPolicyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(district: Option<&str>, county: Option<&str>, field: Option<&str>) -> String {
        let norm = |s: Option<&str>| s.map(|v| v.trim().to_ascii_lowercase()).unwrap_or_default();
        format!("{}/{}/{}", norm(district), norm(county), norm(field))
    }

    pub fn insert(
        &mut self,
        district: Option<&str>,
        county: Option<&str>,
        field: Option<&str>,
        policy: Policy,
    ) {
        self.policies.insert(Self::key(district, county, field), policy);
    }

    pub fn with_fallback(mut self, policy: Policy) -> Self {
        self.fallback = Some(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.fallback.is_none()
    }
}

impl PolicyProvider for StaticPolicyProvider {
    fn policy_for(
        &self,
        district: Option<&str>,
        county: Option<&str>,
        field: Option<&str>,
    ) -> Option<Policy> {
        let candidates = [
            Self::key(district, county, field),
            Self::key(district, county, None),
            Self::key(district, None, None),
        ];
        candidates
            .iter()
            .find_map(|k| self.policies.get(k))
            .or(self.fallback.as_ref())
            .cloned()
    }
}

// ============================================================================
// JSON files
// ============================================================================

/// Read one facts document, unwrapping `{value, provenance}` fact wrappers.
pub fn read_facts_file(path: &Path) -> Result<WellFacts, ProviderError> {
    let raw = read_json(path)?;
    WellFacts::from_json(raw).map_err(|source| ProviderError::Facts {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_policy_file(path: &Path) -> Result<Policy, ProviderError> {
    let raw = read_json(path)?;
    serde_json::from_value(raw).map_err(|source| ProviderError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json(path: &Path) -> Result<serde_json::Value, ProviderError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ProviderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ProviderError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Facts stored one file per well as `<dir>/<api14>.json`.
#[derive(Debug, Clone)]
pub struct JsonFactsProvider {
    dir: PathBuf,
}

impl JsonFactsProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FactsProvider for JsonFactsProvider {
    fn facts_for(&self, api14: &str) -> Result<WellFacts, ProviderError> {
        let digits: String = api14.chars().filter(char::is_ascii_digit).collect();
        let path = self.dir.join(format!("{digits}.json"));
        if !path.exists() {
            return Err(ProviderError::NotFound(api14.to_string()));
        }
        debug!(path = %path.display(), "Loading well facts");
        let mut facts = read_facts_file(&path)?;
        facts.api14.get_or_insert(digits);
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn policy(id: &str) -> Policy {
        Policy {
            policy_id: id.to_string(),
            ..Policy::default()
        }
    }

    #[test]
    fn test_most_specific_policy_wins() {
        let mut provider = StaticPolicyProvider::new().with_fallback(policy("statewide"));
        provider.insert(Some("08A"), None, None, policy("d08a"));
        provider.insert(Some("08A"), Some("Andrews"), None, policy("d08a.andrews"));

        let get = |d, c, f| provider.policy_for(d, c, f).map(|p| p.policy_id);
        assert_eq!(get(Some("08a"), Some("ANDREWS"), Some("Fuhrman")).as_deref(), Some("d08a.andrews"));
        assert_eq!(get(Some("08A"), Some("Gaines"), None).as_deref(), Some("d08a"));
        assert_eq!(get(Some("7C"), None, None).as_deref(), Some("statewide"));
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn test_json_facts_provider() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut file =
            std::fs::File::create(dir.path().join("42003012340000.json")).expect("create facts file");
        let body = json!({
            "surface_shoe_ft": {"value": 1200.0, "provenance": {"source": "W-2", "page": 1}},
            "county": "Andrews"
        });
        write!(file, "{body}").expect("write facts");

        let provider = JsonFactsProvider::new(dir.path());
        let facts = provider.facts_for("42-003-01234-0000").expect("facts");
        assert_eq!(facts.surface_shoe_ft, Some(1200.0));
        assert_eq!(facts.api14.as_deref(), Some("42003012340000"));
        assert!(facts.provenance.contains_key("surface_shoe_ft"));

        assert!(matches!(
            provider.facts_for("42-003-99999-0000"),
            Err(ProviderError::NotFound(_))
        ));
    }

    #[test]
    fn test_bad_policy_json_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{\"policy_id\": 7}}").expect("write");
        let err = read_policy_file(file.path()).expect_err("policy_id must be a string");
        assert!(matches!(err, ProviderError::Json { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
