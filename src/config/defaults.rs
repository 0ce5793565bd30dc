//! System-wide default constants.
//!
//! Centralises policy knob names and fixed regulatory values so generators,
//! overrides and tests agree on spelling. Grouped by subsystem.

// ============================================================================
// Policy knobs (requirement keys)
// ============================================================================

pub const KNOB_SURFACE_SHOE_MIN_FT: &str = "surface_casing_shoe_plug_min_ft";
pub const KNOB_SURFACE_COVERAGE_CHECK: &str = "surface_casing_coverage_check";
pub const KNOB_CEMENT_ABOVE_CIBP_MIN_FT: &str = "cement_above_cibp_min_ft";
pub const KNOB_EXISTING_CIBP_CAP_FT: &str = "existing_cibp_cap_ft";
pub const KNOB_CIBP_CAP_LENGTH_FT: &str = "cibp_cap_length_ft";
pub const KNOB_UQW_ISOLATION_MIN_LEN_FT: &str = "uqw_isolation_min_len_ft";
pub const KNOB_TOP_PLUG_LENGTH_FT: &str = "top_plug_length_ft";
pub const KNOB_CASING_CUT_BELOW_SURFACE_FT: &str = "casing_cut_below_surface_ft";
pub const KNOB_INTERMEDIATE_SHOE_MIN_FT: &str = "intermediate_casing_shoe_plug_min_ft";
pub const KNOB_PERF_CIRCULATE_ENABLED: &str = "perf_circulate_to_surface_enabled";
pub const KNOB_SHALLOW_UQW_THRESHOLD_FT: &str = "shallow_uqw_threshold_ft";
pub const KNOB_PRODUCTIVE_HORIZON_FT: &str = "productive_horizon_isolation_ft";
pub const KNOB_SQUEEZE_CAP_LENGTH_FT: &str = "squeeze_cap_length_ft";
pub const KNOB_TOOL_ISOLATION_FT: &str = "tool_isolation_plug_ft";

/// Knobs every complete policy must resolve. Reported in the
/// `policy_incomplete` constraint when the resolver left them out.
pub const REQUIRED_KNOBS: &[&str] = &[
    KNOB_SURFACE_SHOE_MIN_FT,
    KNOB_CEMENT_ABOVE_CIBP_MIN_FT,
    KNOB_UQW_ISOLATION_MIN_LEN_FT,
    KNOB_TOP_PLUG_LENGTH_FT,
];

// ============================================================================
// Constraint / violation codes
// ============================================================================

pub const CONSTRAINT_POLICY_INCOMPLETE: &str = "policy_incomplete";

pub const V_SURFACE_SHOE_UNKNOWN: &str = "surface_shoe_depth_unknown";
pub const V_SURFACE_COVERAGE: &str = "surface_casing_does_not_cover_uqw";
pub const V_UQW_MISSING: &str = "uqw_isolation_missing";
pub const V_PERF_CIRCULATE_BLOCKED: &str = "perf_circulate_blocked_by_cibp";
pub const V_FORMATION_TOP_UNKNOWN: &str = "formation_top_unknown";
pub const V_BELOW_MINIMUM: &str = "below_25_sack_minimum";
pub const V_BELOW_BARRIER_REMOVED: &str = "step_below_existing_barrier_removed";
pub const V_PROPOSAL_TRUNCATED: &str = "proposal_ladder_truncated";
