//! End-to-end plan scenarios
//!
//! Each test drives `generate_plan` from JSON fixtures the way an upstream
//! resolver would hand them over, then checks the regulatory outcome.

use serde_json::{json, Value};
use wellplug::config::defaults::{
    CONSTRAINT_POLICY_INCOMPLETE, V_BELOW_BARRIER_REMOVED, V_BELOW_MINIMUM,
    V_PERF_CIRCULATE_BLOCKED,
};
use wellplug::geometry::capacity::{annulus_capacity, texas_factor};
use wellplug::kernel::materials::DETAIL_CALCULATION_GAP;
use wellplug::kernel::merge::DETAIL_MERGED;
use wellplug::types::{MechanicalType, RegulatoryPurpose, Severity};
use wellplug::{generate_plan, KernelConfig, Plan, Policy, WellFacts};

// ============================================================================
// Fixtures
// ============================================================================

fn facts(value: Value) -> WellFacts {
    WellFacts::from_json(value).expect("facts fixture should parse")
}

fn policy(value: Value) -> Policy {
    serde_json::from_value(value).expect("policy fixture should parse")
}

fn plan(facts: &WellFacts, policy: &Policy) -> Plan {
    generate_plan(facts, policy, &KernelConfig::default()).expect("plan generation")
}

/// A fully cased Permian-style well with perforations and formation tops.
fn cased_well() -> WellFacts {
    facts(json!({
        "api14": "42003012340000",
        "county": "Andrews",
        "surface_shoe_ft": 1200.0,
        "intermediate_shoe_ft": 4500.0,
        "production_shoe_ft": 9500.0,
        "production_casing_toc_ft": 6000.0,
        "uqw_base_ft": 300.0,
        "casing_strings": [
            {"name": "surface", "od_in": 13.375, "id_in": 12.615, "top_ft": 0.0,
             "bottom_ft": 1200.0, "hole_size_in": 17.5, "cement_top_ft": 0.0},
            {"name": "intermediate", "od_in": 8.625, "id_in": 7.921, "top_ft": 0.0,
             "bottom_ft": 4500.0, "hole_size_in": 12.25, "cement_top_ft": 2500.0},
            {"name": "production", "od_in": 5.5, "id_in": 4.892, "top_ft": 0.0,
             "bottom_ft": 9500.0, "hole_size_in": 7.875, "cement_top_ft": 6000.0}
        ],
        "perforations": [{"top_ft": 9000.0, "bottom_ft": 9100.0, "formation": "Wolfcamp"}],
        "formation_tops_map": {"San Andres": 4200.0, "Wolfcamp": 8200.0},
        "producing_interval": {"top_ft": 9000.0, "bottom_ft": 9100.0}
    }))
}

fn full_policy() -> Policy {
    policy(json!({
        "policy_id": "tx.w3a",
        "jurisdiction": "TX",
        "district": "08A",
        "complete": true,
        "requirements": {
            "surface_casing_shoe_plug_min_ft": {"value": 50, "citation_keys": ["tx.tac.16.3.14(e)(2)"]},
            "cement_above_cibp_min_ft": {"value": 100},
            "uqw_isolation_min_len_ft": {"value": 100},
            "top_plug_length_ft": {"value": 10},
            "intermediate_casing_shoe_plug_min_ft": {"value": 100},
            "productive_horizon_isolation_ft": {"value": 100}
        },
        "district_overrides": {
            "formation_tops": [{"formation": "San Andres", "min_length_ft": 100}]
        },
        "preferences": {
            "default_recipe": {
                "id": "class_h_neat", "class": "H", "density_ppg": 15.6,
                "yield_ft3_per_sk": 1.18, "water_gal_per_sk": 5.2
            }
        }
    }))
}

// ============================================================================
// Regulatory scenarios
// ============================================================================

#[test]
fn surface_shoe_plug_sits_directly_above_the_shoe() {
    let facts = facts(json!({"surface_shoe_ft": 1200.0}));
    let policy = policy(json!({
        "policy_id": "tx.w3a",
        "requirements": {
            "surface_casing_shoe_plug_min_ft": {"value": 50},
            "perf_circulate_to_surface_enabled": {"value": false}
        }
    }));

    let plan = plan(&facts, &policy);
    assert_eq!(plan.steps.len(), 1);
    let step = &plan.steps[0];
    assert_eq!(step.purpose, RegulatoryPurpose::SurfaceCasingShoePlug);
    assert_eq!((step.top_ft, step.bottom_ft), (1150.0, 1200.0));
    assert_eq!(step.id, 1);
}

/// One 5-1/2" production string, cemented up to 6000 ft.
fn single_string_well(extra: Value) -> WellFacts {
    let mut value = json!({
        "production_casing_toc_ft": 6000.0,
        "casing_strings": [
            {"name": "production", "od_in": 5.5, "id_in": 4.892, "top_ft": 0.0,
             "bottom_ft": 9500.0, "hole_size_in": 7.875, "cement_top_ft": 6000.0}
        ]
    });
    if let (Some(base), Some(more)) = (value.as_object_mut(), extra.as_object()) {
        base.extend(more.clone());
    }
    facts(value)
}

#[test]
fn cement_plugs_above_toc_are_squeezed_below_are_spotted() {
    // Every plug here is small enough to merge with its neighbour on sacks,
    // length and member count; only the squeeze/spot boundary keeps them apart
    let facts = single_string_well(json!({}));
    let policy = policy(json!({
        "policy_id": "tx.w3a",
        "steps_overrides": {
            "cement_plugs": [
                {"top_ft": 5700.0, "bottom_ft": 5750.0},
                {"top_ft": 5800.0, "bottom_ft": 5850.0},
                {"top_ft": 5900.0, "bottom_ft": 5950.0},
                {"top_ft": 6000.0, "bottom_ft": 6050.0}
            ]
        }
    }));

    let plan = plan(&facts, &policy);
    assert_eq!(plan.steps.len(), 2);

    let squeeze = plan
        .steps
        .iter()
        .find(|s| s.plug_type == Some(MechanicalType::PerfAndSqueezePlug))
        .expect("squeeze plug");
    assert!(squeeze.detail_flag(DETAIL_MERGED));
    assert_eq!((squeeze.top_ft, squeeze.bottom_ft), (5700.0, 5950.0));

    let spot = plan
        .steps
        .iter()
        .find(|s| s.plug_type == Some(MechanicalType::SpotPlug))
        .expect("spot plug");
    assert!(!spot.detail_flag(DETAIL_MERGED));
    assert_eq!((spot.top_ft, spot.bottom_ft), (6000.0, 6050.0));
}

#[test]
fn classified_squeeze_cap_follows_configured_length() {
    let facts = single_string_well(json!({"formation_tops_map": {"San Andres": 4200.0}}));
    let mut value = json!({
        "policy_id": "tx.w3a",
        "district_overrides": {
            "formation_tops": [{"formation": "San Andres", "min_length_ft": 100}]
        }
    });

    // squeeze 100 ft x 0.03086 x 1.5 + cap 50 ft x 0.02325 x 1.4 = 6.26 bbl = 29.8 sk
    let plan_default = plan(&facts, &policy(value.clone()));
    let plug = plan_default
        .steps_of(RegulatoryPurpose::FormationTopPlug)
        .next()
        .expect("formation plug");
    assert_eq!((plug.top_ft, plug.bottom_ft), (4150.0, 4250.0));
    assert_eq!(plug.plug_type, Some(MechanicalType::PerfAndSqueezePlug));
    assert_eq!(plug.sacks, Some(30));

    value["requirements"] = json!({"squeeze_cap_length_ft": {"value": 100}});
    let plan_long_cap = plan(&facts, &policy(value));
    let plug = plan_long_cap
        .steps_of(RegulatoryPurpose::FormationTopPlug)
        .next()
        .expect("formation plug");
    assert_eq!(plug.sacks, Some(38));
}

#[test]
fn open_hole_plug_with_unknown_toc_is_priced() {
    let facts = facts(json!({
        "casing_strings": [
            {"name": "production", "od_in": 5.5, "id_in": 4.892, "top_ft": 0.0,
             "bottom_ft": 9000.0, "hole_size_in": 7.875}
        ],
        "producing_interval": {"top_ft": 9500.0, "bottom_ft": 9600.0}
    }));
    let policy = policy(json!({
        "policy_id": "tx.w3a",
        "requirements": {"productive_horizon_isolation_ft": {"value": 50}}
    }));

    let plan = plan(&facts, &policy);
    let plug = plan
        .steps_of(RegulatoryPurpose::ProductiveHorizonIsolationPlug)
        .next()
        .expect("productive horizon plug");
    assert_eq!((plug.top_ft, plug.bottom_ft), (9450.0, 9500.0));
    assert_eq!(plug.plug_type, Some(MechanicalType::PerfAndSqueezePlug));
    assert_eq!(plug.sacks, Some(49));
    assert!(!plug.details.contains_key(DETAIL_CALCULATION_GAP));
}

#[test]
fn existing_cibp_without_cap_gets_twenty_foot_cap() {
    let facts = facts(json!({
        "existing_mechanical_barriers": ["CIBP"],
        "existing_cibp_ft": 5000.0
    }));
    let policy = policy(json!({"policy_id": "tx.w3a"}));

    let plan = plan(&facts, &policy);
    let caps: Vec<_> = plan.steps_of(RegulatoryPurpose::CibpCap).collect();
    assert_eq!(caps.len(), 1);
    assert_eq!((caps[0].top_ft, caps[0].bottom_ft), (4980.0, 5000.0));
    assert_eq!(caps[0].plug_type, Some(MechanicalType::DumbbellPlug));
}

#[test]
fn required_cibp_knob_tops_up_instead_of_default_cap() {
    let facts = facts(json!({
        "existing_mechanical_barriers": ["CIBP"],
        "existing_cibp_ft": 5000.0
    }));

    let plan = plan(&facts, &full_policy());
    let caps: Vec<_> = plan.steps_of(RegulatoryPurpose::CibpCap).collect();
    assert_eq!(caps.len(), 1);
    assert_eq!((caps[0].top_ft, caps[0].bottom_ft), (4900.0, 5000.0));
}

#[test]
fn override_perf_circulate_through_cibp_is_blocked_not_removed_as_minor() {
    let facts = facts(json!({
        "existing_mechanical_barriers": ["CIBP"],
        "existing_cibp_ft": 5000.0
    }));
    let policy = policy(json!({
        "policy_id": "tx.w3a",
        "steps_overrides": {"perf_circulate": [{"top_ft": 4000.0, "bottom_ft": 5100.0}]}
    }));

    let plan = plan(&facts, &policy);
    assert_eq!(plan.steps_of(RegulatoryPurpose::PerfCirculate).count(), 0);
    assert!(plan
        .violations
        .iter()
        .any(|v| v.code == V_PERF_CIRCULATE_BLOCKED && v.severity == Severity::Info));
    assert!(!plan.has_violation(V_BELOW_BARRIER_REMOVED));
}

#[test]
fn perf_circulate_through_existing_cibp_is_dropped() {
    let facts = facts(json!({
        "surface_shoe_ft": 1200.0,
        "existing_mechanical_barriers": ["CIBP"],
        "existing_cibp_ft": 1000.0,
        "casing_strings": [
            {"name": "surface", "od_in": 13.375, "id_in": 12.615, "top_ft": 0.0,
             "bottom_ft": 1200.0, "cement_top_ft": 0.0},
            {"name": "intermediate", "od_in": 9.625, "id_in": 8.835, "top_ft": 0.0,
             "bottom_ft": 4500.0}
        ]
    }));
    let policy = policy(json!({"policy_id": "tx.w3a"}));

    let plan = plan(&facts, &policy);
    assert_eq!(plan.steps_of(RegulatoryPurpose::PerfCirculateToSurface).count(), 0);
    let blocked = plan
        .violations
        .iter()
        .find(|v| v.code == V_PERF_CIRCULATE_BLOCKED)
        .expect("blocked violation");
    assert_eq!(blocked.severity, Severity::Info);

    let cap = plan
        .steps_of(RegulatoryPurpose::CibpCap)
        .next()
        .expect("cap above the CIBP");
    assert_eq!((cap.top_ft, cap.bottom_ft), (980.0, 1000.0));
}

#[test]
fn incomplete_policy_yields_constraint_and_no_steps() {
    let facts = cased_well();
    let policy = policy(json!({
        "policy_id": "tx.w3a",
        "complete": false,
        "missing_knobs": ["top_plug_length_ft"]
    }));

    let first = plan(&facts, &policy);
    assert!(first.steps.is_empty());
    assert!(!first.policy_complete);
    assert!(first
        .constraints
        .iter()
        .any(|c| c.code == CONSTRAINT_POLICY_INCOMPLETE));

    let second = plan(&facts, &policy);
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );
}

// ============================================================================
// Plan-wide properties
// ============================================================================

#[test]
fn full_plan_is_deterministic() {
    let facts = cased_well();
    let policy = full_policy();
    let a = serde_json::to_string(&plan(&facts, &policy)).expect("serialize");
    let b = serde_json::to_string(&plan(&facts, &policy)).expect("serialize");
    assert_eq!(a, b);
}

#[test]
fn full_plan_intervals_are_ordered_and_ids_sequential() {
    let plan = plan(&cased_well(), &full_policy());
    assert!(!plan.steps.is_empty());
    for (i, step) in plan.steps.iter().enumerate() {
        assert!(
            step.top_ft <= step.bottom_ft,
            "step {} inverted: {}-{}",
            step.id,
            step.top_ft,
            step.bottom_ft
        );
        assert_eq!(step.id as usize, i + 1);
    }
}

#[test]
fn full_plan_meets_sack_minimum_and_totals_add_up() {
    let plan = plan(&cased_well(), &full_policy());
    for step in &plan.steps {
        if step.purpose.is_cement_bearing() && !step.purpose.is_minimum_exempt() {
            if let Some(sacks) = step.sacks {
                assert!(sacks >= 25, "step {} ({}) has {sacks} sacks", step.id, step.purpose);
            }
        }
    }
    assert!(!plan.has_violation(V_BELOW_MINIMUM));

    let sum: u32 = plan.steps.iter().filter_map(|s| s.sacks).sum();
    assert_eq!(plan.materials_totals.total_sacks, sum);
    assert!(sum > 0);
}

#[test]
fn full_plan_places_district_formation_plug() {
    let plan = plan(&cased_well(), &full_policy());
    let plug = plan
        .steps
        .iter()
        .find(|s| s.formation.as_deref() == Some("San Andres"))
        .expect("San Andres plug");
    assert!(plug.top_ft <= 4200.0 && plug.bottom_ft >= 4200.0);
}

#[test]
fn invalid_config_is_rejected_before_any_stage_runs() {
    let mut config = KernelConfig::default();
    config.materials.capacity_divisor = 0.0;
    let err = generate_plan(&cased_well(), &full_policy(), &config).expect_err("bad divisor");
    assert!(matches!(err, wellplug::KernelError::Config(_)));
}

// ============================================================================
// Geometry properties
// ============================================================================

#[test]
fn texas_factor_steps_at_each_started_thousand_feet() {
    assert_eq!(texas_factor(0.0), 1.0);
    assert!((texas_factor(999.0) - 1.1).abs() < 1e-12);
    assert!((texas_factor(5000.0) - 1.5).abs() < 1e-12);
    assert!((texas_factor(5001.0) - 1.6).abs() < 1e-12);
    let mut last = 1.0;
    for depth in (0..20_000).step_by(250) {
        let f = texas_factor(f64::from(depth));
        assert!(f >= last);
        last = f;
    }
}

#[test]
fn annulus_capacity_is_zero_when_pipe_fills_bore() {
    assert!((annulus_capacity(4.892, 0.0) - 4.892_f64.powi(2) / 1029.4).abs() < 1e-12);
    assert_eq!(annulus_capacity(4.892, 4.892), 0.0);
    assert_eq!(annulus_capacity(4.0, 5.5), 0.0);
    assert!(annulus_capacity(8.835, 5.5) < annulus_capacity(8.835, 2.875));
}
