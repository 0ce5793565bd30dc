//! Wellbore capacity formulas
//!
//! Oilfield capacity in bbl/ft for diameters in inches:
//! capacity = D² / 1029.4
//!
//! The constant comes from π/4 × (1/144 ft²/in²) ÷ 5.6146 ft³/bbl.

/// Standard capacity divisor (bbl/ft from inches²).
pub const CAPACITY_DIVISOR: f64 = 1029.4;

/// Cubic feet per barrel.
pub const FT3_PER_BBL: f64 = 5.6146;

/// Annular capacity between an outer bore and an inner pipe, bbl/ft.
///
/// Returns 0 when the inner pipe fills or exceeds the outer bore.
pub fn annulus_capacity(outer_id_in: f64, inner_od_in: f64) -> f64 {
    annulus_capacity_with(outer_id_in, inner_od_in, CAPACITY_DIVISOR)
}

pub fn annulus_capacity_with(outer_id_in: f64, inner_od_in: f64, divisor: f64) -> f64 {
    if outer_id_in <= inner_od_in || divisor <= 0.0 {
        return 0.0;
    }
    let inner = inner_od_in.max(0.0);
    (outer_id_in * outer_id_in - inner * inner) / divisor
}

/// Capacity of an open cylinder (casing interior or open hole), bbl/ft.
pub fn cylinder_capacity(id_in: f64) -> f64 {
    cylinder_capacity_with(id_in, CAPACITY_DIVISOR)
}

pub fn cylinder_capacity_with(id_in: f64, divisor: f64) -> f64 {
    if id_in <= 0.0 || divisor <= 0.0 {
        return 0.0;
    }
    id_in * id_in / divisor
}

/// Texas depth excess factor (TAC §3.14(d)(11)).
///
/// factor = 1 + step × ceil(depth / 1000), using the deeper endpoint.
/// With the statutory 10% step: 5000 ft → 1.5, 5001 ft → 1.6.
pub fn texas_factor(bottom_depth_ft: f64) -> f64 {
    texas_factor_with(bottom_depth_ft, 0.10)
}

pub fn texas_factor_with(bottom_depth_ft: f64, step_per_kft: f64) -> f64 {
    if !bottom_depth_ft.is_finite() || bottom_depth_ft <= 0.0 {
        return 1.0;
    }
    1.0 + step_per_kft * (bottom_depth_ft / 1000.0).ceil()
}
