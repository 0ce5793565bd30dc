//! Casing OD → ID resolution
//!
//! Completion records usually carry OD and weight but not ID. Resolution
//! precedence:
//! 1. Explicit ID on the record
//! 2. Pipe-spec table lookup by (OD, weight)
//! 3. OD-only nominal table (most common weight for that size)
//! 4. Fuzzy OD match within tolerance against the nominal table
//! 5. Caller default

/// External pipe-spec collaborator.
pub trait PipeSpecLookup {
    /// Inner diameter for a pipe of the given OD and (optional) nominal weight.
    fn inner_diameter(&self, od_in: f64, weight_lbft: Option<f64>) -> Option<f64>;
}

/// (OD in, weight lb/ft, ID in) from API 5CT.
static API_5CT: &[(f64, f64, f64)] = &[
    (2.375, 4.7, 1.995),
    (2.875, 6.5, 2.441),
    (3.5, 9.3, 2.992),
    (4.5, 9.5, 4.090),
    (4.5, 10.5, 4.052),
    (4.5, 11.6, 4.000),
    (4.5, 13.5, 3.920),
    (5.0, 15.0, 4.408),
    (5.0, 18.0, 4.276),
    (5.5, 14.0, 5.012),
    (5.5, 15.5, 4.950),
    (5.5, 17.0, 4.892),
    (5.5, 20.0, 4.778),
    (5.5, 23.0, 4.670),
    (7.0, 20.0, 6.456),
    (7.0, 23.0, 6.366),
    (7.0, 26.0, 6.276),
    (7.0, 29.0, 6.184),
    (7.0, 32.0, 6.094),
    (8.625, 24.0, 8.097),
    (8.625, 28.0, 8.017),
    (8.625, 32.0, 7.921),
    (8.625, 36.0, 7.825),
    (9.625, 36.0, 8.921),
    (9.625, 40.0, 8.835),
    (9.625, 43.5, 8.755),
    (9.625, 47.0, 8.681),
    (10.75, 40.5, 10.050),
    (10.75, 45.5, 9.950),
    (10.75, 51.0, 9.850),
    (11.75, 47.0, 11.000),
    (11.75, 54.0, 10.880),
    (13.375, 48.0, 12.715),
    (13.375, 54.5, 12.615),
    (13.375, 61.0, 12.515),
    (13.375, 68.0, 12.415),
    (16.0, 65.0, 15.250),
    (16.0, 75.0, 15.124),
    (16.0, 84.0, 15.010),
    (20.0, 94.0, 19.124),
];

/// OD → ID for the most common weight of each size.
static NOMINAL_ID: &[(f64, f64)] = &[
    (2.375, 1.995),
    (2.875, 2.441),
    (3.5, 2.992),
    (4.5, 4.000),
    (5.0, 4.276),
    (5.5, 4.892),
    (7.0, 6.276),
    (8.625, 7.921),
    (9.625, 8.835),
    (10.75, 9.950),
    (11.75, 10.880),
    (13.375, 12.615),
    (16.0, 15.124),
    (20.0, 19.124),
];

const EXACT_OD_EPS: f64 = 1e-6;

/// Built-in API 5CT tables.
#[derive(Debug, Clone, Copy)]
pub struct StandardPipeSpecs {
    pub weight_tolerance_ppf: f64,
}

impl Default for StandardPipeSpecs {
    fn default() -> Self {
        Self {
            weight_tolerance_ppf: 0.25,
        }
    }
}

impl PipeSpecLookup for StandardPipeSpecs {
    fn inner_diameter(&self, od_in: f64, weight_lbft: Option<f64>) -> Option<f64> {
        let weight = weight_lbft?;
        API_5CT
            .iter()
            .filter(|(od, _, _)| (od - od_in).abs() < EXACT_OD_EPS)
            .map(|&(_, w, id)| ((w - weight).abs(), id))
            .filter(|(diff, _)| *diff <= self.weight_tolerance_ppf)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }
}

/// How a casing ID was obtained, recorded for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    Explicit,
    PipeSpec,
    Nominal,
    FuzzyNominal,
    Default,
}

/// Nominal ID for an OD, exact match first, then nearest within tolerance.
pub fn nominal_id(od_in: f64, tolerance_in: f64) -> Option<(f64, IdSource)> {
    if let Some(&(_, id)) = NOMINAL_ID
        .iter()
        .find(|(od, _)| (od - od_in).abs() < EXACT_OD_EPS)
    {
        return Some((id, IdSource::Nominal));
    }
    NOMINAL_ID
        .iter()
        .map(|&(od, id)| ((od - od_in).abs(), id))
        .filter(|(diff, _)| *diff <= tolerance_in + EXACT_OD_EPS)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, id)| (id, IdSource::FuzzyNominal))
}

/// Resolve a casing ID following the documented precedence.
pub fn resolve_casing_id(
    lookup: &dyn PipeSpecLookup,
    od_in: f64,
    weight_lbft: Option<f64>,
    explicit_id_in: Option<f64>,
    tolerance_in: f64,
    default_id_in: f64,
) -> (f64, IdSource) {
    if let Some(id) = explicit_id_in.filter(|id| *id > 0.0 && *id < od_in) {
        return (id, IdSource::Explicit);
    }
    if let Some(id) = lookup.inner_diameter(od_in, weight_lbft) {
        return (id, IdSource::PipeSpec);
    }
    nominal_id(od_in, tolerance_in).unwrap_or((default_id_in, IdSource::Default))
}
