//! Cement slurry recipes and sack rounding.

use serde::{Deserialize, Serialize};

/// How fractional sack counts are turned into whole sacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    #[default]
    Nearest,
    Up,
}

impl Rounding {
    pub fn apply(self, sacks: f64) -> f64 {
        match self {
            Rounding::Nearest => sacks.round(),
            // Guard against 12.000000001 rounding up to 13
            Rounding::Up => (sacks - 1e-9).ceil().max(0.0),
        }
    }
}

/// A cement slurry design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlurryRecipe {
    pub id: String,
    /// API cement class ("A", "C", "H", ...)
    pub class: String,
    pub density_ppg: f64,
    pub yield_ft3_per_sk: f64,
    pub water_gal_per_sk: f64,
    #[serde(default)]
    pub additives: Vec<String>,
    #[serde(default)]
    pub rounding: Option<Rounding>,
}

impl SlurryRecipe {
    /// Neat Class H, used when a policy supplies no recipe.
    pub fn class_h_fallback() -> Self {
        Self {
            id: "class_h_neat_fallback".to_string(),
            class: "H".to_string(),
            density_ppg: 15.6,
            yield_ft3_per_sk: 1.18,
            water_gal_per_sk: 5.2,
            additives: Vec::new(),
            rounding: None,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.yield_ft3_per_sk.is_finite() && self.yield_ft3_per_sk > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_up_ignores_float_noise() {
        assert_eq!(Rounding::Up.apply(12.000_000_000_1), 12.0);
        assert_eq!(Rounding::Up.apply(12.01), 13.0);
        assert_eq!(Rounding::Nearest.apply(12.49), 12.0);
        assert_eq!(Rounding::Nearest.apply(12.5), 13.0);
    }

    #[test]
    fn test_fallback_recipe_is_usable() {
        let r = SlurryRecipe::class_h_fallback();
        assert!(r.is_usable());
        assert_eq!(r.class, "H");
    }
}
