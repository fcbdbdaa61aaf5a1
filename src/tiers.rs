//! Maturity tiers over the embedded band contract.
//!
//! Every section that colors or labels a score goes through this module,
//! so a given percentage maps to exactly one tier everywhere in a report.

use crate::types::Color;
use taqrir_tier_contract::{TierBandDef, band_for, tier_band_defs_v1};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaturityTier {
    Basic,
    Emerging,
    Ideal,
}

impl MaturityTier {
    /// Classifies an unrounded percentage. Display rounding happens after
    /// this, never before.
    pub fn for_percentage(percentage: f64) -> Self {
        Self::from_band(band_for(percentage))
    }

    fn from_band(band: &'static TierBandDef) -> Self {
        match band.id {
            "basic" => MaturityTier::Basic,
            "emerging" => MaturityTier::Emerging,
            _ => MaturityTier::Ideal,
        }
    }

    fn band(self) -> &'static TierBandDef {
        let id = match self {
            MaturityTier::Basic => "basic",
            MaturityTier::Emerging => "emerging",
            MaturityTier::Ideal => "ideal",
        };
        tier_band_defs_v1()
            .iter()
            .find(|b| b.id == id)
            .unwrap_or(&tier_band_defs_v1()[0])
    }

    pub fn label_ar(self) -> &'static str {
        self.band().label_ar
    }

    pub fn color(self) -> Color {
        let [r, g, b] = self.band().color_rgb;
        Color::from_rgb8(r, g, b)
    }

    pub fn all() -> [MaturityTier; 3] {
        [
            MaturityTier::Basic,
            MaturityTier::Emerging,
            MaturityTier::Ideal,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_uses_unrounded_values() {
        // 49.6 displays as 50% but sits below the emerging band.
        assert_eq!(MaturityTier::for_percentage(49.6), MaturityTier::Basic);
        assert_eq!(MaturityTier::for_percentage(50.0), MaturityTier::Emerging);
        assert_eq!(MaturityTier::for_percentage(82.0), MaturityTier::Ideal);
    }

    #[test]
    fn every_tier_has_a_label_and_color() {
        for tier in MaturityTier::all() {
            assert!(!tier.label_ar().is_empty());
            assert_ne!(tier.color(), Color::WHITE);
        }
    }

    #[test]
    fn boundaries_partition_the_scale() {
        assert_eq!(MaturityTier::for_percentage(0.0), MaturityTier::Basic);
        assert_eq!(MaturityTier::for_percentage(74.999), MaturityTier::Emerging);
        assert_eq!(MaturityTier::for_percentage(75.0), MaturityTier::Ideal);
        assert_eq!(MaturityTier::for_percentage(100.0), MaturityTier::Ideal);
    }
}
