//! Per-population PRS adjustment parameters.

use crate::common::Population;

/// Adjustment parameters applied to PRS computation for one population.
#[derive(
    Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new,
)]
pub struct AncestryAdjustment {
    /// Relative shift applied to the mean of the reference score distribution.
    pub percentile_adjustment: f64,
    /// Multiplier applied to the raw score.
    pub effect_size_multiplier: f64,
    /// Multiplier applied to the standard deviation of the reference score
    /// distribution, accounting for population LD structure.
    pub ld_correction_factor: f64,
}

impl AncestryAdjustment {
    /// The adjustment parameters for `population`.
    ///
    /// European parameters are the neutral baseline since most published
    /// PRS models were trained on European cohorts.
    pub fn for_population(population: Population) -> Self {
        match population {
            Population::Eur => Self::new(0.0, 1.0, 1.0),
            Population::Afr => Self::new(0.05, 0.95, 0.9),
            Population::Eas => Self::new(-0.03, 1.05, 1.1),
            Population::Sas => Self::new(0.02, 0.98, 0.95),
            Population::Amr => Self::new(0.01, 1.0, 1.0),
        }
    }

    /// The neutral baseline parameters, used when no ancestry is available.
    pub fn baseline() -> Self {
        Self::for_population(Population::Eur)
    }

    /// Whether the parameters leave scores and percentiles unchanged.
    pub fn is_neutral(&self) -> bool {
        self.percentile_adjustment == 0.0
            && self.effect_size_multiplier == 1.0
            && self.ld_correction_factor == 1.0
    }
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::common::Population;

    use super::AncestryAdjustment;

    #[rstest]
    #[case(Population::Eur, 0.0, 1.0, 1.0)]
    #[case(Population::Afr, 0.05, 0.95, 0.9)]
    #[case(Population::Eas, -0.03, 1.05, 1.1)]
    #[case(Population::Sas, 0.02, 0.98, 0.95)]
    #[case(Population::Amr, 0.01, 1.0, 1.0)]
    fn for_population(
        #[case] population: Population,
        #[case] percentile_adjustment: f64,
        #[case] effect_size_multiplier: f64,
        #[case] ld_correction_factor: f64,
    ) {
        let adjustment = AncestryAdjustment::for_population(population);

        assert!(approx_eq!(
            f64,
            adjustment.percentile_adjustment,
            percentile_adjustment,
            ulps = 2
        ));
        assert!(approx_eq!(
            f64,
            adjustment.effect_size_multiplier,
            effect_size_multiplier,
            ulps = 2
        ));
        assert!(approx_eq!(
            f64,
            adjustment.ld_correction_factor,
            ld_correction_factor,
            ulps = 2
        ));
    }

    #[test]
    fn baseline_is_neutral() {
        assert!(AncestryAdjustment::baseline().is_neutral());
        assert!(!AncestryAdjustment::for_population(Population::Afr).is_neutral());
        assert_eq!(
            AncestryAdjustment::baseline(),
            AncestryAdjustment::for_population(Population::Eur)
        );
    }
}
