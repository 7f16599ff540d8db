//! Data quality assessment for polygenic score computation.

use crate::{
    genotype::GenotypeStore,
    prs::{model::PrsModel, score::ScoreAncestry},
};

/// Recommendation on whether ancestry adjustment is worthwhile.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
pub enum RecommendationTier {
    /// Ancestry assignment is confident and marker coverage is good.
    #[strum(serialize = "Ancestry-adjusted PRS recommended")]
    #[serde(rename = "Ancestry-adjusted PRS recommended")]
    AdjustmentRecommended,
    /// Ancestry assignment is usable but not strong.
    #[strum(serialize = "Ancestry adjustment may provide moderate improvement")]
    #[serde(rename = "Ancestry adjustment may provide moderate improvement")]
    ModerateImprovement,
    /// Ancestry assignment is too weak to adjust on.
    #[strum(serialize = "Consider manual ancestry specification or skip ancestry adjustment")]
    #[serde(rename = "Consider manual ancestry specification or skip ancestry adjustment")]
    ConsiderManualAncestry,
}

/// Quality assessment of one model against one sample.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrsValidation {
    /// Number of markers in the model.
    pub model_snps: usize,
    /// Number of model markers found in the sample.
    pub snps_found: usize,
    /// Fraction of model markers found in the sample.
    pub coverage: f64,
    /// Non-fatal quality concerns.
    pub warnings: Vec<String>,
    /// Severe quality concerns.
    pub errors: Vec<String>,
    /// Confidence in the ancestry assignment, when one was used.
    pub ancestry_confidence: Option<f64>,
    /// Adjustment recommendation, when ancestry was used.
    pub recommendation: Option<RecommendationTier>,
}

/// Assess marker coverage of `model` against `store`.
pub fn validate_model(store: &GenotypeStore, model: &PrsModel) -> PrsValidation {
    let snps_found = model
        .variants
        .iter()
        .filter(|variant| store.contains(&variant.rsid))
        .count();
    let model_snps = model.variants.len();
    let coverage = if model_snps > 0 {
        snps_found as f64 / model_snps as f64
    } else {
        0.0
    };

    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    if coverage < 0.5 {
        warnings.push(format!("Low SNP coverage: {:.1}", coverage));
    }
    if coverage < 0.1 {
        errors.push(String::from(
            "Extremely low SNP coverage - results may be unreliable",
        ));
    }

    PrsValidation {
        model_snps,
        snps_found,
        coverage,
        warnings,
        errors,
        ancestry_confidence: None,
        recommendation: None,
    }
}

/// Assess `model` against `store` including the ancestry context.
pub fn validate_with_ancestry(
    store: &GenotypeStore,
    model: &PrsModel,
    ancestry: &ScoreAncestry,
) -> PrsValidation {
    let mut validation = validate_model(store, model);
    let confidence = ancestry.confidence;
    validation.ancestry_confidence = Some(confidence);

    if confidence < 0.5 {
        validation.warnings.push(String::from(
            "Low confidence in ancestry inference - results may be less reliable",
        ));
    } else if confidence < 0.7 {
        validation
            .warnings
            .push(String::from("Moderate confidence in ancestry inference"));
    }

    validation.recommendation = Some(if confidence >= 0.7 && validation.coverage >= 0.5 {
        RecommendationTier::AdjustmentRecommended
    } else if confidence >= 0.5 {
        RecommendationTier::ModerateImprovement
    } else {
        RecommendationTier::ConsiderManualAncestry
    });

    validation
}
