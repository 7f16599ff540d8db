//! Data quality assessment for ancestry inference.

use crate::{ancestry::aims::AimsPanel, genotype::GenotypeStore};

/// Coarse assessment of inference confidence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
pub enum ConfidenceAssessment {
    /// Confidence above 0.8.
    High,
    /// Confidence above 0.6.
    Medium,
    /// Anything below.
    Low,
}

impl ConfidenceAssessment {
    /// Classify a confidence value.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.8 {
            ConfidenceAssessment::High
        } else if confidence > 0.6 {
            ConfidenceAssessment::Medium
        } else {
            ConfidenceAssessment::Low
        }
    }
}

/// Data quality report for one ancestry inference run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct AncestryValidation {
    /// Number of markers in the reference panel.
    pub total_aims_available: usize,
    /// Number of panel markers found in the sample data.
    pub aims_found_in_data: usize,
    /// Percentage of panel markers found in the sample data.
    pub coverage_percentage: f64,
    /// Coarse assessment of the inference confidence.
    pub confidence_assessment: ConfidenceAssessment,
    /// Human-readable warnings.
    pub warnings: Vec<String>,
    /// Human-readable recommendations.
    pub recommendations: Vec<String>,
}

/// Assess panel coverage and confidence of an inference run.
pub fn validate_inference(
    store: &GenotypeStore,
    panel: &AimsPanel,
    confidence: f64,
) -> AncestryValidation {
    let aims_found_in_data = panel
        .records
        .iter()
        .filter(|record| store.contains(&record.rsid))
        .count();
    let coverage_percentage = if panel.is_empty() {
        0.0
    } else {
        aims_found_in_data as f64 / panel.len() as f64 * 100.0
    };
    let confidence_assessment = ConfidenceAssessment::from_confidence(confidence);

    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();
    if coverage_percentage < 50.0 {
        warnings.push("Low AIMs coverage - results may be unreliable".into());
        recommendations.push("Consider using more comprehensive SNP data".into());
    }
    if confidence_assessment == ConfidenceAssessment::Low {
        warnings.push("Low confidence in ancestry inference".into());
        recommendations.push("Manual ancestry specification recommended".into());
    }

    AncestryValidation::new(
        panel.len(),
        aims_found_in_data,
        coverage_percentage,
        confidence_assessment,
        warnings,
        recommendations,
    )
}
