//! Polygenic risk score models and the built-in trait library.

use std::io::BufRead;

use crate::common::io::open_read_maybe_gz;
use crate::common::is_valid_base;
use crate::prs::score::Error;

/// One scored variant of a model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct ModelVariant {
    /// Marker rsID.
    pub rsid: String,
    /// Allele whose copies contribute to the score.
    pub effect_allele: String,
    /// Per-copy contribution to the score.
    pub weight: f64,
}

/// A weighted variant model for one trait.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrsModel {
    /// Optional model identifier, e.g. a catalog accession.
    #[serde(default)]
    pub id: Option<String>,
    /// Trait the model scores.
    #[serde(rename = "trait")]
    pub trait_name: String,
    /// The scored variants.
    pub variants: Vec<ModelVariant>,
    /// Mean score of the model's reference population, if known.
    #[serde(default)]
    pub population_mean: Option<f64>,
    /// Score standard deviation of the reference population, if known.
    #[serde(default)]
    pub population_std: Option<f64>,
}

impl PrsModel {
    /// Check the model for structural problems.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| Error::InvalidModel(self.trait_name.clone(), reason);

        if self.variants.is_empty() {
            return Err(invalid(String::from("model has no variants")));
        }
        let mut seen = indexmap::IndexSet::new();
        for variant in &self.variants {
            if !seen.insert(variant.rsid.as_str()) {
                return Err(invalid(format!("duplicate marker {}", variant.rsid)));
            }
            if !variant.weight.is_finite() {
                return Err(invalid(format!(
                    "non-finite weight for {}",
                    variant.rsid
                )));
            }
            let mut chars = variant.effect_allele.chars();
            match (chars.next(), chars.next()) {
                (Some(base), None) if is_valid_base(base.to_ascii_uppercase()) => (),
                _ => {
                    return Err(invalid(format!(
                        "effect allele {:?} of {} is not a single nucleotide",
                        variant.effect_allele, variant.rsid
                    )))
                }
            }
        }
        Ok(())
    }

    /// Sum of all variant weights.
    pub fn sum_of_weights(&self) -> f64 {
        self.variants.iter().map(|variant| variant.weight).sum()
    }
}

/// Load models from a JSONL file, one JSON model per line.
///
/// Each model is validated; the first offending line aborts the load.
pub fn load_jsonl(path: &str) -> Result<Vec<PrsModel>, anyhow::Error> {
    tracing::debug!("loading models from {}...", path);
    let reader = open_read_maybe_gz(path)?;
    let mut models = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let model: PrsModel = serde_json::from_str(&line).map_err(|e| {
            anyhow::anyhow!("problem parsing model on line {} of {}: {}", lineno + 1, path, e)
        })?;
        model.validate().map_err(|e| {
            anyhow::anyhow!("invalid model on line {} of {}: {}", lineno + 1, path, e)
        })?;
        models.push(model);
    }
    Ok(models)
}

/// The built-in trait models, in library order.
pub fn builtin_models() -> Vec<PrsModel> {
    fn model(trait_name: &str, variants: &[(&str, &str, f64)]) -> PrsModel {
        PrsModel {
            id: None,
            trait_name: trait_name.to_string(),
            variants: variants
                .iter()
                .map(|(rsid, allele, weight)| {
                    ModelVariant::new(rsid.to_string(), allele.to_string(), *weight)
                })
                .collect(),
            population_mean: None,
            population_std: None,
        }
    }

    vec![
        model(
            "Coronary Artery Disease",
            &[
                ("rs10757274", "G", 0.177),
                ("rs10757278", "G", 0.198),
                ("rs1333049", "C", 0.126),
                ("rs2383206", "A", 0.106),
            ],
        ),
        model(
            "Type 2 Diabetes",
            &[
                ("rs7903146", "T", 0.31),
                ("rs13266634", "C", 0.14),
                ("rs7754840", "C", 0.11),
                ("rs10811661", "T", 0.22),
                ("rs4506565", "T", 0.12),
            ],
        ),
        model(
            "Atrial Fibrillation",
            &[
                ("rs2200733", "T", 0.45),
                ("rs10033464", "T", 0.30),
                ("rs6817105", "C", 0.22),
            ],
        ),
        model(
            "Colorectal Cancer",
            &[
                ("rs6983267", "G", 0.15),
                ("rs4939827", "C", 0.14),
                ("rs10795668", "G", 0.09),
            ],
        ),
        model(
            "Prostate Cancer",
            &[("rs1447295", "A", 0.30), ("rs6983267", "G", 0.25)],
        ),
        model(
            "Ischemic Stroke",
            &[
                ("rs12425791", "A", 0.18),
                ("rs11833579", "A", 0.15),
                ("rs2200733", "T", 0.28),
            ],
        ),
        model(
            "Inflammatory Bowel Disease",
            &[
                ("rs2066844", "G", 0.25),
                ("rs2476601", "A", 0.20),
                ("rs2187668", "T", 0.15),
            ],
        ),
        model(
            "Rheumatoid Arthritis",
            &[("rs2476601", "A", 0.30), ("rs3087243", "G", 0.15)],
        ),
        model(
            "Systemic Lupus Erythematosus",
            &[("rs2476601", "A", 0.28), ("rs7574865", "T", 0.18)],
        ),
        model(
            "Multiple Sclerosis",
            &[("rs9271366", "C", 0.22), ("rs340874", "C", 0.19)],
        ),
        model(
            "Celiac Disease",
            &[("rs2187668", "T", 0.20), ("rs3184504", "A", 0.17)],
        ),
        model(
            "Major Depressive Disorder",
            &[("rs10503253", "A", 0.15), ("rs35936514", "C", 0.12)],
        ),
        model(
            "Schizophrenia",
            &[("rs1625579", "T", 0.18), ("rs7004633", "C", 0.14)],
        ),
        model(
            "Osteoporosis",
            &[("rs3736228", "T", 0.20), ("rs2941740", "A", 0.15)],
        ),
        model(
            "Asthma",
            &[("rs2305480", "G", 0.18), ("rs4950928", "C", 0.22)],
        ),
    ]
}

/// The built-in model for `trait_name`, matched case-insensitively.
pub fn builtin_model(trait_name: &str) -> Option<PrsModel> {
    builtin_models()
        .into_iter()
        .find(|model| model.trait_name.eq_ignore_ascii_case(trait_name))
}

/// The trait names of the built-in library.
pub fn builtin_traits() -> Vec<String> {
    builtin_models()
        .into_iter()
        .map(|model| model.trait_name)
        .collect()
}
