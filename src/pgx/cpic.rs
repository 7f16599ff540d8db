//! CPIC dosing guideline lookup.

use enum_map::EnumMap;
use indexmap::IndexMap;

use crate::{
    common::io::open_read_maybe_gz,
    pgx::caller::{Error, MetabolizerStatus},
};

/// Fallback text for drug/status pairs without a guideline entry.
pub const NO_SPECIFIC_RECOMMENDATION: &str = "No specific recommendation";

/// Dosing recommendations per gene, drug, and metabolizer status.
#[derive(Debug, Clone)]
pub struct CpicGuidelines {
    guidelines: IndexMap<String, IndexMap<String, EnumMap<MetabolizerStatus, Option<String>>>>,
}

impl CpicGuidelines {
    /// Construct the built-in guideline table.
    pub fn builtin() -> Self {
        fn drug(texts: &[(MetabolizerStatus, &str)]) -> EnumMap<MetabolizerStatus, Option<String>> {
            let mut map = EnumMap::default();
            for (status, text) in texts {
                map[*status] = Some(text.to_string());
            }
            map
        }
        use MetabolizerStatus::*;

        let mut guidelines: IndexMap<
            String,
            IndexMap<String, EnumMap<MetabolizerStatus, Option<String>>>,
        > = IndexMap::new();
        guidelines.insert(
            String::from("CYP2C19"),
            IndexMap::from_iter([
                (
                    String::from("clopidogrel"),
                    drug(&[
                        (
                            Poor,
                            "Avoid clopidogrel due to lack of efficacy; use alternative \
                             antiplatelet therapy (e.g., ticagrelor, prasugrel)",
                        ),
                        (Intermediate, "Standard dose with platelet function testing"),
                        (Normal, "Standard dose"),
                        (Rapid, "Standard dose"),
                        (Ultrarapid, "Standard dose"),
                    ]),
                ),
                (
                    String::from("citalopram"),
                    drug(&[
                        (Poor, "Reduce dose by 50%"),
                        (Intermediate, "Use with caution"),
                        (Normal, "Standard dose"),
                        (Rapid, "Standard dose"),
                        (Ultrarapid, "Standard dose"),
                    ]),
                ),
            ]),
        );
        guidelines.insert(
            String::from("CYP2D6"),
            IndexMap::from_iter([
                (
                    String::from("codeine"),
                    drug(&[
                        (Poor, "Avoid use"),
                        (Intermediate, "Use with caution"),
                        (Normal, "Standard dose"),
                        (Rapid, "Standard dose"),
                        (Ultrarapid, "Avoid use - risk of toxicity"),
                    ]),
                ),
                (
                    String::from("tamoxifen"),
                    drug(&[
                        (Poor, "Alternative therapy"),
                        (Intermediate, "Alternative therapy"),
                        (Normal, "Standard dose"),
                        (Rapid, "Standard dose"),
                        (Ultrarapid, "Standard dose"),
                    ]),
                ),
            ]),
        );
        guidelines.insert(
            String::from("CYP2C9"),
            IndexMap::from_iter([(
                String::from("warfarin"),
                drug(&[
                    (Poor, "Reduce initial dose by 30-50%"),
                    (Intermediate, "Reduce initial dose by 20-30%"),
                    (Normal, "Standard dose"),
                    (Rapid, "Standard dose"),
                    (Ultrarapid, "Standard dose"),
                ]),
            )]),
        );
        guidelines.insert(
            String::from("TPMT"),
            IndexMap::from_iter([(
                String::from("azathioprine"),
                drug(&[
                    (Poor, "Reduce dose by 90%"),
                    (Intermediate, "Reduce dose by 50%"),
                    (Normal, "Standard dose"),
                    (Rapid, "Standard dose"),
                    (Ultrarapid, "Standard dose"),
                ]),
            )]),
        );
        guidelines.insert(
            String::from("DPYD"),
            IndexMap::from_iter([(
                String::from("fluorouracil"),
                drug(&[
                    (Poor, "Avoid use or reduce dose by 50%"),
                    (Intermediate, "Reduce dose by 25%"),
                    (Normal, "Standard dose"),
                    (Rapid, "Standard dose"),
                    (Ultrarapid, "Standard dose"),
                ]),
            )]),
        );

        Self { guidelines }
    }

    /// Load a guideline table from a JSON file, replacing the built-in table.
    ///
    /// The file maps gene symbols to drugs to per-status recommendation
    /// texts; statuses without an entry fall back to
    /// [`NO_SPECIFIC_RECOMMENDATION`].
    pub fn from_json_path(path: &str) -> Result<Self, anyhow::Error> {
        tracing::debug!("loading dosing guidelines from {}...", path);
        let reader = open_read_maybe_gz(path)?;
        let raw: IndexMap<String, IndexMap<String, IndexMap<MetabolizerStatus, String>>> =
            serde_json::from_reader(reader)
                .map_err(|e| anyhow::anyhow!("problem parsing guidelines from {}: {}", path, e))?;
        if raw.is_empty() {
            anyhow::bail!("guideline table {} defines no genes", path);
        }

        let mut guidelines = IndexMap::new();
        for (gene, drugs) in raw {
            if drugs.is_empty() {
                anyhow::bail!("guideline table {} defines no drugs for {}", path, gene);
            }
            let mut by_drug = IndexMap::new();
            for (drug, texts) in drugs {
                let mut by_status: EnumMap<MetabolizerStatus, Option<String>> = EnumMap::default();
                for (status, text) in texts {
                    by_status[status] = Some(text);
                }
                by_drug.insert(drug, by_status);
            }
            guidelines.insert(gene, by_drug);
        }
        Ok(Self { guidelines })
    }

    /// The gene symbols with guidelines, in table order.
    pub fn genes(&self) -> Vec<&str> {
        self.guidelines.keys().map(|gene| gene.as_str()).collect()
    }

    /// The recommendation for one gene, drug, and status.
    ///
    /// Falls back to [`NO_SPECIFIC_RECOMMENDATION`] for drug/status pairs
    /// without an entry; unknown genes are an error.
    pub fn recommendation(
        &self,
        gene: &str,
        drug: &str,
        status: MetabolizerStatus,
    ) -> Result<String, Error> {
        let drugs = self
            .guidelines
            .get(gene)
            .ok_or_else(|| Error::UnsupportedGene(gene.to_string()))?;
        Ok(drugs
            .get(drug)
            .and_then(|texts| texts[status].clone())
            .unwrap_or_else(|| NO_SPECIFIC_RECOMMENDATION.to_string()))
    }

    /// The recommendations for every drug of `gene` at `status`.
    pub fn recommendations_for(
        &self,
        gene: &str,
        status: MetabolizerStatus,
    ) -> Result<IndexMap<String, String>, Error> {
        let drugs = self
            .guidelines
            .get(gene)
            .ok_or_else(|| Error::UnsupportedGene(gene.to_string()))?;
        Ok(drugs
            .iter()
            .map(|(drug, texts)| {
                (
                    drug.clone(),
                    texts[status]
                        .clone()
                        .unwrap_or_else(|| NO_SPECIFIC_RECOMMENDATION.to_string()),
                )
            })
            .collect())
    }
}

impl Default for CpicGuidelines {
    fn default() -> Self {
        Self::builtin()
    }
}
