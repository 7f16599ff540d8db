//! Implementation of the `ancestry infer` subcommand.

use std::io::Write;
use std::time::Instant;

use enum_map::EnumMap;
use indexmap::IndexMap;

use crate::{
    ancestry::{
        aims::{AimsPanel, PanelSource},
        validate::{validate_inference, AncestryValidation},
    },
    common::{self, is_valid_base, Population, ReportHeader},
    genotype::GenotypeStore,
};

/// Inference method requested on the command line.
///
/// Only frequency comparison is implemented; the other methods degrade to it
/// and the result records the method actually used.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    clap::ValueEnum,
    strum::Display,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Method {
    /// Compare observed allele dosages against reference panel frequencies.
    #[default]
    FrequencyBased,
    /// Principal component projection.
    Pca,
    /// Reference cluster assignment.
    Clustering,
}

/// Failure modes of ancestry inference.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The sample shares no markers with the reference panel.
    #[error("no shared markers between sample and AIMs reference panel")]
    NoOverlap,
    /// No usable reference panel could be obtained.
    #[error("no AIMs reference data available: {0}")]
    NoReferenceData(String),
}

/// Result of a successful ancestry inference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AncestryResult {
    /// The most likely reference population.
    pub population: Population,
    /// Human-readable label of the primary ancestry.
    pub primary_ancestry: String,
    /// Confidence in the primary call, in `[0, 1]`.
    pub confidence: f64,
    /// Admixture proportions by population label; proportions at or below
    /// 5% are dropped.
    pub admixture_proportions: IndexMap<String, f64>,
    /// Number of panel markers shared with the sample.
    pub snps_used: usize,
    /// The method that actually produced the result.
    pub method: Method,
    /// Raw per-population similarity scores.
    pub ancestry_scores: IndexMap<Population, f64>,
    /// Provenance of the reference panel used.
    pub panel_source: PanelSource,
}

/// Minimal admixture proportion that is reported.
const MIN_ADMIXTURE_PROPORTION: f64 = 0.05;

/// Allele dosage of a call for ancestry scoring.
///
/// A call with one distinct character counts two copies when that character
/// is a nucleotide base.  For two-character heterozygous calls the first
/// character of the call is the one counted, whatever allele it denotes.
/// Longer calls count zero.
pub fn aims_dosage(call: &str) -> u8 {
    let call = call.to_uppercase();
    let chars = call.chars().collect::<Vec<_>>();
    match chars.len() {
        1 => {
            if is_valid_base(chars[0]) {
                2
            } else {
                0
            }
        }
        2 if chars[0] == chars[1] => {
            if is_valid_base(chars[0]) {
                2
            } else {
                0
            }
        }
        2 => chars.iter().filter(|c| **c == chars[0]).count() as u8,
        _ => 0,
    }
}

/// Infer the ancestry of the sample in `store` from the markers of `panel`.
///
/// Each shared marker contributes a similarity in `[0, 2]` per population,
/// comparing the observed allele dosage against twice the reference
/// frequency; population scores are the means of these similarities.
pub fn infer_ancestry(
    store: &GenotypeStore,
    panel: &AimsPanel,
    method: Method,
) -> Result<AncestryResult, Error> {
    if method != Method::FrequencyBased {
        tracing::warn!(
            "method {} is not implemented, falling back to frequency comparison",
            method
        );
    }

    let overlap = panel
        .records
        .iter()
        .filter(|record| store.contains(&record.rsid))
        .collect::<Vec<_>>();
    if overlap.is_empty() {
        return Err(Error::NoOverlap);
    }
    tracing::debug!(
        "{} of {} panel markers found in sample",
        overlap.len(),
        panel.len()
    );

    let mut sums: EnumMap<Population, f64> = EnumMap::default();
    let mut counts: EnumMap<Population, usize> = EnumMap::default();
    for record in &overlap {
        let dosage = aims_dosage(store.get(&record.rsid).unwrap_or("")) as f64;
        for (population, frequency) in &record.frequencies {
            if let Some(frequency) = frequency {
                let expected = 2.0 * frequency;
                let similarity = (2.0 - (dosage - expected).abs()).max(0.0);
                sums[population] += similarity;
                counts[population] += 1;
            }
        }
    }

    let mut ancestry_scores = IndexMap::new();
    for (population, count) in &counts {
        if *count > 0 {
            ancestry_scores.insert(population, sums[population] / *count as f64);
        }
    }
    if ancestry_scores.is_empty() {
        return Err(Error::NoReferenceData(
            "reference panel has no frequency entries for shared markers".into(),
        ));
    }

    let mut ranked = ancestry_scores
        .iter()
        .map(|(population, score)| (*population, *score))
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let (population, best_score) = ranked[0];
    let confidence = if ranked.len() > 1 {
        ((best_score - ranked[1].1) / 2.0).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let admixture_proportions = admixture_proportions(&ancestry_scores, population);

    Ok(AncestryResult {
        population,
        primary_ancestry: population.label().to_string(),
        confidence,
        admixture_proportions,
        snps_used: overlap.len(),
        method: Method::FrequencyBased,
        ancestry_scores,
        panel_source: panel.source,
    })
}

/// Normalize scores into admixture proportions, dropping trace components.
fn admixture_proportions(
    scores: &IndexMap<Population, f64>,
    best: Population,
) -> IndexMap<String, f64> {
    if scores.len() <= 1 {
        let mut result = IndexMap::new();
        result.insert(best.label().to_string(), 1.0);
        return result;
    }

    let total: f64 = scores.values().sum();
    if total <= 0.0 {
        return IndexMap::new();
    }
    scores
        .iter()
        .filter_map(|(population, score)| {
            let proportion = score / total;
            (proportion > MIN_ADMIXTURE_PROPORTION)
                .then(|| (population.label().to_string(), proportion))
        })
        .collect()
}

/// Full report of an `ancestry infer` run.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Provenance information.
    pub header: ReportHeader,
    /// Whether inference succeeded.
    pub success: bool,
    /// Primary ancestry label; `"Unknown"` when inference failed.
    pub primary_ancestry: String,
    /// Population code of the primary ancestry, if any.
    pub ancestry_code: Option<Population>,
    /// Confidence in the call; 0.0 when inference failed.
    pub confidence: f64,
    /// Admixture proportions by population label.
    pub admixture_proportions: IndexMap<String, f64>,
    /// Number of panel markers shared with the sample.
    pub snps_used: usize,
    /// The method that produced the result, if any.
    pub method: Option<Method>,
    /// Raw per-population similarity scores.
    pub ancestry_scores: IndexMap<Population, f64>,
    /// Provenance of the reference panel used, if any.
    pub panel_source: Option<PanelSource>,
    /// SHA256 checksum of the reference panel file used, if any.
    pub panel_sha256: Option<String>,
    /// Failure reason, if inference failed.
    pub error: Option<String>,
    /// Data quality assessment, if inference succeeded.
    pub validation: Option<AncestryValidation>,
}

impl Report {
    /// Construct from a successful inference.
    pub fn with_result(
        header: ReportHeader,
        result: AncestryResult,
        validation: AncestryValidation,
        panel_sha256: Option<String>,
    ) -> Self {
        Self {
            header,
            success: true,
            primary_ancestry: result.primary_ancestry,
            ancestry_code: Some(result.population),
            confidence: result.confidence,
            admixture_proportions: result.admixture_proportions,
            snps_used: result.snps_used,
            method: Some(result.method),
            ancestry_scores: result.ancestry_scores,
            panel_source: Some(result.panel_source),
            panel_sha256,
            error: None,
            validation: Some(validation),
        }
    }

    /// Construct from a failed inference.
    pub fn with_error(header: ReportHeader, error: &Error) -> Self {
        Self {
            header,
            success: false,
            primary_ancestry: String::from("Unknown"),
            ancestry_code: None,
            confidence: 0.0,
            admixture_proportions: IndexMap::new(),
            snps_used: 0,
            method: None,
            ancestry_scores: IndexMap::new(),
            panel_source: None,
            panel_sha256: None,
            error: Some(error.to_string()),
            validation: None,
        }
    }
}

/// Command line arguments for `ancestry infer` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "Run ancestry inference", long_about = None)]
pub struct Args {
    /// Path to the prepared genotype TSV file.
    #[clap(long)]
    pub path_genotypes: String,
    /// Path to a dedicated AIMs reference panel TSV file.
    #[clap(long)]
    pub path_aims_panel: Option<String>,
    /// Path to a long-format population frequency TSV file; used to derive
    /// a fallback panel when no dedicated panel is available.
    #[clap(long)]
    pub path_population_freqs: Option<String>,
    /// Inference method to request.
    #[clap(long, value_enum, default_value_t = Method::FrequencyBased)]
    pub method: Method,
    /// Path to the output JSON report file.
    #[clap(long)]
    pub path_output: String,
}

/// Resolve the reference panel from the command line arguments.
///
/// A dedicated panel takes precedence; a panel derived from population
/// frequencies is the fallback.
pub fn resolve_panel(
    path_aims_panel: Option<&str>,
    path_population_freqs: Option<&str>,
) -> Result<AimsPanel, Error> {
    if let Some(path) = path_aims_panel {
        match AimsPanel::from_tsv_path(shellexpand::tilde(path).as_ref()) {
            Ok(panel) if !panel.is_empty() => return Ok(panel),
            Ok(_) => {
                tracing::warn!("AIMs panel {} holds no usable markers", path);
            }
            Err(e) => {
                tracing::warn!("could not load AIMs panel {}: {}", path, e);
            }
        }
    }
    if let Some(path) = path_population_freqs {
        tracing::info!("deriving fallback panel from population frequencies...");
        match AimsPanel::from_population_freqs_path(shellexpand::tilde(path).as_ref()) {
            Ok(panel) if !panel.is_empty() => return Ok(panel),
            Ok(_) => {
                tracing::warn!("population frequency table {} yields no markers", path);
            }
            Err(e) => {
                tracing::warn!("could not derive panel from {}: {}", path, e);
            }
        }
    }
    Err(Error::NoReferenceData(
        "neither a dedicated AIMs panel nor population frequencies were usable".into(),
    ))
}

/// Main entry point for `ancestry infer` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("loading genotype calls...");
    let path_genotypes = shellexpand::tilde(&args.path_genotypes).to_string();
    let store = GenotypeStore::from_tsv_path(&path_genotypes)?;
    let header = ReportHeader::with_genotypes_path(&path_genotypes)?;

    common::trace_rss_now();

    tracing::info!("resolving reference panel...");
    let report = match resolve_panel(
        args.path_aims_panel.as_deref(),
        args.path_population_freqs.as_deref(),
    ) {
        Ok(panel) => {
            tracing::info!(
                "using {} panel with {} markers",
                panel.source,
                panel.len()
            );
            let path_panel = match panel.source {
                PanelSource::Dedicated => args.path_aims_panel.as_deref(),
                PanelSource::DerivedFromPopulationFrequencies => {
                    args.path_population_freqs.as_deref()
                }
            };
            let panel_sha256 = path_panel
                .map(|path| common::io::sha256sum(shellexpand::tilde(path).as_ref()))
                .transpose()?;
            match infer_ancestry(&store, &panel, args.method) {
                Ok(result) => {
                    tracing::info!(
                        "inferred {} (confidence {:.3}) from {} markers",
                        &result.primary_ancestry,
                        result.confidence,
                        result.snps_used
                    );
                    let validation = validate_inference(&store, &panel, result.confidence);
                    Report::with_result(header, result, validation, panel_sha256)
                }
                Err(error) => {
                    tracing::warn!("ancestry inference failed: {}", &error);
                    Report::with_error(header, &error)
                }
            }
        }
        Err(error) => {
            tracing::warn!("ancestry inference failed: {}", &error);
            Report::with_error(header, &error)
        }
    };

    tracing::info!("writing report...");
    let mut writer = common::io::open_write_maybe_gz(&args.path_output)?;
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush()?;

    tracing::info!(
        "All of `ancestry infer` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
