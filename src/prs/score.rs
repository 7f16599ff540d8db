//! Implementation of the `prs score` subcommand.

use std::io::Write;
use std::time::Instant;

use rand_core::SeedableRng;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::{
    ancestry::{
        adjust::AncestryAdjustment,
        infer::{self, AncestryResult, Method},
    },
    common::{self, Population},
    genotype::GenotypeStore,
    prs::{
        model::{builtin_model, builtin_models, builtin_traits, load_jsonl, PrsModel},
        validate::{validate_model, validate_with_ancestry, PrsValidation},
    },
};

/// Size of the simulated reference population.
pub const POPULATION_SIZE: usize = 10_000;

/// Failure modes of score computation.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The sample shares no markers with the model.
    #[error("no overlap between genotype calls and markers of model {0}")]
    NoOverlap(String),
    /// The model is structurally broken.
    #[error("invalid model {0}: {1}")]
    InvalidModel(String, String),
}

/// Where the population statistics of a result came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatsSource {
    /// The model carried its own mean and standard deviation.
    ModelProvided,
    /// Statistics estimated from the model's weight vector.
    EstimatedFromWeights,
}

/// How the ancestry used for adjustment was obtained.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AncestrySource {
    /// Inferred from the sample's markers.
    Inferred,
    /// Specified on the command line.
    Specified,
}

/// Ancestry context for adjusted scoring.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreAncestry {
    /// The population to adjust for.
    pub population: Population,
    /// Confidence in the ancestry assignment.
    pub confidence: f64,
    /// How the ancestry was obtained.
    pub source: AncestrySource,
}

impl ScoreAncestry {
    /// Ancestry context from an inference result.
    pub fn from_inference(result: &AncestryResult) -> Self {
        Self {
            population: result.population,
            confidence: result.confidence,
            source: AncestrySource::Inferred,
        }
    }

    /// Ancestry context for a manually specified population.
    ///
    /// Manual specification is treated as fully confident.
    pub fn specified(population: Population) -> Self {
        Self {
            population,
            confidence: 1.0,
            source: AncestrySource::Specified,
        }
    }
}

/// Ancestry annotations of an adjusted result.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrsAncestryInfo {
    /// The population adjusted for.
    pub population: Population,
    /// Human-readable label of the population.
    pub primary_ancestry: String,
    /// Confidence in the ancestry assignment.
    pub confidence: f64,
    /// How the ancestry was obtained.
    pub source: AncestrySource,
    /// The adjustment parameters applied.
    pub adjustment: AncestryAdjustment,
}

/// Result of scoring one model.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrsResult {
    /// Trait the model scores.
    #[serde(rename = "trait")]
    pub trait_name: String,
    /// Model identifier, if any.
    pub model_id: Option<String>,
    /// The weighted dosage score, ancestry-adjusted when requested.
    pub prs_score: f64,
    /// Score in standard deviation units of the reference population.
    pub normalized_score: f64,
    /// Percentile within the simulated reference population.
    pub percentile: f64,
    /// Number of model markers found in the sample.
    pub snps_used: usize,
    /// Number of markers in the model.
    pub total_snps: usize,
    /// Fraction of model markers found in the sample.
    pub coverage: f64,
    /// Where the population statistics came from.
    pub stats_source: StatsSource,
    /// Ancestry annotations, present when adjustment was applied.
    pub ancestry: Option<PrsAncestryInfo>,
}

/// Deterministic per-trait seed for the population simulation.
///
/// The first eight bytes of the SHA-256 digest of the trait name,
/// little-endian; the same trait always yields the same simulated
/// population.
fn trait_seed(trait_name: &str) -> u64 {
    let digest = Sha256::digest(trait_name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Draw a simulated reference population.
///
/// A non-positive standard deviation yields a degenerate all-mean
/// population.
fn simulate_population(
    mean: f64,
    std: f64,
    count: usize,
    rng: &mut rand::rngs::StdRng,
) -> Vec<f64> {
    use rand::distributions::Distribution;

    match statrs::distribution::Normal::new(mean, std) {
        Ok(normal) => (0..count).map(|_| normal.sample(rng)).collect(),
        Err(_) => vec![mean; count],
    }
}

/// Share of the population strictly below `score`, as a percentage.
fn percentile_of(score: f64, population: &[f64]) -> f64 {
    let below = population.iter().filter(|sample| **sample < score).count();
    (below as f64 / population.len() as f64 * 100.0).clamp(0.0, 100.0)
}

/// Score `model` against the genotype calls in `store`.
///
/// With an ancestry context, the raw score is scaled by the population's
/// effect size multiplier and the percentile is taken against an
/// ancestry-shifted reference distribution; the normalized score always
/// uses the unshifted statistics.
pub fn score(
    store: &GenotypeStore,
    model: &PrsModel,
    ancestry: Option<&ScoreAncestry>,
) -> Result<PrsResult, Error> {
    model.validate()?;

    let shared = model
        .variants
        .iter()
        .filter(|variant| store.contains(&variant.rsid))
        .collect::<Vec<_>>();
    if shared.is_empty() {
        return Err(Error::NoOverlap(model.trait_name.clone()));
    }

    let raw_score = shared
        .iter()
        .map(|variant| {
            store.effect_allele_dosage(&variant.rsid, &variant.effect_allele) as f64
                * variant.weight
        })
        .sum::<f64>();

    let (population_mean, population_std, stats_source) =
        match (model.population_mean, model.population_std) {
            (Some(mean), Some(std)) => (mean, std, StatsSource::ModelProvided),
            _ => {
                let sum = model.sum_of_weights();
                (
                    sum * 0.8,
                    sum.abs() * 0.3,
                    StatsSource::EstimatedFromWeights,
                )
            }
        };

    let adjustment = ancestry.map(|a| AncestryAdjustment::for_population(a.population));
    let (prs_score, simulation_mean, simulation_std) = match adjustment {
        Some(params) => (
            raw_score * params.effect_size_multiplier,
            population_mean * (1.0 + params.percentile_adjustment),
            population_std * params.ld_correction_factor,
        ),
        None => (raw_score, population_mean, population_std),
    };

    let mut rng = rand::rngs::StdRng::seed_from_u64(trait_seed(&model.trait_name));
    let population =
        simulate_population(simulation_mean, simulation_std, POPULATION_SIZE, &mut rng);
    let percentile = percentile_of(prs_score, &population);

    let normalized_score = if population_std == 0.0 {
        0.0
    } else {
        (prs_score - population_mean) / population_std
    };

    let total_snps = model.variants.len();
    let coverage = if total_snps > 0 {
        shared.len() as f64 / total_snps as f64
    } else {
        0.0
    };

    Ok(PrsResult {
        trait_name: model.trait_name.clone(),
        model_id: model.id.clone(),
        prs_score,
        normalized_score,
        percentile,
        snps_used: shared.len(),
        total_snps,
        coverage,
        stats_source,
        ancestry: ancestry.zip(adjustment).map(|(a, params)| PrsAncestryInfo {
            population: a.population,
            primary_ancestry: a.population.label().to_string(),
            confidence: a.confidence,
            source: a.source,
            adjustment: params,
        }),
    })
}

/// Tagged outcome of scoring one model.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TraitReport {
    /// Trait of the scored model.
    #[serde(rename = "trait")]
    pub trait_name: String,
    /// Whether scoring succeeded.
    pub success: bool,
    /// The score result, if successful.
    pub result: Option<PrsResult>,
    /// Data quality assessment, if successful.
    pub validation: Option<PrsValidation>,
    /// Failure reason, if scoring failed.
    pub error: Option<String>,
}

impl TraitReport {
    /// Construct from a successful score.
    pub fn with_result(result: PrsResult, validation: PrsValidation) -> Self {
        Self {
            trait_name: result.trait_name.clone(),
            success: true,
            result: Some(result),
            validation: Some(validation),
            error: None,
        }
    }

    /// Construct from a failed score.
    pub fn with_error(trait_name: &str, error: &Error) -> Self {
        Self {
            trait_name: trait_name.to_string(),
            success: false,
            result: None,
            validation: None,
            error: Some(error.to_string()),
        }
    }
}

/// Score many models, one tagged report per model.
///
/// Models are scored in parallel; a failing model yields a failure report
/// and never aborts its siblings.  Output order follows input order.
pub fn score_batch(
    store: &GenotypeStore,
    models: &[PrsModel],
    ancestry: Option<&ScoreAncestry>,
) -> Vec<TraitReport> {
    models
        .par_iter()
        .map(|model| match score(store, model, ancestry) {
            Ok(result) => {
                let validation = match ancestry {
                    Some(a) => validate_with_ancestry(store, model, a),
                    None => validate_model(store, model),
                };
                TraitReport::with_result(result, validation)
            }
            Err(error) => {
                tracing::debug!("scoring {} failed: {}", &model.trait_name, &error);
                TraitReport::with_error(&model.trait_name, &error)
            }
        })
        .collect()
}

/// Command line arguments for `prs score` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "Run polygenic score computation", long_about = None)]
pub struct Args {
    /// Path to the prepared genotype TSV file.
    #[clap(long)]
    pub path_genotypes: String,
    /// Built-in trait models to score.
    #[clap(long = "trait")]
    pub traits: Vec<String>,
    /// Paths to JSONL model files to score.
    #[clap(long = "path-model")]
    pub paths_model: Vec<String>,
    /// Score every model of the built-in library; `--trait` is ignored.
    #[clap(long)]
    pub all_builtin: bool,
    /// Apply ancestry adjustment to all scores.
    #[clap(long)]
    pub with_ancestry_adjustment: bool,
    /// Population to adjust for, skipping inference.
    #[clap(long, value_enum)]
    pub ancestry: Option<Population>,
    /// Path to a dedicated AIMs reference panel TSV file.
    #[clap(long)]
    pub path_aims_panel: Option<String>,
    /// Path to a long-format population frequency TSV file.
    #[clap(long)]
    pub path_population_freqs: Option<String>,
    /// Path to the output JSONL file, one result per line.
    #[clap(long)]
    pub path_output: String,
}

/// Resolve the models to score from the command line arguments.
fn resolve_models(args: &Args) -> Result<Vec<PrsModel>, anyhow::Error> {
    let mut models = Vec::new();
    if args.all_builtin {
        models.extend(builtin_models());
    } else {
        for trait_name in &args.traits {
            let model = builtin_model(trait_name).ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown built-in trait {:?}; known traits: {}",
                    trait_name,
                    builtin_traits().join(", ")
                )
            })?;
            models.push(model);
        }
    }
    for path in &args.paths_model {
        models.extend(load_jsonl(shellexpand::tilde(path).as_ref())?);
    }
    if models.is_empty() {
        anyhow::bail!("no models selected; use --trait, --path-model, or --all-builtin");
    }
    Ok(models)
}

/// Resolve the ancestry context from the command line arguments.
///
/// Failed inference degrades to unadjusted scoring with a warning.
fn resolve_ancestry(args: &Args, store: &GenotypeStore) -> Option<ScoreAncestry> {
    if !args.with_ancestry_adjustment {
        return None;
    }
    if let Some(population) = args.ancestry {
        tracing::info!("adjusting for manually specified ancestry {}", population);
        return Some(ScoreAncestry::specified(population));
    }
    match infer::resolve_panel(
        args.path_aims_panel.as_deref(),
        args.path_population_freqs.as_deref(),
    ) {
        Ok(panel) => match infer::infer_ancestry(store, &panel, Method::FrequencyBased) {
            Ok(result) => {
                tracing::info!(
                    "adjusting for inferred ancestry {} (confidence {:.3})",
                    &result.primary_ancestry,
                    result.confidence
                );
                Some(ScoreAncestry::from_inference(&result))
            }
            Err(e) => {
                tracing::warn!("ancestry inference failed, scoring unadjusted: {}", e);
                None
            }
        },
        Err(e) => {
            tracing::warn!("no ancestry reference data, scoring unadjusted: {}", e);
            None
        }
    }
}

/// Main entry point for `prs score` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("loading genotype calls...");
    let path_genotypes = shellexpand::tilde(&args.path_genotypes).to_string();
    let store = GenotypeStore::from_tsv_path(&path_genotypes)?;

    let models = resolve_models(args)?;
    let ancestry = resolve_ancestry(args, &store);

    common::trace_rss_now();

    tracing::info!("scoring {} models...", models.len());
    let before_scoring = Instant::now();
    let reports = score_batch(&store, &models, ancestry.as_ref());
    let scored = reports.iter().filter(|report| report.success).count();
    tracing::info!(
        "scored {} of {} models ({} failed) in {:?}",
        scored,
        reports.len(),
        reports.len() - scored,
        before_scoring.elapsed()
    );

    tracing::info!("writing results...");
    let mut writer = common::io::open_write_maybe_gz(&args.path_output)?;
    for report in &reports {
        writeln!(writer, "{}", serde_json::to_string(report)?)?;
    }
    writer.flush()?;

    tracing::info!(
        "All of `prs score` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    use crate::{
        common::Population,
        genotype::GenotypeStore,
        prs::{
            model::{builtin_model, ModelVariant, PrsModel},
            validate::RecommendationTier,
        },
    };

    use super::{score, score_batch, Error, ScoreAncestry, StatsSource};

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

    #[test]
    fn score_single_marker_model() -> Result<(), Error> {
        let store = GenotypeStore::from_pairs(vec![("rs10757274", "GG")]);
        let model = model("Coronary Artery Disease", &[("rs10757274", "G", 0.177)]);

        let result = score(&store, &model, None)?;

        assert!(approx_eq!(f64, result.prs_score, 0.354, epsilon = 1e-9));
        assert_eq!(result.snps_used, 1);
        assert_eq!(result.total_snps, 1);
        assert!(approx_eq!(f64, result.coverage, 1.0, ulps = 2));
        assert_eq!(result.stats_source, StatsSource::EstimatedFromWeights);
        // Four standard deviations above the estimated mean.
        assert!(approx_eq!(f64, result.normalized_score, 4.0, epsilon = 1e-9));
        assert!(result.percentile > 99.0);
        assert!(result.percentile <= 100.0);
        assert!(result.ancestry.is_none());

        Ok(())
    }

    #[test]
    fn score_is_reproducible_per_trait() -> Result<(), Error> {
        let store = GenotypeStore::from_pairs(vec![("rs10757274", "AG")]);
        let model = model("Coronary Artery Disease", &[("rs10757274", "G", 0.177)]);

        let first = score(&store, &model, None)?;
        let second = score(&store, &model, None)?;

        assert_eq!(first.percentile, second.percentile);
        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn score_with_model_provided_stats() -> Result<(), Error> {
        let store = GenotypeStore::from_pairs(vec![("rs1", "GG")]);
        let mut high = model("Test Trait", &[("rs1", "G", 1.0)]);
        high.population_mean = Some(0.5);
        high.population_std = Some(0.0);

        let result = score(&store, &high, None)?;

        assert_eq!(result.stats_source, StatsSource::ModelProvided);
        // Degenerate population: everything sits at the mean.
        assert!(approx_eq!(f64, result.percentile, 100.0, ulps = 2));
        assert!(approx_eq!(f64, result.normalized_score, 0.0, ulps = 2));

        let store_low = GenotypeStore::from_pairs(vec![("rs1", "AA")]);
        let result_low = score(&store_low, &high, None)?;
        assert!(approx_eq!(f64, result_low.prs_score, 0.0, ulps = 2));
        assert!(approx_eq!(f64, result_low.percentile, 0.0, ulps = 2));

        Ok(())
    }

    #[test]
    fn score_with_ancestry_adjustment() -> Result<(), Error> {
        let store = GenotypeStore::from_pairs(vec![("rs1", "GG")]);
        let model = model("Test Trait", &[("rs1", "G", 1.0)]);
        let ancestry = ScoreAncestry::specified(Population::Afr);

        let result = score(&store, &model, Some(&ancestry))?;

        // Raw score 2.0 scaled by the African effect size multiplier.
        assert!(approx_eq!(f64, result.prs_score, 1.9, epsilon = 1e-9));
        assert!(approx_eq!(
            f64,
            result.normalized_score,
            (1.9 - 0.8) / 0.3,
            epsilon = 1e-9
        ));
        let info = result.ancestry.expect("ancestry info must be present");
        assert_eq!(info.population, Population::Afr);
        assert_eq!(info.primary_ancestry, "African");
        assert!(approx_eq!(f64, info.confidence, 1.0, ulps = 2));
        assert!(approx_eq!(
            f64,
            info.adjustment.effect_size_multiplier,
            0.95,
            ulps = 2
        ));

        Ok(())
    }

    #[test]
    fn score_with_neutral_adjustment_matches_unadjusted() -> Result<(), Error> {
        let store = GenotypeStore::from_pairs(vec![("rs1", "AG")]);
        let model = model("Test Trait", &[("rs1", "G", 1.0)]);
        let ancestry = ScoreAncestry::specified(Population::Eur);

        let unadjusted = score(&store, &model, None)?;
        let adjusted = score(&store, &model, Some(&ancestry))?;

        // European parameters are neutral and the seed is per-trait, so the
        // simulated populations are identical.
        assert_eq!(unadjusted.prs_score, adjusted.prs_score);
        assert_eq!(unadjusted.percentile, adjusted.percentile);
        assert_eq!(unadjusted.normalized_score, adjusted.normalized_score);
        assert!(adjusted.ancestry.is_some());

        Ok(())
    }

    #[test]
    fn score_without_overlap() {
        let store = GenotypeStore::from_pairs(vec![("rs2", "AA")]);
        let model = model("Test Trait", &[("rs1", "G", 1.0)]);

        let result = score(&store, &model, None);

        assert!(matches!(result, Err(Error::NoOverlap(_))));
    }

    #[test]
    fn batch_isolates_failures() {
        let store =
            GenotypeStore::from_pairs(vec![("rs10757274", "GG"), ("rs1333049", "CC")]);
        let models = vec![
            builtin_model("Coronary Artery Disease").unwrap(),
            model("Absent Trait", &[("rs0", "A", 0.5)]),
        ];

        let reports = score_batch(&store, &models, None);

        assert_eq!(reports.len(), 2);
        assert!(reports[0].success);
        let result = reports[0].result.as_ref().expect("result must be present");
        assert!(approx_eq!(f64, result.prs_score, 0.606, epsilon = 1e-9));
        assert_eq!(result.snps_used, 2);
        assert!(approx_eq!(f64, result.coverage, 0.5, ulps = 2));
        assert!(!reports[1].success);
        assert!(reports[1].error.is_some());
        assert!(reports[1].validation.is_none());
    }

    #[test]
    fn run_with_builtin_trait() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir
            .to_path_buf()
            .join("prs.jsonl")
            .to_str()
            .unwrap()
            .to_string();

        let args = super::Args {
            path_genotypes: "tests/data/genotype/sample.tsv".into(),
            traits: vec![String::from("Coronary Artery Disease")],
            paths_model: vec![],
            all_builtin: false,
            with_ancestry_adjustment: false,
            ancestry: None,
            path_aims_panel: None,
            path_population_freqs: None,
            path_output: path_output.clone(),
        };

        super::run(&crate::common::Args::default(), &args)?;

        let lines = std::fs::read_to_string(&path_output)?;
        let reports = lines
            .lines()
            .map(serde_json::from_str::<super::TraitReport>)
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].success);
        let result = reports[0].result.as_ref().expect("result must be present");
        assert!(approx_eq!(f64, result.prs_score, 0.606, epsilon = 1e-9));
        assert_eq!(result.snps_used, 2);
        assert_eq!(result.total_snps, 4);
        let validation = reports[0]
            .validation
            .as_ref()
            .expect("validation must be present");
        assert!(validation.warnings.is_empty());
        assert!(validation.recommendation.is_none());

        Ok(())
    }

    #[test]
    fn run_all_builtin_isolates_failures() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir
            .to_path_buf()
            .join("prs.jsonl")
            .to_str()
            .unwrap()
            .to_string();

        let args = super::Args {
            path_genotypes: "tests/data/genotype/sample.tsv".into(),
            traits: vec![],
            paths_model: vec![],
            all_builtin: true,
            with_ancestry_adjustment: false,
            ancestry: None,
            path_aims_panel: None,
            path_population_freqs: None,
            path_output: path_output.clone(),
        };

        super::run(&crate::common::Args::default(), &args)?;

        let lines = std::fs::read_to_string(&path_output)?;
        let reports = lines
            .lines()
            .map(serde_json::from_str::<super::TraitReport>)
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(reports.len(), 15);
        // Only the coronary artery disease model shares markers with the
        // sample; every other model fails without aborting the batch.
        assert_eq!(reports.iter().filter(|report| report.success).count(), 1);
        assert!(reports[0].success);
        assert_eq!(reports[0].trait_name, "Coronary Artery Disease");

        Ok(())
    }

    #[test]
    fn run_with_specified_ancestry() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir
            .to_path_buf()
            .join("prs.jsonl")
            .to_str()
            .unwrap()
            .to_string();

        let args = super::Args {
            path_genotypes: "tests/data/genotype/sample.tsv".into(),
            traits: vec![String::from("Coronary Artery Disease")],
            paths_model: vec![],
            all_builtin: false,
            with_ancestry_adjustment: true,
            ancestry: Some(Population::Afr),
            path_aims_panel: None,
            path_population_freqs: None,
            path_output: path_output.clone(),
        };

        super::run(&crate::common::Args::default(), &args)?;

        let lines = std::fs::read_to_string(&path_output)?;
        let reports = lines
            .lines()
            .map(serde_json::from_str::<super::TraitReport>)
            .collect::<Result<Vec<_>, _>>()?;
        let result = reports[0].result.as_ref().expect("result must be present");
        assert!(approx_eq!(
            f64,
            result.prs_score,
            0.606 * 0.95,
            epsilon = 1e-9
        ));
        let info = result.ancestry.as_ref().expect("ancestry must be present");
        assert_eq!(info.population, Population::Afr);
        assert_eq!(info.source, super::AncestrySource::Specified);
        let validation = reports[0]
            .validation
            .as_ref()
            .expect("validation must be present");
        assert_eq!(
            validation.recommendation,
            Some(RecommendationTier::AdjustmentRecommended)
        );

        Ok(())
    }

    #[test]
    fn run_with_inferred_ancestry() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir
            .to_path_buf()
            .join("prs.jsonl")
            .to_str()
            .unwrap()
            .to_string();

        let args = super::Args {
            path_genotypes: "tests/data/genotype/sample.tsv".into(),
            traits: vec![String::from("Coronary Artery Disease")],
            paths_model: vec![],
            all_builtin: false,
            with_ancestry_adjustment: true,
            ancestry: None,
            path_aims_panel: Some("tests/data/ancestry/aims_panel.tsv".into()),
            path_population_freqs: None,
            path_output: path_output.clone(),
        };

        super::run(&crate::common::Args::default(), &args)?;

        let lines = std::fs::read_to_string(&path_output)?;
        let reports = lines
            .lines()
            .map(serde_json::from_str::<super::TraitReport>)
            .collect::<Result<Vec<_>, _>>()?;
        let result = reports[0].result.as_ref().expect("result must be present");
        let info = result.ancestry.as_ref().expect("ancestry must be present");
        // The sample's markers match the European reference frequencies.
        assert_eq!(info.population, Population::Eur);
        assert_eq!(info.source, super::AncestrySource::Inferred);
        // European adjustment parameters are neutral.
        assert!(approx_eq!(f64, result.prs_score, 0.606, epsilon = 1e-9));
        let validation = reports[0]
            .validation
            .as_ref()
            .expect("validation must be present");
        assert_eq!(
            validation.recommendation,
            Some(RecommendationTier::ConsiderManualAncestry)
        );

        Ok(())
    }
}
