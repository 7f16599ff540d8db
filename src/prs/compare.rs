//! Implementation of the `prs compare` subcommand.

use std::io::Write;
use std::time::Instant;

use crate::{
    ancestry::infer::{self, Method},
    common::{self, Population, ReportHeader},
    genotype::GenotypeStore,
    prs::{
        model::{builtin_model, builtin_traits, load_jsonl, PrsModel},
        score::{score, Error, PrsResult, ScoreAncestry},
    },
};

/// Differences between the adjusted and the unadjusted result.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Differences {
    /// Difference in the score itself.
    pub prs_score: f64,
    /// Difference in percentile points.
    pub percentile: f64,
    /// Difference in standard deviation units.
    pub normalized_score: f64,
    /// Score difference relative to the unadjusted score, in percent;
    /// absent when the unadjusted score is zero.
    pub prs_score_relative: Option<f64>,
}

/// Side-by-side comparison of unadjusted and ancestry-adjusted scoring.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Comparison {
    /// Result without ancestry adjustment.
    pub unadjusted: PrsResult,
    /// Result with ancestry adjustment; carries the ancestry annotations.
    pub adjusted: PrsResult,
    /// Differences between the two results.
    pub differences: Differences,
}

/// Score `model` twice, with and without ancestry adjustment.
pub fn compare(
    store: &GenotypeStore,
    model: &PrsModel,
    ancestry: &ScoreAncestry,
) -> Result<Comparison, Error> {
    let unadjusted = score(store, model, None)?;
    let adjusted = score(store, model, Some(ancestry))?;

    let prs_score = adjusted.prs_score - unadjusted.prs_score;
    let differences = Differences {
        prs_score,
        percentile: adjusted.percentile - unadjusted.percentile,
        normalized_score: adjusted.normalized_score - unadjusted.normalized_score,
        prs_score_relative: (unadjusted.prs_score != 0.0)
            .then(|| prs_score / unadjusted.prs_score.abs() * 100.0),
    };

    Ok(Comparison {
        unadjusted,
        adjusted,
        differences,
    })
}

/// Comparison report written to the output file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Provenance header.
    pub header: ReportHeader,
    /// The comparison itself.
    pub comparison: Comparison,
}

/// Command line arguments for `prs compare` sub command.
#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about = "Compare adjusted and unadjusted polygenic scores",
    long_about = None
)]
pub struct Args {
    /// Path to the prepared genotype TSV file.
    #[clap(long)]
    pub path_genotypes: String,
    /// Built-in trait model to compare.
    #[clap(long = "trait")]
    pub trait_name: Option<String>,
    /// Path to a JSONL file holding exactly one model.
    #[clap(long)]
    pub path_model: Option<String>,
    /// Population to adjust for, skipping inference.
    #[clap(long, value_enum)]
    pub ancestry: Option<Population>,
    /// Path to a dedicated AIMs reference panel TSV file.
    #[clap(long)]
    pub path_aims_panel: Option<String>,
    /// Path to a long-format population frequency TSV file.
    #[clap(long)]
    pub path_population_freqs: Option<String>,
    /// Path to the output JSON file.
    #[clap(long)]
    pub path_output: String,
}

/// Resolve the single model to compare from the command line arguments.
fn resolve_model(args: &Args) -> Result<PrsModel, anyhow::Error> {
    match (&args.trait_name, &args.path_model) {
        (Some(trait_name), None) => builtin_model(trait_name).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown built-in trait {:?}; known traits: {}",
                trait_name,
                builtin_traits().join(", ")
            )
        }),
        (None, Some(path)) => {
            let models = load_jsonl(shellexpand::tilde(path).as_ref())?;
            if models.len() != 1 {
                anyhow::bail!(
                    "model file {} must hold exactly one model but has {}",
                    path,
                    models.len()
                );
            }
            Ok(models.into_iter().next().expect("checked length above"))
        }
        _ => anyhow::bail!("exactly one of --trait and --path-model must be given"),
    }
}

/// Resolve the ancestry context; comparison cannot proceed without one.
fn resolve_ancestry(args: &Args, store: &GenotypeStore) -> Result<ScoreAncestry, anyhow::Error> {
    if let Some(population) = args.ancestry {
        return Ok(ScoreAncestry::specified(population));
    }
    let panel = infer::resolve_panel(
        args.path_aims_panel.as_deref(),
        args.path_population_freqs.as_deref(),
    )?;
    let result = infer::infer_ancestry(store, &panel, Method::FrequencyBased)?;
    tracing::info!(
        "comparing against inferred ancestry {} (confidence {:.3})",
        &result.primary_ancestry,
        result.confidence
    );
    Ok(ScoreAncestry::from_inference(&result))
}

/// Main entry point for `prs compare` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("loading genotype calls...");
    let path_genotypes = shellexpand::tilde(&args.path_genotypes).to_string();
    let store = GenotypeStore::from_tsv_path(&path_genotypes)?;
    let header = ReportHeader::with_genotypes_path(&path_genotypes)?;

    let model = resolve_model(args)?;
    let ancestry = resolve_ancestry(args, &store)?;

    common::trace_rss_now();

    tracing::info!("comparing {} ...", &model.trait_name);
    let comparison = compare(&store, &model, &ancestry)?;
    tracing::info!(
        "score {:.4} vs. {:.4} ({:+.2} percentile points)",
        comparison.unadjusted.prs_score,
        comparison.adjusted.prs_score,
        comparison.differences.percentile
    );

    tracing::info!("writing comparison report...");
    let report = Report { header, comparison };
    let mut writer = common::io::open_write_maybe_gz(&args.path_output)?;
    writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    writer.flush()?;

    tracing::info!(
        "All of `prs compare` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
