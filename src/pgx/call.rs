//! Implementation of the `pgx call` subcommand.

use std::io::Write;
use std::time::Instant;

use indexmap::IndexMap;

use crate::{
    common::{self, ReportHeader},
    genotype::GenotypeStore,
    pgx::{
        caller::{call_gene, DiplotypeCall, Error},
        cpic::CpicGuidelines,
        definitions::HaplotypeDefinitionTable,
    },
};

/// Outcome of one gene's diplotype call.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneReport {
    /// Gene symbol.
    pub gene: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// The diplotype call, if successful.
    pub call: Option<DiplotypeCall>,
    /// Dosing recommendations by drug, if requested and available.
    pub recommendations: Option<IndexMap<String, String>>,
    /// Failure reason, if the call failed.
    pub error: Option<String>,
}

impl GeneReport {
    /// Construct from a successful call.
    pub fn with_call(
        call: DiplotypeCall,
        recommendations: Option<IndexMap<String, String>>,
    ) -> Self {
        Self {
            gene: call.gene.clone(),
            success: true,
            call: Some(call),
            recommendations,
            error: None,
        }
    }

    /// Construct from a failed call.
    pub fn with_error(gene: &str, error: &Error) -> Self {
        Self {
            gene: gene.to_string(),
            success: false,
            call: None,
            recommendations: None,
            error: Some(error.to_string()),
        }
    }
}

/// Full report of a `pgx call` run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Report {
    /// Provenance information.
    pub header: ReportHeader,
    /// Per-gene outcomes, in analysis order.
    pub genes: Vec<GeneReport>,
}

/// Command line arguments for `pgx call` sub command.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "Run star allele calling", long_about = None)]
pub struct Args {
    /// Path to the prepared genotype TSV file.
    #[clap(long)]
    pub path_genotypes: String,
    /// Genes to analyze; all genes of the definition table when empty.
    #[clap(long = "gene")]
    pub genes: Vec<String>,
    /// Path to a JSON file overriding the built-in star allele definitions.
    #[clap(long)]
    pub path_definitions: Option<String>,
    /// Path to a JSON file overriding the built-in dosing guidelines.
    #[clap(long)]
    pub path_guidelines: Option<String>,
    /// Also look up dosing recommendations for each called gene.
    #[clap(long)]
    pub with_recommendations: bool,
    /// Path to the output JSON report file.
    #[clap(long)]
    pub path_output: String,
}

/// Main entry point for `pgx call` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("loading genotype calls...");
    let path_genotypes = shellexpand::tilde(&args.path_genotypes).to_string();
    let store = GenotypeStore::from_tsv_path(&path_genotypes)?;
    let header = ReportHeader::with_genotypes_path(&path_genotypes)?;

    let table = if let Some(path) = &args.path_definitions {
        HaplotypeDefinitionTable::from_json_path(shellexpand::tilde(path).as_ref())?
    } else {
        HaplotypeDefinitionTable::builtin()
    };
    let guidelines = if let Some(path) = &args.path_guidelines {
        CpicGuidelines::from_json_path(shellexpand::tilde(path).as_ref())?
    } else {
        CpicGuidelines::builtin()
    };

    let genes = if args.genes.is_empty() {
        table
            .genes()
            .into_iter()
            .map(|gene| gene.to_string())
            .collect::<Vec<_>>()
    } else {
        args.genes
            .iter()
            .map(|gene| gene.to_uppercase())
            .collect::<Vec<_>>()
    };

    common::trace_rss_now();

    tracing::info!("calling star alleles for {} genes...", genes.len());
    let mut gene_reports = Vec::new();
    for gene in &genes {
        match call_gene(gene, &store, &table) {
            Ok(call) => {
                tracing::info!(
                    "called {}: {} ({})",
                    gene,
                    &call.diplotype,
                    call.metabolizer_status
                );
                let recommendations = if args.with_recommendations {
                    match guidelines.recommendations_for(gene, call.metabolizer_status) {
                        Ok(recommendations) => Some(recommendations),
                        Err(e) => {
                            tracing::debug!("no dosing guidelines for {}: {}", gene, e);
                            None
                        }
                    }
                } else {
                    None
                };
                gene_reports.push(GeneReport::with_call(call, recommendations));
            }
            Err(error) => {
                tracing::warn!("calling {} failed: {}", gene, &error);
                gene_reports.push(GeneReport::with_error(gene, &error));
            }
        }
    }

    let called = gene_reports.iter().filter(|report| report.success).count();
    tracing::info!(
        "called {} of {} genes ({} failed)",
        called,
        gene_reports.len(),
        gene_reports.len() - called
    );

    tracing::info!("writing report...");
    let report = Report {
        header,
        genes: gene_reports,
    };
    let mut writer = common::io::open_write_maybe_gz(&args.path_output)?;
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush()?;

    tracing::info!(
        "All of `pgx call` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    use crate::pgx::caller::MetabolizerStatus;

    #[test]
    fn run_with_builtin_definitions() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir
            .to_path_buf()
            .join("pgx.json")
            .to_str()
            .unwrap()
            .to_string();

        let args = super::Args {
            path_genotypes: "tests/data/genotype/sample.tsv".into(),
            genes: vec![],
            path_definitions: None,
            path_guidelines: None,
            with_recommendations: true,
            path_output: path_output.clone(),
        };

        super::run(&crate::common::Args::default(), &args)?;

        let report: super::Report =
            serde_json::from_reader(std::fs::File::open(&path_output)?)?;
        assert_eq!(report.genes.len(), 5);

        let cyp2c19 = &report.genes[0];
        assert_eq!(cyp2c19.gene, "CYP2C19");
        assert!(cyp2c19.success);
        let call = cyp2c19.call.as_ref().expect("call must be present");
        assert_eq!(call.diplotype, "*2/*2");
        assert_eq!(call.metabolizer_status, MetabolizerStatus::Poor);
        let recommendations = cyp2c19
            .recommendations
            .as_ref()
            .expect("recommendations must be present");
        assert_eq!(
            recommendations["clopidogrel"],
            "Avoid clopidogrel due to lack of efficacy; use alternative antiplatelet \
             therapy (e.g., ticagrelor, prasugrel)"
        );

        // The sample has no markers for the remaining genes; their failures
        // must not abort the run.
        for gene_report in &report.genes[1..] {
            assert!(!gene_report.success);
            assert!(gene_report.error.is_some());
            assert!(gene_report.call.is_none());
        }

        Ok(())
    }

    #[test]
    fn run_normalizes_gene_names() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir
            .to_path_buf()
            .join("pgx.json")
            .to_str()
            .unwrap()
            .to_string();

        let args = super::Args {
            path_genotypes: "tests/data/genotype/sample.tsv".into(),
            genes: vec![String::from("cyp2c19")],
            path_definitions: None,
            path_guidelines: None,
            with_recommendations: false,
            path_output: path_output.clone(),
        };

        super::run(&crate::common::Args::default(), &args)?;

        let report: super::Report =
            serde_json::from_reader(std::fs::File::open(&path_output)?)?;
        assert_eq!(report.genes.len(), 1);
        assert_eq!(report.genes[0].gene, "CYP2C19");
        assert!(report.genes[0].success);
        assert!(report.genes[0].recommendations.is_none());

        Ok(())
    }

    #[test]
    fn run_with_custom_definitions() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_output = tmpdir
            .to_path_buf()
            .join("pgx.json")
            .to_str()
            .unwrap()
            .to_string();

        let args = super::Args {
            path_genotypes: "tests/data/pgx/sample_custom.tsv".into(),
            genes: vec![],
            path_definitions: Some("tests/data/pgx/definitions_custom.json".into()),
            path_guidelines: Some("tests/data/pgx/guidelines_custom.json".into()),
            with_recommendations: true,
            path_output: path_output.clone(),
        };

        super::run(&crate::common::Args::default(), &args)?;

        let report: super::Report =
            serde_json::from_reader(std::fs::File::open(&path_output)?)?;
        assert_eq!(report.genes.len(), 1);

        let cyp3a5 = &report.genes[0];
        assert_eq!(cyp3a5.gene, "CYP3A5");
        assert!(cyp3a5.success);
        let call = cyp3a5.call.as_ref().expect("call must be present");
        assert_eq!(call.diplotype, "*3/*3");
        assert_eq!(call.metabolizer_status, MetabolizerStatus::Poor);
        assert!(approx_eq!(f64, call.haplotype_completeness, 1.0, ulps = 2));
        // No copy number markers are defined for this gene.
        assert!(call.cnv_status.is_none());
        let recommendations = cyp3a5
            .recommendations
            .as_ref()
            .expect("recommendations must be present");
        assert_eq!(
            recommendations["tacrolimus"],
            "Increase starting dose 1.5 to 2 times"
        );

        Ok(())
    }
}
