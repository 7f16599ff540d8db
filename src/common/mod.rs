//! Common functionality.

use byte_unit::Byte;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use strum_macros::{Display, EnumIter, EnumString};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let me = procfs::process::Process::myself().unwrap();
    let page_size = procfs::page_size();
    tracing::debug!(
        "RSS now: {}",
        Byte::from_u64(me.stat().unwrap().rss * page_size)
            .get_appropriate_unit(byte_unit::UnitType::Binary)
    );
}

/// The nucleotide bases accepted in genotype calls.
pub const VALID_BASES: &[char] = &['A', 'C', 'G', 'T'];

/// Whether `c` is one of the four nucleotide bases (upper case).
pub fn is_valid_base(c: char) -> bool {
    VALID_BASES.contains(&c)
}

/// Continental reference population used for ancestry inference and
/// PRS adjustment.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Display,
    EnumString,
    EnumIter,
    PartialEq,
    Eq,
    enum_map::Enum,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum Population {
    /// European reference population.
    #[strum(serialize = "EUR")]
    #[serde(rename = "EUR")]
    #[clap(name = "eur")]
    Eur,
    /// African reference population.
    #[strum(serialize = "AFR")]
    #[serde(rename = "AFR")]
    #[clap(name = "afr")]
    Afr,
    /// East Asian reference population.
    #[strum(serialize = "EAS")]
    #[serde(rename = "EAS")]
    #[clap(name = "eas")]
    Eas,
    /// South Asian reference population.
    #[strum(serialize = "SAS")]
    #[serde(rename = "SAS")]
    #[clap(name = "sas")]
    Sas,
    /// Admixed American reference population.
    #[strum(serialize = "AMR")]
    #[serde(rename = "AMR")]
    #[clap(name = "amr")]
    Amr,
}

impl Population {
    /// Human-readable population label as used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Population::Eur => "European",
            Population::Afr => "African",
            Population::Eas => "East Asian",
            Population::Sas => "South Asian",
            Population::Amr => "American",
        }
    }
}

/// The version of the `genoreport-worker` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return the version of the `genoreport-worker` crate and `x.y.z` in tests.
pub fn worker_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Provenance header written into every worker report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct ReportHeader {
    /// Identifier of the report.
    pub report_uuid: uuid::Uuid,
    /// Version of the worker that wrote the report.
    pub worker_version: String,
    /// Time at which the report was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// SHA256 checksum of the genotype input file.
    pub genotypes_sha256: String,
}

impl ReportHeader {
    /// Construct with a fresh UUID and the current time for the genotype
    /// file at `path`.
    pub fn with_genotypes_path(path: &str) -> Result<Self, anyhow::Error> {
        Ok(Self::new(
            uuid::Uuid::new_v4(),
            worker_version().to_string(),
            chrono::Utc::now(),
            io::sha256sum(path)?,
        ))
    }
}
