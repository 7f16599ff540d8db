//! Access to the genotype calls of a single sample.

use std::{path::Path, time::Instant};

use indexmap::IndexMap;
use thousands::Separable;

use crate::common::io::open_read_maybe_gz;

/// Module with code for parsing prepared genotype TSV files.
pub mod input {
    use serde::Deserialize;

    /// One line of a prepared genotype TSV file.
    #[derive(Debug, Deserialize)]
    pub struct Record {
        /// The dbSNP identifier of the marker.
        pub rsid: String,
        /// The raw diploid call, e.g., "AG".
        pub genotype: String,
    }
}

/// Classification of a single genotype call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Zygosity {
    /// Two identical characters.
    Homozygous,
    /// Two distinct characters.
    Heterozygous,
    /// Empty call.
    Missing,
    /// Any other call shape (indels, CNV-style calls).
    Indeterminate,
}

/// No-call and indel placeholder codes as written by consumer genotyping
/// arrays.
const NO_CALLS: &[&str] = &["--", "00", "II", "DD"];

/// In-memory genotype calls of one sample, keyed by rsID.
///
/// Calls are kept verbatim as read from the input; the empty string encodes
/// a missing call.  Case folding happens at the scoring sites that need it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenotypeStore {
    /// Calls by rsID.
    calls: IndexMap<String, String>,
}

impl GenotypeStore {
    /// Load calls from a two-column TSV file (`rsid`, `genotype`), plain text
    /// or gzip-ed.
    pub fn from_tsv_path<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let before_parsing = Instant::now();
        tracing::debug!("parsing genotype TSV file from {:?}", path.as_ref());

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .from_reader(open_read_maybe_gz(path.as_ref())?);
        let mut calls = IndexMap::new();
        for record in reader.deserialize() {
            let record: input::Record = record?;
            calls.insert(record.rsid, normalize_call(&record.genotype));
        }

        let result = Self { calls };
        tracing::debug!(
            "total time spent reading {} calls ({} missing): {:?}",
            result.len().separate_with_commas(),
            result.n_missing().separate_with_commas(),
            before_parsing.elapsed()
        );

        Ok(result)
    }

    /// Construct from `(rsid, call)` pairs, applying the same no-call
    /// normalization as the TSV reader.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        Self {
            calls: pairs
                .into_iter()
                .map(|(rsid, call)| (rsid.into(), normalize_call(call.as_ref())))
                .collect(),
        }
    }

    /// The call for `rsid`, if the marker was genotyped at all.
    pub fn get(&self, rsid: &str) -> Option<&str> {
        self.calls.get(rsid).map(|s| s.as_str())
    }

    /// Whether the marker is present in the store (possibly with a no-call).
    pub fn contains(&self, rsid: &str) -> bool {
        self.calls.contains_key(rsid)
    }

    /// Iterate over `(rsid, call)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.calls.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of markers in the store.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Whether the store holds no markers at all.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Number of markers with a missing call.
    pub fn n_missing(&self) -> usize {
        self.calls.values().filter(|call| call.is_empty()).count()
    }

    /// Classify the call at `rsid`; absent markers count as missing.
    pub fn zygosity(&self, rsid: &str) -> Zygosity {
        let call = self.get(rsid).unwrap_or("");
        let chars = call.chars().collect::<Vec<_>>();
        match chars.len() {
            0 => Zygosity::Missing,
            2 if chars[0] == chars[1] => Zygosity::Homozygous,
            2 => Zygosity::Heterozygous,
            _ => Zygosity::Indeterminate,
        }
    }

    /// Count copies of `effect_allele` in the call at `rsid`, case
    /// insensitively and capped at two copies.
    pub fn effect_allele_dosage(&self, rsid: &str, effect_allele: &str) -> u8 {
        let call = match self.get(rsid) {
            Some(call) => call.to_uppercase(),
            None => return 0,
        };
        let allele = effect_allele.to_uppercase();
        if allele.is_empty() {
            return 0;
        }
        std::cmp::min(call.matches(allele.as_str()).count(), 2) as u8
    }
}

/// Map array no-call codes to the empty string; keep all other calls verbatim.
///
/// No-call codes match case-insensitively so that `ii`/`dd` cells do not
/// survive as bogus two-character calls.
fn normalize_call(raw: &str) -> String {
    let trimmed = raw.trim();
    if NO_CALLS.contains(&trimmed.to_uppercase().as_str()) {
        String::new()
    } else {
        trimmed.to_string()
    }
}
