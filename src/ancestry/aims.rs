//! Ancestry-informative marker (AIMs) reference panels.

use std::{path::Path, time::Instant};

use enum_map::EnumMap;
use indexmap::IndexMap;
use thousands::Separable;

use crate::common::{io::open_read_maybe_gz, Population};

/// Module with code for parsing the reference panel TSVs.
pub mod input {
    use serde::Deserialize;

    /// One line of a dedicated AIMs reference panel TSV file.
    #[derive(Debug, Deserialize)]
    pub struct Record {
        /// The dbSNP identifier of the marker.
        pub rsid: String,
        /// Effect allele frequency in the European reference population.
        #[serde(rename = "EUR_freq", default)]
        pub eur_freq: Option<f64>,
        /// Effect allele frequency in the African reference population.
        #[serde(rename = "AFR_freq", default)]
        pub afr_freq: Option<f64>,
        /// Effect allele frequency in the East Asian reference population.
        #[serde(rename = "EAS_freq", default)]
        pub eas_freq: Option<f64>,
        /// Effect allele frequency in the South Asian reference population.
        #[serde(rename = "SAS_freq", default)]
        pub sas_freq: Option<f64>,
        /// Effect allele frequency in the American reference population.
        #[serde(rename = "AMR_freq", default)]
        pub amr_freq: Option<f64>,
    }

    /// One line of a long-format population frequency TSV file.
    #[derive(Debug, Deserialize)]
    pub struct PopulationFrequencyRecord {
        /// The dbSNP identifier of the marker.
        pub rsid: String,
        /// Population code, e.g., "EUR".
        pub population: String,
        /// Effect allele frequency in that population.
        pub frequency: f64,
    }
}

/// Provenance of a loaded reference panel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PanelSource {
    /// Loaded from a dedicated AIMs reference panel file.
    Dedicated,
    /// Derived from a generic population frequency table.
    DerivedFromPopulationFrequencies,
}

/// One ancestry-informative marker with its per-population frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct AimsRecord {
    /// The dbSNP identifier of the marker.
    pub rsid: String,
    /// Effect allele frequency per reference population, where known.
    pub frequencies: EnumMap<Population, Option<f64>>,
}

/// Number of markers kept when deriving a panel from population frequencies.
const MAX_DERIVED_MARKERS: usize = 100;

/// An AIMs reference panel together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct AimsPanel {
    /// Where the panel came from.
    pub source: PanelSource,
    /// The markers of the panel.
    pub records: Vec<AimsRecord>,
}

impl AimsPanel {
    /// Load a dedicated panel from a wide-format TSV file (columns `rsid`,
    /// `EUR_freq`, ..., `AMR_freq`), plain text or gzip-ed.
    ///
    /// Markers without a single frequency value are dropped with a warning.
    pub fn from_tsv_path<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let before_parsing = Instant::now();
        tracing::debug!("parsing AIMs panel TSV file from {:?}", path.as_ref());

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .from_reader(open_read_maybe_gz(path.as_ref())?);
        let mut records = Vec::new();
        let mut n_dropped = 0;
        for record in reader.deserialize() {
            let record: input::Record = record?;
            let frequencies = EnumMap::from_fn(|population| match population {
                Population::Eur => record.eur_freq,
                Population::Afr => record.afr_freq,
                Population::Eas => record.eas_freq,
                Population::Sas => record.sas_freq,
                Population::Amr => record.amr_freq,
            });
            if frequencies.values().all(|freq| freq.is_none()) {
                n_dropped += 1;
                continue;
            }
            records.push(AimsRecord {
                rsid: record.rsid,
                frequencies,
            });
        }
        if n_dropped > 0 {
            tracing::warn!(
                "dropped {} AIMs panel markers without any frequency value",
                n_dropped
            );
        }

        tracing::debug!(
            "total time spent reading {} panel markers: {:?}",
            records.len().separate_with_commas(),
            before_parsing.elapsed()
        );

        Ok(Self {
            source: PanelSource::Dedicated,
            records,
        })
    }

    /// Derive a reduced panel from a long-format population frequency TSV
    /// file (columns `rsid`, `population`, `frequency`).
    ///
    /// Markers are ranked by their frequency differential (maximal minus
    /// minimal frequency across populations) and the top markers are kept.
    pub fn from_population_freqs_path<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        let before_parsing = Instant::now();
        tracing::debug!(
            "deriving AIMs panel from population frequency TSV file {:?}",
            path.as_ref()
        );

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b'\t')
            .from_reader(open_read_maybe_gz(path.as_ref())?);
        let mut by_rsid: IndexMap<String, EnumMap<Population, Option<f64>>> = IndexMap::new();
        for record in reader.deserialize() {
            let record: input::PopulationFrequencyRecord = record?;
            let population = match record.population.parse::<Population>() {
                Ok(population) => population,
                Err(_) => {
                    tracing::debug!(
                        "skipping frequency entry for unknown population {:?}",
                        &record.population
                    );
                    continue;
                }
            };
            by_rsid.entry(record.rsid).or_default()[population] = Some(record.frequency);
        }

        let mut records = by_rsid
            .into_iter()
            .filter(|(_, frequencies)| frequencies.values().any(|freq| freq.is_some()))
            .map(|(rsid, frequencies)| AimsRecord { rsid, frequencies })
            .collect::<Vec<_>>();
        records.sort_by(|a, b| {
            frequency_differential(&b.frequencies)
                .partial_cmp(&frequency_differential(&a.frequencies))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        records.truncate(MAX_DERIVED_MARKERS);

        tracing::debug!(
            "total time spent deriving {} panel markers: {:?}",
            records.len().separate_with_commas(),
            before_parsing.elapsed()
        );

        Ok(Self {
            source: PanelSource::DerivedFromPopulationFrequencies,
            records,
        })
    }

    /// Number of markers in the panel.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the panel holds no markers at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Spread between the largest and smallest known frequency of a marker.
fn frequency_differential(frequencies: &EnumMap<Population, Option<f64>>) -> f64 {
    let known = frequencies.values().flatten().copied().collect::<Vec<_>>();
    match (
        known.iter().cloned().reduce(f64::max),
        known.iter().cloned().reduce(f64::min),
    ) {
        (Some(max), Some(min)) => max - min,
        _ => 0.0,
    }
}

#[cfg(test)]
mod test {
    use float_cmp::approx_eq;
    use pretty_assertions::assert_eq;

    use crate::common::Population;

    use super::{AimsPanel, PanelSource};

    #[test]
    fn from_tsv_path() -> Result<(), anyhow::Error> {
        let panel = AimsPanel::from_tsv_path("tests/data/ancestry/aims_panel.tsv")?;

        assert_eq!(panel.source, PanelSource::Dedicated);
        assert_eq!(panel.len(), 4);
        assert_eq!(panel.records[0].rsid, "rs1426654");
        assert!(approx_eq!(
            f64,
            panel.records[0].frequencies[Population::Eur].unwrap(),
            0.99,
            ulps = 2
        ));
        // The all-empty marker from the file must have been dropped.
        assert!(!panel.records.iter().any(|record| record.rsid == "rs0"));

        Ok(())
    }

    #[test]
    fn from_tsv_path_keeps_partial_frequencies() -> Result<(), anyhow::Error> {
        let panel = AimsPanel::from_tsv_path("tests/data/ancestry/aims_panel.tsv")?;

        let record = panel
            .records
            .iter()
            .find(|record| record.rsid == "rs3827760")
            .expect("marker must be present");
        assert_eq!(record.frequencies[Population::Amr], None);
        assert!(record.frequencies[Population::Eas].is_some());

        Ok(())
    }

    #[test]
    fn from_population_freqs_path() -> Result<(), anyhow::Error> {
        let panel = AimsPanel::from_population_freqs_path(
            "tests/data/ancestry/population_freqs.tsv",
        )?;

        assert_eq!(panel.source, PanelSource::DerivedFromPopulationFrequencies);
        // Markers are ranked by frequency differential.
        assert_eq!(
            panel
                .records
                .iter()
                .map(|record| record.rsid.as_str())
                .collect::<Vec<_>>(),
            vec!["rs2814778", "rs1426654", "rs16891982"]
        );
        assert!(approx_eq!(
            f64,
            panel.records[0].frequencies[Population::Afr].unwrap(),
            0.95,
            ulps = 2
        ));

        Ok(())
    }

    #[test]
    fn frequency_differential() {
        let mut frequencies = enum_map::EnumMap::default();
        frequencies[Population::Eur] = Some(0.2);
        frequencies[Population::Afr] = Some(0.9);

        assert!(approx_eq!(
            f64,
            super::frequency_differential(&frequencies),
            0.7,
            ulps = 2
        ));
    }
}
