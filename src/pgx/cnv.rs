//! Copy number advisories derived from genotype call shapes.

use crate::genotype::GenotypeStore;

/// Copy number advisory for a gene.
///
/// This is a heuristic side-check on call shapes at a few marker positions,
/// not a real copy number analysis; it annotates the diplotype call and
/// never changes it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CnvStatus {
    /// All marker calls look expanded beyond two alleles.
    #[strum(serialize = "Possible duplication (*1xN)")]
    PossibleDuplication,
    /// All marker calls are missing.
    #[strum(serialize = "Possible deletion (*5)")]
    PossibleDeletion,
    /// No unusual call pattern.
    #[strum(serialize = "None detected")]
    NoneDetected,
}

/// Copy number marker rsIDs per gene.
pub fn cnv_markers(gene: &str) -> Option<&'static [&'static str]> {
    match gene {
        "CYP2D6" => Some(&["rs1065852", "rs3892097"]),
        "CYP2C19" => Some(&["rs4244285", "rs12248560"]),
        _ => None,
    }
}

/// Inspect the call shape at the copy number markers of `gene`.
///
/// Genes without copy number markers yield no advisory at all.
pub fn detect_cnv(gene: &str, store: &GenotypeStore) -> Option<CnvStatus> {
    let markers = cnv_markers(gene)?;
    let calls = markers
        .iter()
        .filter_map(|marker| store.get(marker))
        .collect::<Vec<_>>();
    if calls.len() < markers.len() {
        return Some(CnvStatus::NoneDetected);
    }

    if calls.iter().all(|call| call.chars().count() > 2) {
        Some(CnvStatus::PossibleDuplication)
    } else if calls.iter().all(|call| call.is_empty()) {
        Some(CnvStatus::PossibleDeletion)
    } else {
        Some(CnvStatus::NoneDetected)
    }
}
