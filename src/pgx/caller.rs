//! Diplotype calling from unphased genotype calls.

use std::cmp::Reverse;

use itertools::Itertools;

use crate::{
    genotype::GenotypeStore,
    pgx::{
        cnv::{self, CnvStatus},
        definitions::{tag_rsid, AlleleFunction, HaplotypeDefinitionTable, StarAllele},
    },
};

/// Failure modes of diplotype calling.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The gene has no star allele definitions.
    #[error("gene {0} is not supported for star allele analysis")]
    UnsupportedGene(String),
    /// The genotype store holds no calls at all.
    #[error("no genotype calls provided")]
    NoGenotypes,
    /// None of the gene's defining markers is present in the sample.
    #[error("no relevant markers for {0} found in genotype calls")]
    NoRelevantSnps(String),
}

/// Metabolizer phenotype derived from a diplotype.
///
/// `Ultrarapid` is never produced by [`classify_metabolizer`]; it exists for
/// the dosing guideline tables, which cover it for copy number gains.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    enum_map::Enum,
    strum::Display,
    strum::EnumIter,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum MetabolizerStatus {
    /// Strongly reduced or absent enzyme activity.
    #[strum(serialize = "Poor Metabolizer")]
    #[serde(rename = "Poor Metabolizer")]
    Poor,
    /// Reduced enzyme activity.
    #[strum(serialize = "Intermediate Metabolizer")]
    #[serde(rename = "Intermediate Metabolizer")]
    Intermediate,
    /// Expected enzyme activity.
    #[strum(serialize = "Normal Metabolizer")]
    #[serde(rename = "Normal Metabolizer")]
    Normal,
    /// Enhanced enzyme activity.
    #[strum(serialize = "Rapid Metabolizer")]
    #[serde(rename = "Rapid Metabolizer")]
    Rapid,
    /// Greatly enhanced enzyme activity.
    #[strum(serialize = "Ultrarapid Metabolizer")]
    #[serde(rename = "Ultrarapid Metabolizer")]
    Ultrarapid,
}

/// A called diplotype with its derived phenotype and quality annotations.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DiplotypeCall {
    /// Gene symbol.
    pub gene: String,
    /// First allele of the canonical diplotype.
    pub allele1: String,
    /// Second allele of the canonical diplotype.
    pub allele2: String,
    /// Display form, e.g. `"*1/*2"`.
    pub diplotype: String,
    /// Combined function labels, e.g. `"Normal/No function"`.
    pub function: String,
    /// Derived metabolizer phenotype.
    pub metabolizer_status: MetabolizerStatus,
    /// Fraction of the gene's defining markers observed in the sample.
    pub haplotype_completeness: f64,
    /// Data quality warnings.
    pub warnings: Vec<String>,
    /// Copy number advisory for genes with copy number markers.
    pub cnv_status: Option<CnvStatus>,
}

/// Sort key ordering star alleles canonically.
///
/// `*1` first, then numeric alleles ascending by number and suffix,
/// non-parseable names last alphabetically.
fn allele_sort_key(name: &str) -> (u8, u32, String) {
    if name == "*1" {
        return (0, 0, String::new());
    }
    if let Some(rest) = name.strip_prefix('*') {
        let digits = rest
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>();
        if let Ok(number) = digits.parse::<u32>() {
            return (1, number, rest[digits.len()..].to_string());
        }
    }
    (2, 0, name.to_string())
}

/// Observed tag pool of the sample, one tag per chromosomal copy.
///
/// Two-character calls yield one tag per character; other non-empty calls
/// yield a single tag carrying the whole call.
fn extract_tags(store: &GenotypeStore, rsids: &[&str]) -> Vec<String> {
    let mut tags = Vec::new();
    for rsid in rsids {
        let Some(call) = store.get(rsid) else {
            continue;
        };
        let chars = call.chars().collect::<Vec<_>>();
        match chars.len() {
            0 => (),
            2 => {
                tags.push(format!("{}:{}", rsid, chars[0]));
                tags.push(format!("{}:{}", rsid, chars[1]));
            }
            _ => tags.push(format!("{}:{}", rsid, call)),
        }
    }
    tags
}

/// Number of complete copies of `tags` that `pool` can satisfy.
fn satisfaction(pool: &[String], tags: &[String]) -> usize {
    tags.iter()
        .unique()
        .map(|tag| pool.iter().filter(|have| *have == tag).count())
        .min()
        .unwrap_or(0)
}

/// Remove one instance of each of `tags` from `pool`.
fn consume_tag_set(pool: &mut Vec<String>, tags: &[String]) {
    for tag in tags.iter().unique() {
        if let Some(pos) = pool.iter().position(|have| have == tag) {
            pool.remove(pos);
        }
    }
}

/// The best-satisfied non-reference allele against the current pool.
fn best_candidate<'a>(alleles: &'a [StarAllele], pool: &[String]) -> Option<&'a StarAllele> {
    alleles
        .iter()
        .filter(|allele| !allele.tags.is_empty())
        .filter_map(|allele| {
            let copies = satisfaction(pool, &allele.tags);
            (copies > 0).then_some((allele, copies))
        })
        .min_by_key(|(allele, copies)| {
            (
                Reverse(*copies),
                Reverse(allele.tags.len()),
                allele_sort_key(&allele.name),
            )
        })
        .map(|(allele, _)| allele)
}

/// Metabolizer phenotype of a pair of allele functions.
///
/// No function rules are evaluated first, then decreased function, then
/// increased function.
pub fn classify_metabolizer(
    function1: AlleleFunction,
    function2: AlleleFunction,
) -> MetabolizerStatus {
    let functions = [function1, function2];
    let count = |function: AlleleFunction| functions.iter().filter(|f| **f == function).count();

    if count(AlleleFunction::NoFunction) == 2 {
        MetabolizerStatus::Poor
    } else if count(AlleleFunction::NoFunction) == 1 {
        MetabolizerStatus::Intermediate
    } else if count(AlleleFunction::Decreased) == 2 {
        MetabolizerStatus::Poor
    } else if count(AlleleFunction::Decreased) == 1 {
        MetabolizerStatus::Intermediate
    } else if count(AlleleFunction::Increased) >= 1 {
        MetabolizerStatus::Rapid
    } else {
        MetabolizerStatus::Normal
    }
}

/// Fraction of distinct required tags whose marker was observed with a call.
fn haplotype_completeness(store: &GenotypeStore, required_tags: &[&str]) -> f64 {
    if required_tags.is_empty() {
        return 1.0;
    }
    let found = required_tags
        .iter()
        .filter(|tag| {
            store
                .get(tag_rsid(tag))
                .map(|call| !call.is_empty())
                .unwrap_or(false)
        })
        .count();
    found as f64 / required_tags.len() as f64
}

/// Call the diplotype of `gene` from the genotype calls in `store`.
///
/// Non-reference alleles are assigned greedily by tag set satisfaction,
/// consuming tags from the observed pool; unfilled slots fall back to `*1`.
pub fn call_gene(
    gene: &str,
    store: &GenotypeStore,
    table: &HaplotypeDefinitionTable,
) -> Result<DiplotypeCall, Error> {
    let alleles = table
        .alleles(gene)
        .ok_or_else(|| Error::UnsupportedGene(gene.to_string()))?;
    if store.is_empty() {
        return Err(Error::NoGenotypes);
    }
    let relevant = table.relevant_rsids(gene);
    if !relevant.iter().any(|rsid| store.contains(rsid)) {
        return Err(Error::NoRelevantSnps(gene.to_string()));
    }

    let mut pool = extract_tags(store, &relevant);
    tracing::trace!("observed tag pool for {}: {:?}", gene, &pool);

    let mut assigned = Vec::new();
    while assigned.len() < 2 {
        let Some(best) = best_candidate(alleles, &pool) else {
            break;
        };
        consume_tag_set(&mut pool, &best.tags);
        assigned.push(best.name.clone());
    }
    while assigned.len() < 2 {
        assigned.push(String::from("*1"));
    }
    assigned.sort_by_key(|name| allele_sort_key(name));

    let allele1 = assigned[0].clone();
    let allele2 = assigned[1].clone();
    let function1 = table.function_of(gene, &allele1);
    let function2 = table.function_of(gene, &allele2);

    let completeness = haplotype_completeness(store, &table.required_tags(gene));
    let mut warnings = Vec::new();
    if completeness < 0.5 {
        warnings.push(String::from(
            "Incomplete haplotype data - results may be less accurate",
        ));
    }

    Ok(DiplotypeCall {
        gene: gene.to_string(),
        diplotype: format!("{}/{}", allele1, allele2),
        function: format!("{}/{}", function1, function2),
        allele1,
        allele2,
        metabolizer_status: classify_metabolizer(function1, function2),
        haplotype_completeness: completeness,
        warnings,
        cnv_status: cnv::detect_cnv(gene, store),
    })
}
