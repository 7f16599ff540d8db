//! Star allele definition tables for the supported pharmacogenes.

use indexmap::IndexMap;

use crate::common::io::open_read_maybe_gz;

/// Pseudo-tag marking a whole-gene deletion allele.
///
/// It can never be satisfied by genotype calls and is excluded from
/// completeness accounting.
pub const DELETION_TAG: &str = "deletion";

/// Genes with built-in star allele definitions, in display order.
pub const SUPPORTED_GENES: &[&str] = &["CYP2C19", "CYP2D6", "CYP2C9", "TPMT", "DPYD"];

/// Functional impact of a star allele.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum AlleleFunction {
    /// Full enzyme activity.
    #[default]
    #[strum(serialize = "Normal")]
    #[serde(rename = "Normal")]
    Normal,
    /// Reduced enzyme activity.
    #[strum(serialize = "Decreased function")]
    #[serde(rename = "Decreased function")]
    Decreased,
    /// No enzyme activity.
    #[strum(serialize = "No function")]
    #[serde(rename = "No function")]
    NoFunction,
    /// Enhanced enzyme activity.
    #[strum(serialize = "Increased function")]
    #[serde(rename = "Increased function")]
    Increased,
}

/// One star allele with its required variant tags.
///
/// A tag has the shape `"rsid:allele"`; the reference allele `*1` carries no
/// tags and is always callable.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct StarAllele {
    /// Allele name, e.g. `"*2"`.
    pub name: String,
    /// Variant tags that must all be observed to call this allele.
    pub tags: Vec<String>,
    /// Functional impact of the allele.
    pub function: AlleleFunction,
    /// Short description of the defining variants.
    pub description: String,
}

/// The rsID part of a `"rsid:allele"` tag.
pub fn tag_rsid(tag: &str) -> &str {
    tag.split(':').next().unwrap_or(tag)
}

/// Star allele definitions for all supported genes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct HaplotypeDefinitionTable {
    genes: IndexMap<String, Vec<StarAllele>>,
}

impl HaplotypeDefinitionTable {
    /// Construct the built-in definition table.
    pub fn builtin() -> Self {
        fn allele(
            name: &str,
            tags: &[&str],
            function: AlleleFunction,
            description: &str,
        ) -> StarAllele {
            StarAllele::new(
                name.to_string(),
                tags.iter().map(|tag| tag.to_string()).collect(),
                function,
                description.to_string(),
            )
        }
        use AlleleFunction::*;

        let mut genes = IndexMap::new();
        genes.insert(
            String::from("CYP2C19"),
            vec![
                allele("*1", &[], Normal, "Reference haplotype"),
                allele("*2", &["rs4244285:A"], NoFunction, "681G>A"),
                allele("*3", &["rs4986893:A"], NoFunction, "636G>A"),
                allele("*17", &["rs12248560:T"], Increased, "-806C>T"),
                allele("*4", &["rs28399504:A"], NoFunction, "1A>C"),
                allele("*5", &["rs56337013:C"], NoFunction, "1297C>T"),
                allele("*6", &["rs72552267:A"], NoFunction, "395G>A"),
                allele("*7", &["rs72558186:A"], NoFunction, "19294T>A"),
                allele("*8", &["rs41291556:T"], NoFunction, "358T>C"),
                allele("*9", &["rs17884712:G"], NoFunction, "431G>A"),
                allele("*10", &["rs6413438:T"], NoFunction, "680C>T"),
            ],
        );
        genes.insert(
            String::from("CYP2D6"),
            vec![
                allele("*1", &[], Normal, "Reference haplotype"),
                allele("*3", &["rs35742686:delA"], NoFunction, "2549delA"),
                allele(
                    "*4",
                    &["rs3892097:A", "rs1065852:T", "rs28371725:C"],
                    NoFunction,
                    "1846G>A + 100C>T + 4180G>C",
                ),
                allele("*5", &[DELETION_TAG], NoFunction, "Gene deletion"),
                allele(
                    "*6",
                    &["rs5030655:delT", "rs3892097:A"],
                    NoFunction,
                    "1707delT + 1846G>A",
                ),
                allele(
                    "*10",
                    &["rs1065852:T", "rs1135840:C"],
                    Decreased,
                    "100C>T + 1661G>C",
                ),
                allele(
                    "*17",
                    &["rs28371706:T", "rs16947:T", "rs28371725:C"],
                    Decreased,
                    "1023C>T + 886C>T + 4180G>C",
                ),
                allele(
                    "*41",
                    &["rs28371725:C", "rs16947:T", "rs267608319:T"],
                    Decreased,
                    "4180G>C + 886C>T + 2988G>A",
                ),
            ],
        );
        genes.insert(
            String::from("CYP2C9"),
            vec![
                allele("*1", &[], Normal, "Reference haplotype"),
                allele("*2", &["rs1799853:C"], Decreased, "430C>T"),
                allele("*3", &["rs1057910:A"], Decreased, "1075A>C"),
            ],
        );
        genes.insert(
            String::from("TPMT"),
            vec![
                allele("*1", &[], Normal, "Reference haplotype"),
                allele("*2", &["rs1800462:A"], NoFunction, "238G>C"),
                allele(
                    "*3A",
                    &["rs1800460:A", "rs1142345:T"],
                    NoFunction,
                    "460G>A + 719A>G",
                ),
                allele("*3B", &["rs1800460:A"], NoFunction, "460G>A"),
                allele("*3C", &["rs1142345:T"], NoFunction, "719A>G"),
            ],
        );
        genes.insert(
            String::from("DPYD"),
            vec![
                allele("*1", &[], Normal, "Reference haplotype"),
                allele("*2A", &["rs3918290:T"], NoFunction, "1905+1G>A"),
                allele("*13", &["rs55886062:A"], Decreased, "1679T>G"),
            ],
        );

        Self { genes }
    }

    /// Load a definition table from a JSON file.
    ///
    /// The file maps gene symbols to lists of star allele records with the
    /// same shape as the built-in table.
    pub fn from_json_path(path: &str) -> Result<Self, anyhow::Error> {
        tracing::debug!("loading star allele definitions from {}...", path);
        let reader = open_read_maybe_gz(path)?;
        let table: Self = serde_json::from_reader(reader)
            .map_err(|e| anyhow::anyhow!("problem parsing definitions from {}: {}", path, e))?;
        if table.genes.is_empty() {
            anyhow::bail!("definition table {} defines no genes", path);
        }
        for (gene, alleles) in &table.genes {
            if alleles.is_empty() {
                anyhow::bail!("definition table {} defines no alleles for {}", path, gene);
            }
        }
        Ok(table)
    }

    /// The gene symbols of the table, in definition order.
    pub fn genes(&self) -> Vec<&str> {
        self.genes.keys().map(|gene| gene.as_str()).collect()
    }

    /// The star alleles defined for `gene`.
    pub fn alleles(&self, gene: &str) -> Option<&[StarAllele]> {
        self.genes.get(gene).map(|alleles| alleles.as_slice())
    }

    /// The function label of allele `name` for `gene`, `Normal` if unknown.
    pub fn function_of(&self, gene: &str, name: &str) -> AlleleFunction {
        self.genes
            .get(gene)
            .and_then(|alleles| alleles.iter().find(|allele| allele.name == name))
            .map(|allele| allele.function)
            .unwrap_or_default()
    }

    /// Distinct required tags of `gene`, excluding the deletion pseudo-tag.
    pub fn required_tags(&self, gene: &str) -> Vec<&str> {
        use itertools::Itertools;

        self.genes
            .get(gene)
            .map(|alleles| {
                alleles
                    .iter()
                    .flat_map(|allele| allele.tags.iter())
                    .map(|tag| tag.as_str())
                    .filter(|tag| *tag != DELETION_TAG)
                    .unique()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct rsIDs relevant to `gene`, in tag order.
    pub fn relevant_rsids(&self, gene: &str) -> Vec<&str> {
        use itertools::Itertools;

        self.required_tags(gene)
            .into_iter()
            .map(tag_rsid)
            .unique()
            .collect()
    }
}

impl Default for HaplotypeDefinitionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{tag_rsid, AlleleFunction, HaplotypeDefinitionTable, SUPPORTED_GENES};

    #[test]
    fn builtin_covers_supported_genes() {
        let table = HaplotypeDefinitionTable::builtin();

        assert_eq!(table.genes(), SUPPORTED_GENES.to_vec());
        for gene in SUPPORTED_GENES {
            let alleles = table.alleles(gene).expect("gene must be defined");
            assert_eq!(alleles[0].name, "*1");
            assert!(alleles[0].tags.is_empty());
            assert_eq!(alleles[0].function, AlleleFunction::Normal);
        }
    }

    #[test]
    fn builtin_cyp2c19_alleles() {
        let table = HaplotypeDefinitionTable::builtin();
        let alleles = table.alleles("CYP2C19").unwrap();

        assert_eq!(alleles.len(), 11);
        assert_eq!(alleles[1].name, "*2");
        assert_eq!(alleles[1].tags, vec!["rs4244285:A"]);
        assert_eq!(alleles[1].function, AlleleFunction::NoFunction);
        assert_eq!(
            table.function_of("CYP2C19", "*17"),
            AlleleFunction::Increased
        );
        assert_eq!(table.function_of("CYP2C19", "*99"), AlleleFunction::Normal);
    }

    #[test]
    fn required_tags_exclude_deletion() {
        let table = HaplotypeDefinitionTable::builtin();
        let tags = table.required_tags("CYP2D6");

        assert_eq!(tags.len(), 9);
        assert!(!tags.contains(&"deletion"));
        assert!(tags.contains(&"rs3892097:A"));
        // Tags shared between alleles appear once.
        assert_eq!(
            tags.iter().filter(|tag| **tag == "rs28371725:C").count(),
            1
        );
    }

    #[test]
    fn relevant_rsids_are_distinct() {
        let table = HaplotypeDefinitionTable::builtin();

        assert_eq!(
            table.relevant_rsids("TPMT"),
            vec!["rs1800462", "rs1800460", "rs1142345"]
        );
        assert_eq!(table.relevant_rsids("UGT1A1"), Vec::<&str>::new());
    }

    #[test]
    fn tag_rsid_splits_at_colon() {
        assert_eq!(tag_rsid("rs4244285:A"), "rs4244285");
        assert_eq!(tag_rsid("deletion"), "deletion");
    }

    #[test]
    fn load_from_json() -> Result<(), anyhow::Error> {
        let table =
            HaplotypeDefinitionTable::from_json_path("tests/data/pgx/definitions_custom.json")?;

        assert_eq!(table.genes(), vec!["CYP3A5"]);
        let alleles = table.alleles("CYP3A5").unwrap();
        assert_eq!(alleles.len(), 2);
        assert_eq!(alleles[1].name, "*3");
        assert_eq!(alleles[1].function, AlleleFunction::NoFunction);

        Ok(())
    }

    #[test]
    fn load_from_json_rejects_empty_gene() {
        let result =
            HaplotypeDefinitionTable::from_json_path("tests/data/pgx/definitions_empty_gene.json");

        assert!(result.is_err());
    }
}
