use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a pathway in the catalog.
///
/// The numeric id is the primary key; name, source database, and organism
/// travel with it so results are self-describing without a second lookup.
/// Equality and hashing are by numeric id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathwayId {
    pub id: i64,
    pub name: String,
    pub source: String,
    pub organism: String,
}

impl PathwayId {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        source: impl Into<String>,
        organism: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source: source.into(),
            organism: organism.into(),
        }
    }
}

impl PartialEq for PathwayId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PathwayId {}

impl std::hash::Hash for PathwayId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PathwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}:{}]", self.name, self.source, self.id)
    }
}

/// A protein as the catalog knows it: accession plus optional gene symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProteinEntry {
    pub accession: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_symbol: Option<String>,
}

impl ProteinEntry {
    pub fn new(accession: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            gene_symbol: None,
        }
    }

    pub fn with_gene_symbol(accession: impl Into<String>, gene_symbol: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            gene_symbol: Some(gene_symbol.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn pathway_identity_is_numeric() {
        let a = PathwayId::new(7, "Apoptosis", "KEGG", "Homo sapiens");
        let b = PathwayId::new(7, "Apoptosis - renamed", "Reactome", "Homo sapiens");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn display_format() {
        let p = PathwayId::new(42, "Cell cycle", "KEGG", "Homo sapiens");
        assert_eq!(p.to_string(), "Cell cycle [KEGG:42]");
    }
}
