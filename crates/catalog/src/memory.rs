use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::catalog::{CatalogError, PathwayCatalog};
use crate::types::{PathwayId, ProteinEntry};

/// An immutable in-memory pathway catalog.
///
/// Built once with [`MemoryCatalogBuilder`], then shared read-only across
/// threads. Both directions of the membership relation are indexed so the
/// hot lookups during a run are single hash probes.
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    pathways: HashMap<i64, PathwayId>,
    members: HashMap<i64, HashSet<ProteinEntry>>,
    by_accession: HashMap<String, Vec<i64>>,
}

impl MemoryCatalog {
    pub fn builder() -> MemoryCatalogBuilder {
        MemoryCatalogBuilder::default()
    }

    /// Iterate over all pathways in the catalog.
    pub fn pathways(&self) -> impl Iterator<Item = &PathwayId> {
        self.pathways.values()
    }
}

impl PathwayCatalog for MemoryCatalog {
    fn pathways_containing(&self, accession: &str) -> Result<Vec<PathwayId>, CatalogError> {
        Ok(self
            .by_accession
            .get(accession)
            .map(|ids| ids.iter().map(|id| self.pathways[id].clone()).collect())
            .unwrap_or_default())
    }

    fn members_of(&self, pathway: &PathwayId) -> Result<HashSet<ProteinEntry>, CatalogError> {
        self.members
            .get(&pathway.id)
            .cloned()
            .ok_or(CatalogError::UnknownPathway(pathway.id))
    }

    fn total_pathways_containing(&self, accession: &str) -> Result<usize, CatalogError> {
        Ok(self
            .by_accession
            .get(accession)
            .map(|ids| ids.len())
            .unwrap_or(0))
    }

    fn pathway_count(&self) -> usize {
        self.pathways.len()
    }
}

/// Builder accumulating pathways and their memberships.
#[derive(Debug, Default)]
pub struct MemoryCatalogBuilder {
    pathways: HashMap<i64, PathwayId>,
    members: HashMap<i64, HashSet<ProteinEntry>>,
}

impl MemoryCatalogBuilder {
    /// Register a pathway with its member proteins. Registering the same
    /// pathway id twice merges the member sets.
    pub fn pathway(
        mut self,
        pathway: PathwayId,
        members: impl IntoIterator<Item = ProteinEntry>,
    ) -> Self {
        let id = pathway.id;
        self.pathways.entry(id).or_insert(pathway);
        self.members.entry(id).or_default().extend(members);
        self
    }

    pub fn build(self) -> MemoryCatalog {
        let mut by_accession: HashMap<String, Vec<i64>> = HashMap::new();
        for (id, members) in &self.members {
            for entry in members {
                by_accession
                    .entry(entry.accession.clone())
                    .or_default()
                    .push(*id);
            }
        }
        // Deterministic lookup order regardless of build order.
        for ids in by_accession.values_mut() {
            ids.sort_unstable();
        }
        info!(
            pathways = self.pathways.len(),
            proteins = by_accession.len(),
            "in-memory pathway catalog built"
        );
        MemoryCatalog {
            pathways: self.pathways,
            members: self.members,
            by_accession,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> MemoryCatalog {
        MemoryCatalog::builder()
            .pathway(
                PathwayId::new(1, "Apoptosis", "KEGG", "Homo sapiens"),
                vec![
                    ProteinEntry::new("P04637"),
                    ProteinEntry::new("P10415"),
                    ProteinEntry::with_gene_symbol("Q07812", "BAX"),
                ],
            )
            .pathway(
                PathwayId::new(2, "Cell cycle", "KEGG", "Homo sapiens"),
                vec![ProteinEntry::new("P04637"), ProteinEntry::new("P24941")],
            )
            .build()
    }

    #[test]
    fn forward_lookup() {
        let catalog = sample_catalog();
        let pathway = PathwayId::new(1, "Apoptosis", "KEGG", "Homo sapiens");
        let members = catalog.members_of(&pathway).unwrap();
        assert_eq!(members.len(), 3);
        assert!(members.contains(&ProteinEntry::with_gene_symbol("Q07812", "BAX")));
    }

    #[test]
    fn reverse_lookup() {
        let catalog = sample_catalog();
        let hits = catalog.pathways_containing("P04637").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(catalog.total_pathways_containing("P04637").unwrap(), 2);
        assert_eq!(catalog.total_pathways_containing("P24941").unwrap(), 1);
    }

    #[test]
    fn unknown_accession_is_empty_not_an_error() {
        let catalog = sample_catalog();
        assert!(catalog.pathways_containing("XXXXXX").unwrap().is_empty());
        assert_eq!(catalog.total_pathways_containing("XXXXXX").unwrap(), 0);
    }

    #[test]
    fn unknown_pathway_is_an_error() {
        let catalog = sample_catalog();
        let missing = PathwayId::new(99, "Missing", "KEGG", "Homo sapiens");
        assert!(matches!(
            catalog.members_of(&missing),
            Err(CatalogError::UnknownPathway(99))
        ));
    }

    #[test]
    fn duplicate_registration_merges_members() {
        let catalog = MemoryCatalog::builder()
            .pathway(
                PathwayId::new(1, "Apoptosis", "KEGG", "Homo sapiens"),
                vec![ProteinEntry::new("P04637")],
            )
            .pathway(
                PathwayId::new(1, "Apoptosis", "KEGG", "Homo sapiens"),
                vec![ProteinEntry::new("P10415")],
            )
            .build();
        assert_eq!(catalog.pathway_count(), 1);
        let pathway = PathwayId::new(1, "Apoptosis", "KEGG", "Homo sapiens");
        assert_eq!(catalog.members_of(&pathway).unwrap().len(), 2);
    }
}
