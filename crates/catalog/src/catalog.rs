use std::collections::HashSet;

use thiserror::Error;

use crate::types::{PathwayId, ProteinEntry};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unknown pathway id: {0}")]
    UnknownPathway(i64),

    #[error("Catalog backend failure: {0}")]
    Backend(String),
}

/// Read-only access to the pathway knowledge base.
///
/// Implementations must be safe to share across worker threads; every call
/// may happen concurrently with discovery and scoring. The accession-keyed
/// lookups treat unknown accessions as absent rather than as errors, since
/// datasets routinely carry proteins the catalog has never seen.
pub trait PathwayCatalog: Send + Sync {
    /// All pathways that contain the given protein accession.
    ///
    /// Unknown accessions yield an empty list.
    fn pathways_containing(&self, accession: &str) -> Result<Vec<PathwayId>, CatalogError>;

    /// The member proteins of a pathway.
    fn members_of(&self, pathway: &PathwayId) -> Result<HashSet<ProteinEntry>, CatalogError>;

    /// Number of pathways containing the given accession.
    ///
    /// Used as the specificity denominator during scoring; kept separate
    /// from [`PathwayCatalog::pathways_containing`] so backends can answer
    /// it with a count query instead of materializing the list.
    fn total_pathways_containing(&self, accession: &str) -> Result<usize, CatalogError> {
        Ok(self.pathways_containing(accession)?.len())
    }

    /// Total number of pathways in the catalog.
    fn pathway_count(&self) -> usize;
}
