use crate::error::EnrichError;

/// Sentinel for a missing ratio or p-value.
pub const MISSING: f64 = f64::NAN;

/// A single quantified observation: one row of the input dataset.
///
/// A row may represent an ambiguous protein group, hence a list of
/// accessions rather than a single one. Values are validated once at
/// construction and immutable afterwards; NaN marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    uid: u32,
    proteins: Vec<String>,
    peptides: Vec<String>,
    ratio: f64,
    pval: f64,
}

impl DataRow {
    pub fn new(
        uid: u32,
        proteins: Vec<String>,
        peptides: Vec<String>,
        ratio: f64,
        pval: f64,
    ) -> Result<Self, EnrichError> {
        if proteins.is_empty() {
            return Err(EnrichError::InvalidRow(
                "protein accession(s) cannot be empty".to_string(),
            ));
        }
        if ratio < 0.0 {
            return Err(EnrichError::InvalidRow(format!(
                "ratio cannot be less than zero, got {ratio}"
            )));
        }
        if !pval.is_nan() && !(0.0..=1.0).contains(&pval) {
            return Err(EnrichError::InvalidRow(format!(
                "p-value must lie in [0,1], got {pval}"
            )));
        }
        Ok(Self { uid, proteins, peptides, ratio, pval })
    }

    /// Copy of this row's identity carrying different quantification values.
    ///
    /// Used by mock generation: row identities stay at their original
    /// positions while (ratio, p-value) pairs are randomized.
    pub(crate) fn with_values(&self, ratio: f64, pval: f64) -> Self {
        Self {
            uid: self.uid,
            proteins: self.proteins.clone(),
            peptides: self.peptides.clone(),
            ratio,
            pval,
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn proteins(&self) -> &[String] {
        &self.proteins
    }

    pub fn peptides(&self) -> &[String] {
        &self.peptides
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn pval(&self) -> f64 {
        self.pval
    }

    /// Signed fold change: ratios below 1 map to -1/ratio so that up- and
    /// down-regulation are symmetric around zero.
    pub fn fold_change(&self) -> f64 {
        signed_fold_change(self.ratio)
    }
}

/// Map a raw ratio onto the signed fold-change scale.
pub fn signed_fold_change(ratio: f64) -> f64 {
    if ratio < 1.0 { -1.0 / ratio } else { ratio }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_row() {
        let row = DataRow::new(0, vec!["P04637".into()], vec![], 1.8, 0.01).unwrap();
        assert_eq!(row.uid(), 0);
        assert_eq!(row.proteins(), ["P04637".to_string()]);
        assert!(row.peptides().is_empty());
    }

    #[test]
    fn missing_values_accepted() {
        let row = DataRow::new(1, vec!["Q9Y6K9".into()], vec![], MISSING, MISSING).unwrap();
        assert!(row.ratio().is_nan());
        assert!(row.pval().is_nan());
    }

    #[test]
    fn empty_protein_group_rejected() {
        assert!(DataRow::new(0, vec![], vec![], 1.0, 0.5).is_err());
    }

    #[test]
    fn negative_ratio_rejected() {
        assert!(DataRow::new(0, vec!["P1".into()], vec![], -0.5, 0.5).is_err());
    }

    #[test]
    fn out_of_range_pval_rejected() {
        assert!(DataRow::new(0, vec!["P1".into()], vec![], 1.0, 1.5).is_err());
    }

    #[test]
    fn fold_change_is_signed() {
        assert_eq!(signed_fold_change(2.0), 2.0);
        assert_eq!(signed_fold_change(0.5), -2.0);
        assert_eq!(signed_fold_change(1.0), 1.0);
    }
}
