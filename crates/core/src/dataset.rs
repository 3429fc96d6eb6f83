use std::cmp::Ordering;
use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::config::{AnalysisConfig, RandMethod, SortMethod};
use crate::data::{signed_fold_change, DataRow};
use crate::error::EnrichError;
use crate::stats::{EmpiricalDistribution, EDI_BINS};

/// An in-memory dataset of quantified observations.
///
/// A dataset is mutable until [`Dataset::finalize`] is called exactly once,
/// which freezes the row list, derives the region of interest and the sorted
/// view, and materializes the mock replicates used for significance
/// calibration. After finalization the dataset is read-only and may be
/// shared freely across worker threads.
#[derive(Debug, Clone)]
pub struct Dataset {
    is_mock: bool,
    finalized: bool,
    rows: Vec<DataRow>,
    protein_ids: HashSet<String>,
    peptide_seqs: HashSet<String>,
    /// Row uids inside the region of interest. Derived at finalization.
    roi: HashSet<u32>,
    /// Row uids ordered by the configured sort method. Derived at
    /// finalization; empty for mock replicates, which are never walked.
    sorted_uids: Vec<u32>,
    mocks: Vec<Dataset>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset {
    /// Create an empty, non-mock dataset to be populated row by row.
    pub fn new() -> Self {
        Self {
            is_mock: false,
            finalized: false,
            rows: Vec::new(),
            protein_ids: HashSet::new(),
            peptide_seqs: HashSet::new(),
            roi: HashSet::new(),
            sorted_uids: Vec::new(),
            mocks: Vec::new(),
        }
    }

    /// Append one validated row. Fails on a finalized or mock dataset.
    ///
    /// Returns the uid assigned to the new row; uids are consecutive and
    /// double as row indices.
    pub fn add_row(
        &mut self,
        proteins: Vec<String>,
        peptides: Vec<String>,
        ratio: f64,
        pval: f64,
    ) -> Result<u32, EnrichError> {
        if self.finalized {
            return Err(EnrichError::AlreadyFinalized);
        }
        if self.is_mock {
            return Err(EnrichError::MockDataset(
                "cannot add rows to a mock dataset".to_string(),
            ));
        }

        let uid = self.rows.len() as u32;
        let row = DataRow::new(uid, proteins, peptides, ratio, pval)?;
        self.protein_ids.extend(row.proteins().iter().cloned());
        self.peptide_seqs.extend(row.peptides().iter().cloned());
        self.rows.push(row);
        Ok(uid)
    }

    /// Freeze the dataset: derive the ROI and sorted view, then materialize
    /// `config.replicates` mock replicates with the configured strategy.
    ///
    /// May be called exactly once; a second call fails.
    pub fn finalize<R: Rng + ?Sized>(
        &mut self,
        config: &AnalysisConfig,
        rng: &mut R,
    ) -> Result<(), EnrichError> {
        if self.finalized {
            return Err(EnrichError::AlreadyFinalized);
        }
        if self.is_mock {
            return Err(EnrichError::MockDataset(
                "mock datasets are finalized at construction".to_string(),
            ));
        }

        self.roi = derive_roi(&self.rows, config);
        self.sorted_uids = derive_sorted(&self.rows, config);

        let n = self.rows.len();
        self.mocks = Vec::with_capacity(config.replicates);
        match config.rand_method {
            RandMethod::Permutation => {
                let mut perm: Vec<usize> = (0..n).collect();
                for _ in 0..config.replicates {
                    perm.shuffle(rng);
                    let rows: Vec<DataRow> = (0..n)
                        .map(|i| {
                            let src = &self.rows[perm[i]];
                            self.rows[i].with_values(src.ratio(), src.pval())
                        })
                        .collect();
                    let mock = self.mock_from_rows(rows, config);
                    self.mocks.push(mock);
                }
                info!(
                    replicates = config.replicates,
                    "mock datasets generated with the permutation method"
                );
            }
            RandMethod::Empirical => {
                let ratios = self.finite_ratios();
                let edi = EmpiricalDistribution::fit(&ratios, EDI_BINS)
                    .ok_or(EnrichError::NoFiniteRatios)?;
                for _ in 0..config.replicates {
                    let rows: Vec<DataRow> = self
                        .rows
                        .iter()
                        .map(|row| {
                            let ratio = edi.sample(rng);
                            let pval = rng.gen_range(0.0..1.0);
                            row.with_values(ratio, pval)
                        })
                        .collect();
                    let mock = self.mock_from_rows(rows, config);
                    self.mocks.push(mock);
                }
                info!(
                    replicates = config.replicates,
                    "mock datasets generated with the empirical distribution method"
                );
            }
        }

        self.finalized = true;
        Ok(())
    }

    /// Build a finalized mock replicate sharing this dataset's identities.
    fn mock_from_rows(&self, rows: Vec<DataRow>, config: &AnalysisConfig) -> Dataset {
        let roi = derive_roi(&rows, config);
        Dataset {
            is_mock: true,
            finalized: true,
            rows,
            protein_ids: self.protein_ids.clone(),
            peptide_seqs: self.peptide_seqs.clone(),
            roi,
            sorted_uids: Vec::new(),
            mocks: Vec::new(),
        }
    }

    /// Access the `index`-th mock replicate.
    pub fn mock(&self, index: usize) -> Result<&Dataset, EnrichError> {
        if self.is_mock {
            return Err(EnrichError::MockDataset(
                "mock datasets carry no second-order mocks".to_string(),
            ));
        }
        if !self.finalized {
            return Err(EnrichError::NotFinalized);
        }
        self.mocks.get(index).ok_or(EnrichError::MockIndex(index))
    }

    pub fn mock_count(&self) -> usize {
        self.mocks.len()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_mock(&self) -> bool {
        self.is_mock
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Row lookup by uid; uids double as indices by construction.
    pub fn row(&self, uid: u32) -> Option<&DataRow> {
        self.rows.get(uid as usize)
    }

    /// Uids of the rows inside the region of interest.
    pub fn roi(&self) -> &HashSet<u32> {
        &self.roi
    }

    /// Row uids in the configured sort order. Empty for mock replicates.
    pub fn sorted_uids(&self) -> &[u32] {
        &self.sorted_uids
    }

    /// Distinct protein accessions observed across all rows.
    pub fn protein_ids(&self) -> &HashSet<String> {
        &self.protein_ids
    }

    /// Distinct peptide sequences observed across all rows.
    pub fn peptide_seqs(&self) -> &HashSet<String> {
        &self.peptide_seqs
    }

    /// All ratio values in row order (NaN included).
    pub fn ratios(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.ratio()).collect()
    }

    /// Ratio values with NaN and infinities filtered out.
    pub fn finite_ratios(&self) -> Vec<f64> {
        self.rows
            .iter()
            .map(|r| r.ratio())
            .filter(|r| r.is_finite())
            .collect()
    }
}

fn derive_roi(rows: &[DataRow], config: &AnalysisConfig) -> HashSet<u32> {
    rows.iter()
        .filter(|r| config.is_in_roi(r.ratio(), r.pval()))
        .map(|r| r.uid())
        .collect()
}

fn derive_sorted(rows: &[DataRow], config: &AnalysisConfig) -> Vec<u32> {
    let mut uids: Vec<u32> = rows.iter().map(|r| r.uid()).collect();
    match config.sort_method {
        SortMethod::FoldChange => {
            uids.sort_by(|a, b| {
                let fa = signed_fold_change(rows[*a as usize].ratio());
                let fb = signed_fold_change(rows[*b as usize].ratio());
                fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
            });
        }
        SortMethod::PValue => {
            uids.sort_by(|a, b| {
                let pa = rows[*a as usize].pval();
                let pb = rows[*b as usize].pval();
                pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
            });
        }
        SortMethod::CombNonLinear => {
            let kappa = config.kappa[1];
            let metric = |r: &DataRow| {
                signed_fold_change(r.ratio()).abs() * (1.0 - r.pval()).powf(kappa)
            };
            uids.sort_by(|a, b| {
                let sa = metric(&rows[*a as usize]);
                let sb = metric(&rows[*b as usize]);
                sa.partial_cmp(&sb).unwrap_or(Ordering::Equal)
            });
        }
    }
    uids
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn sample_dataset() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_row(vec!["A0AVT1".into(), "A0AVT1-2".into()], vec![], 1.42, 0.18)
            .unwrap();
        ds.add_row(vec!["A1A528".into(), "O43264".into()], vec![], 1.99, 0.98)
            .unwrap();
        ds.add_row(
            vec!["A1L0T0".into(), "E9PL44".into(), "E9PJS0".into()],
            vec![],
            0.42,
            0.47,
        )
        .unwrap();
        ds.add_row(vec!["Q99798".into(), "A2A274".into()], vec![], 1.68, 0.28)
            .unwrap();
        ds
    }

    fn small_config(rand_method: RandMethod) -> AnalysisConfig {
        AnalysisConfig {
            rand_method,
            replicates: 25,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn basic_accessors() {
        let ds = sample_dataset();
        assert_eq!(ds.len(), 4);
        assert!(ds.peptide_seqs().is_empty());
        assert_eq!(ds.protein_ids().len(), 9);
        assert!(!ds.is_finalized());
        assert!(!ds.is_mock());
    }

    #[test]
    fn finalize_twice_fails() {
        let mut ds = sample_dataset();
        let config = small_config(RandMethod::Permutation);
        let mut rng = StdRng::seed_from_u64(1);
        ds.finalize(&config, &mut rng).unwrap();
        assert!(matches!(
            ds.finalize(&config, &mut rng),
            Err(EnrichError::AlreadyFinalized)
        ));
    }

    #[test]
    fn add_row_after_finalize_fails() {
        let mut ds = sample_dataset();
        let config = small_config(RandMethod::Permutation);
        ds.finalize(&config, &mut StdRng::seed_from_u64(2)).unwrap();
        assert!(matches!(
            ds.add_row(vec!["P12345".into()], vec![], 1.0, 0.5),
            Err(EnrichError::AlreadyFinalized)
        ));
    }

    #[test]
    fn permutation_mocks_preserve_value_multiset() {
        let mut ds = sample_dataset();
        let config = small_config(RandMethod::Permutation);
        ds.finalize(&config, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(ds.mock_count(), config.replicates);

        let mock = ds.mock(1).unwrap();
        assert!(mock.is_mock());
        assert_eq!(mock.len(), ds.len());
        assert_eq!(mock.protein_ids(), ds.protein_ids());
        assert_eq!(mock.peptide_seqs(), ds.peptide_seqs());

        let mut real: Vec<(u64, u64)> = ds
            .rows()
            .iter()
            .map(|r| (r.ratio().to_bits(), r.pval().to_bits()))
            .collect();
        let mut mocked: Vec<(u64, u64)> = mock
            .rows()
            .iter()
            .map(|r| (r.ratio().to_bits(), r.pval().to_bits()))
            .collect();
        real.sort_unstable();
        mocked.sort_unstable();
        assert_eq!(real, mocked);

        // Row identities stay at their original positions.
        for (a, b) in ds.rows().iter().zip(mock.rows()) {
            assert_eq!(a.uid(), b.uid());
            assert_eq!(a.proteins(), b.proteins());
        }
    }

    #[test]
    fn empirical_mocks_resample_values() {
        let mut ds = sample_dataset();
        let config = small_config(RandMethod::Empirical);
        ds.finalize(&config, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(ds.mock_count(), config.replicates);

        let mock = ds.mock(2).unwrap();
        assert_eq!(mock.len(), ds.len());
        assert_eq!(mock.protein_ids(), ds.protein_ids());
        assert_ne!(ds.ratios(), mock.ratios());
    }

    #[test]
    fn mock_of_mock_fails() {
        let mut ds = sample_dataset();
        let config = small_config(RandMethod::Permutation);
        ds.finalize(&config, &mut StdRng::seed_from_u64(5)).unwrap();
        let mock = ds.mock(0).unwrap();
        assert!(matches!(mock.mock(0), Err(EnrichError::MockDataset(_))));
    }

    #[test]
    fn mock_access_requires_finalization() {
        let ds = sample_dataset();
        assert!(matches!(ds.mock(0), Err(EnrichError::NotFinalized)));
    }

    #[test]
    fn mock_index_out_of_range() {
        let mut ds = sample_dataset();
        let config = small_config(RandMethod::Permutation);
        ds.finalize(&config, &mut StdRng::seed_from_u64(6)).unwrap();
        assert!(matches!(
            ds.mock(config.replicates),
            Err(EnrichError::MockIndex(_))
        ));
    }

    #[test]
    fn roi_matches_thresholds() {
        let mut ds = sample_dataset();
        let config = small_config(RandMethod::Permutation);
        ds.finalize(&config, &mut StdRng::seed_from_u64(7)).unwrap();
        // Defaults: p < 0.05, fold >= 1.5. No sample row passes both.
        assert!(ds.roi().is_empty());

        let mut ds2 = Dataset::new();
        ds2.add_row(vec!["P1".into()], vec![], 2.0, 0.01).unwrap();
        ds2.add_row(vec!["P2".into()], vec![], 0.4, 0.02).unwrap();
        ds2.add_row(vec!["P3".into()], vec![], 2.0, 0.9).unwrap();
        ds2.finalize(&config, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(ds2.roi().len(), 2);
        assert!(ds2.roi().contains(&0));
        assert!(ds2.roi().contains(&1));
    }

    #[test]
    fn sorted_view_orders_by_fold_change() {
        let mut ds = Dataset::new();
        ds.add_row(vec!["P1".into()], vec![], 3.0, 0.5).unwrap();
        ds.add_row(vec!["P2".into()], vec![], 0.25, 0.5).unwrap(); // fc = -4
        ds.add_row(vec!["P3".into()], vec![], 1.5, 0.5).unwrap();
        let config = small_config(RandMethod::Permutation);
        ds.finalize(&config, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(ds.sorted_uids(), &[1, 2, 0]);
    }

    #[test]
    fn sorted_view_orders_by_pval() {
        let mut ds = Dataset::new();
        ds.add_row(vec!["P1".into()], vec![], 1.0, 0.9).unwrap();
        ds.add_row(vec!["P2".into()], vec![], 1.0, 0.1).unwrap();
        ds.add_row(vec!["P3".into()], vec![], 1.0, 0.5).unwrap();
        let config = AnalysisConfig {
            sort_method: SortMethod::PValue,
            ..small_config(RandMethod::Permutation)
        };
        ds.finalize(&config, &mut StdRng::seed_from_u64(10)).unwrap();
        assert_eq!(ds.sorted_uids(), &[1, 2, 0]);
    }

    #[test]
    fn sorted_view_orders_by_comb_nonlinear() {
        let mut ds = Dataset::new();
        ds.add_row(vec!["P1".into()], vec![], 4.0, 0.5).unwrap();
        ds.add_row(vec!["P2".into()], vec![], 1.5, 0.1).unwrap();
        ds.add_row(vec!["P3".into()], vec![], 0.2, 0.9).unwrap();
        let config = AnalysisConfig {
            sort_method: SortMethod::CombNonLinear,
            kappa: [1.0, 2.0],
            ..small_config(RandMethod::Permutation)
        };
        ds.finalize(&config, &mut StdRng::seed_from_u64(12)).unwrap();
        // |fc| * (1-p)^2: P3 = 5*0.01, P1 = 4*0.25, P2 = 1.5*0.81.
        // Differs from the fold-change order [2, 1, 0] and the p-value
        // order [1, 0, 2]; with kappa2 = 1 it would match the former.
        assert_eq!(ds.sorted_uids(), &[2, 0, 1]);
    }

    #[test]
    fn empirical_without_finite_ratios_fails() {
        let mut ds = Dataset::new();
        ds.add_row(vec!["P1".into()], vec![], f64::NAN, 0.5).unwrap();
        let config = small_config(RandMethod::Empirical);
        assert!(matches!(
            ds.finalize(&config, &mut StdRng::seed_from_u64(11)),
            Err(EnrichError::NoFiniteRatios)
        ));
    }
}
