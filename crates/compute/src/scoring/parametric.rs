//! Parametric enrichment model: three weighted subscores and an empirical
//! calibration against the mock replicates.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use statrs::function::gamma::ln_gamma;
use tracing::trace;

use enrich_catalog::PathwayId;
use enrich_core::stats::{EmpiricalDistribution, EDI_BINS};
use enrich_core::{AnalysisConfig, Dataset};

use super::ScoreError;

/// Smallest reportable parametric p-value given the sampling depth.
pub fn min_pval(config: &AnalysisConfig) -> f64 {
    1.0 / sample_count(config) as f64
}

/// Samples drawn from the calibration distribution per pathway.
fn sample_count(config: &AnalysisConfig) -> usize {
    config.replicates * 1000
}

/// Raw parametric enrichment of one pathway against one dataset view.
///
/// The same function scores the real dataset and every mock replicate;
/// only the (ratio, p-value) columns and the derived ROI differ between
/// them. Subscores:
///   S1 rewards ROI coverage,
///   S2 penalizes unspecific proteins (members of many pathways),
///   S3 rewards strong, confident regulation of the identified rows.
pub fn enrichment(
    dataset: &Dataset,
    identified: &HashSet<u32>,
    memberships: &HashMap<String, usize>,
    config: &AnalysisConfig,
) -> f64 {
    let pfound = identified.len();
    if pfound == 0 {
        return 0.0;
    }

    let in_roi: Vec<u32> = identified.intersection(dataset.roi()).copied().collect();
    let psig = in_roi.len();

    let coverage = psig as f64 / pfound as f64;
    let score1 = config.alpha[0] * ln_gamma(psig as f64 * coverage.powf(config.kappa[0]) + 2.0);

    let mut ambiguity = 0.0;
    for uid in &in_roi {
        if let Some(row) = dataset.row(*uid) {
            for acc in row.proteins() {
                ambiguity += memberships.get(acc).copied().unwrap_or(0) as f64;
            }
        }
    }
    let score2 = if psig != 0 && ambiguity != 0.0 {
        -config.alpha[1] * (ambiguity / psig as f64).ln()
    } else {
        0.0
    };

    let mut regulation = 0.0;
    for uid in identified {
        let Some(row) = dataset.row(*uid) else { continue };
        let (ratio, pval) = (row.ratio(), row.pval());
        if ratio.is_nan() || pval.is_nan() {
            continue;
        }
        regulation += row.fold_change().abs() * (1.0 - pval).powf(config.kappa[1]);
    }
    let score3 = config.alpha[2] * regulation / pfound as f64;

    trace!(score1, score2, score3, "parametric subscores");
    score1 + score2 + score3
}

/// Turn a raw enrichment into a p-value by comparing it against the score
/// distribution over the mock replicates.
///
/// An empirical distribution is fitted over the mock scores, then sampled
/// `replicates * 1000` times; the p-value is the fraction of samples at
/// least as large as the real score, floored at [`min_pval`].
#[allow(clippy::too_many_arguments)]
pub fn calibrate<R: Rng + ?Sized>(
    pathway: &PathwayId,
    enrichment_score: f64,
    dataset: &Dataset,
    identified: &HashSet<u32>,
    memberships: &HashMap<String, usize>,
    config: &AnalysisConfig,
    rng: &mut R,
) -> Result<f64, ScoreError> {
    let calibration_err = |reason: String| ScoreError::Calibration {
        pathway: pathway.name.clone(),
        reason,
    };

    let mut mock_scores = Vec::with_capacity(dataset.mock_count());
    for i in 0..dataset.mock_count() {
        let mock = dataset.mock(i).map_err(|e| calibration_err(e.to_string()))?;
        mock_scores.push(enrichment(mock, identified, memberships, config));
    }

    let edi = EmpiricalDistribution::fit(&mock_scores, EDI_BINS)
        .ok_or_else(|| calibration_err("mock scores yielded no finite values".to_string()))?;

    let n_samples = sample_count(config);
    let mut hits = 0usize;
    for _ in 0..n_samples {
        if edi.sample(rng) >= enrichment_score {
            hits += 1;
        }
    }

    Ok(if hits == 0 {
        min_pval(config)
    } else {
        hits as f64 / n_samples as f64
    })
}
