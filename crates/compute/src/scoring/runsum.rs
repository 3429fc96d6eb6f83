//! Non-parametric enrichment: a running-sum walk over the sorted dataset
//! and an exact significance from a dynamic-programming path count.

use std::collections::{HashMap, HashSet};

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use tracing::{debug, warn};

use enrich_catalog::PathwayId;
use enrich_core::Dataset;

use super::{ScoreError, MIN_PSEA_PVAL};

/// Decimal digits kept when reducing the big-integer path ratio to f64.
const RATIO_DIGITS: u32 = 15;

/// Outcome of the running-sum walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStats {
    /// Total number of steps (dataset rows).
    pub steps: usize,
    /// Number of hit steps (identified rows).
    pub hits: usize,
    /// Maximum absolute deviation reached by the walk.
    pub deltamax: i64,
}

/// Walk the sorted dataset: a hit adds `steps - hits`, a miss subtracts
/// `hits`, so the walk is a zero-sum game ending back at zero.
pub fn walk(dataset: &Dataset, identified: &HashSet<u32>) -> WalkStats {
    let m = dataset.len();
    let l = identified.len();
    let reward = (m - l) as i64;
    let penalty = l as i64;

    let mut runsum: i64 = 0;
    let mut deltamax: i64 = 0;
    for uid in dataset.sorted_uids() {
        if identified.contains(uid) {
            runsum += reward;
        } else {
            runsum -= penalty;
        }
        deltamax = deltamax.max(runsum.abs());
    }

    WalkStats { steps: m, hits: l, deltamax }
}

/// Exact running-sum p-value for one pathway.
///
/// The number of hit/miss arrangements whose walk stays strictly inside
/// `(-deltamax, deltamax)` is counted exactly and divided by the total
/// `C(steps, hits)` arrangements; the p-value is the complement of that
/// ratio, floored at [`MIN_PSEA_PVAL`].
pub fn psea_pval(
    pathway: &PathwayId,
    dataset: &Dataset,
    identified: &HashSet<u32>,
) -> Result<f64, ScoreError> {
    let stats = walk(dataset, identified);
    debug!(
        pathway = %pathway,
        steps = stats.steps,
        hits = stats.hits,
        deltamax = stats.deltamax,
        "running-sum walk completed"
    );

    let total = binomial(stats.steps, stats.hits);
    let inside = count_paths(stats.steps, stats.hits, stats.deltamax);

    // ratio = inside / total at fixed decimal precision
    let scale = BigUint::from(10u32).pow(RATIO_DIGITS);
    let scaled = (inside * &scale) / total;
    let ratio = scaled
        .to_f64()
        .ok_or_else(|| ScoreError::PrecisionOverflow(pathway.name.clone()))?
        / 10f64.powi(RATIO_DIGITS as i32);

    let mut z = 1.0 - ratio;
    if z <= 0.0 {
        warn!(
            pathway = %pathway,
            steps = stats.steps,
            hits = stats.hits,
            z,
            "running-sum significance is non-positive"
        );
        if z.abs() < MIN_PSEA_PVAL {
            z = MIN_PSEA_PVAL;
        }
    }
    if z.is_infinite() {
        return Err(ScoreError::PrecisionOverflow(pathway.name.clone()));
    }

    Ok(z.max(MIN_PSEA_PVAL))
}

/// Number of walks with `l` hits in `m` steps whose running sum stays
/// strictly inside `(-max, max)` at every step.
///
/// Dynamic program over reachable running-sum values: each step maps the
/// (value, count) table through the hit and miss transitions, discarding
/// values that break the bound. Walks legal for all `m` steps end at zero,
/// so the answer is the final count at value 0.
pub fn count_paths(m: usize, l: usize, max: i64) -> BigUint {
    let reward = (m - l) as i64;
    let penalty = l as i64;

    let mut this_step: HashMap<i64, BigUint> = HashMap::new();
    let mut next_step: HashMap<i64, BigUint> = HashMap::new();
    this_step.insert(0, BigUint::one());

    for _ in 0..m {
        for (sumval, ways) in this_step.drain() {
            let is_hit = sumval + reward;
            if is_hit < max {
                *next_step.entry(is_hit).or_insert_with(BigUint::zero) += &ways;
            }
            let is_miss = sumval - penalty;
            if is_miss > -max {
                *next_step.entry(is_miss).or_insert_with(BigUint::zero) += ways;
            }
        }
        std::mem::swap(&mut this_step, &mut next_step);
        if this_step.is_empty() {
            return BigUint::zero();
        }
    }

    this_step.remove(&0).unwrap_or_else(BigUint::zero)
}

/// Exact binomial coefficient C(n, k).
pub fn binomial(n: usize, k: usize) -> BigUint {
    if k > n {
        return BigUint::zero();
    }
    let k = k.min(n - k);
    let mut result = BigUint::one();
    for i in 1..=k {
        result = result * BigUint::from(n - k + i) / BigUint::from(i);
    }
    result
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use enrich_core::{AnalysisConfig, RandMethod};

    use super::*;

    fn tiny_config() -> AnalysisConfig {
        AnalysisConfig {
            replicates: 5,
            rand_method: RandMethod::Permutation,
            ..AnalysisConfig::default()
        }
    }

    fn dataset() -> Dataset {
        let mut ds = Dataset::new();
        // Sorted by signed fold change the order is: P2 (-5), P4, P5, P3, P1 (6).
        ds.add_row(vec!["P1".into()], vec![], 6.0, 0.01).unwrap();
        ds.add_row(vec!["P2".into()], vec![], 0.2, 0.01).unwrap();
        ds.add_row(vec!["P3".into()], vec![], 1.5, 0.5).unwrap();
        ds.add_row(vec!["P4".into()], vec![], 0.9, 0.5).unwrap();
        ds.add_row(vec!["P5".into()], vec![], 1.0, 0.5).unwrap();
        ds.finalize(&tiny_config(), &mut StdRng::seed_from_u64(1)).unwrap();
        ds
    }

    #[test]
    fn binomial_small_values() {
        assert_eq!(binomial(5, 2), BigUint::from(10u32));
        assert_eq!(binomial(10, 0), BigUint::one());
        assert_eq!(binomial(10, 10), BigUint::one());
        assert_eq!(binomial(3, 5), BigUint::zero());
        assert_eq!(binomial(52, 5), BigUint::from(2_598_960u64));
    }

    #[test]
    fn walk_extremes_at_both_ends() {
        let ds = dataset();
        // P1 and P2 sit at the two extremes of the sorted order.
        let identified: HashSet<u32> = [0, 1].into_iter().collect();
        let stats = walk(&ds, &identified);
        assert_eq!(stats.steps, 5);
        assert_eq!(stats.hits, 2);
        // Walk: +3, -2, -2, -2, +3 -> deviations 3,1,-1,-3,0
        assert_eq!(stats.deltamax, 3);
    }

    #[test]
    fn count_paths_exhaustive_check() {
        // m=4, l=2: reward=2, penalty=2, C(4,2)=6 walks.
        // Deviation per arrangement (H=+2, M=-2):
        //   HHMM 2,4  HMHM 2,2  HMMH 2,2  MHHM 2,2  MHMH 2,2  MMHH 2,4
        // All reach |2|; walks staying strictly inside (-2,2): none.
        assert_eq!(count_paths(4, 2, 2), BigUint::zero());
        // Inside (-4,4): the four alternating-ish walks that never hit 4.
        assert_eq!(count_paths(4, 2, 4), BigUint::from(4u32));
        // Bound above any reachable deviation: all 6 walks qualify.
        assert_eq!(count_paths(4, 2, 5), BigUint::from(6u32));
    }

    #[test]
    fn all_hits_leave_no_inside_paths() {
        // l == m: the walk never moves, deltamax = 0, and no walk can stay
        // strictly inside an empty interval.
        assert_eq!(count_paths(3, 3, 0), BigUint::zero());
    }

    #[test]
    fn pval_matches_exact_enumeration() {
        let ds = dataset();
        let pathway = PathwayId::new(1, "exact", "KEGG", "Homo sapiens");

        // Hits at both ends of the sorted order: deltamax = 3. Of the
        // C(5,2) = 10 arrangements only MHMHM stays inside (-3,3), so
        // p = 1 - 1/10.
        let identified: HashSet<u32> = [0, 1].into_iter().collect();
        let p = psea_pval(&pathway, &ds, &identified).unwrap();
        approx::assert_relative_eq!(p, 0.9, epsilon = 1e-12);

        // Adjacent hits in the middle: deltamax = 4, four arrangements
        // stay inside (-4,4), so p = 1 - 4/10.
        let identified: HashSet<u32> = [3, 4].into_iter().collect();
        let p = psea_pval(&pathway, &ds, &identified).unwrap();
        approx::assert_relative_eq!(p, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn pval_is_floored() {
        let ds = dataset();
        let pathway = PathwayId::new(1, "floor", "KEGG", "Homo sapiens");
        let identified: HashSet<u32> = [0, 1].into_iter().collect();
        let p = psea_pval(&pathway, &ds, &identified).unwrap();
        assert!(p >= MIN_PSEA_PVAL);
    }
}
