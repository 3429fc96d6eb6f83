//! Consensus score folding the two p-values into a single 0-100 scale.

/// Weight of the parametric p-value in the consensus.
pub const META_PAR_WEIGHT: f64 = 1.2;
/// Weight of the running-sum p-value in the consensus.
pub const META_NPAR_WEIGHT: f64 = 1.0;

/// Combine the two p-values into a score in [0, 100].
///
/// Each p-value is mapped through `-log10`, raised to its weight, and the
/// product is normalized by the best attainable product given the two
/// p-value floors. A pathway hitting both floors scores exactly 100.
pub fn meta_score(par_pval: f64, psea_pval: f64, min_par_pval: f64, min_psea_pval: f64) -> f64 {
    let par = -par_pval.log10();
    let npar = -psea_pval.log10();
    let max_par = -min_par_pval.log10();
    let max_npar = -min_psea_pval.log10();

    let n1 = par.powf(META_PAR_WEIGHT);
    let n2 = npar.powf(META_NPAR_WEIGHT);
    let d1 = max_par.powf(META_PAR_WEIGHT);
    let d2 = max_npar.powf(META_NPAR_WEIGHT);

    n1 * n2 / (d1 * d2) * 100.0
}
