use serde::{Deserialize, Serialize};

use crate::error::EnrichError;

/// Strategy for generating the randomized mock replicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RandMethod {
    /// Permute the observed (ratio, p-value) pairs across rows.
    Permutation,
    /// Sample ratios from a binned empirical distribution and
    /// p-values from Uniform(0,1).
    Empirical,
}

/// Ordering used for the non-parametric running-sum walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMethod {
    /// Signed fold change (ratios below 1 map to -1/r).
    FoldChange,
    /// Ascending p-value.
    PValue,
    /// Combined non-linear metric |fc| * (1-p)^kappa2.
    CombNonLinear,
}

/// Analysis configuration, deserializable from a JSON config file.
///
/// Constructed once and passed by reference into dataset finalization,
/// scoring, and the scheduler. Thresholds left at NaN are treated as
/// unset and pass every row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Significance cutoff: a row is significant when pval < p_threshold.
    #[serde(default = "default_p_threshold")]
    pub p_threshold: f64,
    /// Regulation cutoff: a row is regulated when ratio or 1/ratio >= reg_threshold.
    #[serde(default = "default_reg_threshold")]
    pub reg_threshold: f64,
    /// Weighting coefficients for the three parametric subscores; must sum to 1.
    #[serde(default = "default_alpha")]
    pub alpha: [f64; 3],
    /// Non-linearity exponents (coverage reward, regulation reward).
    #[serde(default = "default_kappa")]
    pub kappa: [f64; 2],
    /// Mock randomization strategy.
    #[serde(default = "default_rand_method")]
    pub rand_method: RandMethod,
    /// Sort order for the running-sum walk.
    #[serde(default = "default_sort_method")]
    pub sort_method: SortMethod,
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default)]
    pub worker_threads: usize,
    /// Number of mock replicates (N).
    #[serde(default = "default_replicates")]
    pub replicates: usize,
    /// Capacity of the bounded discovery queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Seconds the dispatch loop waits for a pathway before logging a stall.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_seconds: u64,
    /// Seconds between monitor checkpoints.
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_seconds: u64,
}

fn default_p_threshold() -> f64 { 0.05 }
fn default_reg_threshold() -> f64 { 1.5 }
fn default_alpha() -> [f64; 3] { [0.4, 0.2, 0.4] }
fn default_kappa() -> [f64; 2] { [1.0, 1.0] }
fn default_rand_method() -> RandMethod { RandMethod::Permutation }
fn default_sort_method() -> SortMethod { SortMethod::FoldChange }
fn default_replicates() -> usize { 1000 }
fn default_queue_capacity() -> usize { 128 }
fn default_poll_timeout() -> u64 { 180 }
fn default_monitor_interval() -> u64 { 30 }

/// Tolerance for the alpha coefficient sum check.
const COEFF_EPSILON: f64 = 1e-6;

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            p_threshold: default_p_threshold(),
            reg_threshold: default_reg_threshold(),
            alpha: default_alpha(),
            kappa: default_kappa(),
            rand_method: default_rand_method(),
            sort_method: default_sort_method(),
            worker_threads: 0,
            replicates: default_replicates(),
            queue_capacity: default_queue_capacity(),
            poll_timeout_seconds: default_poll_timeout(),
            monitor_interval_seconds: default_monitor_interval(),
        }
    }
}

impl AnalysisConfig {
    /// Check that the configuration can drive a run.
    ///
    /// Coefficients must be non-negative and sum to 1, set thresholds must
    /// lie in their meaningful ranges, and the structural knobs must be
    /// non-zero. An invalid configuration aborts the run before it starts.
    pub fn validate(&self) -> Result<(), EnrichError> {
        let alpha_sum: f64 = self.alpha.iter().sum();
        if (alpha_sum - 1.0).abs() > COEFF_EPSILON {
            return Err(EnrichError::InvalidConfig(format!(
                "alpha coefficients must sum to 1.0, got {alpha_sum}"
            )));
        }
        if self.alpha.iter().any(|a| *a < 0.0) {
            return Err(EnrichError::InvalidConfig(
                "alpha coefficients must be non-negative".to_string(),
            ));
        }
        if self.kappa.iter().any(|k| *k < 0.0) {
            return Err(EnrichError::InvalidConfig(
                "kappa exponents must be non-negative".to_string(),
            ));
        }
        if !self.p_threshold.is_nan() && (self.p_threshold <= 0.0 || self.p_threshold >= 1.0) {
            return Err(EnrichError::InvalidConfig(format!(
                "p-value threshold must be in (0,1), got {}",
                self.p_threshold
            )));
        }
        if !self.reg_threshold.is_nan() && self.reg_threshold <= 1.0 {
            return Err(EnrichError::InvalidConfig(format!(
                "regulation threshold must be larger than 1.0, got {}",
                self.reg_threshold
            )));
        }
        if self.replicates == 0 {
            return Err(EnrichError::InvalidConfig(
                "replicate count must be positive".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EnrichError::InvalidConfig(
                "queue capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    /// Whether a (ratio, p-value) pair falls inside the region of interest.
    ///
    /// An unset (NaN) threshold passes every row; a NaN value never passes
    /// a set threshold.
    pub fn is_in_roi(&self, ratio: f64, pval: f64) -> bool {
        let significant = self.p_threshold.is_nan() || pval < self.p_threshold;
        let regulated = self.reg_threshold.is_nan()
            || ratio >= self.reg_threshold
            || 1.0 / ratio >= self.reg_threshold;
        significant && regulated
    }
}
