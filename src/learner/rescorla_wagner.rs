//! Rescorla-Wagner update over an `ndarray` association matrix.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{NdlError, NdlResult, SymbolKind};
use crate::index::EncodedTrial;
use crate::logging;

/// Rescorla-Wagner parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningParams {
    /// Cue salience, shared by every cue
    pub alpha: f64,
    /// Learning rate, shared by positive and negative feedback
    pub beta: f64,
    /// Maximum activation an outcome can receive in one trial
    pub lambda: f64,
}

impl LearningParams {
    pub fn new(alpha: f64, beta: f64, lambda: f64) -> Self {
        Self {
            alpha,
            beta,
            lambda,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.alpha * self.beta
    }

    /// Directory-safe name distinguishing runs with different parameters.
    pub fn key(&self) -> String {
        format!("alpha{}_beta{}_lambda{}", self.alpha, self.beta, self.lambda)
    }
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            beta: 0.01,
            lambda: 1.0,
        }
    }
}

/// What happened during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialReport {
    /// Number of outcomes whose activation was clamped to lambda
    pub clamped: usize,
    /// Number of matrix rows written
    pub rows_updated: usize,
}

/// Incremental associative learner.
///
/// # Example
///
/// ```rust
/// use ndl_core::{EncodedTrial, Learner, LearningParams};
///
/// let mut learner = Learner::new(3, 2, LearningParams::new(0.1, 0.1, 1.0));
/// learner.train(&EncodedTrial::new(vec![0, 1], vec![0])).unwrap();
/// assert!((learner.weights()[[0, 0]] - 0.01).abs() < 1e-12);
/// assert_eq!(learner.weights()[[2, 0]], 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Learner {
    weights: Array2<f64>,
    params: LearningParams,
    trials_seen: usize,
}

impl Learner {
    /// Zero-initialised learner for `cues` rows and `outcomes` columns.
    pub fn new(cues: usize, outcomes: usize, params: LearningParams) -> Self {
        Self {
            weights: Array2::zeros((cues, outcomes)),
            params,
            trials_seen: 0,
        }
    }

    pub fn params(&self) -> &LearningParams {
        &self.params
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn trials_seen(&self) -> usize {
        self.trials_seen
    }

    /// Copy of the current matrix, detached from further updates.
    pub fn snapshot(&self) -> Array2<f64> {
        self.weights.clone()
    }

    pub fn into_weights(self) -> Array2<f64> {
        self.weights
    }

    /// Total activation `V_j` of every outcome given the cue rows, unclamped.
    pub fn activations(&self, cues: &[usize]) -> NdlResult<Array1<f64>> {
        self.check_ids(cues, SymbolKind::Cue)?;
        Ok(self.total_activation(cues))
    }

    /// Applies one Rescorla-Wagner update.
    ///
    /// Ids are validated before any cell is written, so a rejected trial
    /// leaves the matrix untouched.
    pub fn train(&mut self, trial: &EncodedTrial) -> NdlResult<TrialReport> {
        self.check_ids(&trial.cues, SymbolKind::Cue)?;
        self.check_ids(&trial.outcomes, SymbolKind::Outcome)?;

        let lambda = self.params.lambda;
        let mut total = self.total_activation(&trial.cues);

        let clamped = total.iter().filter(|&&v| v > lambda).count();
        if clamped > 0 {
            logging::warn(
                "activation_clamped",
                &json!({
                    "trial": self.trials_seen,
                    "outcomes": clamped,
                    "max_activation": total.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)),
                    "lambda": lambda,
                }),
            );
            total.mapv_inplace(|v| v.min(lambda));
        }

        let mut target = Array1::<f64>::zeros(self.weights.ncols());
        for &outcome in &trial.outcomes {
            target[outcome] = lambda;
        }
        let delta = (target - total) * self.params.learning_rate();

        for &cue in &trial.cues {
            let mut row = self.weights.row_mut(cue);
            row += &delta;
        }

        self.trials_seen += 1;
        Ok(TrialReport {
            clamped,
            rows_updated: trial.cues.len(),
        })
    }

    fn total_activation(&self, cues: &[usize]) -> Array1<f64> {
        let mut total = Array1::<f64>::zeros(self.weights.ncols());
        for &cue in cues {
            total += &self.weights.row(cue);
        }
        total
    }

    fn check_ids(&self, ids: &[usize], kind: SymbolKind) -> NdlResult<()> {
        let len = match kind {
            SymbolKind::Cue => self.weights.nrows(),
            SymbolKind::Outcome => self.weights.ncols(),
        };
        match ids.iter().find(|&&id| id >= len) {
            Some(&id) => Err(NdlError::UnknownId { kind, id, len }),
            None => Ok(()),
        }
    }
}
