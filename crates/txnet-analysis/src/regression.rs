//! Degree-versus-balance regression.
//!
//! Exposes the `(balance, degree)` pair of every account and fits
//! `degree = intercept + slope * balance` by ordinary least squares on a
//! random training split, scoring the fit on the held-out split.
//!
//! Randomness is injected: callers pass any [`rand::Rng`], so a seeded
//! `StdRng` gives reproducible splits.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::GraphError;
use crate::graph::TransactionGraph;

/// Smallest sample count that leaves two training points and one test point.
pub const MIN_SAMPLES: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegressionOptions {
    /// Share of samples held out for scoring, in (0, 1).
    pub test_fraction: f64,
}

impl Default for RegressionOptions {
    fn default() -> Self {
        Self { test_fraction: 0.2 }
    }
}

/// Straight-line model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegressionReport {
    pub fit: LinearFit,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Coefficient of determination on the test split.
    pub r_squared: f64,
    /// Root mean squared error on the test split.
    pub rmse: f64,
}

/// `(balance, degree)` for every recorded account, in insertion order.
///
/// Implicit accounts have no balance to regress on and are skipped.
pub fn degree_balance_pairs(graph: &TransactionGraph) -> Vec<(f64, usize)> {
    graph
        .graph
        .node_indices()
        .filter(|&ix| !graph.graph[ix].implicit)
        .map(|ix| (graph.graph[ix].balance, graph.degree_of(ix)))
        .collect()
}

/// Ordinary least squares over `(x, y)` samples.
pub fn fit_linear(samples: &[(f64, f64)]) -> Result<LinearFit, GraphError> {
    if samples.len() < 2 {
        return Err(GraphError::InsufficientSamples {
            needed: 2,
            found: samples.len(),
        });
    }

    let n = samples.len() as f64;
    let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (covariance, variance) = samples.iter().fold((0.0, 0.0), |(cov, var), (x, y)| {
        let dx = x - mean_x;
        (cov + dx * (y - mean_y), var + dx * dx)
    });

    // All x identical: the slope is undefined.
    if variance == 0.0 {
        return Err(GraphError::InsufficientSamples {
            needed: 2,
            found: 1,
        });
    }

    let slope = covariance / variance;
    Ok(LinearFit {
        intercept: mean_y - slope * mean_x,
        slope,
    })
}

/// R² and RMSE of `fit` over `samples`.
///
/// A constant target gives R² = 1.0 for a perfect fit and 0.0 otherwise.
fn score(fit: &LinearFit, samples: &[(f64, f64)]) -> (f64, f64) {
    let n = samples.len() as f64;
    let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;

    let ss_res: f64 = samples
        .iter()
        .map(|(x, y)| (y - fit.predict(*x)).powi(2))
        .sum();
    let ss_tot: f64 = samples.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();

    let r_squared = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    (r_squared, (ss_res / n).sqrt())
}

/// Shuffle, split, fit on the training part and score on the test part.
pub fn fit_degree_model<R: Rng + ?Sized>(
    pairs: &[(f64, usize)],
    options: &RegressionOptions,
    rng: &mut R,
) -> Result<RegressionReport, GraphError> {
    if pairs.len() < MIN_SAMPLES {
        return Err(GraphError::InsufficientSamples {
            needed: MIN_SAMPLES,
            found: pairs.len(),
        });
    }

    let mut samples: Vec<(f64, f64)> = pairs
        .iter()
        .map(|&(balance, degree)| (balance, degree as f64))
        .collect();
    samples.shuffle(rng);

    let fraction = options.test_fraction.clamp(0.0, 1.0);
    let test_len = ((samples.len() as f64 * fraction).round() as usize).clamp(1, samples.len() - 2);
    let (test, train) = samples.split_at(test_len);

    let fit = fit_linear(train)?;
    let (r_squared, rmse) = score(&fit, test);

    debug!(
        train = train.len(),
        test = test.len(),
        slope = fit.slope,
        intercept = fit.intercept,
        r_squared,
        rmse,
        "degree model fitted"
    );

    Ok(RegressionReport {
        fit,
        train_samples: train.len(),
        test_samples: test.len(),
        r_squared,
        rmse,
    })
}
