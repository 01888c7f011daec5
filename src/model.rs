/// Linear regression, regression metrics, and the splitting helpers shared by both model variants.
use linfa::traits::Fit;
use linfa::Dataset as LinfaDataset;
use linfa_linear::LinearRegression;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{EmissionsError, Result};

/// Anything that maps a scaled feature matrix to one prediction per row.
pub trait Regressor {
    fn predict(&self, x: &Array2<f64>) -> Array1<f64>;

    fn predict_one(&self, row: ArrayView1<f64>) -> f64 {
        let x = row.to_owned().insert_axis(Axis(0));
        self.predict(&x)[0]
    }
}

/// Ordinary least squares with intercept. Only plain parameters are kept so the
/// model round-trips through a bundle unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(EmissionsError::InsufficientData { required: 1, actual: 0 });
        }
        let ds = LinfaDataset::new(x.clone(), y.clone());
        let failure = match LinearRegression::new().fit(&ds) {
            Ok(fitted) if fitted.params().iter().all(|c| c.is_finite()) && fitted.intercept().is_finite() => {
                return Ok(LinearModel {
                    intercept: fitted.intercept(),
                    coefficients: fitted.params().to_vec(),
                });
            }
            Ok(_) => None,
            Err(e) => Some(e),
        };
        warn!("Least squares gave no usable coefficients, refitting with a small ridge penalty");
        ridge_fit(x, y).ok_or_else(|| match failure {
            Some(e) => EmissionsError::from(e),
            None => EmissionsError::Schema("feature matrix is degenerate".to_string()),
        })
    }

    /// The fitted coefficients, one per feature.
    pub fn importances(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Regressor for LinearModel {
    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        let coef = Array1::from(self.coefficients.clone());
        x.dot(&coef) + self.intercept
    }
}

/// Normal equations on centred data with a tiny diagonal penalty, for singular designs
/// (constant columns, a single sample).
fn ridge_fit(x: &Array2<f64>, y: &Array1<f64>) -> Option<LinearModel> {
    let p = x.ncols();
    let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
    let y_mean = y.mean().unwrap_or(0.0);
    let xc = x - &x_mean;
    let yc = y - y_mean;

    let mut gram = xc.t().dot(&xc);
    let trace: f64 = gram.diag().sum();
    let lambda = 1e-8 * (trace / p.max(1) as f64).max(1.0);
    for i in 0..p {
        gram[[i, i]] += lambda;
    }
    let rhs = xc.t().dot(&yc);
    let coef = solve(gram, rhs)?;
    if !coef.iter().all(|c| c.is_finite()) {
        return None;
    }
    let intercept = y_mean - x_mean.dot(&coef);
    Some(LinearModel { intercept, coefficients: coef.to_vec() })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-300 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[[row, k]] * out[k]).sum();
        out[row] = (b[row] - tail) / a[[row, row]];
    }
    Some(out)
}

pub fn mse(actual: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    (actual - predicted).mapv(|d| d * d).mean().unwrap_or(0.0)
}

pub fn rmse(actual: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Coefficient of determination. With a constant target it is 1.0 for a perfect fit and
/// 0.0 otherwise, so it never comes out NaN.
pub fn r2_score(actual: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    let mean = actual.mean().unwrap_or(0.0);
    let ss_res: f64 = (actual - predicted).mapv(|d| d * d).sum();
    let ss_tot: f64 = actual.mapv(|v| (v - mean) * (v - mean)).sum();
    if ss_tot <= f64::EPSILON {
        if ss_res <= f64::EPSILON { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    }
}

pub struct Split {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Seeded shuffle, then the first `ceil(n * test_fraction)` rows form the held-out part.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<Split> {
    let n = x.nrows();
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    if n < 2 || n_test == 0 || n_test >= n {
        return Err(EmissionsError::InsufficientData { required: 2, actual: n });
    }

    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);
    let (test, train) = idx.split_at(n_test);
    debug!("Split {} rows into {} train / {} test", n, train.len(), test.len());

    Ok(Split {
        x_train: x.select(Axis(0), train),
        x_test: x.select(Axis(0), test),
        y_train: y.select(Axis(0), train),
        y_test: y.select(Axis(0), test),
    })
}

/// Contiguous folds without shuffling; the first `n % k` folds take one extra row.
pub fn k_fold(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let k = k.min(n).max(1);
    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for f in 0..k {
        let size = base + usize::from(f < extra);
        let test: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..start).chain(start + size..n).collect();
        folds.push((train, test));
        start += size;
    }
    folds
}

/// R² of each fold when the model is refit on the remaining folds.
pub fn cross_val_r2<M, F>(x: &Array2<f64>, y: &Array1<f64>, k: usize, mut fit: F) -> Result<Vec<f64>>
where
    M: Regressor,
    F: FnMut(&Array2<f64>, &Array1<f64>) -> Result<M>,
{
    if x.nrows() < 2 {
        return Err(EmissionsError::InsufficientData { required: 2, actual: x.nrows() });
    }
    k_fold(x.nrows(), k)
        .into_iter()
        .map(|(train, test)| {
            let model = fit(&x.select(Axis(0), &train), &y.select(Axis(0), &train))?;
            let pred = model.predict(&x.select(Axis(0), &test));
            Ok(r2_score(&y.select(Axis(0), &test), &pred))
        })
        .collect()
}

/// Mean and population standard deviation.
pub fn mean_std(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
