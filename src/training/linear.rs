//! Linear model implementations: OLS, ridge, lasso, logistic

use crate::error::{AnalystError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system Ax = b by Cholesky
/// decomposition. Near-singular systems (one-hot collinearity after
/// centering) are retried with increasing diagonal regularization.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let diag_scale = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;

    for &ridge_factor in &[0.0, 1e-8, 1e-4] {
        let mut a_try = a.clone();
        if ridge_factor > 0.0 {
            let ridge = ridge_factor * diag_scale.max(1e-12);
            for i in 0..n {
                a_try[[i, i]] += ridge;
            }
        }
        if let Some(x) = cholesky_solve_once(&a_try, b) {
            return Ok(x);
        }
    }

    Err(AnalystError::TrainingError(
        "normal equations are singular".to_string(),
    ))
}

fn cholesky_solve_once(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-12 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

fn check_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(AnalystError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    Ok(())
}

/// Center x and y so the intercept can be recovered after the solve
fn centered(x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    let x_c = x - &x_mean.clone().insert_axis(Axis(0));
    let y_c = y - y_mean;
    (x_c, y_c, x_mean, y_mean)
}

/// Ordinary least squares via the normal equations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_shapes(x, y)?;
        let (x_c, y_c, x_mean, y_mean) = centered(x, y);

        let xtx = x_c.t().dot(&x_c);
        let xty = x_c.t().dot(&y_c);
        let coefficients = cholesky_solve(&xtx, &xty)?;

        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(AnalystError::ModelNotFitted)?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// L2-regularized least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub alpha: f64,
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_shapes(x, y)?;
        let (x_c, y_c, x_mean, y_mean) = centered(x, y);

        let mut xtx = x_c.t().dot(&x_c);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_c.t().dot(&y_c);
        let coefficients = cholesky_solve(&xtx, &xty)?;

        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(AnalystError::ModelNotFitted)?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// L1-regularized least squares via cyclic coordinate descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-6,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn soft_threshold(value: f64, threshold: f64) -> f64 {
        if value > threshold {
            value - threshold
        } else if value < -threshold {
            value + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_shapes(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let (x_c, y_c, x_mean, y_mean) = centered(x, y);

        // Squared column norms, reused every sweep
        let col_sq: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).iter().map(|v| v * v).sum())
            .collect();

        let n = n_samples as f64;
        let mut weights = Array1::<f64>::zeros(n_features);
        let mut residual = y_c.clone();

        for _ in 0..self.max_iter {
            let mut max_delta = 0.0f64;

            for j in 0..n_features {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let col = x_c.column(j);
                let w_old = weights[j];

                // rho = x_j . (residual + w_j x_j)
                let rho: f64 = col
                    .iter()
                    .zip(residual.iter())
                    .map(|(xij, ri)| xij * ri)
                    .sum::<f64>()
                    + w_old * col_sq[j];

                let w_new = Self::soft_threshold(rho / n, self.alpha) / (col_sq[j] / n);
                if w_new != w_old {
                    let delta = w_new - w_old;
                    for (ri, xij) in residual.iter_mut().zip(col.iter()) {
                        *ri -= delta * xij;
                    }
                    weights[j] = w_new;
                    max_delta = max_delta.max(delta.abs());
                }
            }

            if max_delta < self.tol {
                break;
            }
        }

        self.intercept = y_mean - weights.dot(&x_mean);
        self.coefficients = Some(weights);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(AnalystError::ModelNotFitted)?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// Logistic regression trained by gradient descent.
///
/// Binary targets use a single sigmoid; above two classes the model holds
/// one one-vs-rest sigmoid per class and normalizes the scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub tol: f64,
    classes: Vec<f64>,
    weights: Vec<Array1<f64>>,
    intercepts: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            learning_rate: 0.1,
            tol: 1e-6,
            classes: Vec::new(),
            weights: Vec::new(),
            intercepts: Vec::new(),
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Gradient descent on one binary indicator target
    fn fit_binary(&self, x: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, f64) {
        let n_samples = x.nrows() as f64;
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);
            let errors = &predictions - y;

            let dw = (x.t().dot(&errors) / n_samples) + self.alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * &dw;
            bias -= self.learning_rate * db;
        }

        (weights, bias)
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_shapes(x, y)?;

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();
        if classes.len() < 2 {
            return Err(AnalystError::TrainingError(
                "target has a single class".to_string(),
            ));
        }

        self.weights.clear();
        self.intercepts.clear();

        if classes.len() == 2 {
            let positive = classes[1];
            let indicator: Array1<f64> =
                y.mapv(|v| if v == positive { 1.0 } else { 0.0 });
            let (w, b) = self.fit_binary(x, &indicator);
            self.weights.push(w);
            self.intercepts.push(b);
        } else {
            for &class in &classes {
                let indicator: Array1<f64> =
                    y.mapv(|v| if v == class { 1.0 } else { 0.0 });
                let (w, b) = self.fit_binary(x, &indicator);
                self.weights.push(w);
                self.intercepts.push(b);
            }
        }

        self.classes = classes;
        Ok(self)
    }

    /// Class probabilities, one column per class in sorted class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.weights.is_empty() {
            return Err(AnalystError::ModelNotFitted);
        }
        let n = x.nrows();
        let k = self.classes.len();

        if k == 2 {
            let p = Self::sigmoid(&(x.dot(&self.weights[0]) + self.intercepts[0]));
            let mut out = Array2::zeros((n, 2));
            for (i, &pi) in p.iter().enumerate() {
                out[[i, 0]] = 1.0 - pi;
                out[[i, 1]] = pi;
            }
            return Ok(out);
        }

        let mut out = Array2::zeros((n, k));
        for (c, (w, b)) in self.weights.iter().zip(self.intercepts.iter()).enumerate() {
            let p = Self::sigmoid(&(x.dot(w) + *b));
            for (i, &pi) in p.iter().enumerate() {
                out[[i, c]] = pi;
            }
        }
        for i in 0..n {
            let row_sum: f64 = out.row(i).sum();
            if row_sum > 0.0 {
                for c in 0..k {
                    out[[i, c]] /= row_sum;
                }
            }
        }
        Ok(out)
    }

    /// Predicted class labels (the argmax column mapped back to its label)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(Array1::from_iter((0..x.nrows()).map(|i| {
            let row = proba.row(i);
            let best = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            self.classes[best]
        })))
    }
}
