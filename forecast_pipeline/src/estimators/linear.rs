//! Linear regression estimators.
//!
//! Both estimators fit `y ≈ b0 + X β`. Ordinary least squares is solved with an
//! SVD so rank-deficient designs (for example a calendar column that is constant
//! over a short training window) still get the minimum-norm solution. Ridge adds
//! `alpha * I` to the normal equations of the centred data and solves them with a
//! Cholesky factorisation; the intercept is never penalised.

use super::Regressor;
use crate::error::{ForecastError, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

fn check_shapes(features: &DMatrix<f64>, target: &DVector<f64>) -> Result<()> {
    if features.nrows() != target.len() {
        return Err(ForecastError::ModelError(format!(
            "Feature rows ({}) don't match target length ({})",
            features.nrows(),
            target.len()
        )));
    }
    if target.is_empty() {
        return Err(ForecastError::ModelError(
            "Cannot fit on zero observations".to_string(),
        ));
    }
    Ok(())
}

fn linear_predict(
    name: &str,
    features: &DMatrix<f64>,
    coefficients: Option<&Vec<f64>>,
    intercept: f64,
) -> Result<DVector<f64>> {
    let coefficients = coefficients
        .ok_or_else(|| ForecastError::NotFittedError(format!("{} has not been fitted", name)))?;
    if features.ncols() != coefficients.len() {
        return Err(ForecastError::ModelError(format!(
            "{} was fitted on {} features, got {}",
            name,
            coefficients.len(),
            features.ncols()
        )));
    }

    let beta = DVector::from_column_slice(coefficients);
    Ok((features * beta).add_scalar(intercept))
}

/// Ordinary least squares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    fit_intercept: bool,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::with_intercept(true)
    }

    pub fn with_intercept(fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            coefficients: None,
            intercept: 0.0,
        }
    }

    /// Fitted feature coefficients
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, features: &DMatrix<f64>, target: &DVector<f64>) -> Result<()> {
        check_shapes(features, target)?;

        let n = features.nrows();
        let p = features.ncols();
        let design = if self.fit_intercept {
            DMatrix::from_fn(n, p + 1, |i, j| if j == 0 { 1.0 } else { features[(i, j - 1)] })
        } else {
            features.clone()
        };

        let beta = solve_least_squares(&design, target).ok_or_else(|| {
            ForecastError::ModelError("Least squares system is too ill-conditioned".to_string())
        })?;

        if self.fit_intercept {
            self.intercept = beta[0];
            self.coefficients = Some(beta.iter().skip(1).copied().collect());
        } else {
            self.intercept = 0.0;
            self.coefficients = Some(beta.iter().copied().collect());
        }
        Ok(())
    }

    fn predict(&self, features: &DMatrix<f64>) -> Result<DVector<f64>> {
        linear_predict(
            self.name(),
            features,
            self.coefficients.as_ref(),
            self.intercept,
        )
    }

    fn name(&self) -> &str {
        "LinearRegression"
    }
}

/// L2-penalised least squares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    alpha: f64,
    fit_intercept: bool,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(ForecastError::ConfigurationError(format!(
                "Ridge alpha must be positive and finite, got {}",
                alpha
            )));
        }
        Ok(Self {
            alpha,
            fit_intercept: true,
            coefficients: None,
            intercept: 0.0,
        })
    }

    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, features: &DMatrix<f64>, target: &DVector<f64>) -> Result<()> {
        check_shapes(features, target)?;

        let n = features.nrows();
        let p = features.ncols();
        let (x_means, y_mean) = if self.fit_intercept {
            let means: Vec<f64> = (0..p).map(|j| features.column(j).mean()).collect();
            (means, target.mean())
        } else {
            (vec![0.0; p], 0.0)
        };

        let centred = DMatrix::from_fn(n, p, |i, j| features[(i, j)] - x_means[j]);
        let y_centred = target.add_scalar(-y_mean);

        let gram = centred.transpose() * &centred + DMatrix::identity(p, p) * self.alpha;
        let rhs = centred.transpose() * y_centred;
        let beta = gram
            .cholesky()
            .map(|chol| chol.solve(&rhs))
            .ok_or_else(|| {
                ForecastError::ModelError("Ridge normal equations are not positive definite".to_string())
            })?;

        self.intercept = y_mean
            - x_means
                .iter()
                .zip(beta.iter())
                .map(|(m, b)| m * b)
                .sum::<f64>();
        self.coefficients = Some(beta.iter().copied().collect());
        Ok(())
    }

    fn predict(&self, features: &DMatrix<f64>) -> Result<DVector<f64>> {
        linear_predict(
            self.name(),
            features,
            self.coefficients.as_ref(),
            self.intercept,
        )
    }

    fn name(&self) -> &str {
        "RidgeRegression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn least_squares_solves_simple_system() {
        // y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert_abs_diff_eq!(beta[0], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(beta[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn linear_regression_recovers_intercept() {
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 3.0, 5.0, 7.0]);

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert_abs_diff_eq!(model.intercept(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(model.coefficients().unwrap()[0], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn ridge_rejects_non_positive_alpha() {
        assert!(RidgeRegression::new(0.0).is_err());
        assert!(RidgeRegression::new(f64::NAN).is_err());
    }
}
