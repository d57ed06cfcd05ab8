use serde::{Deserialize, Serialize};

use crate::models::ModelError;
use crate::utils::mean_and_stddev;

/// Per-feature standardisation fitted once on the training matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Column-wise mean and population std. Constant columns get a unit scale.
    pub fn fit<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let dims = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);

        let (means, scales) = (0..dims)
            .map(|col| {
                let column: Vec<f64> = rows.iter().map(|r| r.as_ref()[col]).collect();
                let (mean, std) = mean_and_stddev(&column);
                let scale = if std > f64::EPSILON { std } else { 1.0 };
                (mean, scale)
            })
            .unzip();

        Self { means, scales }
    }

    pub fn dims(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.dims() || self.scales.len() != self.dims() {
            return Err(ModelError::ShapeMismatch {
                expected: self.dims(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardises_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows);
        assert_eq!(scaler.transform(&[1.0, 5.0]).unwrap(), vec![-1.0, 0.0]);
        assert_eq!(scaler.transform(&[3.0, 7.0]).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(ModelError::ShapeMismatch { expected: 3, actual: 1 })
        ));
    }
}
