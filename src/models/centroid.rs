//! Nearest-centroid segmentation model
//!
//! The trained form of a k-means customer segmentation: optional per-feature
//! standardization followed by assignment to the closest centroid (squared
//! Euclidean distance, ties go to the lowest label).

use super::{ClusterModel, FeatureRow, ModelError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidModel {
    /// Cluster centers in standardized feature space
    pub centroids: Vec<Vec<f64>>,

    /// Per-feature means subtracted before assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub means: Option<Vec<f64>>,

    /// Per-feature scales divided out before assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<Vec<f64>>,

    /// Column names, informational only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_names: Vec<String>,
}

impl CentroidModel {
    /// Build a validated model without scaling
    pub fn new(centroids: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let model = Self {
            centroids,
            means: None,
            scales: None,
            feature_names: Vec::new(),
        };
        model.validate()?;
        Ok(model)
    }

    /// Attach a standard scaler
    pub fn with_scaler(mut self, means: Vec<f64>, scales: Vec<f64>) -> Result<Self, ModelError> {
        self.means = Some(means);
        self.scales = Some(scales);
        self.validate()?;
        Ok(self)
    }

    pub fn dimension(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    /// Check structural invariants; run after deserialization
    pub fn validate(&self) -> Result<(), ModelError> {
        let dim = self.dimension();
        if self.centroids.is_empty() {
            return Err(ModelError::InvalidModel("no centroids".to_string()));
        }
        if dim == 0 {
            return Err(ModelError::InvalidModel("centroids are empty".to_string()));
        }
        if u32::try_from(self.centroids.len()).is_err() {
            return Err(ModelError::InvalidModel("too many centroids".to_string()));
        }
        for (i, centroid) in self.centroids.iter().enumerate() {
            if centroid.len() != dim {
                return Err(ModelError::InvalidModel(format!(
                    "centroid {} has {} dimensions, expected {}",
                    i,
                    centroid.len(),
                    dim
                )));
            }
            if centroid.iter().any(|v| !v.is_finite()) {
                return Err(ModelError::InvalidModel(format!(
                    "centroid {} has non-finite values",
                    i
                )));
            }
        }

        match (&self.means, &self.scales) {
            (None, None) => {}
            (Some(means), Some(scales)) => {
                if means.len() != dim || scales.len() != dim {
                    return Err(ModelError::InvalidModel(format!(
                        "scaler has {} means and {} scales, expected {}",
                        means.len(),
                        scales.len(),
                        dim
                    )));
                }
                if scales.iter().any(|s| !s.is_finite() || *s == 0.0) {
                    return Err(ModelError::InvalidModel(
                        "scales must be finite and non-zero".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ModelError::InvalidModel(
                    "means and scales must be provided together".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn standardize(&self, feature: usize, value: f64) -> f64 {
        match (&self.means, &self.scales) {
            (Some(means), Some(scales)) => (value - means[feature]) / scales[feature],
            _ => value,
        }
    }

    fn assign(&self, row_index: usize, row: &[f64]) -> Result<u32, ModelError> {
        if row.len() != self.dimension() {
            return Err(ModelError::DimensionMismatch {
                row: row_index,
                expected: self.dimension(),
                actual: row.len(),
            });
        }
        if let Some(feature) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteFeature {
                row: row_index,
                feature,
            });
        }

        let scaled: Vec<f64> = row
            .iter()
            .enumerate()
            .map(|(i, v)| self.standardize(i, *v))
            .collect();

        let mut best = (0usize, f64::INFINITY);
        for (label, centroid) in self.centroids.iter().enumerate() {
            let distance: f64 = centroid
                .iter()
                .zip(&scaled)
                .map(|(c, x)| (c - x) * (c - x))
                .sum();
            if distance < best.1 {
                best = (label, distance);
            }
        }

        // Bounded by validate()
        Ok(best.0 as u32)
    }
}

impl ClusterModel for CentroidModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<u32>, ModelError> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| self.assign(i, row))
            .collect()
    }

    fn n_clusters(&self) -> usize {
        self.centroids.len()
    }
}
