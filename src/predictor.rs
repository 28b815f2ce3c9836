// 🤖 Predictor contract - the regression model is an external collaborator
//
// The core only calls predict(features) -> price in Lacs. LinearModel is a
// small file-backed implementation so the binary can run without the
// original trained model.

use crate::features::{FeatureVector, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model references unknown feature column '{0}'")]
    UnknownColumn(String),

    #[error("model evaluation failed: {0}")]
    Evaluation(String),
}

/// Price model. Synchronous and side-effect free.
pub trait Predictor {
    /// Feature encoding the model was trained with.
    fn encoding_version(&self) -> &str;

    /// Estimated price in Lacs.
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictorError>;
}

/// Linear model: intercept + sum(coefficient * column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub encoding_version: String,
    pub intercept: f64,
    /// Keyed by training column name; absent columns weigh zero
    pub coefficients: BTreeMap<String, f64>,
}

impl LinearModel {
    pub fn from_json(raw: &str) -> Result<Self, PredictorError> {
        let model: LinearModel = serde_json::from_str(raw)?;
        model.check_columns()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, PredictorError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    fn check_columns(&self) -> Result<(), PredictorError> {
        for name in self.coefficients.keys() {
            if !FEATURE_NAMES.contains(&name.as_str()) {
                return Err(PredictorError::UnknownColumn(name.clone()));
            }
        }
        Ok(())
    }
}

impl Predictor for LinearModel {
    fn encoding_version(&self) -> &str {
        &self.encoding_version
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictorError> {
        let estimate = features
            .columns()
            .iter()
            .fold(self.intercept, |acc, (name, value)| {
                acc + self.coefficients.get(*name).copied().unwrap_or(0.0) * value
            });

        if estimate.is_finite() {
            Ok(estimate)
        } else {
            Err(PredictorError::Evaluation(format!(
                "non-finite estimate {}",
                estimate
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{PropertyForm, CATEGORY_CODES_V1};
    use std::io::Write;

    const MODEL_JSON: &str = r#"{
        "encoding_version": "category-codes-v1",
        "intercept": 10.0,
        "coefficients": { "SQUARE_FT": 0.05, "BHK_NO.": 2.5 }
    }"#;

    #[test]
    fn test_linear_prediction() {
        let model = LinearModel::from_json(MODEL_JSON).unwrap();
        let fv = CATEGORY_CODES_V1.encode(&PropertyForm::default()).unwrap();

        // 10 + 0.05 * 1000 + 2.5 * 2
        let price = model.predict(&fv).unwrap();
        assert!((price - 65.0).abs() < 1e-9);
        assert_eq!(model.encoding_version(), "category-codes-v1");
    }

    #[test]
    fn test_unknown_column_rejected() {
        let raw = r#"{ "encoding_version": "v", "intercept": 0.0, "coefficients": { "GARDEN": 1.0 } }"#;
        let err = LinearModel::from_json(raw).unwrap_err();
        assert!(matches!(err, PredictorError::UnknownColumn(col) if col == "GARDEN"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MODEL_JSON.as_bytes()).unwrap();

        let model = LinearModel::load(file.path()).unwrap();
        assert_eq!(model.coefficients.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LinearModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, PredictorError::Io(_)));
    }
}
