//! Prediction model boundary
//!
//! The estimator only sees [`PredictionModel`]: a feature vector goes in, a
//! predicted sleep duration in seconds comes out. [`SleepCalculator`] is the
//! artifact-backed implementation; tests and hosts may supply their own.

mod artifact;

pub use artifact::*;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ModelError;
use crate::types::SleepFeatures;

/// Artifact compiled into the crate
const BUNDLED_ARTIFACT: &str = include_str!("../../models/sleep_calculator.json");

/// A trained regressor predicting actual sleep from the three sleep features
pub trait PredictionModel: Send + Sync + fmt::Debug {
    /// Predicted actual sleep in seconds
    fn predict(&self, features: &SleepFeatures) -> Result<f64, ModelError>;

    /// Human-readable model name
    fn name(&self) -> &str;
}

impl<M: PredictionModel + ?Sized> PredictionModel for Box<M> {
    fn predict(&self, features: &SleepFeatures) -> Result<f64, ModelError> {
        (**self).predict(features)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Where a loaded model came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Bundled,
    File(PathBuf),
    Memory,
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Bundled => f.write_str("bundled"),
            ModelSource::File(path) => write!(f, "{}", path.display()),
            ModelSource::Memory => f.write_str("in-memory"),
        }
    }
}

/// Model loaded from a sleep_calculator.v1 artifact
#[derive(Debug, Clone)]
pub struct SleepCalculator {
    artifact: ModelArtifact,
    source: ModelSource,
}

impl SleepCalculator {
    /// Load the artifact shipped with the crate
    pub fn bundled() -> Result<Self, ModelError> {
        let artifact = ModelArtifact::from_json(BUNDLED_ARTIFACT)?;
        Ok(Self::with_source(artifact, ModelSource::Bundled))
    }

    /// Load an artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = ModelArtifact::from_json(&json)?;
        Ok(Self::with_source(artifact, ModelSource::File(path.to_path_buf())))
    }

    /// Load from a file when a path is given, otherwise the bundled artifact
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, ModelError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    /// Parse an artifact held in memory
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact = ModelArtifact::from_json(json)?;
        Ok(Self::with_source(artifact, ModelSource::Memory))
    }

    fn with_source(artifact: ModelArtifact, source: ModelSource) -> Self {
        info!(
            model = %artifact.name,
            regressor = artifact.regressor_kind(),
            %source,
            "loaded sleep model"
        );
        Self { artifact, source }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }
}

impl PredictionModel for SleepCalculator {
    fn predict(&self, features: &SleepFeatures) -> Result<f64, ModelError> {
        if let Some(bad) = features.as_array().iter().find(|v| !v.is_finite()) {
            return Err(ModelError::Evaluation(format!("non-finite input {bad}")));
        }

        let predicted = self.artifact.evaluate(features)?;
        if !predicted.is_finite() {
            return Err(ModelError::Evaluation(format!(
                "non-finite prediction {predicted}"
            )));
        }
        Ok(predicted)
    }

    fn name(&self) -> &str {
        &self.artifact.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(wake: f64, hours: f64, coffee: f64) -> SleepFeatures {
        SleepFeatures {
            wake,
            estimated_sleep: hours,
            coffee,
        }
    }

    #[test]
    fn test_bundled_model_loads() {
        let model = SleepCalculator::bundled().unwrap();
        assert_eq!(model.name(), crate::BUNDLED_MODEL_NAME);
        assert_eq!(model.source(), &ModelSource::Bundled);
    }

    #[test]
    fn test_bundled_prediction_is_plausible() {
        let model = SleepCalculator::bundled().unwrap();
        let predicted = model.predict(&features(25_200.0, 8.0, 2.0)).unwrap();

        // Somewhat less than the eight hours asked for
        assert!(predicted > 6.0 * 3600.0);
        assert!(predicted < 8.0 * 3600.0);
    }

    #[test]
    fn test_bundled_prediction_never_exceeds_desired_sleep() {
        let model = SleepCalculator::bundled().unwrap();

        for quarter in 16..=48 {
            let hours = quarter as f64 * 0.25;
            for coffee in 1..=11 {
                for wake in [0.0, 21_600.0, 43_200.0, 86_340.0] {
                    let predicted = model.predict(&features(wake, hours, coffee as f64)).unwrap();
                    assert!(
                        predicted <= hours * 3600.0,
                        "{hours}h, {coffee} cups, wake {wake}: {predicted}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_more_coffee_means_less_sleep() {
        let model = SleepCalculator::bundled().unwrap();
        let light = model.predict(&features(25_200.0, 8.0, 2.0)).unwrap();
        let heavy = model.predict(&features(25_200.0, 8.0, 8.0)).unwrap();
        assert!(heavy < light);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let model = SleepCalculator::bundled().unwrap();
        let result = model.predict(&features(25_200.0, f64::NAN, 2.0));
        assert!(matches!(result, Err(ModelError::Evaluation(_))));
    }

    #[test]
    fn test_overflowing_prediction_rejected() {
        let model = SleepCalculator::bundled().unwrap();
        let result = model.predict(&features(25_200.0, f64::MAX, 2.0));
        assert!(matches!(result, Err(ModelError::Evaluation(_))));
    }

    #[test]
    fn test_missing_artifact() {
        let path = std::env::temp_dir().join("better-rest-missing-model.json");
        let _ = fs::remove_file(&path);

        let result = SleepCalculator::load(&path);
        assert!(matches!(result, Err(ModelError::Io { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "better-rest-model-{}.json",
            uuid::Uuid::new_v4()
        ));
        fs::write(&path, BUNDLED_ARTIFACT).unwrap();

        let model = SleepCalculator::load_or_bundled(Some(&path)).unwrap();
        assert_eq!(model.source(), &ModelSource::File(path.clone()));
        assert_eq!(model.source().to_string(), path.display().to_string());

        fs::remove_file(&path).unwrap();
    }
}
