//! sleep_calculator.v1 model artifact
//!
//! A trained regressor serialized as JSON. The artifact declares its named
//! inputs and output so a host can check it matches the feature vector before
//! any evaluation happens.
//!
//! Two regressor families are supported:
//! - `linear`: intercept plus one coefficient per input
//! - `tree_ensemble`: base prediction plus the sum of boosted regression trees

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ModelError;
use crate::types::{SleepFeatures, FEATURE_NAMES, OUTPUT_ACTUAL_SLEEP};

/// Current artifact format version
pub const MODEL_FORMAT_VERSION: &str = "sleep_calculator.v1";

/// A named model input or output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Serialized model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub inputs: Vec<FeatureSpec>,
    pub output: FeatureSpec,
    pub regressor: Regressor,
}

/// Regressor family and parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearRegressor),
    TreeEnsemble(TreeEnsemble),
}

/// `intercept + Σ coefficients[name] * x[name]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
}

/// `base_prediction + Σ tree(x)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_prediction: f64,
    pub trees: Vec<RegressionTree>,
}

/// Flat node array, root at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

/// Tree node: branches route `x[feature] < threshold` left, otherwise right
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Branch {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl ModelArtifact {
    /// Parse and validate an artifact
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Serialize the artifact
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the artifact matches the feature vector and its parameters are usable
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::InvalidFormatVersion {
                expected: MODEL_FORMAT_VERSION.to_string(),
                actual: self.format_version.clone(),
            });
        }

        let declared: Vec<&str> = self.inputs.iter().map(|f| f.name.as_str()).collect();
        if declared != FEATURE_NAMES {
            return Err(ModelError::ShapeMismatch(format!(
                "inputs must be [{}], got [{}]",
                FEATURE_NAMES.join(", "),
                declared.join(", ")
            )));
        }

        if self.output.name != OUTPUT_ACTUAL_SLEEP {
            return Err(ModelError::ShapeMismatch(format!(
                "output must be {}, got {}",
                OUTPUT_ACTUAL_SLEEP, self.output.name
            )));
        }

        match &self.regressor {
            Regressor::Linear(linear) => linear.validate(),
            Regressor::TreeEnsemble(ensemble) => ensemble.validate(),
        }
    }

    /// Regressor family name as written in the artifact
    pub fn regressor_kind(&self) -> &'static str {
        match self.regressor {
            Regressor::Linear(_) => "linear",
            Regressor::TreeEnsemble(_) => "tree_ensemble",
        }
    }

    /// Evaluate the regressor. Assumes [`validate`](Self::validate) passed.
    pub fn evaluate(&self, features: &SleepFeatures) -> Result<f64, ModelError> {
        match &self.regressor {
            Regressor::Linear(linear) => linear.evaluate(features),
            Regressor::TreeEnsemble(ensemble) => ensemble.evaluate(features),
        }
    }
}

impl LinearRegressor {
    fn validate(&self) -> Result<(), ModelError> {
        ensure_finite("intercept", self.intercept)?;

        for name in FEATURE_NAMES {
            match self.coefficients.get(name) {
                Some(c) => ensure_finite(name, *c)?,
                None => {
                    return Err(ModelError::ShapeMismatch(format!(
                        "missing coefficient for input {name}"
                    )))
                }
            }
        }

        if let Some(extra) = self
            .coefficients
            .keys()
            .find(|k| !FEATURE_NAMES.contains(&k.as_str()))
        {
            return Err(ModelError::ShapeMismatch(format!(
                "coefficient for undeclared input {extra}"
            )));
        }

        Ok(())
    }

    fn evaluate(&self, features: &SleepFeatures) -> Result<f64, ModelError> {
        let mut total = self.intercept;
        for name in FEATURE_NAMES {
            let coefficient = self.coefficients.get(name).copied().unwrap_or(0.0);
            let value = features
                .get(name)
                .ok_or_else(|| ModelError::Evaluation(format!("unknown input {name}")))?;
            total += coefficient * value;
        }
        Ok(total)
    }
}

impl TreeEnsemble {
    fn validate(&self) -> Result<(), ModelError> {
        ensure_finite("base_prediction", self.base_prediction)?;

        if self.trees.is_empty() {
            return Err(ModelError::ShapeMismatch("tree ensemble has no trees".to_string()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::ShapeMismatch(format!("tree {t} has no nodes")));
            }

            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Leaf { value } => ensure_finite("leaf value", *value)?,
                    TreeNode::Branch {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if !FEATURE_NAMES.contains(&feature.as_str()) {
                            return Err(ModelError::ShapeMismatch(format!(
                                "tree {t} node {i} splits on undeclared input {feature}"
                            )));
                        }
                        ensure_finite("threshold", *threshold)?;
                        // Children must point forward so traversal always terminates
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(ModelError::ShapeMismatch(format!(
                                    "tree {t} node {i} has invalid child index {child}"
                                )));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn evaluate(&self, features: &SleepFeatures) -> Result<f64, ModelError> {
        let mut total = self.base_prediction;
        for tree in &self.trees {
            total += tree.evaluate(features)?;
        }
        Ok(total)
    }
}

impl RegressionTree {
    fn evaluate(&self, features: &SleepFeatures) -> Result<f64, ModelError> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(feature).ok_or_else(|| {
                        ModelError::Evaluation(format!("unknown input {feature}"))
                    })?;
                    index = if x < *threshold { *left } else { *right };
                }
                None => {
                    return Err(ModelError::Evaluation(format!(
                        "node index {index} out of range"
                    )))
                }
            }
        }
    }
}

fn ensure_finite(what: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::ShapeMismatch(format!("{what} is not finite")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_json(coefficients: &str) -> String {
        format!(
            r#"{{
                "format_version": "sleep_calculator.v1",
                "name": "test",
                "inputs": [{{"name": "wake"}}, {{"name": "estimatedSleep"}}, {{"name": "coffee"}}],
                "output": {{"name": "actualSleep"}},
                "regressor": {{"type": "linear", "intercept": 100.0, "coefficients": {coefficients}}}
            }}"#
        )
    }

    fn features() -> SleepFeatures {
        SleepFeatures {
            wake: 25_200.0,
            estimated_sleep: 8.0,
            coffee: 2.0,
        }
    }

    #[test]
    fn test_linear_evaluation() {
        let artifact = ModelArtifact::from_json(&linear_json(
            r#"{"wake": 0.01, "estimatedSleep": 3600.0, "coffee": -60.0}"#,
        ))
        .unwrap();

        assert_eq!(artifact.regressor_kind(), "linear");
        let y = artifact.evaluate(&features()).unwrap();
        assert!((y - (100.0 + 252.0 + 28_800.0 - 120.0)).abs() < 1e-9);
    }

    #[test]
    fn test_linear_missing_coefficient() {
        let result =
            ModelArtifact::from_json(&linear_json(r#"{"wake": 0.01, "estimatedSleep": 3600.0}"#));
        assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn test_linear_extra_coefficient() {
        let result = ModelArtifact::from_json(&linear_json(
            r#"{"wake": 0.0, "estimatedSleep": 1.0, "coffee": 0.0, "tea": 1.0}"#,
        ));
        assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn test_wrong_format_version() {
        let json = linear_json(r#"{"wake": 0.0, "estimatedSleep": 1.0, "coffee": 0.0}"#)
            .replace("sleep_calculator.v1", "sleep_calculator.v0");
        let result = ModelArtifact::from_json(&json);
        assert!(matches!(
            result,
            Err(ModelError::InvalidFormatVersion { .. })
        ));
    }

    #[test]
    fn test_input_order_is_part_of_the_shape() {
        let json = linear_json(r#"{"wake": 0.0, "estimatedSleep": 1.0, "coffee": 0.0}"#).replace(
            r#"[{"name": "wake"}, {"name": "estimatedSleep"}, {"name": "coffee"}]"#,
            r#"[{"name": "coffee"}, {"name": "estimatedSleep"}, {"name": "wake"}]"#,
        );
        let result = ModelArtifact::from_json(&json);
        assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn test_wrong_output_name() {
        let json = linear_json(r#"{"wake": 0.0, "estimatedSleep": 1.0, "coffee": 0.0}"#)
            .replace("actualSleep", "bedtime");
        let result = ModelArtifact::from_json(&json);
        assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn test_corrupt_json() {
        let result = ModelArtifact::from_json("{\"format_version\": ");
        assert!(matches!(result, Err(ModelError::Json(_))));
    }

    fn ensemble_json(nodes: &str) -> String {
        format!(
            r#"{{
                "format_version": "sleep_calculator.v1",
                "name": "boosted",
                "inputs": [{{"name": "wake"}}, {{"name": "estimatedSleep"}}, {{"name": "coffee"}}],
                "output": {{"name": "actualSleep"}},
                "regressor": {{
                    "type": "tree_ensemble",
                    "base_prediction": 27000.0,
                    "trees": [
                        {{"nodes": {nodes}}},
                        {{"nodes": [{{"value": 60.0}}]}}
                    ]
                }}
            }}"#
        )
    }

    #[test]
    fn test_tree_ensemble_evaluation() {
        let artifact = ModelArtifact::from_json(&ensemble_json(
            r#"[
                {"feature": "coffee", "threshold": 3.0, "left": 1, "right": 2},
                {"value": 600.0},
                {"value": -900.0}
            ]"#,
        ))
        .unwrap();

        assert_eq!(artifact.regressor_kind(), "tree_ensemble");
        assert_eq!(artifact.evaluate(&features()).unwrap(), 27_660.0);

        let heavy = SleepFeatures {
            coffee: 5.0,
            ..features()
        };
        assert_eq!(artifact.evaluate(&heavy).unwrap(), 26_160.0);
    }

    #[test]
    fn test_tree_rejects_backward_child() {
        let result = ModelArtifact::from_json(&ensemble_json(
            r#"[
                {"feature": "coffee", "threshold": 3.0, "left": 0, "right": 1},
                {"value": 1.0}
            ]"#,
        ));
        assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn test_tree_rejects_unknown_split_feature() {
        let result = ModelArtifact::from_json(&ensemble_json(
            r#"[
                {"feature": "tea", "threshold": 3.0, "left": 1, "right": 2},
                {"value": 1.0},
                {"value": 2.0}
            ]"#,
        ));
        assert!(matches!(result, Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn test_artifact_serialization_keeps_shape() {
        let artifact = ModelArtifact::from_json(&linear_json(
            r#"{"wake": 0.0, "estimatedSleep": 3600.0, "coffee": 0.0}"#,
        ))
        .unwrap();

        let reparsed = ModelArtifact::from_json(&artifact.to_json().unwrap()).unwrap();
        assert_eq!(reparsed.inputs, artifact.inputs);
        assert_eq!(reparsed.evaluate(&features()).unwrap(), 28_900.0);
    }
}
