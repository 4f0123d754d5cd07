use raidash_data::{
    DatasetValue, ImportanceTensor, JointDatasetInput, ModelMetadata, ModelType,
};
use serde::{Deserialize, Serialize};

/// Dashboard input file.
///
/// `metadata` may be omitted, in which case it is inferred from the dataset
/// and the optional `modelType`, `classNames` and `featureNames` fields.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInput {
    #[serde(default)]
    pub dataset: Option<Vec<Vec<DatasetValue>>>,
    #[serde(default)]
    pub predicted_y: Option<Vec<f64>>,
    #[serde(default, alias = "probabilityY")]
    pub predicted_probabilities: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    pub true_y: Option<Vec<f64>>,
    #[serde(default, alias = "precomputedExplanations")]
    pub local_explanations: Option<ImportanceTensor>,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
    #[serde(default)]
    pub model_type: Option<ModelType>,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub feature_names: Vec<String>,
}

impl DashboardInput {
    /// Model type from the explicit field, the probability width or the
    /// class names, in that order. Falls back to regression.
    fn resolve_model_type(&self) -> ModelType {
        if let Some(model_type) = self.model_type {
            return model_type;
        }
        if let Some(width) = self
            .predicted_probabilities
            .as_ref()
            .and_then(|rows| rows.first())
            .map(Vec::len)
        {
            return ModelType::classifier(width);
        }
        if !self.class_names.is_empty() {
            return ModelType::classifier(self.class_names.len());
        }
        ModelType::Regression
    }

    pub fn into_input(mut self) -> JointDatasetInput {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => {
                let mut metadata = ModelMetadata::infer(
                    self.dataset.as_deref(),
                    self.resolve_model_type(),
                    self.class_names.clone(),
                );
                if self.feature_names.len() == metadata.feature_is_categorical.len() {
                    metadata.feature_names.clone_from(&self.feature_names);
                } else if !self.feature_names.is_empty() {
                    log::warn!(
                        "ignoring {} feature names for {} features",
                        self.feature_names.len(),
                        metadata.feature_is_categorical.len()
                    );
                }
                log::info!("inferred metadata for a {} model", metadata.model_type);
                metadata
            }
        };
        JointDatasetInput {
            dataset: self.dataset,
            predicted_y: self.predicted_y,
            predicted_probabilities: self.predicted_probabilities,
            true_y: self.true_y,
            local_explanations: self.local_explanations,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_is_inferred() {
        let input: DashboardInput = serde_json::from_str(
            r#"{
                "dataset": [[1, "a"], [2, "b"]],
                "predictedY": [0, 1],
                "probabilityY": [[0.7, 0.3], [0.1, 0.9]],
                "featureNames": ["age", "color"]
            }"#,
        )
        .unwrap();
        let input = input.into_input();
        assert_eq!(input.metadata.model_type, ModelType::Binary);
        assert_eq!(input.metadata.feature_names, ["age", "color"]);
        assert_eq!(input.metadata.feature_is_categorical, [false, true]);
    }

    #[test]
    fn test_explicit_metadata_wins() {
        let input: DashboardInput = serde_json::from_str(
            r#"{
                "trueY": [1.5, 2.5],
                "modelType": "binary",
                "metadata": {
                    "modelType": "regression",
                    "featureNames": [],
                    "featureIsCategorical": []
                }
            }"#,
        )
        .unwrap();
        let input = input.into_input();
        assert_eq!(input.metadata.model_type, ModelType::Regression);
    }
}
