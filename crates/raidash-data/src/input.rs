//! Construction input for the joint dataset
//!
//! The joint dataset is built from precomputed model outputs. All arrays are
//! optional: a dashboard may only have a dataset, or only predictions, or only
//! local explanations. [`ModelMetadata`] describes the features and classes.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{column::FeatureRange, local_importance::WeightVectorOption};

/// A single cell of the raw feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(untagged)]
pub enum DatasetValue {
    Number(f64),
    Text(String),
}

impl DatasetValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Total order used for category lists: numbers before text, numbers by
    /// value, text lexicographically.
    pub(crate) fn category_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for DatasetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => fmt::Display::fmt(n, f),
            Self::Text(s) => fmt::Display::fmt(s, f),
        }
    }
}

impl From<f64> for DatasetValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DatasetValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(derive_more::IsVariant, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Regression,
    Binary,
    Multiclass,
}

impl ModelType {
    /// Picks binary or multiclass from the number of classes.
    #[must_use]
    pub fn classifier(class_count: usize) -> Self {
        if class_count > 2 {
            Self::Multiclass
        } else {
            Self::Binary
        }
    }

    #[must_use]
    pub fn is_classifier(self) -> bool {
        !self.is_regression()
    }
}

/// Description of the model and its features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub model_type: ModelType,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_names_abridged: Vec<String>,
    #[serde(default)]
    pub class_names: Vec<String>,
    pub feature_is_categorical: Vec<bool>,
    #[serde(default)]
    pub feature_ranges: Vec<Option<FeatureRange>>,
}

impl ModelMetadata {
    /// Infers feature metadata from the raw dataset.
    ///
    /// A column is categorical when any of its values is text. Numeric
    /// columns get an [`Integer`](crate::RangeType::Integer) range when every
    /// value is a whole number, [`Numeric`](crate::RangeType::Numeric)
    /// otherwise. Features are named `"Feature {i}"`.
    ///
    /// ```
    /// use raidash_data::{DatasetValue, ModelMetadata, ModelType, RangeType};
    ///
    /// let dataset = vec![
    ///     vec![DatasetValue::from(1.0), DatasetValue::from("A")],
    ///     vec![DatasetValue::from(2.5), DatasetValue::from("B")],
    /// ];
    /// let meta = ModelMetadata::infer(Some(&dataset[..]), ModelType::Regression, vec![]);
    /// assert_eq!(meta.feature_is_categorical, [false, true]);
    /// assert_eq!(meta.feature_ranges[0].unwrap().range_type, RangeType::Numeric);
    /// ```
    #[must_use]
    pub fn infer(
        dataset: Option<&[Vec<DatasetValue>]>,
        model_type: ModelType,
        class_names: Vec<String>,
    ) -> Self {
        let feature_count = dataset.and_then(|rows| rows.first()).map_or(0, Vec::len);
        let rows = dataset.unwrap_or_default();

        let mut feature_is_categorical = Vec::with_capacity(feature_count);
        let mut feature_ranges = Vec::with_capacity(feature_count);
        for col in 0..feature_count {
            let column = rows.iter().filter_map(|row| row.get(col));
            let is_categorical = column.clone().any(DatasetValue::is_text);
            feature_is_categorical.push(is_categorical);
            let range = FeatureRange::spanning(column.filter_map(DatasetValue::as_number), true);
            feature_ranges.push((!is_categorical).then_some(range));
        }

        let feature_names = (0..feature_count)
            .map(|col| format!("Feature {col}"))
            .collect();
        Self {
            model_type,
            feature_names,
            feature_names_abridged: vec![],
            class_names,
            feature_is_categorical,
            feature_ranges,
        }
    }

    /// Display name of a feature, falling back to `"Feature {i}"`.
    #[must_use]
    pub fn feature_name(&self, index: usize) -> String {
        self.feature_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Feature {index}"))
    }

    #[must_use]
    pub fn abridged_feature_name(&self, index: usize) -> String {
        self.feature_names_abridged
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.feature_name(index))
    }

    /// Display name of a class, falling back to `"Class {i}"`.
    #[must_use]
    pub fn class_name(&self, index: usize) -> String {
        self.class_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Class {index}"))
    }
}

/// Local feature importance as produced by an explainer.
///
/// Regressors produce `[row][feature]`; classifiers produce
/// `[class][row][feature]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportanceTensor {
    PerClass(Vec<Vec<Vec<f64>>>),
    PerRow(Vec<Vec<f64>>),
}

impl ImportanceTensor {
    /// Number of rows covered by the tensor.
    #[must_use]
    pub fn row_count(&self) -> usize {
        match self {
            Self::PerRow(rows) => rows.len(),
            Self::PerClass(classes) => classes.first().map_or(0, Vec::len),
        }
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        match self {
            Self::PerRow(_) => 1,
            Self::PerClass(classes) => classes.len(),
        }
    }

    /// Number of features, taken from the first row.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        match self {
            Self::PerRow(rows) => rows.first().map_or(0, Vec::len),
            Self::PerClass(classes) => classes
                .first()
                .and_then(|rows| rows.first())
                .map_or(0, Vec::len),
        }
    }

    /// Returns the `[row][feature]` slice of one class.
    #[must_use]
    pub fn class_slice(&self, class: usize) -> Option<&[Vec<f64>]> {
        match self {
            Self::PerRow(rows) => (class == 0).then_some(rows.as_slice()),
            Self::PerClass(classes) => classes.get(class).map(Vec::as_slice),
        }
    }
}

/// Everything the joint dataset is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointDatasetInput {
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
    pub metadata: ModelMetadata,
}

impl JointDatasetInput {
    /// Creates an input carrying only metadata.
    #[must_use]
    pub fn new(metadata: ModelMetadata) -> Self {
        Self {
            dataset: None,
            predicted_y: None,
            predicted_probabilities: None,
            true_y: None,
            local_explanations: None,
            metadata,
        }
    }
}

/// Construction options that are not part of the model output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointDatasetOptions {
    /// Seed for the scatter-plot dither. OS entropy is used when absent.
    pub dither_seed: Option<u64>,
    /// Initial reduction of per-class local importances.
    pub weight_vector: WeightVectorOption,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::RangeType;

    #[test]
    fn test_importance_tensor_shapes() {
        let json = "[[[1, 2], [3, 4], [5, 6]], [[1, 2], [3, 4], [5, 6]]]";
        let per_class: ImportanceTensor = serde_json::from_str(json).unwrap();
        assert_eq!(per_class.class_count(), 2);
        assert_eq!(per_class.row_count(), 3);
        assert_eq!(per_class.feature_count(), 2);

        let per_row: ImportanceTensor = serde_json::from_str("[[1, 2, 3]]").unwrap();
        assert!(matches!(per_row, ImportanceTensor::PerRow(_)));
        assert_eq!(per_row.feature_count(), 3);
        assert!(per_row.class_slice(1).is_none());
    }

    #[test]
    fn test_dataset_value_deserializes_untagged() {
        let row: Vec<DatasetValue> = serde_json::from_str(r#"[1, "A", 2.5]"#).unwrap();
        let expected = [
            DatasetValue::Number(1.0),
            DatasetValue::from("A"),
            DatasetValue::Number(2.5),
        ];
        assert_eq!(row, expected);
    }

    #[test]
    fn test_infer_integer_range() {
        let dataset = vec![vec![DatasetValue::from(3.0)], vec![DatasetValue::from(7.0)]];
        let meta = ModelMetadata::infer(Some(&dataset[..]), ModelType::Binary, vec![]);
        let range = meta.feature_ranges[0].unwrap();
        assert_eq!((range.min, range.max), (3.0, 7.0));
        assert_eq!(range.range_type, RangeType::Integer);
        assert_eq!(meta.class_name(1), "Class 1");
    }

    #[test]
    fn test_input_accepts_camel_case() {
        let input: JointDatasetInput = serde_json::from_str(
            r#"{
                "predictedY": [0, 1],
                "trueY": [1, 1],
                "metadata": {
                    "modelType": "binary",
                    "featureNames": [],
                    "featureIsCategorical": []
                }
            }"#,
        )
        .unwrap();
        assert_eq!(input.predicted_y, Some(vec![0.0, 1.0]));
        assert_eq!(input.true_y, Some(vec![1.0, 1.0]));
    }
}
