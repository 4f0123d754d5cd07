//! The joint row store
//!
//! [`JointDataset`] unifies the raw feature matrix, predictions, class
//! probabilities, ground truth and local importances into one table with a
//! uniform schema. Every value is stored as `f64`: categorical columns hold
//! the index of the value in [`ColumnMeta::sorted_categorical_values`].
//!
//! # Storage
//!
//! Columns are stored by value, one `Vec<f64>` per column, all of length
//! [`JointDataset::row_count`]. A [`ColumnKey`] is resolved to its column slot
//! through a hash map, so every row has exactly the same set of keys.
//!
//! # Mutation
//!
//! The store is built once and then only changed by three explicit operations:
//!
//! - [`JointDataset::set_treat_as_categorical`]: switch an integer or numeric
//!   column between raw values and category indices
//! - [`JointDataset::add_bin`]: regenerate the display buckets of a column
//! - [`JointDataset::build_local_flatten_matrix`]: recompute the reduced local
//!   importance columns with another weighting
//!
//! Each of them increments [`JointDataset::generation`], which cohorts use to
//! notice that their filtered view may be stale.

use std::collections::{BTreeMap, HashMap};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;
use raidash_stats::{
    binning::{self, BinPlan},
    descriptive::DescriptiveStats,
};
use serde::{Deserialize, Serialize};

use crate::{
    column::{ColumnCategory, ColumnKey, ColumnMeta, FeatureRange, RangeType},
    input::{
        DatasetValue, ImportanceTensor, JointDatasetInput, JointDatasetOptions, ModelMetadata,
        ModelType,
    },
    local_importance::{self, ReduceImportanceError, WeightVectorOption},
};

/// Bound of the scatter-plot jitter: dither values lie in
/// `[-DITHER_BOUND, DITHER_BOUND)`.
pub const DITHER_BOUND: f64 = 0.1;

/// Labels of the binary classification error column, indexed by
/// `2 * TrueY + PredictedY`.
pub const BINARY_ERROR_LABELS: [&str; 4] = [
    "True negative",
    "False positive",
    "False negative",
    "True positive",
];

/// Labels of the multiclass classification error column.
pub const MULTICLASS_ERROR_LABELS: [&str; 2] = ["Correct", "Misclassified"];

/// A materialized row: every column key with its stored value.
pub type Row = BTreeMap<ColumnKey, f64>;

#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
pub enum JointDatasetError {
    #[display("{input} has {actual} rows but {reference} has {expected}")]
    DimensionMismatch {
        input: &'static str,
        reference: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("dataset row {row} has {actual} features, expected {expected}")]
    FeatureCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("predicted probability row {row} has {actual} classes, expected {expected}")]
    ClassCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("dataset column {column} is numeric but row {row} holds '{value}'")]
    NonNumericValue {
        column: usize,
        row: usize,
        value: String,
    },
    #[display("invalid local explanation: {_0}")]
    LocalExplanation(#[error(source)] ReduceImportanceError),
    #[display("unknown column '{key}'")]
    UnknownColumn { key: ColumnKey },
    #[display("column '{key}' has no numeric range or is displayed as categorical")]
    NotBinnable { key: ColumnKey },
    #[display("column '{key}' is inherently categorical or has no numeric range")]
    NotToggleable { key: ColumnKey },
}

impl From<ReduceImportanceError> for JointDatasetError {
    fn from(err: ReduceImportanceError) -> Self {
        Self::LocalExplanation(err)
    }
}

/// A cell value with categorical indices resolved to their labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Category(String),
}

/// How the stored values of a column relate to its source values.
#[derive(Debug, Clone)]
enum ColumnEncoding {
    /// Stored values are the ingested values.
    Native,
    /// A numeric column switched to categorical mode. Stored values are
    /// category indices; the original values are kept for the way back.
    CategoryIndex { raw_values: Box<[f64]> },
}

#[derive(Debug, Clone)]
struct Column {
    key: ColumnKey,
    meta: ColumnMeta,
    values: Vec<f64>,
    encoding: ColumnEncoding,
}

/// Unified row store of features, outcomes and explanations.
#[derive(Debug, Clone)]
pub struct JointDataset {
    columns: Vec<Column>,
    slots: HashMap<ColumnKey, usize>,
    bins: HashMap<ColumnKey, Vec<f64>>,
    row_count: usize,
    metadata: ModelMetadata,
    has_dataset: bool,
    has_predicted_y: bool,
    has_predicted_probabilities: bool,
    has_true_y: bool,
    dataset_feature_count: usize,
    local_explanation_feature_count: usize,
    raw_local_importance: Option<ImportanceTensor>,
    weight_vector: WeightVectorOption,
    generation: u64,
}

impl JointDataset {
    /// Builds the row store from model outputs.
    ///
    /// The raw dataset is consumed; only the per-class local importance
    /// tensor is retained, since it is needed to recompute the reduced
    /// importance columns.
    ///
    /// # Errors
    ///
    /// Fails when the supplied arrays disagree on the number of rows, when a
    /// dataset row or probability row has the wrong width, when a numeric
    /// dataset column contains text, or when the local explanation tensor is
    /// ragged.
    pub fn new(
        input: JointDatasetInput,
        options: JointDatasetOptions,
    ) -> Result<Self, JointDatasetError> {
        let row_count = check_row_counts(&input)?;
        if let Some(tensor) = &input.local_explanations {
            local_importance::validate(tensor)?;
        }

        let JointDatasetInput {
            dataset,
            predicted_y,
            predicted_probabilities,
            true_y,
            local_explanations,
            mut metadata,
        } = input;

        if metadata.model_type.is_classifier() && metadata.class_names.is_empty() {
            let class_count = infer_class_count(
                predicted_y.as_deref(),
                true_y.as_deref(),
                predicted_probabilities.as_deref(),
            );
            metadata.class_names = (0..class_count).map(|i| format!("Class {i}")).collect();
        }

        let mut this = Self {
            columns: vec![],
            slots: HashMap::new(),
            bins: HashMap::new(),
            row_count,
            metadata,
            has_dataset: dataset.is_some(),
            has_predicted_y: predicted_y.is_some(),
            has_predicted_probabilities: predicted_probabilities.is_some(),
            has_true_y: true_y.is_some(),
            dataset_feature_count: 0,
            local_explanation_feature_count: 0,
            raw_local_importance: None,
            weight_vector: options.weight_vector,
            generation: 0,
        };

        this.push_index_column();
        if let Some(dataset) = dataset {
            this.ingest_dataset(dataset)?;
        }
        if let Some(predicted_y) = predicted_y {
            this.push_outcome_column(ColumnKey::PredictedY, "Predicted Y", predicted_y);
        }
        if let Some(probabilities) = predicted_probabilities
            && this.metadata.model_type.is_classifier()
        {
            this.ingest_probabilities(&probabilities)?;
        }
        if let Some(true_y) = true_y {
            this.push_outcome_column(ColumnKey::TrueY, "True Y", true_y);
        }
        this.push_error_column();
        this.push_dither_columns(options.dither_seed);

        if let Some(tensor) = local_explanations {
            this.local_explanation_feature_count = tensor.feature_count();
            this.raw_local_importance = Some(tensor);
            this.build_local_flatten_matrix(options.weight_vector)?;
        }

        log::info!(
            "built joint dataset: {} rows, {} columns, {} dataset features, model type {}",
            this.row_count,
            this.columns.len(),
            this.dataset_feature_count,
            this.metadata.model_type
        );
        Ok(this)
    }

    fn push_column(&mut self, key: ColumnKey, meta: ColumnMeta, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.row_count, "column {key} length");
        let column = Column {
            key,
            meta,
            values,
            encoding: ColumnEncoding::Native,
        };
        if let Some(&slot) = self.slots.get(&key) {
            self.columns[slot] = column;
        } else {
            self.slots.insert(key, self.columns.len());
            self.columns.push(column);
        }
    }

    #[expect(clippy::cast_precision_loss)]
    fn push_index_column(&mut self) {
        let max = self.row_count.saturating_sub(1) as f64;
        let meta = ColumnMeta::numeric(
            "Index",
            FeatureRange::new(0.0, max, RangeType::Integer),
            ColumnCategory::Index,
        );
        let values = (0..self.row_count).map(|i| i as f64).collect();
        self.push_column(ColumnKey::Index, meta, values);
    }

    fn ingest_dataset(
        &mut self,
        dataset: Vec<Vec<DatasetValue>>,
    ) -> Result<(), JointDatasetError> {
        let feature_count = self.metadata.feature_is_categorical.len();
        if let Some((row, values)) = dataset
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != feature_count)
        {
            return Err(JointDatasetError::FeatureCountMismatch {
                row,
                expected: feature_count,
                actual: values.len(),
            });
        }
        self.dataset_feature_count = feature_count;

        let mut categorical = 0;
        for col in 0..feature_count {
            let key = ColumnKey::Data(col);
            let (mut meta, values) = if self.metadata.feature_is_categorical[col] {
                encode_categorical(dataset.iter().map(|row| &row[col]))
            } else {
                let values = dataset
                    .iter()
                    .enumerate()
                    .map(|(row, values)| {
                        values[col]
                            .as_number()
                            .ok_or_else(|| JointDatasetError::NonNumericValue {
                                column: col,
                                row,
                                value: values[col].to_string(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let range = match self.metadata.feature_ranges.get(col).copied().flatten() {
                    Some(range) if range.range_type != RangeType::Categorical => range,
                    _ => FeatureRange::spanning(values.iter().copied(), true),
                };
                (ColumnMeta::numeric("", range, ColumnCategory::Dataset), values)
            };
            meta.label = self.metadata.feature_name(col);
            meta.abridged_label = self.metadata.abridged_feature_name(col);
            meta.category = ColumnCategory::Dataset;
            meta.index = Some(col);
            let binnable = !meta.is_categorical;
            categorical += usize::from(!binnable);
            self.push_column(key, meta, values);
            if binnable {
                self.add_bin(key, None)?;
            }
        }

        log::debug!("features: {feature_count} ({categorical} categorical)");
        Ok(())
    }

    fn push_outcome_column(&mut self, key: ColumnKey, label: &str, values: Vec<f64>) {
        if self.metadata.model_type.is_classifier() {
            let meta = ColumnMeta::categorical(
                label,
                self.metadata.class_names.clone(),
                ColumnCategory::Outcome,
            );
            self.push_column(key, meta, values);
        } else {
            let range = FeatureRange::spanning(values.iter().copied(), false);
            let meta = ColumnMeta::numeric(label, range, ColumnCategory::Outcome);
            self.push_column(key, meta, values);
            self.bin_default(key);
        }
    }

    fn ingest_probabilities(
        &mut self,
        probabilities: &[Vec<f64>],
    ) -> Result<(), JointDatasetError> {
        let class_count = self.metadata.class_names.len();
        if let Some((row, values)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != class_count)
        {
            return Err(JointDatasetError::ClassCountMismatch {
                row,
                expected: class_count,
                actual: values.len(),
            });
        }

        for class in 0..class_count {
            let values = probabilities
                .iter()
                .map(|row| row[class])
                .collect::<Vec<_>>();
            let range = FeatureRange::spanning(values.iter().copied(), false);
            let label = format!("Probability: {}", self.metadata.class_name(class));
            let meta = ColumnMeta::numeric(label, range, ColumnCategory::Outcome);
            self.push_column(ColumnKey::ProbabilityClass(class), meta, values);
        }
        Ok(())
    }

    fn push_error_column(&mut self) {
        let (Some(true_y), Some(predicted_y)) = (
            self.column_values(&ColumnKey::TrueY),
            self.column_values(&ColumnKey::PredictedY),
        ) else {
            return;
        };
        let pairs = true_y.iter().zip(predicted_y);

        match self.metadata.model_type {
            ModelType::Binary => {
                let values = pairs.map(|(t, p)| 2.0 * t + p).collect();
                let labels = BINARY_ERROR_LABELS.map(str::to_owned).to_vec();
                let meta = ColumnMeta::categorical(
                    "Classification outcome",
                    labels,
                    ColumnCategory::Outcome,
                );
                self.push_column(ColumnKey::ClassificationError, meta, values);
            }
            ModelType::Multiclass => {
                let values = pairs.map(|(t, p)| f64::from(u8::from(t != p))).collect();
                let labels = MULTICLASS_ERROR_LABELS.map(str::to_owned).to_vec();
                let meta = ColumnMeta::categorical(
                    "Classification outcome",
                    labels,
                    ColumnCategory::Outcome,
                );
                self.push_column(ColumnKey::ClassificationError, meta, values);
            }
            ModelType::Regression => {
                let values = pairs.map(|(t, p)| t - p).collect::<Vec<_>>();
                let range = FeatureRange::spanning(values.iter().copied(), false);
                let meta = ColumnMeta::numeric("Error", range, ColumnCategory::Outcome);
                self.push_column(ColumnKey::RegressionError, meta, values);
                self.bin_default(ColumnKey::RegressionError);
            }
        }
    }

    fn push_dither_columns(&mut self, seed: Option<u64>) {
        let mut rng = match seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_rng(&mut rand::rng()),
        };
        for key in [ColumnKey::Dither, ColumnKey::Dither2] {
            let values = (0..self.row_count)
                .map(|_| rng.random_range(-DITHER_BOUND..DITHER_BOUND))
                .collect();
            let meta = ColumnMeta::numeric(
                key.to_string(),
                FeatureRange::new(-DITHER_BOUND, DITHER_BOUND, RangeType::Numeric),
                ColumnCategory::None,
            );
            self.push_column(key, meta, values);
        }
    }

    /// Bins a column created by the constructor, which always has a range.
    fn bin_default(&mut self, key: ColumnKey) {
        if let Err(err) = self.add_bin(key, None) {
            log::warn!("skipping default bins: {err}");
        }
    }

    fn touch(&mut self) {
        self.generation += 1;
    }

    fn column(&self, key: &ColumnKey) -> Option<&Column> {
        self.slots.get(key).map(|&slot| &self.columns[slot])
    }

    fn column_mut(&mut self, key: &ColumnKey) -> Result<&mut Column, JointDatasetError> {
        self.slots
            .get(key)
            .map(|&slot| &mut self.columns[slot])
            .ok_or(JointDatasetError::UnknownColumn { key: *key })
    }

    // Read interface

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Alias of [`JointDataset::row_count`] matching the dashboard naming.
    #[must_use]
    pub fn dataset_row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub fn dataset_feature_count(&self) -> usize {
        self.dataset_feature_count
    }

    /// Number of classes of a classifier, `0` for regressors.
    #[must_use]
    pub fn prediction_class_count(&self) -> usize {
        if self.metadata.model_type.is_classifier() {
            self.metadata.class_names.len()
        } else {
            0
        }
    }

    #[must_use]
    pub fn local_explanation_feature_count(&self) -> usize {
        self.local_explanation_feature_count
    }

    #[must_use]
    pub fn has_dataset(&self) -> bool {
        self.has_dataset
    }

    #[must_use]
    pub fn has_predicted_y(&self) -> bool {
        self.has_predicted_y
    }

    #[must_use]
    pub fn has_predicted_probabilities(&self) -> bool {
        self.has_predicted_probabilities
    }

    #[must_use]
    pub fn has_true_y(&self) -> bool {
        self.has_true_y
    }

    #[must_use]
    pub fn has_local_explanations(&self) -> bool {
        self.raw_local_importance.is_some()
    }

    #[must_use]
    pub fn model_type(&self) -> ModelType {
        self.metadata.model_type
    }

    #[must_use]
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Counter incremented by every in-place mutation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Weighting used by the last local importance reduction.
    #[must_use]
    pub fn weight_vector(&self) -> WeightVectorOption {
        self.weight_vector
    }

    /// Column keys in schema order.
    pub fn columns(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.columns.iter().map(|column| column.key)
    }

    #[must_use]
    pub fn contains_column(&self, key: &ColumnKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Keys of the dataset feature columns, in feature order.
    pub fn dataset_feature_keys(&self) -> impl Iterator<Item = ColumnKey> {
        (0..self.dataset_feature_count).map(ColumnKey::Data)
    }

    /// Keys of the reduced local importance columns, in feature order.
    pub fn local_importance_keys(&self) -> impl Iterator<Item = ColumnKey> {
        (0..self.local_explanation_feature_count).map(ColumnKey::LocalImportance)
    }

    #[must_use]
    pub fn meta(&self, key: &ColumnKey) -> Option<&ColumnMeta> {
        self.column(key).map(|column| &column.meta)
    }

    /// Metadata of every column, in schema order.
    pub fn meta_dict(&self) -> impl Iterator<Item = (ColumnKey, &ColumnMeta)> + '_ {
        self.columns.iter().map(|column| (column.key, &column.meta))
    }

    /// Stored values of a column, one per row.
    #[must_use]
    pub fn column_values(&self, key: &ColumnKey) -> Option<&[f64]> {
        self.column(key).map(|column| column.values.as_slice())
    }

    /// Bucket edges of a binned column.
    #[must_use]
    pub fn bins(&self, key: &ColumnKey) -> Option<&[f64]> {
        self.bins.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn value(&self, row: usize, key: &ColumnKey) -> Option<f64> {
        self.column(key)?.values.get(row).copied()
    }

    /// Materializes one row with every column.
    #[must_use]
    pub fn get_row(&self, index: usize) -> Option<Row> {
        (index < self.row_count).then(|| {
            self.columns
                .iter()
                .map(|column| (column.key, column.values[index]))
                .collect()
        })
    }

    /// Returns a cell with category indices resolved to labels.
    ///
    /// Columns switched to categorical mode report their original number.
    #[must_use]
    pub fn raw_value(&self, row: usize, key: &ColumnKey) -> Option<CellValue> {
        let column = self.column(key)?;
        let value = *column.values.get(row)?;
        match &column.encoding {
            ColumnEncoding::CategoryIndex { raw_values } => {
                Some(CellValue::Number(raw_values[row]))
            }
            ColumnEncoding::Native if column.meta.is_categorical => {
                let label = category_index(value)
                    .and_then(|index| column.meta.sorted_categorical_values.get(index))?;
                Some(CellValue::Category(label.clone()))
            }
            ColumnEncoding::Native => Some(CellValue::Number(value)),
        }
    }

    /// Projects one column across all rows.
    ///
    /// When `bin_edges` is given, every value is replaced by the index of
    /// its bucket (see [`binning::bucket_index`]).
    pub fn unwrap(
        &self,
        key: &ColumnKey,
        bin_edges: Option<&[f64]>,
    ) -> Result<Vec<f64>, JointDatasetError> {
        let values = self
            .column_values(key)
            .ok_or(JointDatasetError::UnknownColumn { key: *key })?;
        Ok(project(values.iter().copied(), bin_edges))
    }

    /// Projects one column across the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if a row index is out of bounds.
    pub fn unwrap_rows(
        &self,
        rows: &[usize],
        key: &ColumnKey,
        bin_edges: Option<&[f64]>,
    ) -> Result<Vec<f64>, JointDatasetError> {
        let values = self
            .column_values(key)
            .ok_or(JointDatasetError::UnknownColumn { key: *key })?;
        Ok(project(rows.iter().map(|&row| values[row]), bin_edges))
    }

    /// Mean absolute reduced local importance of each feature over `rows`.
    ///
    /// Returns an empty vector when there are no local explanations.
    #[must_use]
    pub fn feature_average_importance(&self, rows: &[usize]) -> Vec<f64> {
        self.local_importance_keys()
            .filter_map(|key| self.column_values(&key))
            .map(|values| {
                raidash_stats::metrics::mean(rows.iter().map(|&row| values[row].abs()))
            })
            .collect()
    }

    // Mutation interface

    /// Recomputes the display buckets of a numeric column.
    ///
    /// Without an explicit `bin_count`, 5 buckets are used, or fewer for
    /// integer columns with fewer distinct values. The bucket labels replace
    /// the column's `sorted_categorical_values`.
    ///
    /// # Errors
    ///
    /// Fails for unknown columns, columns without a numeric range and
    /// columns currently treated as categorical.
    pub fn add_bin(
        &mut self,
        key: ColumnKey,
        bin_count: Option<usize>,
    ) -> Result<(), JointDatasetError> {
        let column = self.column_mut(&key)?;
        let range = match column.meta.feature_range {
            Some(range) if range.range_type != RangeType::Categorical => range,
            _ => return Err(JointDatasetError::NotBinnable { key }),
        };
        if column.meta.treat_as_categorical {
            return Err(JointDatasetError::NotBinnable { key });
        }

        let is_integer = range.range_type == RangeType::Integer;
        let bin_count = bin_count.unwrap_or_else(|| {
            let distinct = if is_integer {
                DescriptiveStats::new(column.values.iter().copied())
                    .map_or(0, |stats| stats.distinct)
            } else {
                0
            };
            binning::default_bin_count(is_integer, distinct)
        });
        let plan = BinPlan::new(range.min, range.max, is_integer, bin_count);
        log::debug!("binned {key} into {} buckets: {:?}", plan.len(), plan.edges);

        column.meta.sorted_categorical_values = plan.labels;
        self.bins.insert(key, plan.edges);
        self.touch();
        Ok(())
    }

    /// Switches a numeric column between raw values and category indices.
    ///
    /// Switching to categorical replaces every value with its index among
    /// the sorted distinct values and keeps the original values aside.
    /// Switching back restores the original values exactly and regenerates
    /// the default buckets. Requesting the current mode does nothing.
    ///
    /// # Errors
    ///
    /// Fails for unknown columns and for inherently categorical columns.
    pub fn set_treat_as_categorical(
        &mut self,
        key: ColumnKey,
        treat_as_categorical: bool,
    ) -> Result<(), JointDatasetError> {
        let column = self.column_mut(&key)?;
        if column.meta.is_categorical || column.meta.feature_range.is_none() {
            return Err(JointDatasetError::NotToggleable { key });
        }

        let encoding = std::mem::replace(&mut column.encoding, ColumnEncoding::Native);
        match (encoding, treat_as_categorical) {
            (ColumnEncoding::Native, true) => {
                let mut distinct = column.values.clone();
                distinct.sort_by(f64::total_cmp);
                distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());

                let raw_values = std::mem::take(&mut column.values).into_boxed_slice();
                #[expect(clippy::cast_precision_loss)]
                let indices = raw_values
                    .iter()
                    .map(|v| {
                        distinct
                            .binary_search_by(|candidate| candidate.total_cmp(v))
                            .unwrap_or_else(|i| i) as f64
                    })
                    .collect();

                column.values = indices;
                let labels = distinct.iter().map(|&v| binning::format_plain(v));
                column.meta.sorted_categorical_values = labels.collect();
                column.meta.treat_as_categorical = true;
                column.encoding = ColumnEncoding::CategoryIndex { raw_values };
                self.bins.remove(&key);
                let count = distinct.len();
                log::debug!("{key} treated as categorical ({count} categories)");
                self.touch();
                Ok(())
            }
            (ColumnEncoding::CategoryIndex { raw_values }, false) => {
                column.values = raw_values.into_vec();
                column.meta.treat_as_categorical = false;
                log::debug!("{key} treated as numeric");
                self.touch();
                self.add_bin(key, None)
            }
            (encoding, _) => {
                column.encoding = encoding;
                Ok(())
            }
        }
    }

    /// Recomputes the reduced local importance columns.
    ///
    /// The new columns are fully computed before any existing column is
    /// replaced. Without local explanations this does nothing.
    ///
    /// # Errors
    ///
    /// Fails when `option` selects a class the explanation does not have.
    /// The previous columns are kept in that case.
    pub fn build_local_flatten_matrix(
        &mut self,
        option: WeightVectorOption,
    ) -> Result<(), JointDatasetError> {
        let Some(tensor) = &self.raw_local_importance else {
            log::debug!("no local explanations to reduce");
            return Ok(());
        };
        let reduced = local_importance::reduce(tensor, self.metadata.model_type, option)?;

        let columns = reduced
            .columns
            .into_iter()
            .zip(reduced.ranges)
            .enumerate()
            .map(|(feature, (values, range))| {
                let mut meta = ColumnMeta::numeric(
                    format!("Importance: {}", self.metadata.feature_name(feature)),
                    range,
                    ColumnCategory::Explanation,
                );
                meta.abridged_label = self.metadata.abridged_feature_name(feature);
                meta.index = Some(feature);
                (ColumnKey::LocalImportance(feature), meta, values)
            })
            .collect::<Vec<_>>();

        for (key, meta, values) in columns {
            self.push_column(key, meta, values);
        }
        self.weight_vector = option;
        self.touch();
        Ok(())
    }
}

fn check_row_counts(input: &JointDatasetInput) -> Result<usize, JointDatasetError> {
    let counts = [
        ("dataset", input.dataset.as_ref().map(Vec::len)),
        ("predictedY", input.predicted_y.as_ref().map(Vec::len)),
        (
            "predictedProbabilities",
            input.predicted_probabilities.as_ref().map(Vec::len),
        ),
        ("trueY", input.true_y.as_ref().map(Vec::len)),
        (
            "localExplanations",
            input
                .local_explanations
                .as_ref()
                .map(ImportanceTensor::row_count),
        ),
    ];
    let mut present = counts
        .into_iter()
        .filter_map(|(name, count)| count.map(|count| (name, count)));
    let Some((reference, expected)) = present.next() else {
        return Ok(0);
    };
    for (name, actual) in present {
        if actual != expected {
            return Err(JointDatasetError::DimensionMismatch {
                input: name,
                reference,
                expected,
                actual,
            });
        }
    }
    Ok(expected)
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn infer_class_count(
    predicted_y: Option<&[f64]>,
    true_y: Option<&[f64]>,
    probabilities: Option<&[Vec<f64>]>,
) -> usize {
    let from_labels = predicted_y
        .into_iter()
        .chain(true_y)
        .flatten()
        .copied()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .fold(0.0, f64::max);
    let from_labels = if predicted_y.is_some() || true_y.is_some() {
        from_labels as usize + 1
    } else {
        0
    };
    let from_probabilities = probabilities
        .and_then(|rows| rows.first())
        .map_or(0, Vec::len);
    from_labels.max(from_probabilities).max(2)
}

/// Replaces values with category indices into the sorted distinct values.
#[expect(clippy::cast_precision_loss)]
fn encode_categorical<'a, I>(values: I) -> (ColumnMeta, Vec<f64>)
where
    I: Iterator<Item = &'a DatasetValue> + Clone,
{
    let mut categories = values.clone().collect::<Vec<_>>();
    categories.sort_by(|a, b| a.category_cmp(b));
    categories.dedup_by(|a, b| a.category_cmp(b).is_eq());

    let indices = values
        .map(|value| {
            categories
                .binary_search_by(|category| category.category_cmp(value))
                .unwrap_or_else(|i| i) as f64
        })
        .collect();
    let labels = categories
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let max = categories.len().saturating_sub(1) as f64;
    let mut meta = ColumnMeta::categorical("", labels, ColumnCategory::Dataset);
    meta.feature_range = Some(FeatureRange::new(0.0, max, RangeType::Categorical));
    (meta, indices)
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn category_index(value: f64) -> Option<usize> {
    (value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}

#[expect(clippy::cast_precision_loss)]
fn project<I>(values: I, bin_edges: Option<&[f64]>) -> Vec<f64>
where
    I: Iterator<Item = f64>,
{
    match bin_edges {
        Some(edges) => values
            .map(|v| binning::bucket_index(edges, v) as f64)
            .collect(),
        None => values.collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use approx::assert_relative_eq;

    use super::*;

    fn scenario_input() -> JointDatasetInput {
        let dataset = vec![
            vec![DatasetValue::from(1.0), DatasetValue::from("A")],
            vec![DatasetValue::from(2.0), DatasetValue::from("B")],
            vec![DatasetValue::from(3.0), DatasetValue::from("A")],
        ];
        let mut metadata = ModelMetadata::infer(Some(&dataset[..]), ModelType::Binary, vec![]);
        metadata.class_names = vec!["No".to_owned(), "Yes".to_owned()];
        JointDatasetInput {
            dataset: Some(dataset),
            predicted_y: Some(vec![0.0, 1.0, 0.0]),
            true_y: Some(vec![0.0, 0.0, 1.0]),
            ..JointDatasetInput::new(metadata)
        }
    }

    fn options() -> JointDatasetOptions {
        JointDatasetOptions {
            dither_seed: Some(42),
            ..JointDatasetOptions::default()
        }
    }

    pub(crate) fn scenario_dataset() -> JointDataset {
        JointDataset::new(scenario_input(), options()).unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let jd = scenario_dataset();
        let meta = jd.meta(&ColumnKey::Data(1)).unwrap();
        assert_eq!(meta.sorted_categorical_values, ["A", "B"]);
        assert!(meta.is_categorical && meta.treat_as_categorical);
        assert_eq!(jd.value(0, &ColumnKey::Data(1)), Some(0.0));
        assert_eq!(jd.value(1, &ColumnKey::Data(1)), Some(1.0));
        assert_eq!(jd.value(2, &ColumnKey::Data(1)), Some(0.0));
        assert_eq!(
            jd.unwrap(&ColumnKey::ClassificationError, None).unwrap(),
            [0.0, 1.0, 2.0]
        );
        assert_eq!(
            jd.raw_value(1, &ColumnKey::ClassificationError),
            Some(CellValue::Category("False positive".to_owned()))
        );
        assert_eq!(
            jd.raw_value(1, &ColumnKey::Data(1)),
            Some(CellValue::Category("B".to_owned()))
        );
        assert!(jd.has_dataset() && jd.has_predicted_y() && jd.has_true_y());
        assert!(!jd.has_predicted_probabilities());
        assert!(!jd.has_local_explanations());
        assert_eq!(jd.dataset_feature_count(), 2);
        assert_eq!(jd.prediction_class_count(), 2);
        assert_eq!(jd.dataset_row_count(), 3);
    }

    #[test]
    fn test_rows_share_schema() {
        let jd = scenario_dataset();
        let first = jd.get_row(0).unwrap().into_keys().collect::<BTreeSet<_>>();
        for i in 1..jd.row_count() {
            let keys = jd.get_row(i).unwrap().into_keys().collect::<BTreeSet<_>>();
            assert_eq!(keys, first);
        }
        assert!(jd.get_row(jd.row_count()).is_none());
        assert!(first.contains(&ColumnKey::Index));
        assert!(first.contains(&ColumnKey::Dither));
        assert!(first.contains(&ColumnKey::Dither2));
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let mut input = scenario_input();
        input.true_y = Some(vec![0.0, 1.0]);
        let err = JointDataset::new(input, options()).unwrap_err();
        assert!(matches!(
            err,
            JointDatasetError::DimensionMismatch {
                input: "trueY",
                reference: "dataset",
                expected: 3,
                actual: 2
            }
        ));

        let mut input = scenario_input();
        input.local_explanations = Some(ImportanceTensor::PerRow(vec![vec![0.0, 0.0]; 4]));
        assert!(matches!(
            JointDataset::new(input, options()),
            Err(JointDatasetError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_text_in_numeric_column_is_rejected() {
        let mut input = scenario_input();
        input.metadata.feature_is_categorical = vec![false, false];
        assert!(matches!(
            JointDataset::new(input, options()),
            Err(JointDatasetError::NonNumericValue {
                column: 1,
                row: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_classification_error_encoding() {
        let truth = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        let predicted = [0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let mut input =
            JointDatasetInput::new(ModelMetadata::infer(None, ModelType::Binary, vec![]));
        input.true_y = Some(truth.to_vec());
        input.predicted_y = Some(predicted.to_vec());
        let jd = JointDataset::new(input, options()).unwrap();
        let errors = jd.unwrap(&ColumnKey::ClassificationError, None).unwrap();
        for ((error, t), p) in errors.iter().zip(truth).zip(predicted) {
            assert!([0.0, 1.0, 2.0, 3.0].contains(error));
            assert_eq!(*error, 2.0 * t + p);
        }
    }

    #[test]
    fn test_multiclass_error_is_misclassification_flag() {
        let mut input =
            JointDatasetInput::new(ModelMetadata::infer(None, ModelType::Multiclass, vec![]));
        input.true_y = Some(vec![0.0, 2.0, 1.0]);
        input.predicted_y = Some(vec![0.0, 1.0, 1.0]);
        let jd = JointDataset::new(input, options()).unwrap();
        assert_eq!(jd.prediction_class_count(), 3);
        assert_eq!(
            jd.unwrap(&ColumnKey::ClassificationError, None).unwrap(),
            [0.0, 1.0, 0.0]
        );
        let meta = jd.meta(&ColumnKey::PredictedY).unwrap();
        assert_eq!(
            meta.sorted_categorical_values,
            ["Class 0", "Class 1", "Class 2"]
        );
    }

    #[test]
    fn test_regression_outcomes() {
        let mut input =
            JointDatasetInput::new(ModelMetadata::infer(None, ModelType::Regression, vec![]));
        input.true_y = Some(vec![1.5, 4.0, 2.0]);
        input.predicted_y = Some(vec![1.0, 5.0, 2.0]);
        let jd = JointDataset::new(input, options()).unwrap();

        let meta = jd.meta(&ColumnKey::PredictedY).unwrap();
        assert!(!meta.is_categorical);
        let expected = FeatureRange::new(1.0, 5.0, RangeType::Numeric);
        assert_eq!(meta.feature_range, Some(expected));
        assert_eq!(
            jd.unwrap(&ColumnKey::RegressionError, None).unwrap(),
            [0.5, -1.0, 0.0]
        );
        assert!(jd.bins(&ColumnKey::RegressionError).is_some());
        assert!(!jd.contains_column(&ColumnKey::ClassificationError));
        assert_eq!(jd.prediction_class_count(), 0);
    }

    #[test]
    fn test_probability_columns() {
        let mut input = scenario_input();
        input.predicted_probabilities = Some(vec![vec![0.9, 0.1], vec![0.2, 0.8], vec![0.6, 0.4]]);
        let jd = JointDataset::new(input, options()).unwrap();
        let meta = jd.meta(&ColumnKey::ProbabilityClass(1)).unwrap();
        assert_eq!(meta.category, ColumnCategory::Outcome);
        assert!(!meta.is_categorical);
        let range = meta.feature_range.unwrap();
        assert_relative_eq!(range.min, 0.1);
        assert_relative_eq!(range.max, 0.8);
        assert!(jd.has_predicted_probabilities());

        let mut input = scenario_input();
        input.predicted_probabilities = Some(vec![vec![1.0]; 3]);
        assert!(matches!(
            JointDataset::new(input, options()),
            Err(JointDatasetError::ClassCountMismatch { .. })
        ));
    }

    #[test]
    fn test_dither_is_bounded_and_seeded() {
        let a = scenario_dataset();
        let b = scenario_dataset();
        let dither = a.unwrap(&ColumnKey::Dither, None).unwrap();
        let bound = -DITHER_BOUND..DITHER_BOUND;
        assert!(dither.iter().all(|d| bound.contains(d)));
        assert_eq!(dither, b.unwrap(&ColumnKey::Dither, None).unwrap());
        assert_ne!(dither, a.unwrap(&ColumnKey::Dither2, None).unwrap());
    }

    #[test]
    fn test_categorical_toggle_round_trip() {
        let values = [0.1, 2.75, 1e-9, 2.75, -3.0];
        let dataset = values
            .iter()
            .map(|&v| vec![DatasetValue::from(v)])
            .collect::<Vec<_>>();
        let metadata = ModelMetadata::infer(Some(&dataset[..]), ModelType::Regression, vec![]);
        let input = JointDatasetInput {
            dataset: Some(dataset),
            ..JointDatasetInput::new(metadata)
        };
        let mut jd = JointDataset::new(input, options()).unwrap();
        let key = ColumnKey::Data(0);

        jd.set_treat_as_categorical(key, true).unwrap();
        let meta = jd.meta(&key).unwrap();
        assert!(meta.treat_as_categorical && !meta.is_categorical);
        assert_eq!(
            meta.sorted_categorical_values,
            ["-3", "0.000000001", "0.1", "2.75"]
        );
        assert_eq!(jd.unwrap(&key, None).unwrap(), [2.0, 3.0, 1.0, 3.0, 0.0]);
        assert_eq!(jd.raw_value(1, &key), Some(CellValue::Number(2.75)));
        assert!(jd.bins(&key).is_none());

        // repeated request is a no-op
        let generation = jd.generation();
        jd.set_treat_as_categorical(key, true).unwrap();
        assert_eq!(jd.generation(), generation);

        jd.set_treat_as_categorical(key, false).unwrap();
        assert_eq!(jd.unwrap(&key, None).unwrap(), values);
        assert!(!jd.meta(&key).unwrap().treat_as_categorical);
        assert!(jd.bins(&key).is_some());
    }

    #[test]
    fn test_inherently_categorical_cannot_toggle() {
        let mut jd = scenario_dataset();
        assert!(matches!(
            jd.set_treat_as_categorical(ColumnKey::Data(1), false),
            Err(JointDatasetError::NotToggleable { .. })
        ));
        assert!(matches!(
            jd.set_treat_as_categorical(ColumnKey::Data(9), true),
            Err(JointDatasetError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_integer_bins_bounded_by_distinct_values() {
        let values = [4.0, 4.0, 7.0, 5.0, 7.0];
        let dataset = values
            .iter()
            .map(|&v| vec![DatasetValue::from(v)])
            .collect::<Vec<_>>();
        let metadata = ModelMetadata::infer(Some(&dataset[..]), ModelType::Regression, vec![]);
        let input = JointDatasetInput {
            dataset: Some(dataset),
            ..JointDatasetInput::new(metadata)
        };
        let mut jd = JointDataset::new(input, options()).unwrap();
        let key = ColumnKey::Data(0);

        let edges = jd.bins(&key).unwrap();
        assert!(edges.len() <= 3);
        assert_eq!(*edges.last().unwrap(), 7.0);
        assert_eq!(
            jd.meta(&key).unwrap().sorted_categorical_values.len(),
            edges.len()
        );

        jd.add_bin(key, Some(2)).unwrap();
        assert_eq!(jd.bins(&key).unwrap().len(), 2);
        let binned = jd.unwrap(&key, jd.bins(&key)).unwrap();
        assert!(binned.iter().all(|&b| b == 0.0 || b == 1.0));
    }

    fn single_feature_input(range: Option<FeatureRange>) -> JointDatasetInput {
        let dataset = [1.0, 2.0, 3.0]
            .iter()
            .map(|&v| vec![DatasetValue::from(v)])
            .collect::<Vec<_>>();
        let mut metadata = ModelMetadata::infer(Some(&dataset[..]), ModelType::Regression, vec![]);
        metadata.feature_ranges = vec![range];
        JointDatasetInput {
            dataset: Some(dataset),
            ..JointDatasetInput::new(metadata)
        }
    }

    #[test]
    fn test_metadata_range_drives_default_bins() {
        let range = FeatureRange::new(0.0, 10.0, RangeType::Numeric);
        let jd = JointDataset::new(single_feature_input(Some(range)), options()).unwrap();
        let key = ColumnKey::Data(0);

        assert_eq!(jd.meta(&key).unwrap().feature_range, Some(range));
        assert_eq!(jd.bins(&key).unwrap(), [2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(jd.meta(&key).unwrap().sorted_categorical_values[0], "0 - 2");
        assert_eq!(jd.unwrap(&key, jd.bins(&key)).unwrap(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_missing_or_categorical_range_falls_back_to_values() {
        let categorical = FeatureRange::new(0.0, 10.0, RangeType::Categorical);
        for range in [None, Some(categorical)] {
            let jd = JointDataset::new(single_feature_input(range), options()).unwrap();
            let key = ColumnKey::Data(0);

            let meta = jd.meta(&key).unwrap();
            let expected = FeatureRange::new(1.0, 3.0, RangeType::Integer);
            assert_eq!(meta.feature_range, Some(expected));
            assert!(!meta.treat_as_categorical);
            assert_eq!(jd.bins(&key).unwrap(), [1.0, 2.0, 3.0]);
            assert_eq!(meta.sorted_categorical_values, ["1", "2", "3"]);
        }
    }

    #[test]
    fn test_categorical_column_is_not_binnable() {
        let mut jd = scenario_dataset();
        assert!(matches!(
            jd.add_bin(ColumnKey::Data(1), None),
            Err(JointDatasetError::NotBinnable { .. })
        ));
        assert!(matches!(
            jd.add_bin(ColumnKey::PredictedY, None),
            Err(JointDatasetError::NotBinnable { .. })
        ));
    }

    #[test]
    fn test_local_importance_reprojection_overwrites() {
        let mut input = JointDatasetInput::new(ModelMetadata::infer(
            None,
            ModelType::Multiclass,
            vec!["a".into(), "b".into(), "c".into()],
        ));
        input.local_explanations = Some(ImportanceTensor::PerClass(vec![
            vec![vec![1.0, -2.0]],
            vec![vec![-3.0, 4.0]],
            vec![vec![5.0, 0.0]],
        ]));
        let mut jd = JointDataset::new(input, options()).unwrap();
        assert_eq!(jd.local_explanation_feature_count(), 2);
        assert_eq!(jd.weight_vector(), WeightVectorOption::AbsAvg);
        assert_relative_eq!(jd.value(0, &ColumnKey::LocalImportance(0)).unwrap(), 3.0);

        let column_count = jd.columns().count();
        jd.build_local_flatten_matrix(WeightVectorOption::Equal)
            .unwrap();
        assert_eq!(jd.columns().count(), column_count);
        assert_relative_eq!(jd.value(0, &ColumnKey::LocalImportance(0)).unwrap(), 1.0);
        let second = jd.value(0, &ColumnKey::LocalImportance(1)).unwrap();
        assert_relative_eq!(second, 2.0 / 3.0);

        jd.build_local_flatten_matrix(WeightVectorOption::Class(2))
            .unwrap();
        assert_eq!(jd.value(0, &ColumnKey::LocalImportance(0)), Some(5.0));

        let result = jd.build_local_flatten_matrix(WeightVectorOption::Class(7));
        assert!(result.is_err());
        assert_eq!(jd.value(0, &ColumnKey::LocalImportance(0)), Some(5.0));
        assert_eq!(jd.weight_vector(), WeightVectorOption::Class(2));
        assert_eq!(
            jd.meta(&ColumnKey::LocalImportance(1)).unwrap().category,
            ColumnCategory::Explanation
        );
    }

    #[test]
    fn test_reprojection_without_explanations_is_noop() {
        let mut jd = scenario_dataset();
        let generation = jd.generation();
        jd.build_local_flatten_matrix(WeightVectorOption::Equal)
            .unwrap();
        assert_eq!(jd.generation(), generation);
        assert!(jd.feature_average_importance(&[0, 1, 2]).is_empty());
    }

    #[test]
    fn test_feature_average_importance() {
        let mut input = scenario_input();
        input.local_explanations = Some(ImportanceTensor::PerClass(vec![vec![
            vec![1.0, -1.0],
            vec![-3.0, 0.0],
            vec![5.0, 2.0],
        ]]));
        let jd = JointDataset::new(input, options()).unwrap();
        assert_eq!(jd.feature_average_importance(&[0, 1]), [2.0, 0.5]);
        assert_eq!(jd.local_importance_keys().count(), 2);
    }

    #[test]
    fn test_unwrap_unknown_column() {
        let jd = scenario_dataset();
        assert!(matches!(
            jd.unwrap(&ColumnKey::RegressionError, None),
            Err(JointDatasetError::UnknownColumn { .. })
        ));
    }
}
