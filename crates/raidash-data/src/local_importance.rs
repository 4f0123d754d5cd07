//! Reduction of per-class local importances
//!
//! Explainers of classifiers produce one importance per class, row and
//! feature. Charts need a single importance per row and feature, so the
//! per-class vector is collapsed according to a [`WeightVectorOption`]:
//!
//! - [`WeightVectorOption::Equal`]: mean across classes
//! - [`WeightVectorOption::AbsAvg`]: mean of absolute values across classes
//! - [`WeightVectorOption::Class`]: the value of one class
//!
//! Regressors have nothing to reduce. Binary classifiers use the first class
//! slice, since binary importances are symmetric.
//!
//! ```
//! use raidash_data::{ImportanceTensor, ModelType, WeightVectorOption, local_importance};
//!
//! let tensor = ImportanceTensor::PerClass(vec![
//!     vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
//!     vec![vec![10.0, 20.0], vec![30.0, 40.0], vec![50.0, 60.0]],
//! ]);
//! let option = WeightVectorOption::Equal;
//! let reduced = local_importance::reduce(&tensor, ModelType::Multiclass, option).unwrap();
//! assert_eq!(reduced.columns[0][0], 5.5);
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    column::{FeatureRange, RangeType},
    input::{ImportanceTensor, ModelType},
};

/// Strategy for collapsing a per-class importance vector into one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightVectorOption {
    Equal,
    #[default]
    AbsAvg,
    Class(usize),
}

impl WeightVectorOption {
    fn reduce(self, class_values: &[f64]) -> f64 {
        match self {
            Self::Equal => raidash_stats::metrics::mean(class_values.iter().copied()),
            Self::AbsAvg => raidash_stats::metrics::mean(class_values.iter().map(|v| v.abs())),
            Self::Class(class) => class_values.get(class).copied().unwrap_or(f64::NAN),
        }
    }
}

impl fmt::Display for WeightVectorOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => f.write_str("equal"),
            Self::AbsAvg => f.write_str("abs-avg"),
            Self::Class(class) => write!(f, "{class}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid weight vector option '{value}' (expected 'equal', 'abs-avg' or a class index)")]
pub struct WeightVectorParseError {
    pub value: String,
}

impl FromStr for WeightVectorOption {
    type Err = WeightVectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "abs-avg" | "absAvg" => Ok(Self::AbsAvg),
            _ => match s.parse() {
                Ok(class) => Ok(Self::Class(class)),
                Err(_) => Err(WeightVectorParseError {
                    value: s.to_owned(),
                }),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ReduceImportanceError {
    #[display("class {class} requested but the explanation has {class_count} classes")]
    ClassOutOfRange { class: usize, class_count: usize },
    #[display("explanation class {class} has {actual} rows, expected {expected}")]
    RowCountMismatch {
        class: usize,
        expected: usize,
        actual: usize,
    },
    #[display("explanation row {row} of class {class} has {actual} features, expected {expected}")]
    FeatureCountMismatch {
        class: usize,
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Local importance reduced to one value per row and feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedImportance {
    /// Feature-major values: `columns[feature][row]`.
    pub columns: Vec<Vec<f64>>,
    /// Observed range of each feature's values.
    pub ranges: Vec<FeatureRange>,
}

/// Checks that every class slice has the same number of rows and every row
/// the same number of features.
pub fn validate(tensor: &ImportanceTensor) -> Result<(), ReduceImportanceError> {
    let row_count = tensor.row_count();
    let feature_count = tensor.feature_count();
    for class in 0..tensor.class_count() {
        let rows = tensor.class_slice(class).unwrap_or_default();
        if rows.len() != row_count {
            return Err(ReduceImportanceError::RowCountMismatch {
                class,
                expected: row_count,
                actual: rows.len(),
            });
        }
        if let Some((row, values)) = rows
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != feature_count)
        {
            return Err(ReduceImportanceError::FeatureCountMismatch {
                class,
                row,
                expected: feature_count,
                actual: values.len(),
            });
        }
    }
    Ok(())
}

/// Reduces a raw importance tensor to `[feature][row]` values.
///
/// Only multiclass per-class tensors are reduced with `option`; every other
/// shape uses the first class slice as is.
pub fn reduce(
    tensor: &ImportanceTensor,
    model_type: ModelType,
    option: WeightVectorOption,
) -> Result<ReducedImportance, ReduceImportanceError> {
    validate(tensor)?;

    let row_count = tensor.row_count();
    let feature_count = tensor.feature_count();
    let class_count = tensor.class_count();
    let reduce_classes = model_type.is_multiclass() && class_count > 1;

    if reduce_classes
        && let WeightVectorOption::Class(class) = option
        && class >= class_count
    {
        let error = ReduceImportanceError::ClassOutOfRange { class, class_count };
        return Err(error);
    }

    let slice_count = if reduce_classes { class_count } else { 1 };
    let slices = (0..slice_count)
        .filter_map(|class| tensor.class_slice(class))
        .collect::<Vec<_>>();

    let mut columns = vec![Vec::with_capacity(row_count); feature_count];
    let mut bounds = vec![(f64::INFINITY, f64::NEG_INFINITY); feature_count];
    let mut class_values = Vec::with_capacity(slices.len());
    for row in 0..row_count {
        for (feature, column) in columns.iter_mut().enumerate() {
            let value = if reduce_classes {
                class_values.clear();
                class_values.extend(slices.iter().map(|rows| rows[row][feature]));
                option.reduce(&class_values)
            } else {
                slices[0][row][feature]
            };
            let (min, max) = &mut bounds[feature];
            *min = min.min(value);
            *max = max.max(value);
            column.push(value);
        }
    }

    let ranges = bounds
        .into_iter()
        .map(|(min, max)| {
            if min > max {
                FeatureRange::new(0.0, 0.0, RangeType::Numeric)
            } else {
                FeatureRange::new(min, max, RangeType::Numeric)
            }
        })
        .collect();

    log::debug!(
        "reduced {row_count}x{feature_count} importances over {class_count} classes ({option})"
    );
    Ok(ReducedImportance { columns, ranges })
}
