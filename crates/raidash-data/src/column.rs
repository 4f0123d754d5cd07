//! Column keys and per-column metadata
//!
//! Every column of the [`JointDataset`](crate::JointDataset) is addressed by a
//! [`ColumnKey`]. The key set is closed: fixed roles (index, predictions, ...)
//! plus indexed families for dataset features, class probabilities and local
//! importances. Keys round-trip through their string form (`"Data0"`,
//! `"ProbabilityClass1"`, ...), which is also their serialized form.
//!
//! ```
//! use raidash_data::ColumnKey;
//!
//! let key: ColumnKey = "LocalImportance3".parse().unwrap();
//! assert_eq!(key, ColumnKey::LocalImportance(3));
//! assert_eq!(key.to_string(), "LocalImportance3");
//! ```

use std::str::FromStr;

use raidash_stats::descriptive;
use serde::{Deserialize, Serialize};

/// Identifies a column of the joint dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnKey {
    #[display("Index")]
    Index,
    #[display("Dither")]
    Dither,
    #[display("Dither2")]
    Dither2,
    #[display("Data{_0}")]
    Data(usize),
    #[display("PredictedY")]
    PredictedY,
    #[display("TrueY")]
    TrueY,
    #[display("ProbabilityClass{_0}")]
    ProbabilityClass(usize),
    #[display("ClassificationError")]
    ClassificationError,
    #[display("RegressionError")]
    RegressionError,
    #[display("LocalImportance{_0}")]
    LocalImportance(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown column key '{key}'")]
pub struct ColumnKeyParseError {
    pub key: String,
}

impl FromStr for ColumnKey {
    type Err = ColumnKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fixed = match s {
            "Index" => Some(Self::Index),
            "Dither" => Some(Self::Dither),
            "Dither2" => Some(Self::Dither2),
            "PredictedY" => Some(Self::PredictedY),
            "TrueY" => Some(Self::TrueY),
            "ClassificationError" => Some(Self::ClassificationError),
            "RegressionError" => Some(Self::RegressionError),
            _ => None,
        };
        if let Some(key) = fixed {
            return Ok(key);
        }

        let indexed: [(&str, fn(usize) -> Self); 3] = [
            ("ProbabilityClass", Self::ProbabilityClass),
            ("LocalImportance", Self::LocalImportance),
            ("Data", Self::Data),
        ];
        indexed
            .iter()
            .find_map(|(prefix, make)| {
                let digits = s.strip_prefix(prefix)?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok().map(make)
            })
            .ok_or_else(|| ColumnKeyParseError { key: s.to_owned() })
    }
}

impl TryFrom<String> for ColumnKey {
    type Error = ColumnKeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnKey> for String {
    fn from(value: ColumnKey) -> Self {
        value.to_string()
    }
}

/// Semantic role of a column, used for grouping in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCategory {
    Outcome,
    Dataset,
    Index,
    Explanation,
    Cohort,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum RangeType {
    Integer,
    Numeric,
    Categorical,
}

/// Value range of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
    pub range_type: RangeType,
}

impl FeatureRange {
    #[must_use]
    pub fn new(min: f64, max: f64, range_type: RangeType) -> Self {
        Self {
            min,
            max,
            range_type,
        }
    }

    /// Builds a range spanning the given values.
    ///
    /// The range is [`RangeType::Integer`] when every value is a whole
    /// number and `integer_allowed` is set. An empty input yields `[0, 0]`.
    #[must_use]
    pub fn spanning<I>(values: I, integer_allowed: bool) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut all_integral = true;
        let values = values
            .into_iter()
            .inspect(|v| all_integral &= v.fract() == 0.0);
        let (min, max) = descriptive::min_max(values).unwrap_or((0.0, 0.0));
        let range_type = if integer_allowed && all_integral {
            RangeType::Integer
        } else {
            RangeType::Numeric
        };
        Self::new(min, max, range_type)
    }
}

/// Descriptor of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMeta {
    pub label: String,
    pub abridged_label: String,
    /// Whether the source values are inherently categorical. Never changes.
    pub is_categorical: bool,
    /// Whether the column is currently displayed and filtered as categorical.
    pub treat_as_categorical: bool,
    /// Labels indexed by the values stored in categorical columns, or bucket
    /// labels for binned numeric columns.
    pub sorted_categorical_values: Vec<String>,
    pub feature_range: Option<FeatureRange>,
    pub category: ColumnCategory,
    /// Original position of a dataset feature.
    pub index: Option<usize>,
}

impl ColumnMeta {
    pub(crate) fn numeric(
        label: impl Into<String>,
        range: FeatureRange,
        category: ColumnCategory,
    ) -> Self {
        let label = label.into();
        Self {
            abridged_label: label.clone(),
            label,
            is_categorical: false,
            treat_as_categorical: false,
            sorted_categorical_values: vec![],
            feature_range: Some(range),
            category,
            index: None,
        }
    }

    pub(crate) fn categorical(
        label: impl Into<String>,
        categories: Vec<String>,
        category: ColumnCategory,
    ) -> Self {
        let label = label.into();
        Self {
            abridged_label: label.clone(),
            label,
            is_categorical: true,
            treat_as_categorical: true,
            sorted_categorical_values: categories,
            feature_range: None,
            category,
            index: None,
        }
    }

    /// Returns `true` if the range is integer-typed.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.feature_range
            .is_some_and(|range| range.range_type == RangeType::Integer)
    }
}
