//! Filter predicates over joint dataset columns
//!
//! A [`Filter`] compares one column of a row against its argument list. A
//! [`CompositeFilter`] combines filters into an AND/OR tree. Both serialize
//! to the JSON shape used by saved cohort definitions:
//!
//! ```
//! use raidash_data::{ColumnKey, CompositeFilter, FilterMethod};
//!
//! let filter: CompositeFilter = serde_json::from_str(
//!     r#"{
//!         "operation": "or",
//!         "compositeFilters": [
//!             { "column": "Data0", "method": "greaterThan", "arg": [1] },
//!             { "column": "Data1", "method": "includes", "arg": [0, 2] }
//!         ]
//!     }"#,
//! )
//! .unwrap();
//! let CompositeFilter::Group { filters, .. } = &filter else { panic!() };
//! let CompositeFilter::Leaf(first) = &filters[0] else { panic!() };
//! assert_eq!(first.column, ColumnKey::Data(0));
//! assert_eq!(first.method, FilterMethod::GreaterThan);
//! ```

use serde::{Deserialize, Serialize};

use crate::{column::ColumnKey, joint_dataset::JointDataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "camelCase")]
pub enum FilterMethod {
    Equal,
    GreaterThan,
    GreaterThanEqualTo,
    LessThan,
    LessThanEqualTo,
    InTheRangeOf,
    Includes,
}

impl FilterMethod {
    /// Required argument count, or `None` for any count.
    #[must_use]
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::Equal
            | Self::GreaterThan
            | Self::GreaterThanEqualTo
            | Self::LessThan
            | Self::LessThanEqualTo => Some(1),
            Self::InTheRangeOf => Some(2),
            Self::Includes => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum FilterError {
    #[display("filter references unknown column '{column}'")]
    UnknownColumn { column: ColumnKey },
    #[display("filter {method} on '{column}' takes {expected} arguments, got {actual}")]
    InvalidArity {
        column: ColumnKey,
        method: FilterMethod,
        expected: usize,
        actual: usize,
    },
    #[display("no filter at position {index} (cohort has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A single-column predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: ColumnKey,
    pub method: FilterMethod,
    pub arg: Vec<f64>,
}

impl Filter {
    #[must_use]
    pub fn new(column: ColumnKey, method: FilterMethod, arg: impl Into<Vec<f64>>) -> Self {
        Self {
            column,
            method,
            arg: arg.into(),
        }
    }

    /// Checks that the column exists and the argument count fits the method.
    pub fn validate(&self, dataset: &JointDataset) -> Result<(), FilterError> {
        if !dataset.contains_column(&self.column) {
            return Err(FilterError::UnknownColumn {
                column: self.column,
            });
        }
        match self.method.arity() {
            Some(expected) if expected != self.arg.len() => Err(FilterError::InvalidArity {
                column: self.column,
                method: self.method,
                expected,
                actual: self.arg.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Applies the predicate to a stored column value.
    ///
    /// A filter missing a required argument matches nothing.
    #[expect(clippy::float_cmp)]
    #[must_use]
    pub fn test(&self, value: f64) -> bool {
        let arg = &self.arg;
        let (first, second) = (arg.first().copied(), arg.get(1).copied());
        match (self.method, first, second) {
            (FilterMethod::Equal, Some(a), _) => value == a,
            (FilterMethod::GreaterThan, Some(a), _) => value > a,
            (FilterMethod::GreaterThanEqualTo, Some(a), _) => value >= a,
            (FilterMethod::LessThan, Some(a), _) => value < a,
            (FilterMethod::LessThanEqualTo, Some(a), _) => value <= a,
            (FilterMethod::InTheRangeOf, Some(lo), Some(hi)) => lo <= value && value <= hi,
            (FilterMethod::Includes, _, _) => arg.contains(&value),
            _ => false,
        }
    }

    /// Applies the predicate to one row of `dataset`. Rows never match a
    /// column the dataset does not have.
    #[must_use]
    pub fn matches(&self, dataset: &JointDataset, row: usize) -> bool {
        dataset
            .value(row, &self.column)
            .is_some_and(|value| self.test(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperation {
    And,
    Or,
}

/// A boolean tree of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompositeFilter {
    Group {
        operation: FilterOperation,
        #[serde(rename = "compositeFilters")]
        filters: Vec<CompositeFilter>,
    },
    Leaf(Filter),
}

impl CompositeFilter {
    #[must_use]
    pub fn and(filters: Vec<CompositeFilter>) -> Self {
        Self::Group {
            operation: FilterOperation::And,
            filters,
        }
    }

    #[must_use]
    pub fn or(filters: Vec<CompositeFilter>) -> Self {
        Self::Group {
            operation: FilterOperation::Or,
            filters,
        }
    }

    /// Validates every leaf of the tree.
    pub fn validate(&self, dataset: &JointDataset) -> Result<(), FilterError> {
        match self {
            Self::Leaf(filter) => filter.validate(dataset),
            Self::Group { filters, .. } => filters.iter().try_for_each(|f| f.validate(dataset)),
        }
    }

    /// Evaluates the tree on one row. An empty AND group matches every row,
    /// an empty OR group matches none.
    #[must_use]
    pub fn matches(&self, dataset: &JointDataset, row: usize) -> bool {
        match self {
            Self::Leaf(filter) => filter.matches(dataset, row),
            Self::Group {
                operation: FilterOperation::And,
                filters,
            } => filters.iter().all(|f| f.matches(dataset, row)),
            Self::Group {
                operation: FilterOperation::Or,
                filters,
            } => filters.iter().any(|f| f.matches(dataset, row)),
        }
    }
}

impl From<Filter> for CompositeFilter {
    fn from(filter: Filter) -> Self {
        Self::Leaf(filter)
    }
}

/// Returns the rows matching every filter and every composite filter, in
/// ascending row order.
#[must_use]
pub fn apply_filters(
    dataset: &JointDataset,
    filters: &[Filter],
    composite_filters: &[CompositeFilter],
) -> Vec<usize> {
    (0..dataset.row_count())
        .filter(|&row| {
            filters.iter().all(|f| f.matches(dataset, row))
                && composite_filters.iter().all(|f| f.matches(dataset, row))
        })
        .collect()
}
