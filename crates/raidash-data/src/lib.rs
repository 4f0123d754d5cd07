//! Joint dataset and cohort engine for the model-inspection dashboard.
//!
//! This crate turns precomputed model outputs into one uniform table and
//! slices that table into named cohorts:
//!
//! - **Joint dataset**: features, predictions, class probabilities, ground
//!   truth, derived error columns and reduced local importances, addressed by
//!   [`ColumnKey`]
//! - **Binning and categorical toggle**: display buckets for numeric columns
//!   and reversible conversion of numeric columns to category indices
//! - **Local importance reduction**: collapsing per-class importances with a
//!   [`WeightVectorOption`]
//! - **Cohorts**: filtered, sortable row views sharing one dataset, optionally
//!   annotated with error statistics
//!
//! # Modules
//!
//! - [`column`]: Column keys and column metadata
//! - [`input`]: Construction input and model metadata
//! - [`joint_dataset`]: The row store and its read/mutation interface
//! - [`local_importance`]: Per-class importance reduction
//! - [`filter`]: Filter predicates and boolean filter trees
//! - [`cohort`]: Filtered views over a shared dataset
//! - [`error_cohort`]: Cohorts with coverage and metric statistics
//!
//! # Examples
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use raidash_data::{
//!     Cohort, CohortSource, ColumnKey, DatasetValue, ErrorCohort, Filter, FilterMethod,
//!     JointDataset, JointDatasetInput, JointDatasetOptions, ModelMetadata, ModelType,
//! };
//!
//! let dataset = vec![
//!     vec![DatasetValue::from(1.0), DatasetValue::from("A")],
//!     vec![DatasetValue::from(2.0), DatasetValue::from("B")],
//!     vec![DatasetValue::from(3.0), DatasetValue::from("A")],
//! ];
//! let metadata = ModelMetadata::infer(Some(&dataset[..]), ModelType::Binary, vec![]);
//! let input = JointDatasetInput {
//!     dataset: Some(dataset),
//!     predicted_y: Some(vec![0.0, 1.0, 0.0]),
//!     true_y: Some(vec![0.0, 0.0, 1.0]),
//!     ..JointDatasetInput::new(metadata)
//! };
//! let jd = JointDataset::new(input, JointDatasetOptions::default()).unwrap();
//!
//! // true negative, false positive, false negative
//! assert_eq!(jd.unwrap(&ColumnKey::ClassificationError, None).unwrap(), [0.0, 1.0, 2.0]);
//! assert_eq!(jd.meta(&ColumnKey::Data(1)).unwrap().sorted_categorical_values, ["A", "B"]);
//!
//! let jd = Rc::new(RefCell::new(jd));
//! let filter = Filter::new(ColumnKey::Data(0), FilterMethod::GreaterThan, [1.0]);
//! let cohort = Cohort::new("Data0 > 1", jd, vec![filter], vec![]).unwrap();
//! assert_eq!(cohort.filtered_data(), [1, 2]);
//!
//! let error_cohort = ErrorCohort::new(cohort, CohortSource::ManuallyCreated, None).unwrap();
//! assert_eq!(error_cohort.stats().error_coverage, 100.0);
//! ```

pub use self::{
    cohort::{Cohort, SharedJointDataset},
    column::{ColumnCategory, ColumnKey, ColumnKeyParseError, ColumnMeta, FeatureRange, RangeType},
    error_cohort::{CohortSource, ErrorCohort, MetricCohortStats, MetricError, MetricKind},
    filter::{CompositeFilter, Filter, FilterError, FilterMethod, FilterOperation},
    input::{
        DatasetValue, ImportanceTensor, JointDatasetInput, JointDatasetOptions, ModelMetadata,
        ModelType,
    },
    joint_dataset::{CellValue, JointDataset, JointDatasetError, Row},
    local_importance::{ReduceImportanceError, WeightVectorOption, WeightVectorParseError},
};

pub mod cohort;
pub mod column;
pub mod error_cohort;
pub mod filter;
pub mod input;
pub mod joint_dataset;
pub mod local_importance;
