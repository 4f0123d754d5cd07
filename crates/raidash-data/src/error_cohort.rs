//! Cohorts annotated with error statistics
//!
//! An [`ErrorCohort`] pairs a [`Cohort`] with a [`MetricCohortStats`]
//! summary used to compare cohorts: how many of the model's errors fall into
//! the cohort (coverage), how often the model errs inside it (error rate),
//! and one selectable performance metric.

use serde::{Deserialize, Serialize};

use raidash_stats::metrics::{self, BinaryConfusion};

use crate::{cohort::Cohort, column::ColumnKey, input::ModelType, joint_dataset::JointDataset};

/// Where a cohort definition came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(derive_more::Display)]
#[serde(rename_all = "camelCase")]
pub enum CohortSource {
    #[default]
    None,
    TreeMap,
    HeatMap,
    ManuallyCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    ErrorRate,
    Accuracy,
    Precision,
    Recall,
    F1Score,
    MeanSquaredError,
    MeanAbsoluteError,
    MeanPrediction,
}

impl MetricKind {
    /// Default metric for a model type.
    #[must_use]
    pub fn default_for(model_type: ModelType) -> Self {
        if model_type.is_classifier() {
            Self::ErrorRate
        } else {
            Self::MeanSquaredError
        }
    }

    fn supports(self, model_type: ModelType) -> bool {
        match self {
            Self::ErrorRate | Self::Accuracy => model_type.is_classifier(),
            Self::Precision | Self::Recall | Self::F1Score => model_type.is_binary(),
            Self::MeanSquaredError | Self::MeanAbsoluteError => model_type.is_regression(),
            Self::MeanPrediction => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MetricError {
    #[display("metric requires predictions")]
    MissingPredictions,
    #[display("metric {metric} requires true labels")]
    MissingTrueY { metric: MetricKind },
    #[display("metric {metric} is not defined for {model_type} models")]
    UnsupportedMetric {
        metric: MetricKind,
        model_type: ModelType,
    },
}

/// Error statistics of a cohort relative to the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCohortStats {
    pub total_cohort: usize,
    pub total_all: usize,
    pub metric_kind: MetricKind,
    pub metric_value: f64,
    /// Percentage of all errors that fall into the cohort.
    pub error_coverage: f64,
    /// Percentage of misclassified rows for classifiers, mean squared error
    /// for regressors.
    pub error_rate: f64,
}

impl MetricCohortStats {
    /// Computes the statistics of the rows `rows` of `dataset`.
    ///
    /// Without true labels only [`MetricKind::MeanPrediction`] is available
    /// and the error fields are zero.
    ///
    /// # Errors
    ///
    /// Fails when the dataset lacks predictions or true labels the metric
    /// needs, or the metric does not apply to the model type.
    pub fn compute(
        dataset: &JointDataset,
        rows: &[usize],
        metric_kind: MetricKind,
    ) -> Result<Self, MetricError> {
        let model_type = dataset.model_type();
        if !metric_kind.supports(model_type) {
            return Err(MetricError::UnsupportedMetric {
                metric: metric_kind,
                model_type,
            });
        }
        let predicted = dataset
            .column_values(&ColumnKey::PredictedY)
            .ok_or(MetricError::MissingPredictions)?;
        let truth = dataset.column_values(&ColumnKey::TrueY);

        let mut stats = Self {
            total_cohort: rows.len(),
            total_all: dataset.row_count(),
            metric_kind,
            metric_value: 0.0,
            error_coverage: 0.0,
            error_rate: 0.0,
        };

        let Some(truth) = truth else {
            if metric_kind != MetricKind::MeanPrediction {
                return Err(MetricError::MissingTrueY {
                    metric: metric_kind,
                });
            }
            stats.metric_value = metrics::mean(rows.iter().map(|&row| predicted[row]));
            return Ok(stats);
        };

        let pairs = || rows.iter().map(|&row| (truth[row], predicted[row]));
        if model_type.is_classifier() {
            #[expect(clippy::float_cmp)]
            let is_incorrect = |row: usize| truth[row] != predicted[row];
            let cohort_incorrect = rows.iter().filter(|&&row| is_incorrect(row)).count();
            let total_incorrect = (0..dataset.row_count())
                .filter(|&row| is_incorrect(row))
                .count();
            stats.error_rate = percentage(cohort_incorrect, rows.len());
            stats.error_coverage = percentage(cohort_incorrect, total_incorrect);
        } else {
            let squared_error = |row: usize| (truth[row] - predicted[row]).powi(2);
            let cohort_error = rows.iter().map(|&row| squared_error(row)).sum::<f64>();
            let total_error = (0..dataset.row_count()).map(squared_error).sum::<f64>();
            stats.error_coverage = if total_error == 0.0 {
                0.0
            } else {
                100.0 * cohort_error / total_error
            };
            stats.error_rate = metrics::mean_squared_error(pairs());
        }

        stats.metric_value = match metric_kind {
            MetricKind::ErrorRate => stats.error_rate,
            MetricKind::Accuracy => metrics::accuracy(pairs()),
            MetricKind::Precision => BinaryConfusion::from_pairs(pairs()).precision(),
            MetricKind::Recall => BinaryConfusion::from_pairs(pairs()).recall(),
            MetricKind::F1Score => BinaryConfusion::from_pairs(pairs()).f1_score(),
            MetricKind::MeanSquaredError => metrics::mean_squared_error(pairs()),
            MetricKind::MeanAbsoluteError => metrics::mean_absolute_error(pairs()),
            MetricKind::MeanPrediction => metrics::mean(rows.iter().map(|&row| predicted[row])),
        };
        Ok(stats)
    }
}

#[expect(clippy::cast_precision_loss)]
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// A cohort with error statistics.
#[derive(Debug)]
pub struct ErrorCohort {
    cohort: Cohort,
    source: CohortSource,
    stats: MetricCohortStats,
}

impl ErrorCohort {
    /// Computes the statistics of `cohort` with `metric_kind`, or the model
    /// type's default metric.
    ///
    /// # Errors
    ///
    /// See [`MetricCohortStats::compute`].
    pub fn new(
        cohort: Cohort,
        source: CohortSource,
        metric_kind: Option<MetricKind>,
    ) -> Result<Self, MetricError> {
        let stats = {
            let jd = cohort.dataset().borrow();
            let model_type = jd.model_type();
            let metric_kind = metric_kind.unwrap_or_else(|| MetricKind::default_for(model_type));
            MetricCohortStats::compute(&jd, cohort.filtered_data(), metric_kind)?
        };
        Ok(Self {
            cohort,
            source,
            stats,
        })
    }

    #[must_use]
    pub fn cohort(&self) -> &Cohort {
        &self.cohort
    }

    /// Mutable access to the cohort. Call [`ErrorCohort::refresh`] after
    /// changing its filters.
    pub fn cohort_mut(&mut self) -> &mut Cohort {
        &mut self.cohort
    }

    #[must_use]
    pub fn source(&self) -> CohortSource {
        self.source
    }

    #[must_use]
    pub fn stats(&self) -> &MetricCohortStats {
        &self.stats
    }

    /// Refreshes the cohort and recomputes the statistics.
    ///
    /// # Errors
    ///
    /// See [`MetricCohortStats::compute`].
    pub fn refresh(&mut self) -> Result<(), MetricError> {
        self.cohort.refresh();
        let jd = self.cohort.dataset().borrow();
        self.stats =
            MetricCohortStats::compute(&jd, self.cohort.filtered_data(), self.stats.metric_kind)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        filter::{Filter, FilterMethod},
        input::{JointDatasetInput, JointDatasetOptions, ModelMetadata},
        joint_dataset::tests::scenario_dataset,
    };

    fn regression_dataset() -> JointDataset {
        let mut input =
            JointDatasetInput::new(ModelMetadata::infer(None, ModelType::Regression, vec![]));
        input.true_y = Some(vec![1.0, 2.0, 3.0, 4.0]);
        input.predicted_y = Some(vec![1.0, 3.0, 1.0, 4.0]);
        let options = JointDatasetOptions {
            dither_seed: Some(1),
            ..JointDatasetOptions::default()
        };
        JointDataset::new(input, options).unwrap()
    }

    #[test]
    fn test_classification_stats() {
        // truth [0, 0, 1], predicted [0, 1, 0]: rows 1 and 2 are wrong
        let jd = Rc::new(RefCell::new(scenario_dataset()));
        let filter = Filter::new(ColumnKey::Data(0), FilterMethod::GreaterThan, [1.0]);
        let cohort = Cohort::new("gt1", jd, vec![filter], vec![]).unwrap();
        let error_cohort = ErrorCohort::new(cohort, CohortSource::ManuallyCreated, None).unwrap();

        let stats = error_cohort.stats();
        assert_eq!(stats.metric_kind, MetricKind::ErrorRate);
        assert_eq!((stats.total_cohort, stats.total_all), (2, 3));
        assert_relative_eq!(stats.error_rate, 100.0);
        assert_relative_eq!(stats.error_coverage, 100.0);
        assert_relative_eq!(stats.metric_value, 100.0);
        assert_eq!(error_cohort.source(), CohortSource::ManuallyCreated);
    }

    #[test]
    fn test_binary_metrics() {
        let jd = scenario_dataset();
        let rows = [0, 1, 2];
        let precision = MetricCohortStats::compute(&jd, &rows, MetricKind::Precision).unwrap();
        assert_relative_eq!(precision.metric_value, 0.0);
        let accuracy = MetricCohortStats::compute(&jd, &rows, MetricKind::Accuracy).unwrap();
        assert_relative_eq!(accuracy.metric_value, 1.0 / 3.0);
        assert_relative_eq!(accuracy.error_coverage, 100.0);
    }

    #[test]
    fn test_regression_stats() {
        // squared errors [0, 1, 4, 0]
        let jd = regression_dataset();
        let mae = MetricKind::MeanAbsoluteError;
        let stats = MetricCohortStats::compute(&jd, &[1, 3], mae).unwrap();
        assert_relative_eq!(stats.error_coverage, 20.0);
        assert_relative_eq!(stats.error_rate, 0.5);
        assert_relative_eq!(stats.metric_value, 0.5);

        let all = [0, 1, 2, 3];
        let mse = MetricCohortStats::compute(&jd, &all, MetricKind::MeanSquaredError).unwrap();
        assert_relative_eq!(mse.metric_value, 1.25);
        assert_relative_eq!(mse.error_coverage, 100.0);
    }

    #[test]
    fn test_empty_cohort_has_zero_stats() {
        let jd = regression_dataset();
        let stats = MetricCohortStats::compute(&jd, &[], MetricKind::MeanSquaredError).unwrap();
        assert_eq!(stats.total_cohort, 0);
        assert_relative_eq!(stats.error_coverage, 0.0);
        assert_relative_eq!(stats.metric_value, 0.0);
    }

    #[test]
    fn test_unsupported_metrics() {
        let jd = regression_dataset();
        assert_eq!(
            MetricCohortStats::compute(&jd, &[0], MetricKind::Precision),
            Err(MetricError::UnsupportedMetric {
                metric: MetricKind::Precision,
                model_type: ModelType::Regression
            })
        );

        let mut input =
            JointDatasetInput::new(ModelMetadata::infer(None, ModelType::Regression, vec![]));
        input.predicted_y = Some(vec![2.0, 4.0]);
        let jd = JointDataset::new(input, JointDatasetOptions::default()).unwrap();
        assert_eq!(
            MetricCohortStats::compute(&jd, &[0, 1], MetricKind::MeanSquaredError),
            Err(MetricError::MissingTrueY {
                metric: MetricKind::MeanSquaredError
            })
        );
        let mean = MetricCohortStats::compute(&jd, &[0, 1], MetricKind::MeanPrediction).unwrap();
        assert_relative_eq!(mean.metric_value, 3.0);
    }

    #[test]
    fn test_refresh_recomputes_stats() {
        let jd = Rc::new(RefCell::new(regression_dataset()));
        let cohort = Cohort::new("all", jd, vec![], vec![]).unwrap();
        let mut error_cohort = ErrorCohort::new(cohort, CohortSource::None, None).unwrap();
        let stats = error_cohort.stats();
        assert_eq!(stats.metric_kind, MetricKind::MeanSquaredError);
        assert_relative_eq!(stats.metric_value, 1.25);

        let filter = Filter::new(ColumnKey::TrueY, FilterMethod::LessThanEqualTo, [2.0]);
        error_cohort
            .cohort_mut()
            .update_filter(filter, None)
            .unwrap();
        error_cohort.refresh().unwrap();
        assert_eq!(error_cohort.stats().total_cohort, 2);
        assert_relative_eq!(error_cohort.stats().metric_value, 0.5);
    }
}
