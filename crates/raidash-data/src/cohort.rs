//! Named filtered views over a shared joint dataset
//!
//! A [`Cohort`] never copies rows: it keeps the indices of the rows passing
//! its filters, in ascending row order unless sorted. Several cohorts share
//! one [`JointDataset`] through [`SharedJointDataset`], so a mutation of the
//! dataset (categorical toggle, rebinning, importance reprojection) is seen by
//! all of them. Cohorts notice such mutations through
//! [`JointDataset::generation`] and recompute on [`Cohort::refresh`].
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use raidash_data::{
//!     Cohort, ColumnKey, DatasetValue, Filter, FilterMethod, JointDataset, JointDatasetInput,
//!     JointDatasetOptions, ModelMetadata, ModelType,
//! };
//!
//! let dataset = vec![
//!     vec![DatasetValue::from(1.0)],
//!     vec![DatasetValue::from(2.0)],
//!     vec![DatasetValue::from(3.0)],
//! ];
//! let metadata = ModelMetadata::infer(Some(&dataset[..]), ModelType::Regression, vec![]);
//! let input = JointDatasetInput {
//!     dataset: Some(dataset),
//!     ..JointDatasetInput::new(metadata)
//! };
//! let jd = JointDataset::new(input, JointDatasetOptions::default()).unwrap();
//! let shared = Rc::new(RefCell::new(jd));
//!
//! let filter = Filter::new(ColumnKey::Data(0), FilterMethod::GreaterThan, [1.0]);
//! let cohort = Cohort::new("large", shared, vec![filter], vec![]).unwrap();
//! assert_eq!(cohort.filtered_data(), [1, 2]);
//! ```

use std::{
    cell::RefCell,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    column::ColumnKey,
    filter::{self, CompositeFilter, Filter, FilterError},
    joint_dataset::{JointDataset, JointDatasetError, Row},
};

/// A joint dataset shared by several cohorts.
pub type SharedJointDataset = Rc<RefCell<JointDataset>>;

static NEXT_COHORT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SortOrder {
    key: ColumnKey,
    reverse: bool,
}

#[derive(Debug)]
pub struct Cohort {
    id: usize,
    name: String,
    dataset: SharedJointDataset,
    filters: Vec<Filter>,
    composite_filters: Vec<CompositeFilter>,
    filtered_data: Vec<usize>,
    sort_order: Option<SortOrder>,
    synced_generation: u64,
}

impl Cohort {
    /// Creates a cohort and evaluates its filters.
    ///
    /// # Errors
    ///
    /// Fails when a filter references a column the dataset does not have or
    /// has the wrong number of arguments for its method.
    pub fn new(
        name: impl Into<String>,
        dataset: SharedJointDataset,
        filters: Vec<Filter>,
        composite_filters: Vec<CompositeFilter>,
    ) -> Result<Self, FilterError> {
        {
            let jd = dataset.borrow();
            filters.iter().try_for_each(|f| f.validate(&jd))?;
            composite_filters.iter().try_for_each(|f| f.validate(&jd))?;
        }
        let mut cohort = Self {
            id: NEXT_COHORT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            dataset,
            filters,
            composite_filters,
            filtered_data: vec![],
            sort_order: None,
            synced_generation: 0,
        };
        cohort.apply_filters();
        Ok(cohort)
    }

    /// Process-unique identifier of this cohort.
    #[must_use]
    pub fn cohort_id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dataset(&self) -> &SharedJointDataset {
        &self.dataset
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn composite_filters(&self) -> &[CompositeFilter] {
        &self.composite_filters
    }

    /// Indices of the rows in this cohort.
    #[must_use]
    pub fn filtered_data(&self) -> &[usize] {
        &self.filtered_data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filtered_data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filtered_data.is_empty()
    }

    fn apply_filters(&mut self) {
        let jd = self.dataset.borrow();
        self.filtered_data = filter::apply_filters(&jd, &self.filters, &self.composite_filters);
        self.synced_generation = jd.generation();
        if let Some(order) = self.sort_order {
            sort_rows(&jd, &mut self.filtered_data, order);
        }
        log::debug!(
            "cohort '{}' matched {} of {} rows",
            self.name,
            self.filtered_data.len(),
            jd.row_count()
        );
    }

    /// Re-evaluates the filters if the dataset was mutated since the last
    /// evaluation. Returns `true` if the filtered rows were recomputed.
    pub fn refresh(&mut self) -> bool {
        if self.dataset.borrow().generation() == self.synced_generation {
            return false;
        }
        self.apply_filters();
        true
    }

    /// Replaces the filter at `index`, or appends it when `index` is `None`.
    ///
    /// # Errors
    ///
    /// Fails when the filter is invalid for the dataset or `index` is out of
    /// range. The filter set is unchanged in that case.
    pub fn update_filter(
        &mut self,
        filter: Filter,
        index: Option<usize>,
    ) -> Result<(), FilterError> {
        filter.validate(&self.dataset.borrow())?;
        match index {
            Some(index) => {
                let len = self.filters.len();
                let slot = self
                    .filters
                    .get_mut(index)
                    .ok_or(FilterError::IndexOutOfRange { index, len })?;
                *slot = filter;
            }
            None => self.filters.push(filter),
        }
        self.apply_filters();
        Ok(())
    }

    /// Removes and returns the filter at `index`.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range.
    pub fn delete_filter(&mut self, index: usize) -> Result<Filter, FilterError> {
        let len = self.filters.len();
        if index >= len {
            return Err(FilterError::IndexOutOfRange { index, len });
        }
        let removed = self.filters.remove(index);
        self.apply_filters();
        Ok(removed)
    }

    /// Appends a composite filter.
    ///
    /// # Errors
    ///
    /// Fails when any leaf of the filter is invalid for the dataset.
    pub fn add_composite_filter(&mut self, filter: CompositeFilter) -> Result<(), FilterError> {
        filter.validate(&self.dataset.borrow())?;
        self.composite_filters.push(filter);
        self.apply_filters();
        Ok(())
    }

    /// Removes and returns the composite filter at `index`.
    ///
    /// # Errors
    ///
    /// Fails when `index` is out of range.
    pub fn delete_composite_filter(
        &mut self,
        index: usize,
    ) -> Result<CompositeFilter, FilterError> {
        let len = self.composite_filters.len();
        if index >= len {
            return Err(FilterError::IndexOutOfRange { index, len });
        }
        let removed = self.composite_filters.remove(index);
        self.apply_filters();
        Ok(removed)
    }

    /// Sorts the filtered rows by a column's stored value, [`ColumnKey::Index`]
    /// by default. The sort is stable and is reapplied whenever the filters
    /// are re-evaluated.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn sort(&mut self, key: Option<ColumnKey>, reverse: bool) -> Result<(), JointDatasetError> {
        let order = SortOrder {
            key: key.unwrap_or(ColumnKey::Index),
            reverse,
        };
        let jd = self.dataset.borrow();
        if !jd.contains_column(&order.key) {
            return Err(JointDatasetError::UnknownColumn { key: order.key });
        }
        sort_rows(&jd, &mut self.filtered_data, order);
        self.sort_order = Some(order);
        Ok(())
    }

    /// Moves the rows whose `key` value satisfies `predicate` to the front,
    /// keeping the relative order within both groups.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn sort_by_group<F>(
        &mut self,
        key: ColumnKey,
        predicate: F,
    ) -> Result<(), JointDatasetError>
    where
        F: Fn(f64) -> bool,
    {
        let jd = self.dataset.borrow();
        let values = jd
            .column_values(&key)
            .ok_or(JointDatasetError::UnknownColumn { key })?;
        let (mut front, back): (Vec<_>, Vec<_>) = self
            .filtered_data
            .iter()
            .copied()
            .partition(|&row| predicate(values[row]));
        front.extend(back);
        self.filtered_data = front;
        Ok(())
    }

    /// Projects a column across the cohort's rows, in the cohort's order.
    ///
    /// # Errors
    ///
    /// Fails when the column does not exist.
    pub fn unwrap(
        &self,
        key: &ColumnKey,
        bin_edges: Option<&[f64]>,
    ) -> Result<Vec<f64>, JointDatasetError> {
        self.dataset
            .borrow()
            .unwrap_rows(&self.filtered_data, key, bin_edges)
    }

    /// Materializes the cohort's rows.
    #[must_use]
    pub fn filtered_rows(&self) -> Vec<Row> {
        let jd = self.dataset.borrow();
        self.filtered_data
            .iter()
            .filter_map(|&row| jd.get_row(row))
            .collect()
    }

    /// Mean absolute local importance per feature over the cohort's rows.
    #[must_use]
    pub fn calculate_average_importance(&self) -> Vec<f64> {
        self.dataset
            .borrow()
            .feature_average_importance(&self.filtered_data)
    }
}

fn sort_rows(jd: &JointDataset, rows: &mut [usize], order: SortOrder) {
    let Some(values) = jd.column_values(&order.key) else {
        return;
    };
    if order.reverse {
        rows.sort_by(|&a, &b| values[b].total_cmp(&values[a]));
    } else {
        rows.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        filter::FilterMethod,
        input::{DatasetValue, JointDatasetInput, JointDatasetOptions, ModelMetadata, ModelType},
        joint_dataset::tests::scenario_dataset,
    };

    fn shared_scenario() -> SharedJointDataset {
        Rc::new(RefCell::new(scenario_dataset()))
    }

    fn shared_numeric(values: &[f64]) -> SharedJointDataset {
        let dataset = values
            .iter()
            .map(|&v| vec![DatasetValue::from(v)])
            .collect::<Vec<_>>();
        let metadata = ModelMetadata::infer(Some(&dataset[..]), ModelType::Regression, vec![]);
        let input = JointDatasetInput {
            dataset: Some(dataset),
            ..JointDatasetInput::new(metadata)
        };
        let options = JointDatasetOptions {
            dither_seed: Some(7),
            ..JointDatasetOptions::default()
        };
        Rc::new(RefCell::new(JointDataset::new(input, options).unwrap()))
    }

    #[test]
    fn test_filter_scenario() {
        let filter = Filter::new(ColumnKey::Data(0), FilterMethod::GreaterThan, [1.0]);
        let cohort = Cohort::new("gt1", shared_scenario(), vec![filter], vec![]).unwrap();
        assert_eq!(cohort.filtered_data(), [1, 2]);
        let values = cohort.unwrap(&ColumnKey::Data(0), None).unwrap();
        assert_eq!(values, [2.0, 3.0]);
        assert_eq!(cohort.len(), 2);
    }

    #[test]
    fn test_filter_idempotence() {
        let jd = shared_scenario();
        let filter = Filter::new(ColumnKey::Data(1), FilterMethod::Includes, [0.0]);
        let filters = vec![filter];
        let mut cohort = Cohort::new("a", Rc::clone(&jd), filters.clone(), vec![]).unwrap();
        let first = cohort.filtered_data().to_vec();

        assert!(!cohort.refresh());
        assert_eq!(cohort.filtered_data(), first);

        let other = Cohort::new("b", jd, filters, vec![]).unwrap();
        assert_eq!(other.filtered_data(), first);
        assert_ne!(other.cohort_id(), cohort.cohort_id());
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let filter = Filter::new(ColumnKey::LocalImportance(0), FilterMethod::Equal, [0.0]);
        let err = Cohort::new("bad", shared_scenario(), vec![filter], vec![]).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownColumn {
                column: ColumnKey::LocalImportance(0)
            }
        );
    }

    #[test]
    fn test_filter_set_mutation() {
        let mut cohort = Cohort::new("all", shared_scenario(), vec![], vec![]).unwrap();
        assert_eq!(cohort.filtered_data(), [0, 1, 2]);

        let gt = Filter::new(ColumnKey::Data(0), FilterMethod::GreaterThan, [1.0]);
        cohort.update_filter(gt, None).unwrap();
        assert_eq!(cohort.filtered_data(), [1, 2]);

        let lt = Filter::new(ColumnKey::Data(0), FilterMethod::LessThan, [3.0]);
        cohort.update_filter(lt.clone(), Some(0)).unwrap();
        assert_eq!(cohort.filtered_data(), [0, 1]);
        assert!(matches!(
            cohort.update_filter(lt, Some(5)),
            Err(FilterError::IndexOutOfRange { index: 5, len: 1 })
        ));

        let a_only = Filter::new(ColumnKey::Data(1), FilterMethod::Equal, [0.0]);
        cohort.add_composite_filter(a_only.into()).unwrap();
        assert_eq!(cohort.filtered_data(), [0]);

        cohort.delete_composite_filter(0).unwrap();
        cohort.delete_filter(0).unwrap();
        assert_eq!(cohort.filtered_data(), [0, 1, 2]);
        assert!(cohort.delete_filter(0).is_err());
    }

    #[test]
    fn test_refresh_follows_dataset_mutation() {
        let jd = shared_numeric(&[1.0, 5.0, 3.0, 5.0]);
        let filter = Filter::new(ColumnKey::Data(0), FilterMethod::Equal, [1.0]);
        let mut cohort = Cohort::new("c", Rc::clone(&jd), vec![filter], vec![]).unwrap();
        assert_eq!(cohort.filtered_data(), [0]);

        // category 1 is the value 3
        jd.borrow_mut()
            .set_treat_as_categorical(ColumnKey::Data(0), true)
            .unwrap();
        assert!(cohort.refresh());
        assert_eq!(cohort.filtered_data(), [2]);
        assert!(!cohort.refresh());
    }

    #[test]
    fn test_sort_is_stable_and_persistent() {
        let jd = shared_numeric(&[3.0, 1.0, 3.0, 2.0]);
        let mut cohort = Cohort::new("s", jd, vec![], vec![]).unwrap();
        cohort.sort(Some(ColumnKey::Data(0)), false).unwrap();
        assert_eq!(cohort.filtered_data(), [1, 3, 0, 2]);

        cohort.sort(Some(ColumnKey::Data(0)), true).unwrap();
        assert_eq!(cohort.filtered_data(), [0, 2, 3, 1]);

        let filter = Filter::new(ColumnKey::Data(0), FilterMethod::GreaterThan, [1.0]);
        cohort.update_filter(filter, None).unwrap();
        assert_eq!(cohort.filtered_data(), [0, 2, 3]);

        cohort.sort(None, false).unwrap();
        assert_eq!(cohort.filtered_data(), [0, 2, 3]);
        assert!(cohort.sort(Some(ColumnKey::TrueY), false).is_err());
    }

    #[test]
    fn test_sort_by_group_stability() {
        let jd = shared_numeric(&[0.0, 1.0, 1.0, 0.0, 1.0, 0.0]);
        let mut cohort = Cohort::new("g", jd, vec![], vec![]).unwrap();
        cohort
            .sort_by_group(ColumnKey::Data(0), |v| v > 0.5)
            .unwrap();
        assert_eq!(cohort.filtered_data(), [1, 2, 4, 0, 3, 5]);
    }

    #[test]
    fn test_filtered_rows_and_importance() {
        let filter = Filter::new(ColumnKey::Data(1), FilterMethod::Equal, [1.0]);
        let cohort = Cohort::new("b", shared_scenario(), vec![filter], vec![]).unwrap();
        let rows = cohort.filtered_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][&ColumnKey::Index], 1.0);
        assert!(cohort.calculate_average_importance().is_empty());
    }
}
