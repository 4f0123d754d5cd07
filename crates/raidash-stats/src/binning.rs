//! Display binning for numeric columns
//!
//! This module splits a numeric range into a small number of labeled buckets.
//! Bins are used to show continuous columns as if they were categorical (for
//! grouping in charts and for building category-style filters).
//!
//! # Binning Policy
//!
//! - **Degenerate range** (`min == max`) or zero bin count: a single bucket
//!   spanning `[min, max]`.
//! - **Numeric ranges**, or integer ranges narrower than `bin_count - 1`:
//!   uniform-width buckets. The last edge is forced to exactly `max`.
//! - **Integer ranges** with enough span: whole-number edges obtained by
//!   ceiling evenly spaced increments that start one unit below `min`.
//!   A bucket covering a single integer is labeled with that integer alone.
//!
//! Each bucket is represented by its inclusive upper edge. A value belongs to
//! the first bucket whose edge is greater than or equal to the value.
//!
//! # Examples
//!
//! ```
//! use raidash_stats::binning::BinPlan;
//!
//! let plan = BinPlan::new(0.0, 9.0, true, 5);
//! assert_eq!(plan.edges, [1.0, 3.0, 5.0, 7.0, 9.0]);
//! assert_eq!(plan.labels[0], "0 - 1");
//! assert_eq!(plan.bucket_of(4.0), 2);
//! ```

/// Number of buckets used when no explicit count is requested.
pub const DEFAULT_BIN_COUNT: usize = 5;

/// Maximum number of significant digits shown in bucket labels.
pub const LABEL_SIGNIFICANT_DIGITS: u32 = 4;

/// Ordered bucket edges plus a parallel array of display labels.
#[derive(Debug, Clone, PartialEq)]
pub struct BinPlan {
    /// Inclusive upper edge of each bucket, ascending.
    pub edges: Vec<f64>,
    /// Display label of each bucket.
    pub labels: Vec<String>,
}

impl BinPlan {
    /// Computes buckets for the range `[min, max]`.
    ///
    /// # Arguments
    ///
    /// * `min`, `max` - Bounds of the column's value range
    /// * `is_integer` - Whether the column only holds whole numbers
    /// * `bin_count` - Requested number of buckets
    ///
    /// # Examples
    ///
    /// ```
    /// # use raidash_stats::binning::BinPlan;
    /// let plan = BinPlan::new(0.0, 1.0, false, 4);
    /// assert_eq!(plan.edges, [0.25, 0.5, 0.75, 1.0]);
    /// assert_eq!(plan.labels, ["0 - 0.25", "0.25 - 0.5", "0.5 - 0.75", "0.75 - 1"]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(min: f64, max: f64, is_integer: bool, bin_count: usize) -> Self {
        let delta = max - min;
        if delta == 0.0 || bin_count == 0 {
            return Self {
                edges: vec![max],
                labels: vec![format!(
                    "{} - {}",
                    format_significant(min, LABEL_SIGNIFICANT_DIGITS),
                    format_significant(max, LABEL_SIGNIFICANT_DIGITS)
                )],
            };
        }

        let count = bin_count as f64;
        if !is_integer || delta < count - 1.0 {
            return Self::uniform(min, max, bin_count);
        }

        let step = delta / count;
        let edges = (0..bin_count)
            .map(|i| {
                if i == bin_count - 1 {
                    max
                } else {
                    // `+ 0.0` turns a `-0.0` ceiling into `0.0`
                    (min - 1.0 + step * (i + 1) as f64).ceil() + 0.0
                }
            })
            .collect::<Vec<_>>();

        let mut previous = min;
        #[expect(clippy::float_cmp)]
        let labels = edges
            .iter()
            .map(|&edge| {
                let label = if previous == edge {
                    format_plain(previous)
                } else {
                    format!("{} - {}", format_plain(previous), format_plain(edge))
                };
                previous = edge + 1.0;
                label
            })
            .collect();

        Self { edges, labels }
    }

    #[expect(clippy::cast_precision_loss)]
    fn uniform(min: f64, max: f64, bin_count: usize) -> Self {
        let step = (max - min) / bin_count as f64;
        let edges = (0..bin_count)
            .map(|i| {
                if i == bin_count - 1 {
                    max
                } else {
                    min + step * (i + 1) as f64
                }
            })
            .collect::<Vec<_>>();

        let mut previous = min;
        let labels = edges
            .iter()
            .map(|&edge| {
                let label = format!(
                    "{} - {}",
                    format_significant(previous, LABEL_SIGNIFICANT_DIGITS),
                    format_significant(edge, LABEL_SIGNIFICANT_DIGITS)
                );
                previous = edge;
                label
            })
            .collect();

        Self { edges, labels }
    }

    /// Returns the index of the bucket containing `value`.
    ///
    /// See [`bucket_index`].
    #[must_use]
    pub fn bucket_of(&self, value: f64) -> usize {
        bucket_index(&self.edges, value)
    }

    /// Number of buckets in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Returns the default number of buckets for a column.
///
/// Integer columns never get more buckets than they have distinct values.
///
/// ```
/// # use raidash_stats::binning::default_bin_count;
/// assert_eq!(default_bin_count(false, 2), 5);
/// assert_eq!(default_bin_count(true, 3), 3);
/// assert_eq!(default_bin_count(true, 100), 5);
/// ```
#[must_use]
pub fn default_bin_count(is_integer: bool, distinct_values: usize) -> usize {
    if is_integer {
        DEFAULT_BIN_COUNT.min(distinct_values)
    } else {
        DEFAULT_BIN_COUNT
    }
}

/// Maps a value to the first bucket whose upper edge is `>= value`.
///
/// Values above the last edge fall into the last bucket. An empty edge list
/// maps everything to bucket 0.
#[must_use]
pub fn bucket_index(edges: &[f64], value: f64) -> usize {
    let index = edges.partition_point(|&edge| edge < value);
    index.min(edges.len().saturating_sub(1))
}

/// Formats `value` with at most `digits` significant digits.
///
/// Trailing zeros in the fractional part are dropped.
///
/// ```
/// # use raidash_stats::binning::format_significant;
/// assert_eq!(format_significant(3.14159, 4), "3.142");
/// assert_eq!(format_significant(123456.0, 4), "123500");
/// assert_eq!(format_significant(0.000123456, 4), "0.0001235");
/// assert_eq!(format_significant(-2.0, 4), "-2");
/// ```
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn format_significant(value: f64, digits: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_owned();
    }
    let digits = i32::try_from(digits.max(1)).unwrap_or(i32::MAX);
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = digits - 1 - magnitude;
    let formatted = if decimals > 0 {
        format!("{value:.prec$}", prec = decimals as usize)
    } else {
        let scale = 10f64.powi(-decimals);
        format!("{:.0}", (value / scale).round() * scale)
    };
    let trimmed = trim_fraction(&formatted);
    if trimmed == "-0" {
        "0".to_owned()
    } else {
        trimmed
    }
}

/// Formats `value` without rounding, dropping a trailing `.0`.
#[must_use]
pub fn format_plain(value: f64) -> String {
    trim_fraction(&value.to_string())
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        s.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_range_is_single_bucket() {
        let plan = BinPlan::new(3.0, 3.0, true, 5);
        assert_eq!(plan.edges, [3.0]);
        assert_eq!(plan.labels, ["3 - 3"]);
    }

    #[test]
    fn test_zero_bin_count_is_single_bucket() {
        let plan = BinPlan::new(1.0, 10.0, false, 0);
        assert_eq!(plan.edges, [10.0]);
        assert_eq!(plan.labels, ["1 - 10"]);
    }

    #[test]
    fn test_numeric_last_edge_is_exact_max() {
        let max = 0.7;
        let plan = BinPlan::new(0.1, max, false, 3);
        assert_eq!(plan.len(), 3);
        assert_eq!(*plan.edges.last().unwrap(), max);
        assert!(plan.edges.is_sorted());
    }

    #[test]
    fn test_integer_edges_are_whole_numbers() {
        let plan = BinPlan::new(0.0, 9.0, true, 5);
        assert_eq!(plan.edges, [1.0, 3.0, 5.0, 7.0, 9.0]);
        assert_eq!(plan.labels, ["0 - 1", "2 - 3", "4 - 5", "6 - 7", "8 - 9"]);
    }

    #[test]
    fn test_integer_singleton_buckets_use_single_label() {
        let plan = BinPlan::new(1.0, 3.0, true, 3);
        assert_eq!(plan.edges, [1.0, 2.0, 3.0]);
        assert_eq!(plan.labels, ["1", "2", "3"]);
    }

    #[test]
    fn test_integer_range_from_zero_has_no_negative_zero() {
        let plan = BinPlan::new(0.0, 4.0, true, default_bin_count(true, 5));
        assert_eq!(plan.edges, [0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(plan.edges[0].is_sign_positive());
        assert_eq!(plan.labels, ["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_narrow_integer_range_falls_back_to_uniform() {
        // span 2 < bin_count - 1 = 4
        let plan = BinPlan::new(0.0, 2.0, true, 5);
        assert_eq!(plan.len(), 5);
        assert_eq!(*plan.edges.last().unwrap(), 2.0);
        assert_eq!(plan.labels[0], "0 - 0.4");
    }

    #[test]
    fn test_bucket_of_uses_first_edge_at_or_above_value() {
        let plan = BinPlan::new(0.0, 9.0, true, 5);
        assert_eq!(plan.bucket_of(0.0), 0);
        assert_eq!(plan.bucket_of(1.0), 0);
        assert_eq!(plan.bucket_of(2.0), 1);
        assert_eq!(plan.bucket_of(9.0), 4);
        assert_eq!(plan.bucket_of(42.0), 4);
    }

    #[test]
    fn test_bucket_index_empty_edges() {
        assert_eq!(bucket_index(&[], 1.0), 0);
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(0.0, 4), "0");
        assert_eq!(format_significant(1.0, 4), "1");
        assert_eq!(format_significant(2.5, 4), "2.5");
        assert_eq!(format_significant(12.3456, 4), "12.35");
        assert_eq!(format_significant(99999.0, 4), "100000");
        assert_eq!(format_plain(7.0), "7");
        assert_eq!(format_plain(-3.0), "-3");
    }
}
