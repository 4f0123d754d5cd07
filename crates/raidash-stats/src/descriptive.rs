/// Descriptive statistics summarizing a column of values.
///
/// Used for column summaries and for the distinct-value count bounding
/// integer bins.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Midpoint of the two central values for even counts.
    pub median: f64,
    /// Population variance.
    pub variance: f64,
    pub std_dev: f64,
    /// Number of distinct values.
    pub distinct: usize,
    /// Whether every value is a whole number.
    pub all_integral: bool,
}

impl DescriptiveStats {
    /// Summarizes values in any order. Returns `None` for an empty input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use raidash_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, 1.0, 3.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.distinct, 5);
    /// assert!(stats.all_integral);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Summarizes values already sorted in ascending [`f64::total_cmp`] order.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a.total_cmp(b).is_le()),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let median = if count % 2 == 0 {
            f64::midpoint(sorted_values[count / 2 - 1], sorted_values[count / 2])
        } else {
            sorted_values[count / 2]
        };
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        let distinct = 1 + sorted_values.windows(2).filter(|w| w[0] != w[1]).count();
        let all_integral = sorted_values.iter().all(|v| v.fract() == 0.0);

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            variance,
            std_dev: variance.sqrt(),
            distinct,
            all_integral,
        })
    }
}

/// Returns the `(min, max)` of the values, or `None` when empty.
///
/// ```
/// # use raidash_stats::descriptive::min_max;
/// assert_eq!(min_max([3.0, -1.0, 2.0]), Some((-1.0, 3.0)));
/// assert_eq!(min_max(std::iter::empty()), None);
/// ```
#[must_use]
pub fn min_max<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((min, max)) => Some((min.min(v), max.max(v))),
    })
}
