//! Model performance metrics over `(true, predicted)` pairs
//!
//! Classification metrics treat labels as class indices. Binary metrics use
//! class `1` as the positive class. Every metric returns `0.0` for an empty
//! input instead of `NaN`, so callers can display empty cohorts directly.

/// Confusion matrix counts of a binary classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryConfusion {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl BinaryConfusion {
    /// Counts `(true, predicted)` pairs.
    ///
    /// ```
    /// # use raidash_stats::metrics::BinaryConfusion;
    /// let pairs = [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (1.0, 1.0)];
    /// let cm = BinaryConfusion::from_pairs(pairs);
    /// assert_eq!(cm.true_positive, 2);
    /// assert_eq!(cm.false_positive, 1);
    /// assert_eq!(cm.accuracy(), 0.6);
    /// ```
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut cm = Self::default();
        for (truth, predicted) in pairs {
            match (truth == 1.0, predicted == 1.0) {
                (true, true) => cm.true_positive += 1,
                (false, true) => cm.false_positive += 1,
                (false, false) => cm.true_negative += 1,
                (true, false) => cm.false_negative += 1,
            }
        }
        cm
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// Harmonic mean of precision and recall.
    #[must_use]
    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

/// Fraction of pairs where the prediction differs from the truth.
///
/// ```
/// # use raidash_stats::metrics::error_rate;
/// assert_eq!(error_rate([(0.0, 0.0), (2.0, 1.0)]), 0.5);
/// ```
#[must_use]
pub fn error_rate<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (incorrect, total) = pairs
        .into_iter()
        .fold((0, 0), |(incorrect, total), (truth, predicted)| {
            (incorrect + usize::from(truth != predicted), total + 1)
        });
    ratio(incorrect, total)
}

/// Fraction of pairs where the prediction equals the truth.
#[must_use]
pub fn accuracy<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut pairs = pairs.into_iter().peekable();
    if pairs.peek().is_none() {
        return 0.0;
    }
    1.0 - error_rate(pairs)
}

/// Mean of squared residuals.
///
/// ```
/// # use raidash_stats::metrics::mean_squared_error;
/// assert_eq!(mean_squared_error([(1.0, 2.0), (3.0, 1.0)]), 2.5);
/// ```
#[must_use]
pub fn mean_squared_error<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let squared = pairs
        .into_iter()
        .map(|(truth, predicted)| (truth - predicted).powi(2));
    mean(squared)
}

/// Mean of absolute residuals.
#[must_use]
pub fn mean_absolute_error<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let absolute = pairs
        .into_iter()
        .map(|(truth, predicted)| (truth - predicted).abs());
    mean(absolute)
}

/// Arithmetic mean, `0.0` for an empty input.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[expect(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
