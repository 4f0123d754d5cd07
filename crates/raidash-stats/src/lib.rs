//! Numeric helpers for the model-inspection dashboard.
//!
//! This crate has no dependencies and provides:
//!
//! - **Binning**: Split numeric ranges into labeled display buckets
//! - **Descriptive statistics**: min, max, mean, median, variance, distinct counts
//! - **Metrics**: Classification and regression performance measures
//!
//! # Modules
//!
//! - [`binning`]: Uniform and integer-aware bucket plans
//! - [`descriptive`]: Descriptive statistics for summarizing columns
//! - [`metrics`]: Error rate, accuracy, precision, recall, F1, MSE, MAE
//!
//! # Examples
//!
//! ## Binning an integer column
//!
//! ```
//! use raidash_stats::binning::{BinPlan, default_bin_count};
//!
//! // 3 distinct integer values never produce more than 3 buckets
//! let plan = BinPlan::new(1.0, 3.0, true, default_bin_count(true, 3));
//! assert_eq!(plan.labels, ["1", "2", "3"]);
//! ```
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use raidash_stats::descriptive::DescriptiveStats;
//!
//! let stats = DescriptiveStats::new([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Scoring predictions
//!
//! ```
//! use raidash_stats::metrics;
//!
//! let pairs = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
//! assert_eq!(metrics::error_rate(pairs), 0.25);
//! ```

pub mod binning;
pub mod descriptive;
pub mod metrics;
