pub mod cohort;
pub mod dashboard;
