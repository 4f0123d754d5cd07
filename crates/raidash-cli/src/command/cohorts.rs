use std::{path::PathBuf, rc::Rc};

use clap::Args;
use raidash_data::{
    Cohort, CohortSource, ErrorCohort, MetricCohortStats, MetricKind, WeightVectorOption,
};
use serde::Serialize;

use crate::{command::GlobalArgs, util};

const ALL_DATA_COHORT: &str = "All data";

/// Metric selectable on the command line; names match case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum MetricArg {
    ErrorRate,
    Accuracy,
    Precision,
    Recall,
    F1Score,
    MeanSquaredError,
    MeanAbsoluteError,
    MeanPrediction,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::ErrorRate => Self::ErrorRate,
            MetricArg::Accuracy => Self::Accuracy,
            MetricArg::Precision => Self::Precision,
            MetricArg::Recall => Self::Recall,
            MetricArg::F1Score => Self::F1Score,
            MetricArg::MeanSquaredError => Self::MeanSquaredError,
            MetricArg::MeanAbsoluteError => Self::MeanAbsoluteError,
            MetricArg::MeanPrediction => Self::MeanPrediction,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct CohortsArg {
    /// Path to the dashboard input JSON file
    pub input: PathBuf,

    /// Path to the cohort definition JSON file
    #[arg(long)]
    pub cohorts: PathBuf,

    /// Metric to report (defaults to ErrorRate for classifiers, MeanSquaredError for regressors)
    #[arg(long)]
    pub metric: Option<MetricArg>,

    /// Also write the statistics as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CohortReport {
    name: String,
    source: CohortSource,
    #[serde(flatten)]
    stats: MetricCohortStats,
}

pub(crate) fn run(arg: &CohortsArg, global: &GlobalArgs) -> anyhow::Result<()> {
    let jd = util::load_joint_dataset(&arg.input, global, WeightVectorOption::default())?;
    let jd = util::share(jd);
    let definitions = util::read_cohort_file(&arg.cohorts)?;
    let metric = arg.metric.map(MetricKind::from);

    let all_data = Cohort::new(ALL_DATA_COHORT, Rc::clone(&jd), vec![], vec![])?;
    let mut error_cohorts = vec![ErrorCohort::new(all_data, CohortSource::None, metric)?];
    for definition in &definitions.cohorts {
        let cohort = definition.build(Rc::clone(&jd))?;
        error_cohorts.push(ErrorCohort::new(cohort, definition.source, metric)?);
    }

    let reports = error_cohorts
        .iter()
        .map(|ec| CohortReport {
            name: ec.cohort().name().to_owned(),
            source: ec.source(),
            stats: ec.stats().clone(),
        })
        .collect::<Vec<_>>();
    print_reports(&reports);

    if let Some(path) = &arg.output {
        util::save_json(&reports, Some(path))?;
    }
    Ok(())
}

fn print_reports(reports: &[CohortReport]) {
    let metric = reports
        .first()
        .map_or_else(String::new, |report| report.stats.metric_kind.to_string());
    println!(
        "  {:<24} {:<16} {:>8} {:>8} {:>11} {:>11} {:>18}",
        "Cohort", "Source", "Rows", "Total", "Coverage%", "ErrorRate", metric
    );
    println!("  {}", "-".repeat(102));
    for report in reports {
        let stats = &report.stats;
        println!(
            "  {:<24} {:<16} {:>8} {:>8} {:>11.2} {:>11.4} {:>18.4}",
            report.name,
            report.source.to_string(),
            stats.total_cohort,
            stats.total_all,
            stats.error_coverage,
            stats.error_rate,
            stats.metric_value
        );
    }
}
