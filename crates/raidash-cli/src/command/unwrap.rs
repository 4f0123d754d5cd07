use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use raidash_data::{ColumnKey, WeightVectorOption};
use serde::Serialize;

use crate::{command::GlobalArgs, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct UnwrapArg {
    /// Path to the dashboard input JSON file
    pub input: PathBuf,

    /// Column key to project, e.g. "Data0", "PredictedY" or "LocalImportance2"
    #[arg(long)]
    pub column: ColumnKey,

    /// Replace values by bucket indices, using this many buckets
    #[arg(long)]
    pub bins: Option<usize>,

    /// Treat the column as categorical before projecting
    #[arg(long, conflicts_with = "bins")]
    pub categorical: bool,

    /// Path to a cohort definition JSON file
    #[arg(long, requires = "cohort")]
    pub cohorts: Option<PathBuf>,

    /// Restrict the projection to the rows of this cohort
    #[arg(long, requires = "cohorts")]
    pub cohort: Option<String>,

    /// Output file path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Projection {
    column: ColumnKey,
    label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
    rows: Vec<usize>,
    values: Vec<f64>,
}

pub(crate) fn run(arg: &UnwrapArg, global: &GlobalArgs) -> anyhow::Result<()> {
    let key = arg.column;
    let mut jd = util::load_joint_dataset(&arg.input, global, WeightVectorOption::default())?;

    if arg.categorical {
        jd.set_treat_as_categorical(key, true)
            .with_context(|| format!("Cannot treat {key} as categorical"))?;
    }
    if let Some(count) = arg.bins {
        jd.add_bin(key, Some(count))
            .with_context(|| format!("Cannot bin {key}"))?;
    }
    let meta = jd
        .meta(&key)
        .with_context(|| format!("Column {key} not found"))?
        .clone();
    let edges = arg.bins.and_then(|_| jd.bins(&key)).map(<[f64]>::to_vec);
    let categories = if arg.bins.is_some() || meta.treat_as_categorical {
        meta.sorted_categorical_values
    } else {
        vec![]
    };

    let jd = util::share(jd);
    let (rows, values) = match (&arg.cohorts, &arg.cohort) {
        (Some(path), Some(name)) => {
            let definitions = util::read_cohort_file(path)?;
            let cohort = definitions.find(name)?.build(jd)?;
            let values = cohort.unwrap(&key, edges.as_deref())?;
            (cohort.filtered_data().to_vec(), values)
        }
        _ => {
            let jd = jd.borrow();
            let values = jd.unwrap(&key, edges.as_deref())?;
            ((0..jd.row_count()).collect(), values)
        }
    };
    log::info!("projected {} values of {key}", values.len());

    let projection = Projection {
        column: key,
        label: meta.label,
        categories,
        rows,
        values,
    };
    util::save_json(&projection, arg.output.as_deref())
}
