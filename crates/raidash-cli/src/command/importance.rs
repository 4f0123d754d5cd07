use std::{path::PathBuf, rc::Rc};

use clap::Args;
use raidash_data::{Cohort, WeightVectorOption};

use crate::{command::GlobalArgs, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct ImportanceArg {
    /// Path to the dashboard input JSON file
    pub input: PathBuf,

    /// Reduction of per-class importances: "equal", "abs-avg" or a class index
    #[arg(long, default_value = "abs-avg")]
    pub weight: WeightVectorOption,

    /// Number of features to print
    #[arg(long)]
    pub top: Option<usize>,

    /// Path to a cohort definition JSON file; each cohort gets its own column
    #[arg(long)]
    pub cohorts: Option<PathBuf>,
}

pub(crate) fn run(arg: &ImportanceArg, global: &GlobalArgs) -> anyhow::Result<()> {
    let jd = util::load_joint_dataset(&arg.input, global, arg.weight)?;
    anyhow::ensure!(
        jd.has_local_explanations(),
        "{} has no local explanations",
        arg.input.display()
    );
    let feature_names = jd
        .local_importance_keys()
        .map(|key| {
            jd.meta(&key)
                .map(|meta| meta.abridged_label.clone())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    let jd = util::share(jd);
    let mut cohorts = vec![Cohort::new("All data", Rc::clone(&jd), vec![], vec![])?];
    if let Some(path) = &arg.cohorts {
        for definition in util::read_cohort_file(path)?.cohorts {
            cohorts.push(definition.build(Rc::clone(&jd))?);
        }
    }
    let importances = cohorts
        .iter()
        .map(Cohort::calculate_average_importance)
        .collect::<Vec<_>>();

    // rank by the first cohort (all data)
    let mut order = (0..feature_names.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| importances[0][b].total_cmp(&importances[0][a]));
    order.truncate(arg.top.unwrap_or(order.len()));

    println!("Mean |local importance| (weight: {})", arg.weight);
    print!("  {:<28}", "Feature");
    for cohort in &cohorts {
        print!(" {:>16}", cohort.name());
    }
    println!();
    println!("  {}", "-".repeat(28 + 17 * cohorts.len()));
    for feature in order {
        print!("  {:<28}", feature_names[feature]);
        for importance in &importances {
            print!(" {:>16.6}", importance[feature]);
        }
        println!();
    }
    Ok(())
}
