use std::path::PathBuf;

use clap::Args;
use raidash_data::{ColumnMeta, JointDataset, WeightVectorOption};
use raidash_stats::descriptive::DescriptiveStats;

use crate::{command::GlobalArgs, util};

#[derive(Debug, Clone, Args)]
pub(crate) struct SummaryArg {
    /// Path to the dashboard input JSON file
    pub input: PathBuf,

    /// Also print descriptive statistics of numeric columns
    #[arg(long)]
    pub detailed: bool,
}

pub(crate) fn run(arg: &SummaryArg, global: &GlobalArgs) -> anyhow::Result<()> {
    let jd = util::load_joint_dataset(&arg.input, global, WeightVectorOption::default())?;

    println!("Joint Dataset Summary ({})", arg.input.display());
    println!("==========================================\n");
    print_counts(&jd);
    println!();
    print_columns(&jd);
    if arg.detailed {
        println!();
        print_statistics(&jd);
    }
    Ok(())
}

fn print_counts(jd: &JointDataset) {
    let explained = jd.local_explanation_feature_count();
    println!("Model type:         {}", jd.model_type());
    println!("Rows:               {}", jd.dataset_row_count());
    println!("Dataset features:   {}", jd.dataset_feature_count());
    println!("Classes:            {}", jd.prediction_class_count());
    println!("Explained features: {explained}");
    println!();

    let capabilities = [
        ("dataset", jd.has_dataset()),
        ("predicted y", jd.has_predicted_y()),
        ("predicted probabilities", jd.has_predicted_probabilities()),
        ("true y", jd.has_true_y()),
        ("local explanations", jd.has_local_explanations()),
    ];
    println!("Capabilities:");
    for (name, present) in capabilities {
        let label = format!("{name}:");
        let flag = if present { "yes" } else { "no" };
        println!("  {label:<24} {flag}");
    }
}

fn column_kind(meta: &ColumnMeta) -> &'static str {
    match (meta.is_categorical, meta.treat_as_categorical, meta.is_integer()) {
        (true, _, _) => "categorical",
        (false, true, _) => "as-categorical",
        (false, false, true) => "integer",
        (false, false, false) => "numeric",
    }
}

fn print_columns(jd: &JointDataset) {
    println!("Columns:");
    println!(
        "  {:<20} {:<28} {:<12} {:<15} {:>22} {:>6}",
        "Key", "Label", "Category", "Kind", "Range", "Bins"
    );
    println!("  {}", "-".repeat(108));
    for (key, meta) in jd.meta_dict() {
        let range = meta.feature_range.map_or_else(
            || "-".to_owned(),
            |range| format!("[{:.4}, {:.4}]", range.min, range.max),
        );
        let bins = jd
            .bins(&key)
            .map_or_else(|| "-".to_owned(), |edges| edges.len().to_string());
        println!(
            "  {:<20} {:<28} {:<12} {:<15} {:>22} {:>6}",
            key.to_string(),
            meta.label,
            meta.category.to_string(),
            column_kind(meta),
            range,
            bins
        );
        if meta.treat_as_categorical && !meta.sorted_categorical_values.is_empty() {
            let values = meta.sorted_categorical_values.join(", ");
            println!("  {:<20} values: {values}", "");
        }
    }
}

fn print_statistics(jd: &JointDataset) {
    println!("Numeric Column Statistics:");
    println!(
        "  {:<20} {:>12} {:>12} {:>12} {:>12} {:>10}",
        "Key", "Mean", "Median", "Std", "Distinct", "Integral"
    );
    println!("  {}", "-".repeat(84));
    for (key, meta) in jd.meta_dict() {
        if meta.treat_as_categorical {
            continue;
        }
        let Some(values) = jd.column_values(&key) else {
            continue;
        };
        let Some(stats) = DescriptiveStats::new(values.iter().copied()) else {
            continue;
        };
        println!(
            "  {:<20} {:>12.4} {:>12.4} {:>12.4} {:>12} {:>10}",
            key.to_string(),
            stats.mean,
            stats.median,
            stats.std_dev,
            stats.distinct,
            stats.all_integral
        );
    }
}
