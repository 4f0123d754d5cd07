use std::{
    cell::RefCell,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
    rc::Rc,
};

use anyhow::Context as _;
use raidash_data::{JointDataset, JointDatasetOptions, SharedJointDataset, WeightVectorOption};

use crate::{
    command::GlobalArgs,
    schema::{cohort::CohortDefinitionFile, dashboard::DashboardInput},
};

/// Writes `value` as pretty JSON to `output_path`, or to stdout when no path
/// is given.
pub fn save_json<T>(value: &T, output_path: Option<&Path>) -> anyhow::Result<()>
where
    T: serde::Serialize + ?Sized,
{
    let Some(path) = output_path else {
        return write_json(io::stdout().lock(), value).context("Failed to write JSON to stdout");
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    write_json(BufWriter::new(file), value)
        .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn write_json<W, T>(mut writer: W, value: &T) -> io::Result<()>
where
    W: Write,
    T: serde::Serialize + ?Sized,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;

    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}

/// Read a dashboard input file and build the joint dataset from it
///
/// # Errors
///
/// Returns error if the file cannot be read or its arrays are inconsistent
pub fn load_joint_dataset<P>(
    path: P,
    global: &GlobalArgs,
    weight_vector: WeightVectorOption,
) -> anyhow::Result<JointDataset>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let input: DashboardInput = read_json_file("dashboard input", path)?;
    let options = JointDatasetOptions {
        dither_seed: global.seed,
        weight_vector,
    };
    JointDataset::new(input.into_input(), options)
        .with_context(|| format!("Failed to build joint dataset from {}", path.display()))
}

pub fn share(dataset: JointDataset) -> SharedJointDataset {
    Rc::new(RefCell::new(dataset))
}

pub fn read_cohort_file<P>(path: P) -> anyhow::Result<CohortDefinitionFile>
where
    P: AsRef<Path>,
{
    read_json_file("cohort definition", path)
}
