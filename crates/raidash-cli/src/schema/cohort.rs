use anyhow::Context as _;
use raidash_data::{Cohort, CohortSource, CompositeFilter, Filter, SharedJointDataset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CohortDefinitionFile {
    pub cohorts: Vec<CohortDefinition>,
}

/// A saved cohort: a name and its filter set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortDefinition {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub composite_filters: Vec<CompositeFilter>,
    #[serde(default)]
    pub source: CohortSource,
}

impl CohortDefinition {
    pub fn build(&self, dataset: SharedJointDataset) -> anyhow::Result<Cohort> {
        Cohort::new(
            self.name.clone(),
            dataset,
            self.filters.clone(),
            self.composite_filters.clone(),
        )
        .with_context(|| format!("Invalid filters in cohort '{}'", self.name))
    }
}

impl CohortDefinitionFile {
    pub fn find(&self, name: &str) -> anyhow::Result<&CohortDefinition> {
        self.cohorts
            .iter()
            .find(|def| def.name == name)
            .ok_or_else(|| anyhow::anyhow!("Cohort '{name}' not found in cohort file"))
    }
}
