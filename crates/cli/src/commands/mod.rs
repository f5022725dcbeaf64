//! Command implementations.

mod describe;
mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_acquisition;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::AcquisitionPlan;
use feature_engine::{FeatureList, FeatureRegistry};

use crate::error::CliError;

/// Load and validate a plan file
pub(crate) fn load_plan(path: &Path) -> Result<AcquisitionPlan> {
    if !path.exists() {
        return Err(CliError::plan_not_found(path.display().to_string()).into());
    }
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load plan from {}", path.display()))
}

/// Resolve plan feature names against the registry
pub(crate) fn resolve_plan(registry: &FeatureRegistry, plan: &AcquisitionPlan) -> Result<FeatureList> {
    registry
        .resolve(&plan.features)
        .map_err(|e| CliError::plan_resolve(e.to_string()).into())
}
