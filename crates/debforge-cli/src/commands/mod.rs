pub mod check;
pub mod order;

use anyhow::{bail, Result};
use debforge_config::Config;
use debforge_control::Environment;

/// Environments selected on the command line, in configuration order
pub fn select_environments(config: &Config, distribution: Option<&str>) -> Result<Vec<Environment>> {
    let envs = config.environments();
    match distribution {
        None => Ok(envs),
        Some(codename) => {
            let selected: Vec<Environment> =
                envs.into_iter().filter(|e| e.codename == codename).collect();
            if selected.is_empty() {
                bail!(
                    "Distribution '{}' is not configured. Configured distributions: {}",
                    codename,
                    config.repository.build.distributions.join(", ")
                );
            }
            Ok(selected)
        }
    }
}
