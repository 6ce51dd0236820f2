//! Check command - load every package with static checks enabled

use super::select_environments;
use anyhow::{Context, Result};
use colored::Colorize;
use debforge_config::{load_packages, Config};
use serde_json::json;

pub fn run(config: &Config, distribution: Option<&str>, json: bool) -> Result<()> {
    let mut results = Vec::new();

    for env in select_environments(config, distribution)? {
        let loaded = load_packages(&env)
            .with_context(|| format!("Package check failed for {}", env.codename))?;

        let mut packages = Vec::with_capacity(loaded.registry.len());
        for package in &loaded.registry {
            let version = package.version()?;
            let component = loaded
                .definition(package.name())
                .map(|d| d.component.as_str())
                .unwrap_or("main");
            if !json {
                println!(
                    "{} {} {} ({}, {})",
                    "✓".green().bold(),
                    package.name().bold(),
                    version,
                    env.codename,
                    component
                );
            }
            packages.push(json!({
                "name": package.name(),
                "version": version,
                "component": component,
                "binaries": package.control.binary_names().collect::<Vec<_>>(),
            }));
        }
        results.push(json!({ "distribution": env.codename, "packages": packages }));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("{}", "All packages passed their checks".green().bold());
    }
    Ok(())
}
