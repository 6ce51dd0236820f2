//! Order command - print the build order of the repository's packages

use super::select_environments;
use anyhow::{Context, Result};
use debforge_config::{load_packages, Config};
use serde_json::json;

/// Print the build order for every selected distribution
pub fn run(config: &Config, distribution: Option<&str>, parallel: bool, json: bool) -> Result<()> {
    let mut results = Vec::new();

    for env in select_environments(config, distribution)? {
        let loaded = load_packages(&env)
            .with_context(|| format!("Failed to load packages for {}", env.codename))?;

        if parallel {
            let groups = loaded
                .registry
                .parallel_build_groups()
                .with_context(|| format!("Failed to order packages for {}", env.codename))?;
            if !json {
                println!("{}:", env.codename);
                for (i, group) in groups.iter().enumerate() {
                    println!("  {}: {}", i + 1, group.join(" "));
                }
            }
            results.push(json!({ "distribution": env.codename, "groups": groups }));
        } else {
            let order: Vec<String> = loaded
                .registry
                .build_order()
                .with_context(|| format!("Failed to order packages for {}", env.codename))?
                .iter()
                .map(|p| p.name().to_string())
                .collect();
            if !json {
                println!("{}: {}", env.codename, order.join(" "));
            }
            results.push(json!({ "distribution": env.codename, "order": order }));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
