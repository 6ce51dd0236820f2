//! Build order computation for locally built packages
//!
//! Only build dependencies on binaries produced by another package of the
//! same run are edges of the graph. Everything else is expected to come from
//! the distribution and imposes no ordering.

use crate::error::{ControlError, Result};
use crate::source_package::SourcePackage;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// Build order computer using topological sort
#[derive(Debug, Clone, Default)]
pub struct BuildOrderComputer {
    /// Package names in input order
    packages: Vec<String>,
    /// Dependency graph: package -> packages it must be built after
    graph: HashMap<String, Vec<String>>,
}

impl BuildOrderComputer {
    /// Derive the graph from the build dependencies of each package
    pub fn from_packages<'a>(packages: impl IntoIterator<Item = &'a SourcePackage>) -> Result<Self> {
        let packages: Vec<&SourcePackage> = packages.into_iter().collect();

        let mut providers: HashMap<&str, &str> = HashMap::new();
        for package in &packages {
            for binary in package.control.binary_names() {
                providers.entry(binary).or_insert(package.name());
            }
        }

        let mut graph = Vec::with_capacity(packages.len());
        for package in &packages {
            let source = package
                .control
                .source
                .as_ref()
                .ok_or_else(|| ControlError::MissingSourceParagraph(package.name().to_string()))?;

            let mut deps: Vec<String> = Vec::new();
            let build_depends = source.all_build_depends()?;
            for name in build_depends.names() {
                if let Some(&provider) = providers.get(name) {
                    if provider != package.name() && !deps.iter().any(|d| d == provider) {
                        deps.push(provider.to_string());
                    }
                }
            }
            debug!(package = %package.name(), depends_on = ?deps, "managed build dependencies");
            graph.push((package.name().to_string(), deps));
        }

        Ok(Self::from_graph(graph))
    }

    /// Create from a raw dependency graph. Dependencies on names that are not
    /// part of the graph are ignored, repeated ones are counted once.
    pub fn from_graph(graph: Vec<(String, Vec<String>)>) -> Self {
        let packages: Vec<String> = graph.iter().map(|(name, _)| name.clone()).collect();
        let known: HashSet<&str> = packages.iter().map(String::as_str).collect();

        let graph = graph
            .iter()
            .map(|(name, deps)| {
                let mut kept: Vec<String> = Vec::with_capacity(deps.len());
                for dep in deps {
                    if known.contains(dep.as_str()) && !kept.contains(dep) {
                        kept.push(dep.clone());
                    }
                }
                (name.clone(), kept)
            })
            .collect();

        Self { packages, graph }
    }

    /// Compute topological build order using Kahn's algorithm.
    ///
    /// Packages that become ready at the same time keep their input order.
    pub fn compute_build_order(&self) -> Result<Vec<String>> {
        let mut remaining = self.compute_in_degrees();
        let mut queue: VecDeque<&String> = self
            .packages
            .iter()
            .filter(|p| remaining.get(p.as_str()) == Some(&0))
            .collect();
        let mut result = Vec::with_capacity(self.packages.len());

        while let Some(package) = queue.pop_front() {
            result.push(package.clone());

            // For each package that depends on the current package
            for dependent in &self.packages {
                let depends = self
                    .graph
                    .get(dependent)
                    .is_some_and(|deps| deps.contains(package));
                if !depends {
                    continue;
                }
                if let Some(degree) = remaining.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if result.len() != self.packages.len() {
            return Err(ControlError::CircularDependency(self.unresolved(&result)));
        }

        info!(order = ?result, "computed build order");
        Ok(result)
    }

    /// In-degree = number of dependencies this package has
    fn compute_in_degrees(&self) -> HashMap<&str, usize> {
        self.graph
            .iter()
            .map(|(package, deps)| (package.as_str(), deps.len()))
            .collect()
    }

    fn unresolved(&self, built: &[String]) -> Vec<String> {
        self.packages
            .iter()
            .filter(|p| !built.contains(p))
            .cloned()
            .collect()
    }

    /// Group packages into waves that can be built in parallel. Each wave only
    /// depends on earlier waves and is sorted by name.
    pub fn parallel_build_groups(&self) -> Result<Vec<Vec<String>>> {
        let mut groups = Vec::new();
        let mut built: HashSet<&str> = HashSet::new();

        loop {
            let mut group: Vec<String> = self
                .packages
                .iter()
                .filter(|p| !built.contains(p.as_str()))
                .filter(|p| {
                    self.graph
                        .get(p.as_str())
                        .map(|deps| deps.iter().all(|d| built.contains(d.as_str())))
                        .unwrap_or(true)
                })
                .cloned()
                .collect();

            if group.is_empty() {
                break;
            }
            group.sort();

            for package in &group {
                if let Some(name) = self.packages.iter().find(|p| *p == package) {
                    built.insert(name.as_str());
                }
            }
            groups.push(group);
        }

        if built.len() != self.packages.len() {
            let built: Vec<String> = built.iter().map(|s| s.to_string()).collect();
            return Err(ControlError::CircularDependency(self.unresolved(&built)));
        }

        Ok(groups)
    }

    /// Get dependencies for a specific package
    pub fn get_dependencies(&self, package: &str) -> Option<&Vec<String>> {
        self.graph.get(package)
    }

    /// Package names in input order
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
