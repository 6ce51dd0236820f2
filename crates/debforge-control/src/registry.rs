//! Source packages known to one build run, for one distribution

use crate::build_order::BuildOrderComputer;
use crate::environment::Environment;
use crate::error::{ControlError, Result};
use crate::relation::{Comparator, Dependency, Relation};
use crate::source_package::SourcePackage;
use std::collections::HashMap;
use tracing::info;

/// Packages in registration order, indexed by name
#[derive(Debug, Clone)]
pub struct Registry {
    codename: String,
    packages: Vec<SourcePackage>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new(env: &Environment) -> Self {
        Self {
            codename: env.codename.clone(),
            packages: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn codename(&self) -> &str {
        &self.codename
    }

    /// Register a package. Names are unique; a second package with the same
    /// name is rejected and the first one stays registered.
    pub fn add(&mut self, package: SourcePackage) -> Result<()> {
        if package.distribution() != self.codename {
            return Err(ControlError::unexpected(format!(
                "Package '{}' was loaded for '{}' but the registry is for '{}'",
                package.name(),
                package.distribution(),
                self.codename
            )));
        }
        if self.index.contains_key(package.name()) {
            return Err(ControlError::DuplicatePackage(package.name().to_string()));
        }

        info!(package = %package.name(), distribution = %self.codename, "registered package");
        self.index.insert(package.name().to_string(), self.packages.len());
        self.packages.push(package);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SourcePackage> {
        self.index.get(name).map(|&i| &self.packages[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SourcePackage> {
        match self.index.get(name) {
            Some(&i) => self.packages.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Packages in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, SourcePackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// A relation pinning `binary_package` to the version being built in this
    /// run. The first registered package producing that binary wins.
    pub fn make_relation(&self, binary_package: &str) -> Result<Relation> {
        let provider = self
            .packages
            .iter()
            .find(|p| p.control.binary(binary_package).is_some())
            .ok_or_else(|| ControlError::NotRegistered(binary_package.to_string()))?;

        let dependency =
            Dependency::new(binary_package).with_version(Comparator::Equal, provider.version()?);
        Ok(Relation::single(dependency))
    }

    /// Packages in an order where every package comes after the packages
    /// producing its build dependencies
    pub fn build_order(&self) -> Result<Vec<&SourcePackage>> {
        let order = BuildOrderComputer::from_packages(&self.packages)?.compute_build_order()?;
        order
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    ControlError::unexpected(format!("ordered package '{}' is not registered", name))
                })
            })
            .collect()
    }

    /// Names grouped into waves that can be built concurrently
    pub fn parallel_build_groups(&self) -> Result<Vec<Vec<String>>> {
        BuildOrderComputer::from_packages(&self.packages)?.parallel_build_groups()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a SourcePackage;
    type IntoIter = std::slice::Iter<'a, SourcePackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}
