//! Module dependency resolution
//!
//! Orders module definitions so every module starts after the modules it
//! depends on. Uses Kahn's algorithm over version constraints, keyed by
//! `ModuleId`, with a sorted ready set so ties break by name, then version.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

use crate::module::registry::definition::{Dependency, ModuleDefinition, ModuleId, ModuleVersion};

/// Dependency resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No module with the required name was discovered
    #[error("missing dependency: {dependency} required by {requester}")]
    MissingDependency {
        requester: ModuleId,
        dependency: Dependency,
    },

    /// Modules with the required name exist but none satisfies the constraint
    #[error(
        "version mismatch: {requester} requires {dependency}, available versions: {}",
        join_versions(.available)
    )]
    VersionMismatch {
        requester: ModuleId,
        dependency: Dependency,
        available: Vec<ModuleVersion>,
    },

    /// The dependency graph contains a cycle
    #[error("dependency cycle detected: {}", join_cycle(.cycle))]
    Cycle {
        /// One concrete cycle; the first identity is repeated at the end
        cycle: Vec<ModuleId>,
    },
}

fn join_versions(versions: &[ModuleVersion]) -> String {
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_cycle(cycle: &[ModuleId]) -> String {
    cycle
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Resolved load plan
///
/// Definitions in start order, dependencies first, together with the
/// resolved dependency edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    order: Vec<ModuleDefinition>,
    edges: BTreeMap<ModuleId, Vec<ModuleId>>,
}

impl LoadPlan {
    /// Modules in load order (dependencies first)
    pub fn order(&self) -> &[ModuleDefinition] {
        &self.order
    }

    pub fn into_order(self) -> Vec<ModuleDefinition> {
        self.order
    }

    /// Identities in load order
    pub fn ids(&self) -> Vec<ModuleId> {
        self.order.iter().map(|d| d.id().clone()).collect()
    }

    /// Modules selected to satisfy `id`'s dependencies
    pub fn dependencies_of(&self, id: &ModuleId) -> &[ModuleId] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of a module in the load order
    pub fn position(&self, id: &ModuleId) -> Option<usize> {
        self.order.iter().position(|d| d.id() == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Dependency resolver
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Resolve module dependencies and determine load order
    ///
    /// Kahn's algorithm over version constraints: a module is ready once
    /// every dependency has an already ordered module that satisfies it,
    /// and the highest such module becomes the edge target. Modules whose
    /// dependencies are met by the highest available matching version go
    /// first; a lower match is only used when nothing else can make
    /// progress. Requesters are checked in ascending identity order, so the
    /// reported failure does not depend on input order. Identities are
    /// expected to be unique; a repeated identity is ignored after its
    /// first occurrence.
    pub fn resolve(definitions: &[ModuleDefinition]) -> Result<LoadPlan, ResolutionError> {
        let mut by_id: BTreeMap<ModuleId, &ModuleDefinition> = BTreeMap::new();
        for definition in definitions {
            by_id.entry(definition.id().clone()).or_insert(definition);
        }

        // Available versions per name, ascending
        let mut versions_by_name: HashMap<&str, Vec<&ModuleVersion>> = HashMap::new();
        for id in by_id.keys() {
            versions_by_name
                .entry(id.name.as_str())
                .or_default()
                .push(&id.version);
        }

        let preferred = Self::preferred_targets(&by_id, &versions_by_name)?;
        let (order_ids, edges) = Self::topological_sort(&by_id, &preferred, &versions_by_name)?;

        let order: Vec<ModuleDefinition> = order_ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|d| (*d).clone()))
            .collect();

        debug!(
            order = ?order_ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Dependency resolution complete"
        );

        Ok(LoadPlan { order, edges })
    }

    /// Highest available match for every declared dependency
    ///
    /// Fails when a dependency has no module with its name or no version
    /// satisfying its constraint.
    fn preferred_targets(
        by_id: &BTreeMap<ModuleId, &ModuleDefinition>,
        versions_by_name: &HashMap<&str, Vec<&ModuleVersion>>,
    ) -> Result<BTreeMap<ModuleId, Vec<ModuleId>>, ResolutionError> {
        let mut preferred = BTreeMap::new();

        for (id, definition) in by_id {
            let mut targets = Vec::with_capacity(definition.dependencies().len());
            for dependency in definition.dependencies() {
                let Some(available) = versions_by_name.get(dependency.name()) else {
                    return Err(ResolutionError::MissingDependency {
                        requester: id.clone(),
                        dependency: dependency.clone(),
                    });
                };

                match Self::highest_match(available.iter(), dependency) {
                    Some(version) => {
                        targets.push(ModuleId::new(dependency.name(), version.clone()))
                    }
                    None => {
                        return Err(ResolutionError::VersionMismatch {
                            requester: id.clone(),
                            dependency: dependency.clone(),
                            available: available.iter().map(|v| (*v).clone()).collect(),
                        })
                    }
                }
            }
            preferred.insert(id.clone(), targets);
        }

        Ok(preferred)
    }

    /// Highest version in `versions` (ascending) satisfying `dependency`
    fn highest_match<'s, 'a: 's>(
        versions: impl DoubleEndedIterator<Item = &'s &'a ModuleVersion>,
        dependency: &Dependency,
    ) -> Option<&'a ModuleVersion> {
        versions
            .rev()
            .find(|version| dependency.constraint().matches(version))
            .copied()
    }

    /// Topological sort of dependencies (Kahn's algorithm)
    ///
    /// Returns the load order and, per module, the modules bound to its
    /// dependencies.
    fn topological_sort(
        by_id: &BTreeMap<ModuleId, &ModuleDefinition>,
        preferred: &BTreeMap<ModuleId, Vec<ModuleId>>,
        versions_by_name: &HashMap<&str, Vec<&ModuleVersion>>,
    ) -> Result<(Vec<ModuleId>, BTreeMap<ModuleId, Vec<ModuleId>>), ResolutionError> {
        let mut pending: BTreeSet<&ModuleId> = by_id.keys().collect();
        // Versions already placed in the order, per name
        let mut ordered: HashMap<&str, BTreeSet<&ModuleVersion>> = HashMap::new();
        let mut order = Vec::with_capacity(by_id.len());
        let mut edges = BTreeMap::new();

        while !pending.is_empty() {
            let is_ordered = |target: &ModuleId| {
                ordered
                    .get(target.name.as_str())
                    .is_some_and(|versions| versions.contains(&target.version))
            };
            let next = pending
                .iter()
                .copied()
                .find(|id| {
                    preferred
                        .get(*id)
                        .is_some_and(|targets| targets.iter().all(is_ordered))
                })
                .or_else(|| {
                    pending.iter().copied().find(|id| {
                        by_id[*id]
                            .dependencies()
                            .iter()
                            .all(|dep| Self::ordered_match(&ordered, dep).is_some())
                    })
                });

            let Some(module) = next else {
                return Err(ResolutionError::Cycle {
                    cycle: Self::find_cycle(by_id, &pending, &ordered, versions_by_name),
                });
            };

            let mut targets: Vec<ModuleId> = by_id[module]
                .dependencies()
                .iter()
                .filter_map(|dep| {
                    Self::ordered_match(&ordered, dep)
                        .map(|version| ModuleId::new(dep.name(), version.clone()))
                })
                .collect();
            targets.sort();
            targets.dedup();

            pending.remove(module);
            ordered
                .entry(module.name.as_str())
                .or_default()
                .insert(&module.version);
            edges.insert(module.clone(), targets);
            order.push(module.clone());
        }

        Ok((order, edges))
    }

    /// Highest already ordered version satisfying `dependency`
    fn ordered_match<'a>(
        ordered: &HashMap<&str, BTreeSet<&'a ModuleVersion>>,
        dependency: &Dependency,
    ) -> Option<&'a ModuleVersion> {
        ordered
            .get(dependency.name())
            .and_then(|versions| Self::highest_match(versions.iter(), dependency))
    }

    /// Extract one concrete cycle from the modules left unordered
    ///
    /// Every blocked module has a dependency no ordered module satisfies,
    /// and every module that could satisfy it is blocked too. Following the
    /// highest such module from the smallest blocked module must revisit a
    /// module within `blocked.len()` steps.
    fn find_cycle(
        by_id: &BTreeMap<ModuleId, &ModuleDefinition>,
        blocked: &BTreeSet<&ModuleId>,
        ordered: &HashMap<&str, BTreeSet<&ModuleVersion>>,
        versions_by_name: &HashMap<&str, Vec<&ModuleVersion>>,
    ) -> Vec<ModuleId> {
        let mut path: Vec<ModuleId> = Vec::new();
        let mut visited: HashMap<ModuleId, usize> = HashMap::new();
        let mut current = blocked.first().map(|id| (*id).clone());

        while let Some(module) = current {
            if let Some(&start) = visited.get(&module) {
                let mut cycle = path.split_off(start);
                cycle.push(module);
                return cycle;
            }

            let next = by_id
                .get(&module)
                .and_then(|definition| {
                    definition
                        .dependencies()
                        .iter()
                        .find(|dep| Self::ordered_match(ordered, dep).is_none())
                })
                .and_then(|dep| {
                    versions_by_name
                        .get(dep.name())
                        .and_then(|versions| Self::highest_match(versions.iter(), dep))
                        .map(|version| ModuleId::new(dep.name(), version.clone()))
                });
            visited.insert(module.clone(), path.len());
            path.push(module);
            current = next;
        }

        path
    }
}
