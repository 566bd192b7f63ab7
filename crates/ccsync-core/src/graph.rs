// ── Resource graph ──
//
// Desired resources as a DAG of "must exist before" edges:
//   GlobalPool   -> PoolReservation
//   parent site  -> child site
//   site         -> PoolReservation held by it
//
// Creation order is a Kahn topological sort whose ready set always yields
// the lowest declaration index, so identical input gives identical plans.
// Deletion order is the exact reverse.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{DesiredResource, DesiredState, ResourceKey, SitePath};

/// Direction of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
}

/// One planned operation.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub operation: Operation,
    pub key: ResourceKey,
    #[serde(skip)]
    pub resource: Arc<DesiredResource>,
    /// Steps that must reach `Done` or `Skip` before this one may submit.
    pub depends_on: Vec<ResourceKey>,
}

/// Ordered, immutable sequence of operations for one run.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    operation: Operation,
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.steps.iter().map(|s| &s.key)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Validated dependency graph over a [`DesiredState`].
#[derive(Debug)]
pub struct ResourceGraph {
    nodes: Vec<Arc<DesiredResource>>,
    keys: Vec<ResourceKey>,
    /// `prerequisites[i]`: nodes that must exist before node `i`.
    prerequisites: Vec<Vec<usize>>,
    /// `dependents[i]`: nodes that need node `i`.
    dependents: Vec<Vec<usize>>,
}

impl ResourceGraph {
    /// Build and validate the graph. Performs no I/O.
    ///
    /// Dangling parent, pool, or site references have no path to the
    /// `Global` root and are reported as [`CoreError::CycleDetected`].
    /// Duplicate identities and kind-constraint violations are
    /// [`CoreError::InvalidHierarchy`].
    pub fn build(desired: &DesiredState) -> Result<Self, CoreError> {
        let nodes: Vec<Arc<DesiredResource>> = desired.resources().map(Arc::new).collect();
        let keys: Vec<ResourceKey> = nodes.iter().map(|n| n.key()).collect();

        let mut sites_by_path: HashMap<SitePath, usize> = HashMap::new();
        let mut pools_by_name: HashMap<&str, usize> = HashMap::new();
        let mut seen: HashMap<&ResourceKey, usize> = HashMap::new();

        for (idx, node) in nodes.iter().enumerate() {
            if seen.insert(&keys[idx], idx).is_some() {
                return Err(CoreError::InvalidHierarchy {
                    message: format!("{} is declared more than once", keys[idx]),
                });
            }
            match node.as_ref() {
                DesiredResource::Site(site) => {
                    if site.name.trim().is_empty() || site.name.contains('/') {
                        return Err(CoreError::InvalidHierarchy {
                            message: format!(
                                "site name '{}' under '{}' must be non-empty and contain no '/'",
                                site.name, site.parent
                            ),
                        });
                    }
                    if let Some(prev) = sites_by_path.insert(site.path(), idx) {
                        return Err(CoreError::InvalidHierarchy {
                            message: format!(
                                "{} and {} share the path '{}'",
                                keys[prev],
                                keys[idx],
                                site.path()
                            ),
                        });
                    }
                }
                DesiredResource::Pool(pool) => {
                    pools_by_name.insert(pool.name.as_str(), idx);
                }
                DesiredResource::Reservation(res) => {
                    res.prefix()?;
                }
            }
        }

        let mut prerequisites: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            match node.as_ref() {
                DesiredResource::Site(site) => {
                    if site.parent.is_root() {
                        check_parent_kind(&keys[idx], site.kind(), None)?;
                        continue;
                    }
                    let Some(&parent) = sites_by_path.get(&site.parent) else {
                        return Err(dangling(
                            &keys[idx],
                            format!("parent '{}' is not declared", site.parent),
                        ));
                    };
                    let parent_kind = match nodes[parent].as_ref() {
                        DesiredResource::Site(p) => Some(p.kind()),
                        _ => None,
                    };
                    check_parent_kind(&keys[idx], site.kind(), parent_kind)?;
                    prerequisites[idx].push(parent);
                }
                DesiredResource::Pool(_) => {}
                DesiredResource::Reservation(res) => {
                    let Some(&pool) = pools_by_name.get(res.pool.as_str()) else {
                        return Err(dangling(
                            &keys[idx],
                            format!("global pool '{}' is not declared", res.pool),
                        ));
                    };
                    let Some(&site) = sites_by_path.get(&res.site) else {
                        return Err(dangling(
                            &keys[idx],
                            format!("site '{}' is not declared", res.site),
                        ));
                    };
                    prerequisites[idx].push(pool);
                    prerequisites[idx].push(site);
                }
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (idx, prereqs) in prerequisites.iter().enumerate() {
            for &p in prereqs {
                dependents[p].push(idx);
            }
        }

        debug!(resources = nodes.len(), "resource graph built");
        Ok(Self {
            nodes,
            keys,
            prerequisites,
            dependents,
        })
    }

    /// Creation plan: every prerequisite before its dependents.
    pub fn creation_plan(&self) -> Result<Plan, CoreError> {
        let order = self.topological_order()?;
        let steps = order
            .into_iter()
            .map(|idx| self.step(Operation::Create, idx, &self.prerequisites[idx]))
            .collect();
        Ok(Plan {
            operation: Operation::Create,
            steps,
        })
    }

    /// Deletion plan: the exact reverse of the creation plan. Each step
    /// waits on the resources that depend on it.
    pub fn deletion_plan(&self) -> Result<Plan, CoreError> {
        let mut order = self.topological_order()?;
        order.reverse();
        let steps = order
            .into_iter()
            .map(|idx| self.step(Operation::Delete, idx, &self.dependents[idx]))
            .collect();
        Ok(Plan {
            operation: Operation::Delete,
            steps,
        })
    }

    pub fn plan(&self, operation: Operation) -> Result<Plan, CoreError> {
        match operation {
            Operation::Create => self.creation_plan(),
            Operation::Delete => self.deletion_plan(),
        }
    }

    fn step(&self, operation: Operation, idx: usize, waits_on: &[usize]) -> PlanStep {
        PlanStep {
            operation,
            key: self.keys[idx].clone(),
            resource: Arc::clone(&self.nodes[idx]),
            depends_on: waits_on.iter().map(|&i| self.keys[i].clone()).collect(),
        }
    }

    fn topological_order(&self) -> Result<Vec<usize>, CoreError> {
        let mut in_degree: Vec<usize> = self.prerequisites.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &dep in &self.dependents[idx] {
                in_degree[dep] -= 1;
                if in_degree[dep] == 0 {
                    ready.push(Reverse(dep));
                }
            }
        }

        if order.len() < self.nodes.len() {
            let involved: Vec<String> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, d)| **d > 0)
                .map(|(i, _)| self.keys[i].to_string())
                .collect();
            return Err(CoreError::CycleDetected {
                reason: format!("{} resource(s) form a cycle", involved.len()),
                involved,
            });
        }

        Ok(order)
    }
}

fn check_parent_kind(
    key: &ResourceKey,
    kind: crate::model::SiteKind,
    parent: Option<crate::model::SiteKind>,
) -> Result<(), CoreError> {
    if kind.allows_parent(parent) {
        return Ok(());
    }
    let parent = parent.map_or_else(|| "Global".to_owned(), |k| format!("a {k}"));
    Err(CoreError::InvalidHierarchy {
        message: format!("{key} cannot be placed under {parent}"),
    })
}

fn dangling(key: &ResourceKey, why: String) -> CoreError {
    CoreError::CycleDetected {
        involved: vec![key.to_string()],
        reason: format!("{key} has no path to the Global root: {why}"),
    }
}
