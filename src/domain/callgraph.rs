// Call graph structures for depreader.
// Nodes are functions with package identity, edges are direct call sites.

use std::collections::HashMap;
use std::fmt;

/// Identity of a function: the package it lives in and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId {
    pub package: String,
    pub name: String,
}

impl FunctionId {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.name)
    }
}

pub type NodeId = usize;

/// A node in the call graph.
#[derive(Debug)]
pub struct CallGraphNode {
    pub func: FunctionId,
    /// Bookkeeping node introduced by the analysis (closures, wrappers).
    pub synthetic: bool,
    /// One entry per call site, in the order the sites were recorded.
    pub callees: Vec<NodeId>,
    deleted: bool,
}

/// A borrowed view of one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge<'g> {
    pub caller: &'g FunctionId,
    pub callee: &'g FunctionId,
}

/// The call graph itself.
#[derive(Debug, Default)]
pub struct CallGraph {
    nodes: Vec<CallGraphNode>,
    by_id: HashMap<FunctionId, NodeId>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node for `func`, creating it on first sight.
    /// The first registration decides whether the node is synthetic.
    pub fn add_node(&mut self, func: FunctionId, synthetic: bool) -> NodeId {
        if let Some(&id) = self.by_id.get(&func) {
            return id;
        }
        let id = self.nodes.len();
        self.by_id.insert(func.clone(), id);
        self.nodes.push(CallGraphNode {
            func,
            synthetic,
            callees: Vec::new(),
            deleted: false,
        });
        id
    }

    /// Records one call site from `caller` to `callee`.
    pub fn add_edge(&mut self, caller: NodeId, callee: NodeId) {
        self.nodes[caller].callees.push(callee);
    }

    pub fn node_id(&self, func: &FunctionId) -> Option<NodeId> {
        self.by_id
            .get(func)
            .copied()
            .filter(|&id| !self.nodes[id].deleted)
    }

    pub fn node(&self, id: NodeId) -> Option<&CallGraphNode> {
        self.nodes.get(id).filter(|n| !n.deleted)
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &CallGraphNode> + '_ {
        self.nodes.iter().filter(|n| !n.deleted)
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes().map(|n| n.callees.len()).sum()
    }

    /// All call sites of `caller`, resolved to identities.
    pub fn callees_of(&self, caller: &FunctionId) -> Vec<&FunctionId> {
        match self.node_id(caller) {
            Some(id) => self.nodes[id]
                .callees
                .iter()
                .map(|&c| &self.nodes[c].func)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Lazily yields every edge: nodes in insertion order, then each
    /// node's call sites in recorded order.
    pub fn edges(&self) -> impl Iterator<Item = CallEdge<'_>> + '_ {
        self.nodes().flat_map(move |node| {
            node.callees.iter().map(move |&callee| CallEdge {
                caller: &node.func,
                callee: &self.nodes[callee].func,
            })
        })
    }

    /// Visits every edge exactly once. The first error stops the walk.
    pub fn visit_edges<E, F>(&self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(CallEdge<'_>) -> Result<(), E>,
    {
        for edge in self.edges() {
            visit(edge)?;
        }
        Ok(())
    }

    /// Removes synthetic nodes, rewiring each call site that targeted one
    /// to the synthetic node's own callees.
    pub fn delete_synthetic_nodes(&mut self) -> usize {
        let synthetic: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&id| self.nodes[id].synthetic && !self.nodes[id].deleted)
            .collect();

        for &victim in &synthetic {
            let outgoing: Vec<NodeId> = self.nodes[victim]
                .callees
                .iter()
                .copied()
                .filter(|&c| c != victim)
                .collect();

            for caller in 0..self.nodes.len() {
                if caller == victim || self.nodes[caller].deleted {
                    continue;
                }
                if !self.nodes[caller].callees.contains(&victim) {
                    continue;
                }
                let sites = std::mem::take(&mut self.nodes[caller].callees);
                let mut rewired = Vec::with_capacity(sites.len() + outgoing.len());
                for site in sites {
                    if site == victim {
                        rewired.extend(outgoing.iter().copied());
                    } else {
                        rewired.push(site);
                    }
                }
                self.nodes[caller].callees = rewired;
            }

            let node = &mut self.nodes[victim];
            node.callees.clear();
            node.deleted = true;
            self.by_id.remove(&node.func);
        }

        synthetic.len()
    }
}
