use serde::{Deserialize, Serialize};

use crate::domain::callgraph::CallEdge;

/// One reported caller → callee relation, both sides as `package.function`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyRelation {
    pub caller: String,
    pub callee: String,
}

impl From<CallEdge<'_>> for DependencyRelation {
    fn from(edge: CallEdge<'_>) -> Self {
        Self {
            caller: edge.caller.to_string(),
            callee: edge.callee.to_string(),
        }
    }
}
