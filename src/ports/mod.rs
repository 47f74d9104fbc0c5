use std::path::Path;

use crate::domain::callgraph::CallGraph;
use crate::domain::relation::DependencyRelation;
use crate::error::{EmitError, LoadError};

pub mod json_lines;

/// Builds the whole-program call graph for a root module.
///
/// Implementations return a graph whose synthetic nodes are already removed.
pub trait ProgramModelProvider {
    fn build_call_graph(
        &self,
        root_module: &str,
        search_dir: &Path,
    ) -> Result<CallGraph, LoadError>;
}

/// Destination of emitted relations, written one at a time in order.
pub trait RelationSink {
    fn emit(&mut self, relation: &DependencyRelation) -> Result<(), EmitError>;

    /// Called once after the last relation of a successful walk.
    fn finish(&mut self) -> Result<(), EmitError> {
        Ok(())
    }
}

impl<S: RelationSink + ?Sized> RelationSink for &mut S {
    fn emit(&mut self, relation: &DependencyRelation) -> Result<(), EmitError> {
        (**self).emit(relation)
    }

    fn finish(&mut self) -> Result<(), EmitError> {
        (**self).finish()
    }
}

/// Collects relations in memory; mostly useful for tests and tooling.
impl RelationSink for Vec<DependencyRelation> {
    fn emit(&mut self, relation: &DependencyRelation) -> Result<(), EmitError> {
        self.push(relation.clone());
        Ok(())
    }
}
