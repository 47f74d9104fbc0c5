// Use cases: turning a call graph into a dependency relation stream.

use std::path::Path;

use tracing::{debug, info};

use crate::domain::callgraph::{CallEdge, CallGraph};
use crate::domain::policy::{InclusionPolicy, Rejection};
use crate::domain::relation::DependencyRelation;
use crate::error::{ConfigError, Error, ExtractionError};
use crate::ports::{ProgramModelProvider, RelationSink};

/// Order in which relations reach the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ordering {
    /// Call graph visitation order, streamed without buffering.
    #[default]
    Traversal,
    /// Sorted by caller, then callee. Buffers every relation first.
    Lexicographic,
}

/// Counters of one extraction walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub edges_visited: usize,
    pub emitted: usize,
    pub outside_root: usize,
    pub initializer: usize,
}

impl ExtractionSummary {
    fn record(&mut self, verdict: Result<(), Rejection>) {
        self.edges_visited += 1;
        match verdict {
            Ok(()) => {}
            Err(Rejection::OutsideRoot) => self.outside_root += 1,
            Err(Rejection::InitializerCaller | Rejection::InitializerCallee) => {
                self.initializer += 1
            }
        }
    }
}

/// The dependency extractor: filters call edges and emits relations.
pub struct Extractor {
    policy: InclusionPolicy,
    ordering: Ordering,
}

impl Extractor {
    pub fn new(policy: InclusionPolicy) -> Self {
        Self {
            policy,
            ordering: Ordering::default(),
        }
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn policy(&self) -> &InclusionPolicy {
        &self.policy
    }

    /// Lazily maps every qualifying edge to its relation, in visitation order.
    pub fn relations<'g>(
        &'g self,
        graph: &'g CallGraph,
    ) -> impl Iterator<Item = DependencyRelation> + 'g {
        graph
            .edges()
            .filter(move |edge| self.policy.includes(edge))
            .map(DependencyRelation::from)
    }

    /// Walks the graph once, writing each qualifying relation to `sink`.
    ///
    /// Stops at the first relation the sink rejects; relations already
    /// written stay written.
    pub fn extract<S>(
        &self,
        graph: &CallGraph,
        sink: &mut S,
    ) -> Result<ExtractionSummary, ExtractionError>
    where
        S: RelationSink + ?Sized,
    {
        let mut summary = ExtractionSummary::default();

        match self.ordering {
            Ordering::Traversal => {
                graph.visit_edges(|edge: CallEdge<'_>| {
                    let verdict = self.policy.check(&edge);
                    summary.record(verdict);
                    if verdict.is_err() {
                        return Ok(());
                    }
                    emit(&mut *sink, DependencyRelation::from(edge), &mut summary)
                })?;
            }
            Ordering::Lexicographic => {
                let mut relations = Vec::new();
                for edge in graph.edges() {
                    let verdict = self.policy.check(&edge);
                    summary.record(verdict);
                    if verdict.is_ok() {
                        relations.push(DependencyRelation::from(edge));
                    }
                }
                relations.sort();
                for relation in relations {
                    emit(&mut *sink, relation, &mut summary)?;
                }
            }
        }

        sink.finish().map_err(|source| ExtractionError {
            position: summary.emitted + 1,
            relation: None,
            source,
        })?;

        debug!(
            visited = summary.edges_visited,
            emitted = summary.emitted,
            outside_root = summary.outside_root,
            initializer = summary.initializer,
            "extraction finished"
        );
        Ok(summary)
    }
}

fn emit<S>(
    sink: &mut S,
    relation: DependencyRelation,
    summary: &mut ExtractionSummary,
) -> Result<(), ExtractionError>
where
    S: RelationSink + ?Sized,
{
    let position = summary.emitted + 1;
    match sink.emit(&relation) {
        Ok(()) => {
            summary.emitted = position;
            Ok(())
        }
        Err(source) => Err(ExtractionError {
            position,
            relation: Some(relation),
            source,
        }),
    }
}

/// Whole run: validate the root module, build the program model, extract.
pub struct ReadDependencies<'a> {
    pub provider: &'a dyn ProgramModelProvider,
    pub extractor: &'a Extractor,
}

impl<'a> ReadDependencies<'a> {
    pub fn run<S>(&self, search_dir: &Path, sink: &mut S) -> Result<ExtractionSummary, Error>
    where
        S: RelationSink + ?Sized,
    {
        let policy = self.extractor.policy();
        let root_module = policy.root_module();
        if root_module.trim().is_empty() {
            return Err(ConfigError::MissingRootModule.into());
        }

        info!(
            root = root_module,
            match_mode = ?policy.match_mode(),
            dir = %search_dir.display(),
            "building call graph"
        );
        let graph = self.provider.build_call_graph(root_module, search_dir)?;
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "call graph ready"
        );

        Ok(self.extractor.extract(&graph, sink)?)
    }
}
