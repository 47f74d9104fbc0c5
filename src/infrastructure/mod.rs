// Program model providers: a SCIP index reader and a syn-based Rust loader.

pub mod call_visitor;
pub mod concurrency;
pub mod project_loader;
pub mod scip_cache;
pub mod scip_runner;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::domain::callgraph::CallGraph;
use crate::domain::index::{SourceFile, SymbolIndex};
use crate::domain::language::Language;
use crate::domain::policy::DEFAULT_INITIALIZER;
use crate::domain::scip_ingest::ScipIngestor;
use crate::error::LoadError;
use crate::ports::ProgramModelProvider;

use call_visitor::{CallVisitor, FileCalls};
use project_loader::ProjectLoader;

/// Builds call graphs for Rust workspaces straight from source with `syn`.
#[derive(Debug, Clone)]
pub struct SynCallGraphBuilder {
    workers: Option<usize>,
    initializer: String,
}

impl SynCallGraphBuilder {
    pub fn new(workers: Option<usize>) -> Self {
        Self {
            workers,
            initializer: DEFAULT_INITIALIZER.to_string(),
        }
    }

    /// Name of the node that owns `const`/`static` initializer calls.
    pub fn with_initializer(mut self, initializer: impl Into<String>) -> Self {
        self.initializer = initializer.into();
        self
    }

    /// Indexes and walks `sources` in parallel, then merges the per-file
    /// results in file order.
    pub fn build_call_graph(&self, sources: &[SourceFile]) -> Result<CallGraph, LoadError> {
        let pool = concurrency::build_pool(self.workers)?;

        let (diagnostics, files) = pool.install(|| {
            let (index, diagnostics) = SymbolIndex::build(sources);
            if !diagnostics.is_empty() {
                return (diagnostics, Vec::new());
            }
            debug!(functions = index.function_count(), "indexed workspace");
            let files: Vec<FileCalls> = sources
                .par_iter()
                .map(|source| match syn::parse_file(&source.code) {
                    Ok(ast) => CallVisitor::collect(&index, &self.initializer, source, &ast),
                    Err(_) => FileCalls::default(),
                })
                .collect();
            (diagnostics, files)
        });

        if !diagnostics.is_empty() {
            for diag in &diagnostics {
                error!(file = %diag.path.display(), line = diag.line, "{}", diag.message);
            }
            return Err(LoadError::Diagnostics {
                count: diagnostics.len(),
            });
        }

        let mut graph = CallGraph::new();
        for file in &files {
            for (func, synthetic) in &file.definitions {
                graph.add_node(func.clone(), *synthetic);
            }
        }
        for file in files {
            for site in file.sites {
                let caller = graph.add_node(site.caller, false);
                let callee = graph.add_node(site.callee, site.callee_synthetic);
                graph.add_edge(caller, callee);
            }
        }

        let removed = graph.delete_synthetic_nodes();
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            removed,
            "built call graph"
        );
        Ok(graph)
    }
}

/// Reads the Cargo workspace at the search directory.
#[derive(Debug, Clone)]
pub struct SynProvider {
    builder: SynCallGraphBuilder,
}

impl SynProvider {
    pub fn new(workers: Option<usize>) -> Self {
        Self {
            builder: SynCallGraphBuilder::new(workers),
        }
    }

    pub fn with_initializer(mut self, initializer: impl Into<String>) -> Self {
        self.builder = self.builder.with_initializer(initializer);
        self
    }
}

impl ProgramModelProvider for SynProvider {
    fn build_call_graph(
        &self,
        root_module: &str,
        search_dir: &Path,
    ) -> Result<CallGraph, LoadError> {
        let sources = ProjectLoader::load_workspace(search_dir)?;
        info!(files = sources.len(), dir = %search_dir.display(), "loaded workspace sources");

        let matches_crate = |s: &SourceFile| {
            s.crate_name.starts_with(root_module) || root_module.starts_with(&s.crate_name)
        };
        if !sources.iter().any(matches_crate) {
            warn!(root = root_module, "root module matches no crate in the workspace");
        }

        self.builder.build_call_graph(&sources)
    }
}

/// Reads a SCIP index, generating it with the language's indexer unless
/// one is supplied.
#[derive(Debug, Clone)]
pub struct ScipProvider {
    language: Language,
    index: Option<PathBuf>,
    use_cache: bool,
}

impl ScipProvider {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            index: None,
            use_cache: true,
        }
    }

    pub fn with_index(mut self, index: Option<PathBuf>) -> Self {
        self.index = index;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }
}

impl ProgramModelProvider for ScipProvider {
    fn build_call_graph(
        &self,
        root_module: &str,
        search_dir: &Path,
    ) -> Result<CallGraph, LoadError> {
        let index_path = match &self.index {
            Some(path) => path.clone(),
            None => scip_runner::generate_index(search_dir, self.language, self.use_cache)?,
        };

        let mut graph = ScipIngestor::ingest_file(&index_path)?;
        let removed = graph.delete_synthetic_nodes();
        info!(
            index = %index_path.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            removed,
            "loaded SCIP call graph"
        );

        if !graph.nodes().any(|n| n.func.package.starts_with(root_module)) {
            warn!(root = root_module, "root module matches no package in the index");
        }
        Ok(graph)
    }
}
