//! SCIP Index Ingestor.
//!
//! Reads a SCIP index and builds a call graph whose nodes carry package
//! identity: one edge per reference to a function symbol found inside the
//! body of another function.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use protobuf::Message;
use scip::types::descriptor::Suffix;
use scip::types::{Document, Index};
use tracing::{debug, trace};

use crate::domain::callgraph::{CallGraph, FunctionId, NodeId};
use crate::error::LoadError;

const ROLE_DEFINITION: i32 = 0x1;
const ROLE_IMPORT: i32 = 0x2;
const GO_SCHEME: &str = "scip-go";

/// A range in source code, zero-based, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceRange {
    start_line: i32,
    start_col: i32,
    end_line: i32,
    end_col: i32,
}

impl SourceRange {
    /// SCIP ranges are `[line, start_col, end_col]` or
    /// `[start_line, start_col, end_line, end_col]`.
    fn parse(range: &[i32]) -> Option<Self> {
        match *range {
            [line, start_col, end_col] => Some(Self {
                start_line: line,
                start_col,
                end_line: line,
                end_col,
            }),
            [start_line, start_col, end_line, end_col] => Some(Self {
                start_line,
                start_col,
                end_line,
                end_col,
            }),
            _ => None,
        }
    }

    fn contains(&self, other: &SourceRange) -> bool {
        (self.start_line, self.start_col) <= (other.start_line, other.start_col)
            && (other.end_line, other.end_col) <= (self.end_line, self.end_col)
    }
}

/// Function identity derived from a SCIP symbol, plus whether the
/// function is analysis bookkeeping rather than user code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolFunction {
    pub id: FunctionId,
    pub synthetic: bool,
}

/// Maps a global SCIP symbol to a function identity.
///
/// Namespace descriptors form the package path, the trailing
/// type/term/method descriptors joined by `.` form the name. Symbols that
/// do not end in a method descriptor are not functions.
///
/// rust-analyzer files impl items under `impl#[Self][Trait]`; the self type
/// takes the place of `impl` and the trait is dropped.
pub fn function_from_symbol(symbol: &str) -> Option<SymbolFunction> {
    if scip::symbol::is_local_symbol(symbol) {
        return None;
    }
    let parsed = scip::symbol::parse_symbol(symbol).ok()?;

    let mut namespaces: Vec<&str> = Vec::new();
    let mut members: Vec<&str> = Vec::new();
    let mut is_method = false;
    let mut awaiting_self_type = false;
    for descriptor in &parsed.descriptors {
        is_method = false;
        match descriptor.suffix.enum_value_or_default() {
            Suffix::Namespace if members.is_empty() => namespaces.push(&descriptor.name),
            Suffix::Type if descriptor.name == "impl" => {
                members.push(&descriptor.name);
                awaiting_self_type = true;
            }
            Suffix::Type | Suffix::Term => members.push(&descriptor.name),
            Suffix::TypeParameter if awaiting_self_type => {
                if let Some(owner) = members.last_mut() {
                    *owner = descriptor.name.as_str();
                }
                awaiting_self_type = false;
            }
            // Trait of an impl block.
            Suffix::TypeParameter if members.last().is_some() => {}
            Suffix::Method => {
                members.push(&descriptor.name);
                is_method = true;
            }
            _ => return None,
        }
    }
    if !is_method {
        return None;
    }

    let package = if parsed.scheme == GO_SCHEME {
        go_package_path(&parsed.package.name, &namespaces)
    } else {
        package_path(&parsed.package.name, &namespaces)
    };
    let name = members.join(".");
    let synthetic = name.contains('$') || name.contains("{closure");
    Some(SymbolFunction {
        id: FunctionId::new(package, name),
        synthetic,
    })
}

/// scip-go namespaces are full import paths, stdlib ones included.
fn go_package_path(module_name: &str, namespaces: &[&str]) -> String {
    if namespaces.is_empty() {
        return module_name.trim().to_string();
    }
    namespaces.join("/")
}

fn package_path(package_name: &str, namespaces: &[&str]) -> String {
    let joined = namespaces.join("/");
    let package_name = package_name.trim();
    if package_name.is_empty() || package_name == "." {
        return joined;
    }
    if joined.is_empty() {
        return package_name.to_string();
    }
    if joined.starts_with(package_name) {
        joined
    } else {
        format!("{}/{}", package_name, joined)
    }
}

/// A function definition located in one document.
#[derive(Debug, Clone)]
struct Definition {
    node: NodeId,
    range: SourceRange,
}

/// SCIP Ingestor for building call graphs from SCIP indices.
pub struct ScipIngestor;

impl ScipIngestor {
    /// Memory-maps and decodes a SCIP index file.
    pub fn read_index(path: &Path) -> Result<Index, LoadError> {
        let read_err = |source| LoadError::IndexRead {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_err)?;
        let len = file.metadata().map_err(read_err)?.len();
        let decoded = if len == 0 {
            Index::parse_from_bytes(&[])
        } else {
            // SAFETY: the index is opened read-only and not modified while mapped.
            let mmap = unsafe { Mmap::map(&file) }.map_err(read_err)?;
            Index::parse_from_bytes(&mmap)
        };
        decoded.map_err(|source| LoadError::IndexDecode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Ingest a SCIP index file and build a call graph.
    pub fn ingest_file(path: &Path) -> Result<CallGraph, LoadError> {
        debug!(path = %path.display(), "loading SCIP index");
        let index = Self::read_index(path)?;
        Ok(Self::build_graph(&index))
    }

    /// Builds the call graph; synthetic nodes are still present.
    pub fn build_graph(index: &Index) -> CallGraph {
        let mut graph = CallGraph::new();

        // Pass 1: every function definition becomes a node.
        let definitions: Vec<Vec<Definition>> = index
            .documents
            .iter()
            .map(|doc| Self::collect_definitions(doc, &mut graph))
            .collect();
        debug!(nodes = graph.node_count(), "collected function definitions");

        // Pass 2: references inside a definition become call sites.
        let mut edge_count = 0usize;
        for (doc, defs) in index.documents.iter().zip(&definitions) {
            let locals: HashMap<&str, NodeId> = doc
                .occurrences
                .iter()
                .filter(|occ| occ.symbol_roles & ROLE_DEFINITION != 0)
                .filter(|occ| scip::symbol::is_local_symbol(&occ.symbol))
                .filter_map(|occ| {
                    graph
                        .node_id(&local_id(doc, &occ.symbol))
                        .map(|id| (occ.symbol.as_str(), id))
                })
                .collect();

            for occ in &doc.occurrences {
                let skipped_roles = ROLE_DEFINITION | ROLE_IMPORT;
                if occ.symbol.is_empty() || occ.symbol_roles & skipped_roles != 0 {
                    continue;
                }
                let Some(range) = SourceRange::parse(&occ.range) else {
                    continue;
                };
                let callee = if scip::symbol::is_local_symbol(&occ.symbol) {
                    match locals.get(occ.symbol.as_str()) {
                        Some(&id) => id,
                        None => continue,
                    }
                } else {
                    match function_from_symbol(&occ.symbol) {
                        Some(func) => graph.add_node(func.id, func.synthetic),
                        None => continue,
                    }
                };
                let Some(caller) = defs.iter().find(|def| def.range.contains(&range)) else {
                    trace!(symbol = %occ.symbol, "reference outside any function");
                    continue;
                };
                graph.add_edge(caller.node, callee);
                edge_count += 1;
            }
        }
        debug!(edges = edge_count, "created call edges");

        graph
    }

    /// Definitions of `doc`, innermost first for containment lookups.
    fn collect_definitions(doc: &Document, graph: &mut CallGraph) -> Vec<Definition> {
        let mut defs = Vec::new();
        for occ in &doc.occurrences {
            if occ.symbol.is_empty() || occ.symbol_roles & ROLE_DEFINITION == 0 {
                continue;
            }
            let (id, synthetic) = if scip::symbol::is_local_symbol(&occ.symbol) {
                (local_id(doc, &occ.symbol), true)
            } else {
                match function_from_symbol(&occ.symbol) {
                    Some(func) => (func.id, func.synthetic),
                    None => continue,
                }
            };
            let body = if occ.enclosing_range.is_empty() {
                &occ.range
            } else {
                &occ.enclosing_range
            };
            let Some(range) = SourceRange::parse(body) else {
                continue;
            };
            let node = graph.add_node(id, synthetic);
            defs.push(Definition { node, range });
        }
        // Properly nested ranges: the latest start is the innermost.
        defs.sort_by(|a, b| {
            (b.range.start_line, b.range.start_col).cmp(&(a.range.start_line, a.range.start_col))
        });
        defs
    }
}

/// Local symbols are only unique within their document.
fn local_id(doc: &Document, symbol: &str) -> FunctionId {
    FunctionId::new(doc.relative_path.as_str(), symbol)
}
