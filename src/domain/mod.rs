// Domain model: call graphs, relations, and the rules that connect them.

pub mod callgraph;
pub mod index;
pub mod language;
pub mod policy;
pub mod relation;
pub mod scip_ingest;
