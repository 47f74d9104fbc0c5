//! Error kinds of a dependency-reading run. Every kind is fatal.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::relation::DependencyRelation;

/// Invalid or missing invocation settings, detected before any loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the root module name must be provided (--main)")]
    MissingRootModule,
    #[error("failed to read configuration file {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
    #[error("failed to parse configuration file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("worker count must be at least 1")]
    ZeroJobs,
    #[error("invalid log filter {filter:?}: {reason}")]
    LogFilter { filter: String, reason: String },
}

/// The program model could not be built.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read cargo workspace at {path}: {source}")]
    Workspace {
        path: PathBuf,
        source: cargo_metadata::Error,
    },
    #[error("failed to read source file {path}: {source}")]
    ReadSource { path: PathBuf, source: io::Error },
    #[error("failed to walk {path}: {source}")]
    Walk { path: PathBuf, source: ignore::Error },
    #[error("packages contain errors ({count} diagnostics)")]
    Diagnostics { count: usize },
    #[error("{command} not found in PATH. {hint}")]
    IndexerMissing { command: String, hint: String },
    #[error("failed to execute {command}: {source}")]
    IndexerSpawn { command: String, source: io::Error },
    #[error("{command} failed with exit code {code:?}")]
    IndexerFailed { command: String, code: Option<i32> },
    #[error("failed to prepare index directory {path}: {source}")]
    IndexDir { path: PathBuf, source: io::Error },
    #[error("expected SCIP index was not created at {path}")]
    IndexMissing { path: PathBuf },
    #[error("failed to read SCIP index {path}: {source}")]
    IndexRead { path: PathBuf, source: io::Error },
    #[error("failed to decode SCIP index {path}: {source}")]
    IndexDecode {
        path: PathBuf,
        source: protobuf::Error,
    },
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single relation could not be emitted.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to serialize relation: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write relation: {0}")]
    Write(#[source] io::Error),
}

/// A relation failed to reach the output sink; the walk stopped there.
#[derive(Debug, Error)]
#[error("relation #{position} could not be emitted: {source}")]
pub struct ExtractionError {
    /// 1-based position of the failed relation in emission order.
    pub position: usize,
    /// The rejected relation; `None` when the final flush failed.
    pub relation: Option<DependencyRelation>,
    pub source: EmitError,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
}

impl Error {
    /// Process exit status for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => 2,
            Error::Load(_) => 3,
            Error::Extraction(_) => 4,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
