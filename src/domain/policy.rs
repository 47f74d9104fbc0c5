//! Inclusion policy: decides which call edges belong to the report.

use serde::Deserialize;

use crate::domain::callgraph::CallEdge;

/// Name of automatic package-initialization code.
pub const DEFAULT_INITIALIZER: &str = "init";

/// How the root module is matched against a caller's package path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Literal string prefix: `app` also matches `application`.
    #[default]
    Textual,
    /// Prefix must end at a path separator (`/`, `.` or `::`).
    Segment,
}

/// Why an edge was left out of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutsideRoot,
    InitializerCaller,
    InitializerCallee,
}

#[derive(Debug, Clone)]
pub struct InclusionPolicy {
    root_module: String,
    initializer: String,
    match_mode: MatchMode,
}

impl InclusionPolicy {
    pub fn new(root_module: impl Into<String>) -> Self {
        Self {
            root_module: root_module.into(),
            initializer: DEFAULT_INITIALIZER.to_string(),
            match_mode: MatchMode::default(),
        }
    }

    pub fn with_initializer(mut self, initializer: impl Into<String>) -> Self {
        self.initializer = initializer.into();
        self
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn root_module(&self) -> &str {
        &self.root_module
    }

    pub fn initializer(&self) -> &str {
        &self.initializer
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Whether `package` belongs to the root module under the configured mode.
    pub fn matches_root(&self, package: &str) -> bool {
        let Some(rest) = package.strip_prefix(self.root_module.as_str()) else {
            return false;
        };
        match self.match_mode {
            MatchMode::Textual => true,
            MatchMode::Segment => {
                rest.is_empty()
                    || rest.starts_with('/')
                    || rest.starts_with('.')
                    || rest.starts_with("::")
            }
        }
    }

    /// Applies the rules in order; the first failing rule is reported.
    pub fn check(&self, edge: &CallEdge<'_>) -> Result<(), Rejection> {
        if !self.matches_root(&edge.caller.package) {
            return Err(Rejection::OutsideRoot);
        }
        if edge.caller.name == self.initializer {
            return Err(Rejection::InitializerCaller);
        }
        if edge.callee.name == self.initializer {
            return Err(Rejection::InitializerCallee);
        }
        Ok(())
    }

    pub fn includes(&self, edge: &CallEdge<'_>) -> bool {
        self.check(edge).is_ok()
    }
}
