//! Invocation settings: command line, optional `depreader.toml`, defaults.
//!
//! Precedence is flag (or its environment variable), then file, then the
//! built-in default.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::application::Ordering;
use crate::domain::language::Language;
use crate::domain::policy::{InclusionPolicy, MatchMode, DEFAULT_INITIALIZER};
use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "depreader.toml";
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Which program model provider builds the call graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Read a SCIP index, generating one with the language's indexer if needed.
    Scip,
    /// Parse a Cargo workspace directly (Rust only).
    Syn,
}

#[derive(Parser, Debug)]
#[command(
    name = "depreader",
    version,
    about = "Print the caller/callee relations of a root module as JSON lines"
)]
pub struct Cli {
    /// Root module name; only calls made from packages starting with it are printed
    #[arg(short = 'm', long = "main", env = "DEPREADER_MAIN")]
    pub main: Option<String>,

    /// Directory to load the program from
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Program model provider
    #[arg(long, value_enum)]
    pub engine: Option<Engine>,

    /// Source language (detected from the directory when omitted)
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Pre-built SCIP index to read instead of running an indexer
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Always regenerate the SCIP index
    #[arg(long)]
    pub no_cache: bool,

    /// How the root module is matched against package paths
    #[arg(long, value_enum)]
    pub match_mode: Option<MatchMode>,

    /// Sort relations by caller, then callee, before printing
    #[arg(long)]
    pub sort: bool,

    /// Name of package initialization functions to exclude
    #[arg(long)]
    pub initializer: Option<String>,

    /// Worker threads for source parsing
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Configuration file (defaults to <dir>/depreader.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `depreader=debug`
    #[arg(long, env = "DEPREADER_LOG")]
    pub log_level: Option<String>,
}

/// Keys of `depreader.toml`; they mirror the flags.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub main: Option<String>,
    pub engine: Option<Engine>,
    pub language: Option<Language>,
    pub index: Option<PathBuf>,
    pub no_cache: Option<bool>,
    pub match_mode: Option<MatchMode>,
    pub sort: Option<bool>,
    pub initializer: Option<String>,
    pub jobs: Option<usize>,
    pub log_level: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file: FileConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        // Relative index paths are relative to the file itself.
        if let (Some(index), Some(base)) = (&file.index, path.parent()) {
            if index.is_relative() {
                file.index = Some(base.join(index));
            }
        }
        Ok(file)
    }
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub root_module: String,
    pub search_dir: PathBuf,
    pub engine: Engine,
    pub language: Language,
    pub index: Option<PathBuf>,
    pub use_cache: bool,
    pub match_mode: MatchMode,
    pub ordering: Ordering,
    pub initializer: String,
    pub jobs: Option<usize>,
    pub log_filter: String,
}

impl Config {
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => {
                let default_path = cli.dir.join(CONFIG_FILE);
                if default_path.is_file() {
                    FileConfig::load(&default_path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let root_module = cli
            .main
            .or(file.main)
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MissingRootModule)?;

        let jobs = cli.jobs.or(file.jobs);
        if jobs == Some(0) {
            return Err(ConfigError::ZeroJobs);
        }

        let index = cli.index.or(file.index);
        let language = cli
            .language
            .or(file.language)
            .or_else(|| Language::detect(&cli.dir))
            .unwrap_or_default();
        let engine = cli.engine.or(file.engine).unwrap_or(match (language, &index) {
            (Language::Rust, None) => Engine::Syn,
            _ => Engine::Scip,
        });
        let ordering = if cli.sort || file.sort.unwrap_or(false) {
            Ordering::Lexicographic
        } else {
            Ordering::Traversal
        };

        Ok(Self {
            root_module,
            search_dir: cli.dir,
            engine,
            language,
            index,
            use_cache: !(cli.no_cache || file.no_cache.unwrap_or(false)),
            match_mode: cli.match_mode.or(file.match_mode).unwrap_or_default(),
            ordering,
            initializer: cli
                .initializer
                .or(file.initializer)
                .unwrap_or_else(|| DEFAULT_INITIALIZER.to_string()),
            jobs,
            log_filter: cli
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn policy(&self) -> InclusionPolicy {
        InclusionPolicy::new(self.root_module.clone())
            .with_initializer(self.initializer.clone())
            .with_match_mode(self.match_mode)
    }
}
