//! SCIP index generation.
//!
//! Runs the language's indexer in the project directory and writes the
//! index into the cache directory:
//! - Go: `scip-go`
//! - Rust: `rust-analyzer scip`
//! - Python: `scip-python index`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use super::scip_cache::ScipCache;
use crate::domain::language::Language;
use crate::error::LoadError;

/// Returns a SCIP index for `project_root`, reusing the cached one while
/// it is valid and `use_cache` is set.
pub fn generate_index(
    project_root: &Path,
    language: Language,
    use_cache: bool,
) -> Result<PathBuf, LoadError> {
    let cache = ScipCache::new(project_root, language);
    if let Some(cached) = reusable_index(&cache, use_cache) {
        info!(index = %cached.display(), "using cached SCIP index");
        return Ok(cached);
    }
    generate_fresh_index(project_root, language, &cache)
}

/// The cached index, if it may be used. Without `use_cache` any cached
/// index is discarded so a failed regeneration cannot leave it behind.
fn reusable_index(cache: &ScipCache, use_cache: bool) -> Option<PathBuf> {
    if use_cache {
        return cache.get_valid_cache();
    }
    if let Err(e) = cache.invalidate() {
        warn!(error = %e, "failed to discard cached SCIP index");
    }
    None
}

/// Runs the indexer unconditionally and refreshes the cache metadata.
pub fn generate_fresh_index(
    project_root: &Path,
    language: Language,
    cache: &ScipCache,
) -> Result<PathBuf, LoadError> {
    check_indexer_available(language)?;

    fs::create_dir_all(cache.cache_dir()).map_err(|source| LoadError::IndexDir {
        path: cache.cache_dir().to_path_buf(),
        source,
    })?;
    let output_file = absolute(cache.index_path());

    info!(%language, dir = %project_root.display(), "generating SCIP index");
    let spec = build_command_spec(language, &output_file);
    let status = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(project_root)
        .stdout(Stdio::from(io::stderr()))
        .status()
        .map_err(|source| LoadError::IndexerSpawn {
            command: spec.program.clone(),
            source,
        })?;

    if !status.success() {
        return Err(LoadError::IndexerFailed {
            command: spec.program,
            code: status.code(),
        });
    }
    if !output_file.exists() {
        return Err(LoadError::IndexMissing { path: output_file });
    }

    if let Err(e) = cache.update_metadata() {
        warn!(error = %e, "failed to update SCIP cache metadata");
    }

    info!(index = %output_file.display(), "generated SCIP index");
    Ok(output_file)
}

/// Check that the language's indexer can be executed.
pub fn check_indexer_available(language: Language) -> Result<(), LoadError> {
    let command = language.scip_command();
    match Command::new(command).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            debug!(command, version = %version.trim(), "found SCIP indexer");
            Ok(())
        }
        Ok(output) => Err(LoadError::IndexerFailed {
            command: command.to_string(),
            code: output.status.code(),
        }),
        Err(_) => Err(LoadError::IndexerMissing {
            command: command.to_string(),
            hint: language.install_instructions().to_string(),
        }),
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// The indexer invocation for a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScipCommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

pub fn build_command_spec(language: Language, output_file: &Path) -> ScipCommandSpec {
    let output = output_file.to_string_lossy().into_owned();
    let args: Vec<&str> = match language {
        Language::Go => vec!["--output", output.as_str()],
        Language::Rust => vec!["scip", ".", "--output", output.as_str()],
        Language::Python => vec!["index", ".", "--output", output.as_str()],
    };
    ScipCommandSpec {
        program: language.scip_command().to_string(),
        args: args.into_iter().map(String::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_spec_go() {
        let spec = build_command_spec(Language::Go, Path::new("/p/.depreader/index.scip"));
        assert_eq!(spec.program, "scip-go");
        assert_eq!(spec.args, vec!["--output", "/p/.depreader/index.scip"]);
    }

    #[test]
    fn test_build_command_spec_rust() {
        let spec = build_command_spec(Language::Rust, Path::new("/p/.depreader/index.scip"));
        assert_eq!(spec.program, "rust-analyzer");
        assert_eq!(spec.args[..2], ["scip", "."]);
        assert!(spec.args.contains(&"--output".to_string()));
    }

    #[test]
    fn test_build_command_spec_python() {
        let spec = build_command_spec(Language::Python, Path::new("/p/.depreader/index.scip"));
        assert_eq!(spec.program, "scip-python");
        assert_eq!(spec.args[0], "index");
    }

    #[test]
    fn test_relative_output_is_made_absolute() {
        assert!(absolute(Path::new("proj/.depreader/index.scip")).is_absolute());
    }

    #[test]
    fn no_cache_discards_a_valid_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.go"), "package main\n").unwrap();
        let cache = ScipCache::new(dir.path(), Language::Go);
        fs::create_dir_all(cache.cache_dir()).unwrap();
        fs::write(cache.index_path(), b"stale").unwrap();
        cache.update_metadata().unwrap();

        assert_eq!(reusable_index(&cache, true).as_deref(), Some(cache.index_path()));
        assert!(reusable_index(&cache, false).is_none());
        assert!(!cache.index_path().exists());
        assert!(cache.get_valid_cache().is_none());
    }

    #[test]
    #[ignore] // Requires scip-go to be installed
    fn test_generate_index_for_go_module() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/demo\n\ngo 1.21\n").unwrap();
        fs::write(dir.path().join("main.go"), "package main\n\nfunc main() {}\n").unwrap();
        let path = generate_index(dir.path(), Language::Go, false).unwrap();
        assert!(path.exists());
    }
}
