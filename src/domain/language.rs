//! Language Domain Module
//!
//! Languages whose programs depreader can read dependencies from, and the
//! SCIP indexer that produces a semantic index for each.

use std::path::Path;

use serde::Deserialize;

/// Supported programming languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Go,
    #[value(alias = "rs")]
    Rust,
    #[value(alias = "py")]
    Python,
}

impl Language {
    /// Infer language from file extension.
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_lowercase();
        [Language::Go, Language::Rust, Language::Python]
            .into_iter()
            .find(|language| language.extensions().contains(&ext.as_str()))
    }

    /// Infer language from a file path.
    pub fn from_path(path: &Path) -> Option<Language> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess the language of a project from its build manifest.
    pub fn detect(dir: &Path) -> Option<Language> {
        if dir.join("go.mod").is_file() {
            Some(Language::Go)
        } else if dir.join("Cargo.toml").is_file() {
            Some(Language::Rust)
        } else if dir.join("pyproject.toml").is_file() || dir.join("setup.py").is_file() {
            Some(Language::Python)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Rust => "Rust",
            Language::Python => "Python",
        }
    }

    /// Source file extensions an index of this language covers.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["go"],
            Language::Rust => &["rs"],
            Language::Python => &["py"],
        }
    }

    /// Dependency lock file whose content invalidates a cached index.
    pub fn lock_file(&self) -> &'static str {
        match self {
            Language::Go => "go.sum",
            Language::Rust => "Cargo.lock",
            Language::Python => "poetry.lock",
        }
    }

    /// Get the SCIP indexer command for this language.
    pub fn scip_command(&self) -> &'static str {
        match self {
            Language::Go => "scip-go",
            Language::Rust => "rust-analyzer",
            Language::Python => "scip-python",
        }
    }

    /// Get installation instructions for the SCIP indexer.
    pub fn install_instructions(&self) -> &'static str {
        match self {
            Language::Go => {
                "Install scip-go: go install github.com/sourcegraph/scip-go/cmd/scip-go@latest"
            }
            Language::Rust => {
                "Install rust-analyzer: https://rust-analyzer.github.io/manual.html#installation"
            }
            Language::Python => "Install scip-python: npm install -g @sourcegraph/scip-python",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn test_value_enum_aliases() {
        assert_eq!(Language::from_str("go", true), Ok(Language::Go));
        assert_eq!(Language::from_str("RUST", true), Ok(Language::Rust));
        assert_eq!(Language::from_str("rs", true), Ok(Language::Rust));
        assert_eq!(Language::from_str("py", true), Ok(Language::Python));
        assert!(Language::from_str("java", true).is_err());
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path(Path::new("cmd/main.go")), Some(Language::Go));
        assert_eq!(Language::from_path(Path::new("src/main.rs")), Some(Language::Rust));
        assert_eq!(Language::from_path(Path::new("app.py")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("legacy/Tool.PY")), Some(Language::Python));
        assert_eq!(Language::from_path(Path::new("index.js")), None);
    }

    #[test]
    fn test_detect_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Language::detect(dir.path()), None);
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        assert_eq!(Language::detect(dir.path()), Some(Language::Rust));
        std::fs::write(dir.path().join("go.mod"), "module app\n").unwrap();
        assert_eq!(Language::detect(dir.path()), Some(Language::Go));
    }

    #[test]
    fn test_scip_command() {
        assert_eq!(Language::Go.scip_command(), "scip-go");
        assert_eq!(Language::Rust.scip_command(), "rust-analyzer");
        assert_eq!(Language::Python.scip_command(), "scip-python");
    }
}
