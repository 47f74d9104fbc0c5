use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use cargo_metadata::{MetadataCommand, Package, Target};
use ignore::WalkBuilder;
use tracing::{debug, trace};

use crate::domain::index::SourceFile;
use crate::error::LoadError;

const SOURCE_KINDS: [&str; 3] = ["lib", "proc-macro", "bin"];

pub struct ProjectLoader;

impl ProjectLoader {
    /// Load all source files of the Cargo workspace rooted at `dir`.
    ///
    /// Members are visited by name, library targets before binaries; a
    /// file shared by several targets is kept once, under the first.
    pub fn load_workspace(dir: &Path) -> Result<Vec<SourceFile>, LoadError> {
        let manifest_path = dir.join("Cargo.toml");
        let metadata = MetadataCommand::new()
            .manifest_path(&manifest_path)
            .no_deps()
            .exec()
            .map_err(|source| LoadError::Workspace {
                path: manifest_path.clone(),
                source,
            })?;

        let mut members: Vec<&Package> = metadata
            .packages
            .iter()
            .filter(|p| metadata.workspace_members.contains(&p.id))
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));

        let mut files = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for package in members {
            let mut targets: Vec<&Target> = package
                .targets
                .iter()
                .filter(|t| t.kind.iter().any(|k| SOURCE_KINDS.contains(&k.as_str())))
                .collect();
            targets.sort_by_key(|t| !t.kind.iter().any(|k| k == "lib" || k == "proc-macro"));

            let other_roots: Vec<&Path> =
                targets.iter().map(|t| t.src_path.as_std_path()).collect();

            for target in &targets {
                let crate_name = target.name.replace('-', "_");
                let src_path = target.src_path.as_std_path();
                let Some(src_dir) = src_path.parent() else {
                    continue;
                };
                debug!(
                    package = %package.name,
                    target = %target.name,
                    dir = %src_dir.display(),
                    "collecting sources"
                );

                for path in Self::collect_rs_files(src_dir)? {
                    if path != src_path && other_roots.contains(&path.as_path()) {
                        continue;
                    }
                    if path != src_path
                        && !src_dir.ends_with("bin")
                        && path.starts_with(src_dir.join("bin"))
                    {
                        continue;
                    }
                    if !seen.insert(path.clone()) {
                        continue;
                    }
                    let code = fs::read_to_string(&path).map_err(|source| LoadError::ReadSource {
                        path: path.clone(),
                        source,
                    })?;
                    let module_path = module_path(src_dir, src_path, &path);
                    trace!(file = %path.display(), module = ?module_path, "loaded source");
                    files.push(SourceFile {
                        crate_name: crate_name.clone(),
                        module_path,
                        path,
                        code,
                    });
                }
            }
        }

        Ok(files)
    }

    fn collect_rs_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let walker = WalkBuilder::new(dir)
            .git_ignore(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut out = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|source| LoadError::Walk {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let relative = path.strip_prefix(dir).unwrap_or(path);
            if relative.components().any(|c| c.as_os_str() == "target") {
                continue;
            }
            if entry.file_type().is_some_and(|t| t.is_file())
                && path.extension().is_some_and(|ext| ext == "rs")
            {
                out.push(path.to_path_buf());
            }
        }
        Ok(out)
    }
}

/// Module path of `file` relative to the target's source directory.
///
/// `util.rs` and `util/mod.rs` are both `["util"]`; the target root is `[]`.
pub fn module_path(src_dir: &Path, target_root: &Path, file: &Path) -> Vec<String> {
    if file == target_root {
        return Vec::new();
    }
    let Ok(relative) = file.strip_prefix(src_dir) else {
        return Vec::new();
    };
    let mut segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = segments.pop() {
        let stem = last.strip_suffix(".rs").unwrap_or(&last).to_string();
        if stem != "mod" {
            segments.push(stem);
        }
    }
    segments
}
