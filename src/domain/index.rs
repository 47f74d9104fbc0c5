use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use dashmap::{DashMap, DashSet};
use rayon::prelude::*;
use syn::{ImplItem, Item, TraitItem, Type, UseTree};

use crate::domain::callgraph::FunctionId;

/// One Rust source file of a loaded workspace.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Crate name with `-` normalized to `_`.
    pub crate_name: String,
    /// Module path of the file inside its crate (`[]` for the crate root).
    pub module_path: Vec<String>,
    pub path: PathBuf,
    pub code: String,
}

impl SourceFile {
    /// Module scope of the file: crate name followed by its module path.
    pub fn scope(&self) -> Vec<String> {
        let mut scope = Vec::with_capacity(self.module_path.len() + 1);
        scope.push(self.crate_name.clone());
        scope.extend(self.module_path.iter().cloned());
        scope
    }
}

/// A file that failed to parse.
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
}

/// Where a path expression points once `use` aliases and relative
/// prefixes are expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    /// Rooted at a workspace crate.
    Internal(Vec<String>),
    /// Rooted somewhere else (std or a dependency).
    External(Vec<String>),
}

const MAX_ALIAS_DEPTH: u8 = 8;

pub fn package_of(scope: &[String]) -> String {
    scope.join("/")
}

/// Thread-safe symbol index of a Rust workspace.
/// Enables parallel parsing and indexing of source files.
#[derive(Default)]
pub struct SymbolIndex {
    crates: HashSet<String>,
    functions: DashSet<FunctionId>,
    modules: DashSet<String>,

    // Acceleration map: method name -> every `Type.method` defining it
    method_lookup: DashMap<String, Vec<FunctionId>>,

    // Per module package: alias -> path as written in the `use`
    aliases: DashMap<String, HashMap<String, Vec<String>>>,
    globs: DashMap<String, Vec<Vec<String>>>,
}

impl SymbolIndex {
    /// Build the symbol index from source files in parallel.
    ///
    /// Files that fail to parse are reported and left out of the index.
    pub fn build(sources: &[SourceFile]) -> (Self, Vec<ParseDiagnostic>) {
        let index = SymbolIndex {
            crates: sources.iter().map(|s| s.crate_name.clone()).collect(),
            ..SymbolIndex::default()
        };
        for krate in index.crates.iter() {
            index.modules.insert(krate.clone());
        }

        let diagnostics: Vec<ParseDiagnostic> = sources
            .par_iter()
            .filter_map(|source| match syn::parse_file(&source.code) {
                Ok(ast) => {
                    let scope = source.scope();
                    for depth in 1..=scope.len() {
                        index.modules.insert(package_of(&scope[..depth]));
                    }
                    index.index_items(&scope, &ast.items);
                    None
                }
                Err(e) => Some(ParseDiagnostic {
                    path: source.path.clone(),
                    line: e.span().start().line,
                    message: e.to_string(),
                }),
            })
            .collect();

        // Parallel insertion leaves candidate lists in arbitrary order.
        for mut candidates in index.method_lookup.iter_mut() {
            candidates.sort();
            candidates.dedup();
        }

        (index, diagnostics)
    }

    pub fn is_crate(&self, name: &str) -> bool {
        self.crates.contains(name)
    }

    pub fn contains_function(&self, id: &FunctionId) -> bool {
        self.functions.contains(id)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Every indexed method with the given name, in a stable order.
    pub fn find_methods_by_name(&self, method_name: &str) -> Vec<FunctionId> {
        self.method_lookup
            .get(method_name)
            .map(|candidates| candidates.clone())
            .unwrap_or_default()
    }

    /// Index all items in a list (recursive for nested modules).
    fn index_items(&self, scope: &[String], items: &[Item]) {
        let package = package_of(scope);
        for item in items {
            match item {
                Item::Fn(func) => {
                    self.functions
                        .insert(FunctionId::new(package.clone(), func.sig.ident.to_string()));
                }
                Item::Impl(imp) => {
                    let Some(type_name) = type_ident(&imp.self_ty) else {
                        continue;
                    };
                    for impl_item in &imp.items {
                        if let ImplItem::Fn(method) = impl_item {
                            self.insert_method(&package, &type_name, &method.sig.ident.to_string());
                        }
                    }
                }
                Item::Trait(tr) => {
                    let trait_name = tr.ident.to_string();
                    for trait_item in &tr.items {
                        if let TraitItem::Fn(method) = trait_item {
                            if method.default.is_some() {
                                let name = method.sig.ident.to_string();
                                self.insert_method(&package, &trait_name, &name);
                            }
                        }
                    }
                }
                Item::Mod(module) => {
                    // Recurse into inline modules
                    if let Some((_, content)) = &module.content {
                        let mut inner = scope.to_vec();
                        inner.push(module.ident.to_string());
                        self.modules.insert(package_of(&inner));
                        self.index_items(&inner, content);
                    }
                }
                Item::Use(item_use) => {
                    let mut aliases = Vec::new();
                    let mut globs = Vec::new();
                    flatten_use(&item_use.tree, Vec::new(), &mut aliases, &mut globs);
                    if !aliases.is_empty() {
                        self.aliases
                            .entry(package.clone())
                            .or_default()
                            .extend(aliases);
                    }
                    if !globs.is_empty() {
                        self.globs.entry(package.clone()).or_default().extend(globs);
                    }
                }
                _ => {}
            }
        }
    }

    fn insert_method(&self, package: &str, type_name: &str, method_name: &str) {
        let id = FunctionId::new(package, format!("{}.{}", type_name, method_name));
        self.functions.insert(id.clone());
        self.method_lookup
            .entry(method_name.to_string())
            .or_default()
            .push(id);
    }

    fn alias(&self, scope: &[String], name: &str) -> Option<Vec<String>> {
        self.aliases
            .get(&package_of(scope))
            .and_then(|aliases| aliases.get(name).cloned())
    }

    /// Expands `crate`/`self`/`super`, workspace crate names, aliases and
    /// child modules into a crate-rooted path.
    pub fn expand(&self, scope: &[String], segments: &[String]) -> Option<PathTarget> {
        self.expand_with_depth(scope, segments, 0)
    }

    fn expand_with_depth(
        &self,
        scope: &[String],
        segments: &[String],
        depth: u8,
    ) -> Option<PathTarget> {
        let (first, rest) = segments.split_first()?;
        let joined = |mut base: Vec<String>| {
            base.extend(rest.iter().cloned());
            base
        };
        match first.as_str() {
            "crate" => scope.first().map(|krate| PathTarget::Internal(joined(vec![krate.clone()]))),
            "self" => Some(PathTarget::Internal(joined(scope.to_vec()))),
            "super" => {
                let supers = segments.iter().take_while(|s| *s == "super").count();
                if supers >= scope.len() {
                    return None;
                }
                let mut base = scope[..scope.len() - supers].to_vec();
                base.extend(segments[supers..].iter().cloned());
                Some(PathTarget::Internal(base))
            }
            name if self.is_crate(name) => Some(PathTarget::Internal(segments.to_vec())),
            name => {
                if let Some(aliased) = self.alias(scope, name) {
                    if depth >= MAX_ALIAS_DEPTH {
                        return None;
                    }
                    return match self.expand_with_depth(scope, &aliased, depth + 1)? {
                        PathTarget::Internal(base) => Some(PathTarget::Internal(joined(base))),
                        PathTarget::External(base) => Some(PathTarget::External(joined(base))),
                    };
                }
                let mut child = scope.to_vec();
                child.push(name.to_string());
                if self.modules.contains(&package_of(&child)) {
                    Some(PathTarget::Internal(joined(child)))
                } else {
                    Some(PathTarget::External(segments.to_vec()))
                }
            }
        }
    }

    /// Resolves a crate-rooted path to a known function or method.
    pub fn resolve_absolute(&self, path: &[String]) -> Option<FunctionId> {
        let n = path.len();
        if n >= 2 {
            let id = FunctionId::new(package_of(&path[..n - 1]), path[n - 1].clone());
            if self.functions.contains(&id) {
                return Some(id);
            }
        }
        if n >= 3 {
            let id = FunctionId::new(
                package_of(&path[..n - 2]),
                format!("{}.{}", path[n - 2], path[n - 1]),
            );
            if self.functions.contains(&id) {
                return Some(id);
            }
        }
        None
    }

    /// Resolves a called path expression written inside `scope`.
    ///
    /// `impl_type` is the type (or trait) whose body encloses the call.
    pub fn resolve_call(
        &self,
        scope: &[String],
        impl_type: Option<&str>,
        segments: &[String],
    ) -> Option<FunctionId> {
        let package = package_of(scope);
        match segments {
            [] => None,
            [name] => {
                let local = FunctionId::new(package.clone(), name.clone());
                if self.functions.contains(&local) {
                    return Some(local);
                }
                if self.alias(scope, name).is_some() {
                    return self.resolve_expanded(scope, segments);
                }
                let globs = self.globs.get(&package)?;
                globs.iter().find_map(|glob| match self.expand(scope, glob)? {
                    PathTarget::Internal(mut base) => {
                        base.push(name.clone());
                        self.resolve_absolute(&base)
                    }
                    PathTarget::External(_) => None,
                })
            }
            [first, method] if first == "Self" => {
                let id = FunctionId::new(package, format!("{}.{}", impl_type?, method));
                self.functions.contains(&id).then_some(id)
            }
            [type_name, method] => {
                let id = FunctionId::new(package, format!("{}.{}", type_name, method));
                if self.functions.contains(&id) {
                    return Some(id);
                }
                self.resolve_expanded(scope, segments)
            }
            _ => self.resolve_expanded(scope, segments),
        }
    }

    fn resolve_expanded(&self, scope: &[String], segments: &[String]) -> Option<FunctionId> {
        match self.expand(scope, segments)? {
            PathTarget::Internal(path) => self.resolve_absolute(&path),
            PathTarget::External(path) => external_function(segments, &path),
        }
    }
}

/// Calls into std or dependencies keep their written path as package.
///
/// Only module-like roots qualify: `Vec::new` has no package to report.
fn external_function(written: &[String], path: &[String]) -> Option<FunctionId> {
    let (name, package) = path.split_last()?;
    if package.is_empty() {
        return None;
    }
    let root = written.first()?;
    if written.len() > 1 && root.starts_with(|c: char| c.is_uppercase()) {
        return None;
    }
    Some(FunctionId::new(package_of(package), name.clone()))
}

/// Last path segment of an `impl` self type, e.g. `Server` for `impl<T> a::Server<T>`.
pub fn type_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(tp) => tp.path.segments.last().map(|s| s.ident.to_string()),
        Type::Reference(r) => type_ident(&r.elem),
        Type::Paren(p) => type_ident(&p.elem),
        _ => None,
    }
}

fn flatten_use(
    tree: &UseTree,
    prefix: Vec<String>,
    aliases: &mut Vec<(String, Vec<String>)>,
    globs: &mut Vec<Vec<String>>,
) {
    match tree {
        UseTree::Path(p) => {
            let mut next = prefix;
            next.push(p.ident.to_string());
            flatten_use(&p.tree, next, aliases, globs);
        }
        UseTree::Name(n) => {
            let ident = n.ident.to_string();
            if ident == "self" {
                if let Some(last) = prefix.last() {
                    aliases.push((last.clone(), prefix.clone()));
                }
            } else {
                let mut path = prefix;
                path.push(ident.clone());
                aliases.push((ident, path));
            }
        }
        UseTree::Rename(r) => {
            let mut path = prefix;
            path.push(r.ident.to_string());
            aliases.push((r.rename.to_string(), path));
        }
        UseTree::Glob(_) => globs.push(prefix),
        UseTree::Group(g) => {
            for item in &g.items {
                flatten_use(item, prefix.clone(), aliases, globs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(crate_name: &str, module_path: &[&str], code: &str) -> SourceFile {
        SourceFile {
            crate_name: crate_name.to_string(),
            module_path: module_path.iter().map(|s| s.to_string()).collect(),
            path: if module_path.is_empty() {
                PathBuf::from(format!("{}/lib.rs", crate_name))
            } else {
                PathBuf::from(format!("{}/{}.rs", crate_name, module_path.join("/")))
            },
            code: code.to_string(),
        }
    }

    fn segs(path: &str) -> Vec<String> {
        path.split("::").map(str::to_string).collect()
    }

    fn sample_index() -> SymbolIndex {
        let sources = vec![
            source(
                "app",
                &[],
                r#"
                mod util;
                use crate::util::helper as assist;
                use lib_core::*;
                use std::mem;
                fn main() {}
                pub struct Server;
                impl Server {
                    pub fn start(&self) {}
                }
                "#,
            ),
            source(
                "app",
                &["util"],
                r#"
                pub fn helper() {}
                pub mod deep { pub fn leaf() {} }
                "#,
            ),
            source("lib_core", &[], "pub fn run() {} pub trait Op { fn apply(&self) {} }"),
        ];
        let (index, diagnostics) = SymbolIndex::build(&sources);
        assert!(diagnostics.is_empty());
        index
    }

    #[test]
    fn indexes_functions_methods_and_modules() {
        let index = sample_index();
        assert!(index.contains_function(&FunctionId::new("app", "main")));
        assert!(index.contains_function(&FunctionId::new("app", "Server.start")));
        assert!(index.contains_function(&FunctionId::new("app/util/deep", "leaf")));
        assert!(index.contains_function(&FunctionId::new("lib_core", "Op.apply")));
        assert_eq!(
            index.find_methods_by_name("start"),
            vec![FunctionId::new("app", "Server.start")]
        );
    }

    #[test]
    fn resolves_relative_and_aliased_paths() {
        let index = sample_index();
        let root = vec!["app".to_string()];
        let util = vec!["app".to_string(), "util".to_string()];

        assert_eq!(
            index.resolve_call(&root, None, &segs("main")),
            Some(FunctionId::new("app", "main"))
        );
        assert_eq!(
            index.resolve_call(&root, None, &segs("assist")),
            Some(FunctionId::new("app/util", "helper"))
        );
        assert_eq!(
            index.resolve_call(&root, None, &segs("util::deep::leaf")),
            Some(FunctionId::new("app/util/deep", "leaf"))
        );
        assert_eq!(
            index.resolve_call(&util, None, &segs("super::main")),
            Some(FunctionId::new("app", "main"))
        );
        assert_eq!(
            index.resolve_call(&util, None, &segs("crate::Server::start")),
            Some(FunctionId::new("app", "Server.start"))
        );
        assert_eq!(
            index.resolve_call(&root, Some("Server"), &segs("Self::start")),
            Some(FunctionId::new("app", "Server.start"))
        );
    }

    #[test]
    fn resolves_glob_imports_into_other_crates() {
        let index = sample_index();
        let root = vec!["app".to_string()];
        assert_eq!(
            index.resolve_call(&root, None, &segs("run")),
            Some(FunctionId::new("lib_core", "run"))
        );
    }

    #[test]
    fn external_paths_keep_written_package() {
        let index = sample_index();
        let root = vec!["app".to_string()];
        assert_eq!(
            index.resolve_call(&root, None, &segs("mem::swap")),
            Some(FunctionId::new("std/mem", "swap"))
        );
        assert_eq!(
            index.resolve_call(&root, None, &segs("serde_json::to_string")),
            Some(FunctionId::new("serde_json", "to_string"))
        );
        assert_eq!(index.resolve_call(&root, None, &segs("Vec::new")), None);
        assert_eq!(index.resolve_call(&root, None, &segs("drop")), None);
    }

    #[test]
    fn parse_errors_are_reported() {
        let sources = vec![source("app", &[], "fn broken( {")];
        let (_, diagnostics) = SymbolIndex::build(&sources);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].path.ends_with("app/lib.rs"));
    }
}
