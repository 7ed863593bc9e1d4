//! Import resolution.
//!
//! Each language maps an [`ImportRef`] to the module ids it refers to. Module
//! ids are relative file paths, except for Go where a package is its
//! directory (`.` for the root).

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::indexer::ImportRef;
use crate::symbol::RepoMap;

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

/// Where an import points.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// A module id inside the snapshot
    Internal(String),
    /// A name outside the snapshot (package, crate, stdlib)
    External(String),
}

/// Lookup tables built once per repository map.
pub struct Resolver {
    files: HashSet<String>,
    languages: HashMap<String, &'static str>,
    /// dotted-name suffix -> python files, in map order
    python_modules: HashMap<String, Vec<String>>,
    /// dotted-name suffix -> java files, in map order
    java_classes: HashMap<String, Vec<String>>,
    /// directories holding Go files
    go_packages: Vec<String>,
    go_module: Option<String>,
}

impl Resolver {
    /// `go_module` is the module path declared in `go.mod`, when known.
    pub fn new(map: &RepoMap, go_module: Option<&str>) -> Self {
        let mut resolver = Self {
            files: HashSet::new(),
            languages: HashMap::new(),
            python_modules: HashMap::new(),
            java_classes: HashMap::new(),
            go_packages: Vec::new(),
            go_module: go_module.map(|m| m.trim_end_matches('/').to_string()),
        };

        for entry in map.files() {
            resolver.files.insert(entry.path.clone());
            resolver.languages.insert(entry.path.clone(), entry.language);
            match entry.language {
                "python" => {
                    let path = entry.path.as_str();
                    let stem = path
                        .strip_suffix(".py")
                        .or_else(|| path.strip_suffix(".pyi"))
                        .unwrap_or(path);
                    let stem = match stem {
                        "__init__" => "",
                        _ => stem.strip_suffix("/__init__").unwrap_or(stem),
                    };
                    index_suffixes(&mut resolver.python_modules, stem, &entry.path);
                }
                "java" => {
                    let stem = entry.path.trim_end_matches(".java");
                    index_suffixes(&mut resolver.java_classes, stem, &entry.path);
                }
                "go" => {
                    let dir = go_package(&entry.path);
                    if !resolver.go_packages.contains(&dir) {
                        resolver.go_packages.push(dir);
                    }
                }
                _ => {}
            }
        }
        resolver
    }

    /// Module id for a file: the file itself, or its package directory for Go.
    pub fn module_id(&self, path: &str) -> String {
        match self.languages.get(path) {
            Some(&"go") => go_package(path),
            _ => path.to_string(),
        }
    }

    /// Resolve one import of `importer`. Usually one result; Python
    /// `from pkg import a, b` and Java wildcards may give several.
    pub fn resolve(&self, importer: &str, import: &ImportRef) -> Vec<Resolution> {
        let language = self.languages.get(importer).copied().unwrap_or("");
        match language {
            "python" => self.resolve_python(importer, import),
            "javascript" | "typescript" | "tsx" => vec![self.resolve_js(importer, &import.target)],
            "rust" => vec![self.resolve_rust(importer, &import.target)],
            "go" => vec![self.resolve_go(&import.target)],
            "java" => self.resolve_java(&import.target),
            _ => vec![Resolution::External(import.target.clone())],
        }
    }

    fn resolve_python(&self, importer: &str, import: &ImportRef) -> Vec<Resolution> {
        let target = import.target.as_str();
        let dots = target.chars().take_while(|&c| c == '.').count();

        if dots > 0 {
            let mut base: Vec<&str> = parent_dir(importer).split('/').filter(|s| !s.is_empty()).collect();
            for _ in 1..dots {
                base.pop();
            }
            let rest = &target[dots..];
            let module_dir = join_dir(&base.join("/"), &rest.replace('.', "/"));

            let mut resolved: Vec<Resolution> = import
                .names
                .iter()
                .filter(|n| n.as_str() != "*")
                .filter_map(|name| self.python_file(&join_dir(&module_dir, name)))
                .map(Resolution::Internal)
                .collect();
            if resolved.len() < import.names.len() || import.names.is_empty() {
                match self.python_file(&module_dir) {
                    Some(file) => resolved.push(Resolution::Internal(file)),
                    None if resolved.is_empty() => {
                        resolved.push(Resolution::External(target.to_string()))
                    }
                    None => {}
                }
            }
            return dedup(resolved);
        }

        let mut resolved: Vec<Resolution> = import
            .names
            .iter()
            .filter(|n| n.as_str() != "*")
            .filter_map(|name| self.python_module(&format!("{target}.{name}")))
            .map(Resolution::Internal)
            .collect();
        if resolved.len() < import.names.len() || import.names.is_empty() {
            match self.python_module(target) {
                Some(file) => resolved.push(Resolution::Internal(file)),
                None if resolved.is_empty() => {
                    resolved.push(Resolution::External(target.to_string()))
                }
                None => {}
            }
        }
        dedup(resolved)
    }

    /// `dir/name.py`, `dir/name.pyi` or `dir/name/__init__.py`.
    fn python_file(&self, stem: &str) -> Option<String> {
        let candidates = if stem.is_empty() {
            vec!["__init__.py".to_string()]
        } else {
            vec![
                format!("{stem}.py"),
                format!("{stem}.pyi"),
                format!("{stem}/__init__.py"),
            ]
        };
        candidates.into_iter().find(|c| self.files.contains(c))
    }

    fn python_module(&self, dotted: &str) -> Option<String> {
        self.python_modules
            .get(dotted)
            .and_then(|files| files.first())
            .cloned()
    }

    fn resolve_js(&self, importer: &str, specifier: &str) -> Resolution {
        if !(specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == "..") {
            return Resolution::External(js_package_name(specifier));
        }

        let joined = normalize_path(&join_dir(parent_dir(importer), specifier));
        let Some(joined) = joined else {
            return Resolution::External(specifier.to_string());
        };

        let mut candidates = vec![joined.clone()];
        // `./x.js` written in TypeScript refers to `./x.ts`.
        let stripped = JS_EXTENSIONS
            .iter()
            .find_map(|ext| joined.strip_suffix(&format!(".{ext}")))
            .unwrap_or(joined.as_str())
            .to_string();
        for ext in JS_EXTENSIONS {
            candidates.push(format!("{stripped}.{ext}"));
        }
        for ext in JS_EXTENSIONS {
            candidates.push(join_dir(&joined, &format!("index.{ext}")));
        }

        candidates
            .into_iter()
            .find(|c| self.files.contains(c))
            .map(Resolution::Internal)
            .unwrap_or_else(|| Resolution::External(specifier.to_string()))
    }

    fn resolve_rust(&self, importer: &str, target: &str) -> Resolution {
        let segments: Vec<&str> = target.split("::").filter(|s| !s.is_empty()).collect();
        let Some((&head, rest)) = segments.split_first() else {
            return Resolution::External(target.to_string());
        };

        let Some(root) = self.rust_crate_root(importer) else {
            return Resolution::External(head.to_string());
        };
        let current = rust_module_path(&root, importer);

        let mut module: Vec<&str> = match head {
            "crate" => Vec::new(),
            "self" => current.clone(),
            "super" => {
                let mut parent = current.clone();
                parent.pop();
                parent
            }
            _ => return Resolution::External(head.to_string()),
        };
        let mut rest = rest;
        while let Some((&"super", tail)) = rest.split_first() {
            module.pop();
            rest = tail;
        }
        module.extend(rest.iter().copied().filter(|s| *s != "*"));

        // Longest prefix that names a file; items inside it are ignored.
        for len in (1..=module.len()).rev() {
            let path = module[..len].join("/");
            for candidate in [
                join_dir(&root, &format!("{path}.rs")),
                join_dir(&root, &format!("{path}/mod.rs")),
            ] {
                if self.files.contains(&candidate) {
                    return Resolution::Internal(candidate);
                }
            }
        }
        match self.rust_root_file(&root) {
            Some(file) => Resolution::Internal(file),
            None => Resolution::External(target.to_string()),
        }
    }

    /// Nearest ancestor directory holding `lib.rs` or `main.rs`.
    fn rust_crate_root(&self, importer: &str) -> Option<String> {
        let mut dir = parent_dir(importer).to_string();
        loop {
            if self.rust_root_file(&dir).is_some() {
                return Some(dir);
            }
            if dir.is_empty() {
                return None;
            }
            dir = parent_dir(&dir).to_string();
        }
    }

    fn rust_root_file(&self, dir: &str) -> Option<String> {
        ["lib.rs", "main.rs"]
            .iter()
            .map(|f| join_dir(dir, f))
            .find(|c| self.files.contains(c))
    }

    fn resolve_go(&self, target: &str) -> Resolution {
        if let Some(module) = &self.go_module {
            if target == module {
                if self.go_packages.iter().any(|p| p == ".") {
                    return Resolution::Internal(".".to_string());
                }
            } else if let Some(rel) = target.strip_prefix(&format!("{module}/")) {
                if self.go_packages.iter().any(|p| p == rel) {
                    return Resolution::Internal(rel.to_string());
                }
            }
        }

        self.go_packages
            .iter()
            .filter(|dir| dir.as_str() != ".")
            .filter(|dir| target == dir.as_str() || target.ends_with(&format!("/{dir}")))
            .max_by_key(|dir| dir.len())
            .map(|dir| Resolution::Internal(dir.clone()))
            .unwrap_or_else(|| Resolution::External(target.to_string()))
    }

    fn resolve_java(&self, target: &str) -> Vec<Resolution> {
        if let Some(package) = target.strip_suffix(".*") {
            let members: BTreeSet<String> = self
                .java_classes
                .iter()
                .filter(|(name, _)| name.rsplit_once('.').map(|(pkg, _)| pkg) == Some(package))
                .filter_map(|(_, files)| files.first().cloned())
                .collect();
            if !members.is_empty() {
                return members.into_iter().map(Resolution::Internal).collect();
            }
            // The package may name an outer class: `import a.B.*`.
            return match self.java_class(package) {
                Some(file) => vec![Resolution::Internal(file)],
                None => vec![Resolution::External(target.to_string())],
            };
        }

        // Static imports and nested classes: drop trailing segments until a
        // class file matches.
        let mut name = target;
        loop {
            if let Some(file) = self.java_class(name) {
                return vec![Resolution::Internal(file)];
            }
            match name.rsplit_once('.') {
                Some((outer, _)) => name = outer,
                None => return vec![Resolution::External(target.to_string())],
            }
        }
    }

    fn java_class(&self, dotted: &str) -> Option<String> {
        // A bare class name would match any same-named file; require a package.
        if !dotted.contains('.') {
            return None;
        }
        self.java_classes
            .get(dotted)
            .and_then(|files| files.first())
            .cloned()
    }
}

/// Register every dotted suffix of `stem` (`a/b/c` -> `a.b.c`, `b.c`, `c`).
fn index_suffixes(table: &mut HashMap<String, Vec<String>>, stem: &str, path: &str) {
    let parts: Vec<&str> = stem.split('/').filter(|s| !s.is_empty()).collect();
    for start in 0..parts.len() {
        let files = table.entry(parts[start..].join(".")).or_default();
        if !files.iter().any(|f| f == path) {
            files.push(path.to_string());
        }
    }
}

fn go_package(path: &str) -> String {
    match parent_dir(path) {
        "" => ".".to_string(),
        dir => dir.to_string(),
    }
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn join_dir(dir: &str, rest: &str) -> String {
    match (dir.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => dir.to_string(),
        _ => format!("{dir}/{rest}"),
    }
}

/// Collapse `.` and `..`; `None` when the path climbs above the root.
fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// `@scope/pkg/sub` -> `@scope/pkg`, `lodash/fp` -> `lodash`.
fn js_package_name(specifier: &str) -> String {
    let mut parts = specifier.split('/');
    match (parts.next(), parts.next()) {
        (Some(scope), Some(name)) if scope.starts_with('@') => format!("{scope}/{name}"),
        (Some(name), _) => name.to_string(),
        _ => specifier.to_string(),
    }
}

/// Module path of a Rust file relative to its crate root directory.
fn rust_module_path<'a>(root: &str, file: &'a str) -> Vec<&'a str> {
    let relative = if root.is_empty() {
        file
    } else {
        file.strip_prefix(root)
            .and_then(|r| r.strip_prefix('/'))
            .unwrap_or(file)
    };
    let mut segments: Vec<&str> = relative.split('/').collect();
    if let Some(last) = segments.pop() {
        match last {
            "lib.rs" | "main.rs" | "mod.rs" => {}
            name => segments.push(name.trim_end_matches(".rs")),
        }
    }
    segments
}

fn dedup(resolutions: Vec<Resolution>) -> Vec<Resolution> {
    let mut seen = HashSet::new();
    resolutions
        .into_iter()
        .filter(|r| seen.insert(r.clone()))
        .collect()
}
