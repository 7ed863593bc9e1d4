use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Directory,
}

/// Hierarchical view of a snapshot. The root node has an empty `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeNode {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Bytes on disk; for directories the sum over all descendants.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileTreeNode>,
}

/// Flat listing entry, one per node except the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeEntry {
    pub path: String,
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

#[derive(Default)]
struct DirBuilder {
    dirs: BTreeMap<String, DirBuilder>,
    files: BTreeMap<String, u64>,
}

impl DirBuilder {
    fn insert(&mut self, parts: &[&str], size: u64) {
        match parts {
            [] => {}
            [name] => {
                self.files.insert((*name).to_string(), size);
            }
            [dir, rest @ ..] => self
                .dirs
                .entry((*dir).to_string())
                .or_default()
                .insert(rest, size),
        }
    }

    fn build(self, path: String, name: String) -> FileTreeNode {
        // Children interleave by name so that pre-order matches snapshot order.
        let mut named: BTreeMap<String, FileTreeNode> = BTreeMap::new();
        for (child, size) in self.files {
            let child_path = join(&path, &child);
            named.insert(
                child.clone(),
                FileTreeNode {
                    path: child_path,
                    name: child,
                    node_type: NodeType::File,
                    size,
                    children: Vec::new(),
                },
            );
        }
        for (child, dir) in self.dirs {
            let child_path = join(&path, &child);
            named.insert(child.clone(), dir.build(child_path, child));
        }

        let children: Vec<FileTreeNode> = named.into_values().collect();
        FileTreeNode {
            size: children.iter().map(|c| c.size).sum(),
            path,
            name,
            node_type: NodeType::Directory,
            children,
        }
    }
}

fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

impl FileTreeNode {
    /// Derive the tree from the snapshot listing, reading sizes from live
    /// file metadata (falling back to the recorded size when a file vanished).
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut root = DirBuilder::default();
        for file in snapshot.files() {
            let size = std::fs::metadata(snapshot.abs_path(&file.path))
                .map(|m| m.len())
                .unwrap_or(file.size);
            let parts: Vec<&str> = file.path.split('/').collect();
            root.insert(&parts, size);
        }

        let name = snapshot
            .root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        root.build(String::new(), name)
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    /// Number of file nodes in this subtree.
    pub fn file_count(&self) -> usize {
        match self.node_type {
            NodeType::File => 1,
            NodeType::Directory => self.children.iter().map(Self::file_count).sum(),
        }
    }

    /// Pre-order listing of every descendant.
    pub fn flatten(&self) -> Vec<FileTreeEntry> {
        let mut out = Vec::new();
        let mut stack: Vec<&FileTreeNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(FileTreeEntry {
                path: node.path.clone(),
                name: node.name.clone(),
                is_dir: node.is_dir(),
                size: node.size,
            });
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Paths of all files in pre-order.
    pub fn file_paths(&self) -> Vec<String> {
        self.flatten()
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.path)
            .collect()
    }
}
