// Directory tree scanning.
//
// The upload root is walked exactly once. The result is an arena of nodes
// with parent/child indices that both the batch uploader (file list) and the
// renderer (nested markup) read from, so the two can never disagree about
// which files exist or in what order they appear.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::DirectoryReadError;

/// What a directory entry is, as reported by the listing. Links are not
/// followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A single directory entry presented to an [`EntryFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    fn from_walk(entry: &walkdir::DirEntry) -> Self {
        let file_type = entry.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        FileEntry {
            path: entry.path().to_path_buf(),
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        }
    }
}

/// Inclusion predicate applied to every entry below the root. Rejecting a
/// directory skips its whole subtree.
pub trait EntryFilter {
    fn include(&self, entry: &FileEntry) -> bool;
}

impl<F> EntryFilter for F
where
    F: Fn(&FileEntry) -> bool,
{
    fn include(&self, entry: &FileEntry) -> bool {
        self(entry)
    }
}

/// Skip symbolic links and hidden entries.
pub fn skip_hidden_and_symlinks(entry: &FileEntry) -> bool {
    entry.kind != EntryKind::Symlink && !entry.name.starts_with('.')
}

/// Accept everything.
pub fn include_all(_: &FileEntry) -> bool {
    true
}

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct DirNode {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl DirNode {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Scanned directory tree. Node 0 is the root; nodes are stored in
/// depth-first pre-order with siblings sorted by file name.
#[derive(Debug, Clone)]
pub struct DirTree {
    nodes: Vec<DirNode>,
}

impl DirTree {
    /// Walk `root` once, keeping the entries `filter` accepts.
    ///
    /// Any directory that cannot be listed aborts the scan: silently
    /// skipping it would drop its files from the upload.
    pub fn scan(root: &Path, filter: &impl EntryFilter) -> Result<Self, DirectoryReadError> {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || filter.include(&FileEntry::from_walk(e)));

        let mut nodes: Vec<DirNode> = Vec::new();
        // stack[d] is the directory node currently open at depth d
        let mut stack: Vec<NodeId> = Vec::new();

        for item in walker {
            let entry = item.map_err(|source| DirectoryReadError {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf()),
                source,
            })?;
            let depth = entry.depth();
            let info = FileEntry::from_walk(&entry);
            let id = nodes.len();

            let parent = if depth == 0 {
                None
            } else {
                stack.truncate(depth);
                stack.last().copied()
            };
            if let Some(parent) = parent {
                nodes[parent].children.push(id);
            }
            if info.is_dir() {
                stack.push(id);
            }
            nodes.push(DirNode {
                name: info.name,
                path: info.path,
                kind: info.kind,
                parent,
                children: Vec::new(),
            });
        }

        debug!(root = %root.display(), nodes = nodes.len(), "scanned directory tree");
        Ok(DirTree { nodes })
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &DirNode {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &DirNode> + '_ {
        self.nodes[id].children.iter().map(|&c| &self.nodes[c])
    }

    /// Number of directories between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            depth += 1;
            cur = self.nodes[p].parent;
        }
        depth
    }

    /// Every non-directory entry below the root, in depth-first pre-order.
    pub fn files(&self) -> Vec<PathBuf> {
        // Arena order already is the pre-order traversal.
        self.nodes
            .iter()
            .skip(1)
            .filter(|n| !n.is_dir())
            .map(|n| n.path.clone())
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().skip(1).filter(|n| !n.is_dir()).count()
    }
}

/// Recursively list the files below `root` accepted by `filter`.
pub fn list_files(root: &Path, filter: &impl EntryFilter) -> Result<Vec<PathBuf>, DirectoryReadError> {
    Ok(DirTree::scan(root, filter)?.files())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        fs::write(base.join("b.txt"), "b").unwrap();
        fs::write(base.join("a.txt"), "a").unwrap();
        fs::create_dir_all(base.join("docs/nested")).unwrap();
        fs::write(base.join("docs/readme.md"), "r").unwrap();
        fs::write(base.join("docs/nested/deep.txt"), "d").unwrap();
        fs::create_dir(base.join(".git")).unwrap();
        fs::write(base.join(".git/config"), "c").unwrap();
        fs::write(base.join(".env"), "e").unwrap();
        tmp
    }

    #[test]
    fn lists_files_depth_first_in_name_order() {
        let tmp = sample_tree();
        let base = tmp.path();

        let files = list_files(base, &skip_hidden_and_symlinks).unwrap();

        assert_eq!(
            files,
            vec![
                base.join("a.txt"),
                base.join("b.txt"),
                base.join("docs/nested/deep.txt"),
                base.join("docs/readme.md"),
            ]
        );
    }

    #[test]
    fn rejected_directory_prunes_subtree() {
        let tmp = sample_tree();
        let base = tmp.path();

        let no_docs = |e: &FileEntry| skip_hidden_and_symlinks(e) && e.name != "docs";
        let files = list_files(base, &no_docs).unwrap();

        assert_eq!(files, vec![base.join("a.txt"), base.join("b.txt")]);
    }

    #[test]
    fn include_all_keeps_hidden_entries() {
        let tmp = sample_tree();
        let files = list_files(tmp.path(), &include_all).unwrap();
        assert_eq!(files.len(), 6);
        assert!(files.contains(&tmp.path().join(".git/config")));
    }

    #[test]
    fn empty_directory_has_no_files() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = DirTree::scan(tmp.path(), &skip_hidden_and_symlinks).unwrap();
        assert!(tree.files().is_empty());
        assert_eq!(tree.children(tree.root()).count(), 0);
    }

    #[test]
    fn tree_structure_matches_filesystem() {
        let tmp = sample_tree();
        let tree = DirTree::scan(tmp.path(), &skip_hidden_and_symlinks).unwrap();

        let top: Vec<&str> = tree.children(tree.root()).map(|n| n.name.as_str()).collect();
        assert_eq!(top, vec!["a.txt", "b.txt", "docs"]);

        let deep = tree
            .nodes
            .iter()
            .position(|n| n.name == "deep.txt")
            .unwrap();
        assert_eq!(tree.depth(deep), 3);
        assert_eq!(tree.file_count(), 4);
    }

    #[test]
    fn missing_root_is_a_read_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone");
        let err = DirTree::scan(&missing, &include_all).unwrap_err();
        assert_eq!(err.path, missing);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path();
        fs::write(base.join("real.txt"), "r").unwrap();
        std::os::unix::fs::symlink(base.join("real.txt"), base.join("link.txt")).unwrap();

        let files = list_files(base, &skip_hidden_and_symlinks).unwrap();
        assert_eq!(files, vec![base.join("real.txt")]);
    }
}
