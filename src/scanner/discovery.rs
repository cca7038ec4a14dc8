use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A filesystem entry below the gallery root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub abs_path: PathBuf,
    /// Relative to the gallery root, `/`-separated.
    pub rel_path: String,
}

/// Every directory below `root` (the root itself excluded).
pub fn discover_directories(root: &Path) -> Vec<Entry> {
    walk(root, |entry| entry.file_type().is_dir())
}

/// Every regular file below `root` whose extension is in `extensions`.
///
/// Files placed directly in the root have no enclosing gallery node and are
/// skipped.
pub fn discover_images(root: &Path, extensions: &[String]) -> Vec<Entry> {
    let mut images = walk(root, |entry| {
        entry.file_type().is_file() && has_extension(entry.path(), extensions)
    });

    let before = images.len();
    images.retain(|entry| entry.rel_path.contains('/'));
    if images.len() < before {
        debug!(
            "Skipped {} image(s) outside any gallery directory",
            before - images.len()
        );
    }

    images
}

/// Entries are judged by their own file type, so symlinks are never taken
/// for files or directories.
fn walk(root: &Path, predicate: impl Fn(&DirEntry) -> bool) -> Vec<Entry> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !predicate(&entry) {
            continue;
        }
        let path = entry.path();

        match relative_key(root, path) {
            Some(rel_path) => entries.push(Entry {
                abs_path: path.to_path_buf(),
                rel_path,
            }),
            None => warn!("Skipping non UTF-8 path: {}", path.display()),
        }
    }

    // Sort by path for consistent ordering
    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    entries
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|e| e.to_lowercase() == ext_lower)
        }
        None => false,
    }
}

/// POSIX-style path of `path` relative to `root`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Parent key of a relative path (`""` at the top level).
pub fn parent_key(rel_path: &str) -> &str {
    rel_path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

/// Final component of a relative path.
pub fn name_of(rel_path: &str) -> &str {
    rel_path.rsplit_once('/').map(|(_, name)| name).unwrap_or(rel_path)
}

/// Number of separators in a relative path.
pub fn depth_of(rel_path: &str) -> i64 {
    rel_path.matches('/').count() as i64
}
