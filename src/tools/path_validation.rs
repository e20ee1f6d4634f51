//! Project-root confinement for file tools.
//!
//! A path is resolved against the root, normalized lexically, and then
//! checked again through the deepest existing ancestor so that symlinks
//! cannot lead outside the root.

use std::path::{Component, Path, PathBuf};

/// Why a path was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty path argument.
    #[error("path is empty")]
    Empty,
    /// The root itself cannot be resolved.
    #[error("invalid project root")]
    InvalidRoot,
    /// The resolved path is outside the root.
    #[error("path escapes project root")]
    Escapes,
}

/// Collapse `.` and `..` without touching the filesystem.
///
/// Returns `None` when `..` would climb above the filesystem root.
pub fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}

fn first_existing_ancestor(path: &Path) -> Option<&Path> {
    path.ancestors().find(|p| p.exists())
}

/// Resolve `path` against `root` and confirm the result stays inside it.
///
/// Relative paths are joined to the root; absolute paths are accepted only
/// if they already point inside it. `..` is allowed while it stays within
/// the root. Returns the absolute target path.
///
/// # Errors
///
/// Returns [`PathError`] when the path is empty, the root is invalid, or
/// the target (or the real location of its nearest existing ancestor)
/// falls outside the root.
pub fn resolve_in_root(path: &str, root: &Path) -> Result<PathBuf, PathError> {
    if path.trim().is_empty() {
        return Err(PathError::Empty);
    }
    let root = root.canonicalize().map_err(|_| PathError::InvalidRoot)?;

    let joined = root.join(path);
    let target = normalize_lexically(&joined).ok_or(PathError::Escapes)?;
    if !target.starts_with(&root) {
        return Err(PathError::Escapes);
    }

    // Follow symlinks on whatever part of the path exists today.
    let ancestor = first_existing_ancestor(&target).ok_or(PathError::Escapes)?;
    let real = ancestor.canonicalize().map_err(|_| PathError::Escapes)?;
    if !real.starts_with(&root) {
        return Err(PathError::Escapes);
    }
    Ok(target)
}
