use std::path::{Component, Path, PathBuf};

/// Resolves `path` to an absolute, normalized form without requiring it to exist.
///
/// Existing paths are canonicalized. For a path that does not exist yet, the
/// longest existing ancestor is canonicalized and the remaining components are
/// appended with `.` and `..` resolved lexically.
pub fn best_effort_absolute(path: &Path) -> PathBuf {
    if let Ok(canonical_path) = path.canonicalize() {
        return canonical_path;
    }

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(current_dir) => current_dir.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    let normalized = normalize_path(&absolute_path);

    let mut missing = Vec::new();
    let mut existing = normalized.as_path();
    while let Some(parent) = existing.parent() {
        if let Some(name) = existing.file_name() {
            missing.push(name.to_os_string());
        }
        existing = parent;
        if let Ok(canonical_parent) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical_parent, |acc, name| acc.join(name));
        }
    }

    normalized
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !components.is_empty() && !matches!(components.last(), Some(Component::RootDir))
                {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;

    /// True when one of the two paths is equal to, or nested inside, the other.
    fn overlaps_with(&self, other: &Path) -> bool;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_absolute(self).display().to_string()
    }

    fn overlaps_with(&self, other: &Path) -> bool {
        let this = best_effort_absolute(self);
        let other = best_effort_absolute(other);
        this.starts_with(&other) || other.starts_with(&this)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        self.as_path().best_effort_path_display()
    }

    fn overlaps_with(&self, other: &Path) -> bool {
        self.as_path().overlaps_with(other)
    }
}
