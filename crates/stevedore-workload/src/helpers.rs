//! Small formatting and path helpers shared by the pipeline stages

use std::path::{Component, Path, PathBuf};

/// Format a millicpu value as a Kubernetes quantity, e.g. `250m`
pub fn cpu_quantity(millicpu: u32) -> String {
    format!("{}m", millicpu)
}

/// Format a MiB value as a Kubernetes quantity.
///
/// Uses `Gi` when the value is a whole number of GiB, `Mi` otherwise.
pub fn memory_quantity(mebibytes: u32) -> String {
    if mebibytes > 0 && mebibytes % 1024 == 0 {
        format!("{}Gi", mebibytes / 1024)
    } else {
        format!("{}Mi", mebibytes)
    }
}

/// Resolve `path` against `base` and normalize `.` and `..` lexically.
///
/// An absolute `path` ignores `base`. A relative `base` is anchored at the
/// current working directory so the result is always absolute.
pub fn resolve_path(base: &Path, path: &str) -> std::io::Result<PathBuf> {
    let joined = std::path::absolute(base.join(path))?;
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}
