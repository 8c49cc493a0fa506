//! Path sanitizing for request parameters.

use std::path::{Component, Path, PathBuf};

/// Reduce a client-supplied name to its final path component.
///
/// `"../../etc/passwd"` becomes `"passwd"`; names with no normal final
/// component (`""`, `".."`, `"/"`) yield `None`.
pub fn safe_component(input: &str) -> Option<&str> {
    let normalized = input.trim_end_matches(['/', '\\']);
    let last = normalized.rsplit(['/', '\\']).next()?;
    match last {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Resolve a patch reference against the web root.
///
/// A leading `/` or `./` is treated as relative to `root`. References that
/// climb out of `root` with `..` are refused.
pub fn resolve_under(root: &Path, reference: &str) -> Option<PathBuf> {
    let reference = reference.replace('\\', "/");
    let relative = Path::new(reference.trim_start_matches('/'));

    let mut resolved = root.to_path_buf();
    let mut pushed = false;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                resolved.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    pushed.then_some(resolved)
}
