//! Common path helpers shared across the codebase.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Relative module specifier from directory `from` to directory `to`, always
/// starting with `./` or `../` and using `/` separators.
///
/// ```
/// use std::path::Path;
/// use tsgen::utils::relative_specifier;
///
/// assert_eq!(relative_specifier(Path::new("src/a"), Path::new("src/b")), "../b");
/// assert_eq!(relative_specifier(Path::new("src"), Path::new("src/b/c")), "./b/c");
/// assert_eq!(relative_specifier(Path::new("src"), Path::new("src")), ".");
/// ```
pub fn relative_specifier(from: &Path, to: &Path) -> String {
    let from = normalize_path(from);
    let to = normalize_path(to);
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else if parts[0] == ".." {
        parts.join("/")
    } else {
        format!("./{}", parts.join("/"))
    }
}

/// Display form of a path relative to `base`, prefixed with `./`.
pub fn display_relative(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) => format!("./{}", rel.to_string_lossy().replace('\\', "/")),
        Err(_) => path.display().to_string(),
    }
}
