//! Allow-list of directories tools may read and write

use std::path::{Component, Path, PathBuf};

use crate::error::ToolError;

#[derive(Debug, Clone)]
pub struct PathPolicy {
    base: PathBuf,
    allowed: Vec<PathBuf>,
}

impl PathPolicy {
    /// Relative entries are resolved against `base`; an empty list allows
    /// `base` itself.
    pub fn new(base: &Path, allowed: &[PathBuf]) -> Self {
        let base = normalize(base, Path::new("/"));
        let allowed = if allowed.is_empty() {
            vec![base.clone()]
        } else {
            allowed.iter().map(|dir| normalize(dir, &base)).collect()
        };
        Self { base, allowed }
    }

    /// Parse a comma separated directory list (the `ALLOWED_DIRECTORIES` format)
    pub fn parse_list(raw: &str) -> Vec<PathBuf> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    pub fn allowed(&self) -> &[PathBuf] {
        &self.allowed
    }

    /// Absolute, normalized form of `path` if it lies within an allowed
    /// directory.
    pub fn check(&self, path: &Path) -> Result<PathBuf, ToolError> {
        let resolved = normalize(path, &self.base);
        if self.allowed.iter().any(|dir| resolved.starts_with(dir)) {
            Ok(resolved)
        } else {
            Err(ToolError::AccessDenied {
                path: path.display().to_string(),
                allowed: self
                    .allowed
                    .iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    }
}

/// Lexical normalization: resolve `.` and `..` without touching the
/// filesystem.
fn normalize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allowed: &[&str]) -> PathPolicy {
        let allowed: Vec<PathBuf> = allowed.iter().map(PathBuf::from).collect();
        PathPolicy::new(Path::new("/work/app"), &allowed)
    }

    #[test]
    fn test_defaults_to_base() {
        let p = policy(&[]);
        assert!(p.check(Path::new("/work/app/src/a.ts")).is_ok());
        assert!(p.check(Path::new("src/a.ts")).is_ok());
        assert!(p.check(Path::new("/work/other/a.ts")).is_err());
    }

    #[test]
    fn test_directory_itself_is_allowed() {
        let p = policy(&["/srv/code"]);
        assert_eq!(
            p.check(Path::new("/srv/code")).unwrap(),
            PathBuf::from("/srv/code")
        );
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let p = policy(&["/srv/code"]);
        assert!(p.check(Path::new("/srv/code-evil/a.ts")).is_err());
    }

    #[test]
    fn test_parent_traversal_is_resolved() {
        let p = policy(&["/srv/code"]);
        assert!(p.check(Path::new("/srv/code/../secret/a.ts")).is_err());
        assert_eq!(
            p.check(Path::new("/srv/code/./lib/../src/a.ts")).unwrap(),
            PathBuf::from("/srv/code/src/a.ts")
        );
    }

    #[test]
    fn test_access_denied_message() {
        let p = policy(&["/srv/a", "/srv/b"]);
        let err = p.check(Path::new("/etc/passwd")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Access denied: /etc/passwd"));
        assert!(msg.contains("/srv/a, /srv/b"));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            PathPolicy::parse_list(" /a , /b/c,, "),
            vec![PathBuf::from("/a"), PathBuf::from("/b/c")]
        );
    }

    #[test]
    fn test_relative_allowed_entries() {
        let p = policy(&["packages"]);
        assert!(p.check(Path::new("/work/app/packages/x/y.ts")).is_ok());
        assert!(p.check(Path::new("/work/app/src/y.ts")).is_err());
    }
}
