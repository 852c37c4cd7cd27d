use std::path::{Path, PathBuf};

/// Resolve the directory workflow discovery starts from.
///
/// Priority:
/// 1. `--root` flag / `DPC_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.git/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_repo_root(&cwd).unwrap_or(cwd)
}

/// Nearest ancestor of `start` (inclusive) containing a `.git/` directory.
fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_git_dir_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let subdir = dir.path().join(".github/workflows");
        std::fs::create_dir_all(&subdir).unwrap();
        assert_eq!(find_repo_root(&subdir).as_deref(), Some(dir.path()));
    }

    #[test]
    fn git_file_is_not_a_repo_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".git"), "gitdir: elsewhere").unwrap();
        let found = find_repo_root(dir.path());
        assert_ne!(found.as_deref(), Some(dir.path()));
    }
}
