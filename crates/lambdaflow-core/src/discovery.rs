//! ファイル自動発見機能
//!
//! プロジェクトルートと、その配下のスタック定義ファイルを探します。

use crate::error::{FlowError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// ルートファイル名
pub const STACK_FILE: &str = "stack.kdl";
/// ローカルオーバーライドファイル名
pub const STACK_LOCAL_FILE: &str = "stack.local.kdl";
/// プロジェクト内の作業ディレクトリ（状態ファイルもここに置く）
pub const PROJECT_DIR: &str = ".lambdaflow";

/// 発見されたファイル群
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// ルートファイル (stack.kdl)
    pub root: Option<PathBuf>,
    /// ローカルオーバーライドファイル (stack.local.kdl)
    pub local_override: Option<PathBuf>,
}

/// プロジェクトルートを検出
///
/// 以下の優先順位で検索:
/// 1. 環境変数 LAMBDAFLOW_PROJECT_ROOT
/// 2. カレントディレクトリから上に向かって以下を探す:
///    - stack.kdl
///    - .lambdaflow/stack.kdl
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("LAMBDAFLOW_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking LAMBDAFLOW_PROJECT_ROOT");
        if has_stack_file(&path) {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
    }

    let start_dir = std::env::current_dir()?;
    find_project_root_from(&start_dir)
}

/// 指定ディレクトリから上に向かってプロジェクトルートを探す
pub fn find_project_root_from(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();
    debug!(start_dir = %start_dir.display(), "Searching for project root");

    loop {
        if has_stack_file(&current) {
            info!(project_root = %current.display(), "Found project root");
            return Ok(current);
        }

        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(FlowError::ProjectRootNotFound(start_dir.to_path_buf()))
}

fn has_stack_file(dir: &Path) -> bool {
    dir.join(STACK_FILE).exists() || dir.join(PROJECT_DIR).join(STACK_FILE).exists()
}

/// プロジェクトルートからファイルを発見
#[tracing::instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn discover_files(project_root: &Path) -> DiscoveredFiles {
    let mut discovered = DiscoveredFiles::default();

    let base = if project_root.join(STACK_FILE).exists() {
        project_root.to_path_buf()
    } else {
        project_root.join(PROJECT_DIR)
    };

    let root_file = base.join(STACK_FILE);
    if root_file.exists() {
        debug!(file = %root_file.display(), "Found root file");
        discovered.root = Some(root_file);
    }

    let local_file = base.join(STACK_LOCAL_FILE);
    if local_file.exists() {
        debug!(file = %local_file.display(), "Found local override file");
        discovered.local_override = Some(local_file);
    }

    discovered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_project_root_walks_up() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(STACK_FILE), "").unwrap();
        let nested = temp.path().join("src/handlers");
        fs::create_dir_all(&nested).unwrap();

        let root = find_project_root_from(&nested).unwrap();
        assert_eq!(root, temp.path());
    }

    #[test]
    fn test_find_project_root_in_project_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(PROJECT_DIR)).unwrap();
        fs::write(temp.path().join(PROJECT_DIR).join(STACK_FILE), "").unwrap();

        let root = find_project_root_from(temp.path()).unwrap();
        assert_eq!(root, temp.path());

        let discovered = discover_files(&root);
        assert!(discovered.root.unwrap().ends_with(".lambdaflow/stack.kdl"));
    }

    #[test]
    fn test_discover_local_override() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(STACK_FILE), "").unwrap();
        fs::write(temp.path().join(STACK_LOCAL_FILE), "").unwrap();

        let discovered = discover_files(temp.path());
        assert!(discovered.root.is_some());
        assert!(discovered.local_override.is_some());
    }

    #[test]
    fn test_project_root_not_found() {
        let temp = TempDir::new().unwrap();
        let result = find_project_root_from(temp.path());
        assert!(matches!(result, Err(FlowError::ProjectRootNotFound(_))));
    }
}
