//! 統合ローダー
//!
//! ファイル発見、パース、ローカルオーバーライド、環境変数による上書きを統合

use crate::discovery::{discover_files, find_project_root};
use crate::error::{FlowError, Result};
use crate::model::Stack;
use crate::parser::{parse_kdl_overlay, parse_kdl_string};
use std::path::Path;
use tracing::{debug, info, instrument};

/// バケット名を上書きする環境変数
pub const BUCKET_ENV: &str = "S3_BUCKET_NAME";
/// リージョン未指定時に参照する環境変数
pub const REGION_ENV: &str = "AWS_REGION";

/// プロジェクトを検出してスタックをロード
#[instrument]
pub fn load_stack() -> Result<Stack> {
    let project_root = find_project_root()?;
    load_stack_from_root(&project_root)
}

/// 指定されたルートディレクトリからスタックをロード
///
/// 読み込み順序: stack.kdl → stack.local.kdl → 環境変数
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_stack_from_root(project_root: &Path) -> Result<Stack> {
    let discovered = discover_files(project_root);
    let root_file = discovered
        .root
        .ok_or_else(|| FlowError::ProjectRootNotFound(project_root.to_path_buf()))?;

    let name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let content = std::fs::read_to_string(&root_file)?;
    let mut stack = parse_kdl_string(&content, name)?;

    if let Some(local) = discovered.local_override {
        debug!(file = %local.display(), "Merging local override");
        let overlay = parse_kdl_overlay(&std::fs::read_to_string(&local)?)?;
        stack.merge(overlay);
    }

    apply_env_overrides(&mut stack);

    info!(
        project = %stack.run.project,
        handlers = stack.handlers.len(),
        "Stack loaded successfully"
    );
    Ok(stack)
}

/// 環境変数による上書きを適用
///
/// - `S3_BUCKET_NAME` はバケット名を常に上書き
/// - `AWS_REGION` はリージョン未指定の場合のみ使用
pub fn apply_env_overrides(stack: &mut Stack) {
    if let Ok(bucket) = std::env::var(BUCKET_ENV)
        && !bucket.trim().is_empty()
    {
        debug!(bucket = %bucket, "Bucket overridden by {}", BUCKET_ENV);
        stack.run.bucket_name = bucket;
    }

    if stack.run.region.is_empty()
        && let Ok(region) = std::env::var(REGION_ENV)
    {
        stack.run.region = region;
    }
}
