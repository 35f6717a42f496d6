pub mod error;

pub use error::*;

use lambdaflow_core::RunConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 設定ファイル名
pub const SETTINGS_FILE: &str = "config.yaml";

/// ユーザー設定
///
/// `~/.config/lambdaflow/config.yaml` に保存される、スタックをまたいだデフォルト値。
///
/// ```yaml
/// bucket: my-artifacts
/// region: eu-west-1
/// tags:
///   owner: platform-team
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Settings {
    /// スタック側で未指定の項目にデフォルト値を補う（スタックの値が優先）
    pub fn apply_to(&self, run: &mut RunConfig) {
        if run.bucket_name.is_empty()
            && let Some(bucket) = &self.bucket
        {
            run.bucket_name = bucket.clone();
        }
        if run.region.is_empty()
            && let Some(region) = &self.region
        {
            run.region = region.clone();
        }
        for (key, value) in &self.tags {
            run.tags
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// lambdaflowの設定ディレクトリを取得（存在しなければ作成）
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("lambdaflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// 設定ファイルのパスを決定
///
/// 1. 環境変数 LAMBDAFLOW_CONFIG_PATH
/// 2. ~/.config/lambdaflow/config.yaml
pub fn settings_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("LAMBDAFLOW_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("lambdaflow").join(SETTINGS_FILE))
}

/// ユーザー設定をロード（ファイルがなければデフォルト）
pub fn load_settings() -> Result<Settings> {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => Ok(Settings::default()),
    }
}

/// 指定パスからユーザー設定をロード
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}
