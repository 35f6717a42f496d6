//! スタック定義
//!
//! 1回のプロビジョニングで扱う設定（バケット、リージョン、タグ）とハンドラー一覧

use super::handler::HandlerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 全ハンドラー共通の実行設定
///
/// 空文字列は未指定を表す。バケットとリージョンの未指定は [`crate::validate`] で弾く。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// プロジェクト名（タグと論理名のプレフィックスに使用）
    pub project: String,

    /// アーティファクトを格納するバケット名
    pub bucket_name: String,

    /// リージョン（eu-west-1 など）
    pub region: String,

    /// 関数に割り当てる実行ロールのARN
    pub execution_role: Option<String>,

    /// 作成する全リソースに付与するタグ
    pub tags: BTreeMap<String, String>,

    /// 共有ゲートウェイの論理名（未指定時は最初のHTTPハンドラー名から導出）
    pub gateway_name: Option<String>,

    /// 共有トピックの論理名（未指定時は最初のPubSubハンドラー名から導出）
    pub topic_name: Option<String>,
}

impl RunConfig {
    pub fn new(
        project: impl Into<String>,
        bucket_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            bucket_name: bucket_name.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// 別の設定を上書きマージ（空でない値のみ適用）
    pub fn merge(&mut self, other: RunConfig) {
        if !other.project.is_empty() {
            self.project = other.project;
        }
        if !other.bucket_name.is_empty() {
            self.bucket_name = other.bucket_name;
        }
        if !other.region.is_empty() {
            self.region = other.region;
        }
        if other.execution_role.is_some() {
            self.execution_role = other.execution_role;
        }
        if other.gateway_name.is_some() {
            self.gateway_name = other.gateway_name;
        }
        if other.topic_name.is_some() {
            self.topic_name = other.topic_name;
        }
        self.tags.extend(other.tags);
    }
}

/// デプロイの望ましい状態（実行設定と、入力順のハンドラー）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub run: RunConfig,
    pub handlers: Vec<HandlerConfig>,
}

impl Stack {
    pub fn handler(&self, name: &str) -> Option<&HandlerConfig> {
        self.handlers.iter().find(|h| h.name == name)
    }

    /// ローカルオーバーライドをマージ
    ///
    /// 同名のハンドラーはその位置で置き換え、新しいハンドラーは末尾に追加する。
    pub fn merge(&mut self, other: Stack) {
        self.run.merge(other.run);
        for handler in other.handlers {
            if let Some(existing) = self.handlers.iter_mut().find(|h| h.name == handler.name) {
                *existing = handler;
            } else {
                self.handlers.push(handler);
            }
        }
    }
}
