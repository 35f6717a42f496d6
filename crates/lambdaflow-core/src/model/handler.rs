//! ハンドラー定義
//!
//! デプロイ対象の関数と、その関数を起動するトリガーの定義

use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// 関数ランタイムのデフォルト値
pub const DEFAULT_RUNTIME: &str = "nodejs18.x";

/// HTTPルートのデフォルトメソッド
pub const DEFAULT_METHOD: &str = "ANY";

/// 関数を起動するイベントソース
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    /// 共有APIゲートウェイ経由のHTTPリクエスト
    HttpApi,
    /// 共有トピックに発行されたメッセージ
    PubSub,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::HttpApi => "http-api",
            TriggerKind::PubSub => "pubsub",
        }
    }

    /// 関数の呼び出しを許可するサービスプリンシパル
    pub fn principal(&self) -> &'static str {
        match self {
            TriggerKind::HttpApi => "apigateway.amazonaws.com",
            TriggerKind::PubSub => "sns.amazonaws.com",
        }
    }

    /// 権限ステートメントIDに使う短いサービス名
    pub fn service(&self) -> &'static str {
        match self {
            TriggerKind::HttpApi => "apigateway",
            TriggerKind::PubSub => "sns",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http-api" | "http_api" | "http" | "apigateway" | "api-gateway" => {
                Ok(TriggerKind::HttpApi)
            }
            "pubsub" | "pub-sub" | "sns" => Ok(TriggerKind::PubSub),
            other => Err(FlowError::UnknownTrigger(other.to_string())),
        }
    }
}

/// HTTPルート設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRoute {
    /// パス（例: /hello）
    pub path: String,
    /// HTTPメソッド（GET, POST, ANY など）
    pub method: String,
}

impl HttpRoute {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            path,
            method: method.into().to_ascii_uppercase(),
        }
    }

    /// ハンドラー名から導出されるデフォルトルート
    pub fn default_for(handler_name: &str) -> Self {
        Self::new(format!("/{}", handler_name), DEFAULT_METHOD)
    }

    /// HTTP API のルートキー（例: "GET /hello"）
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// デプロイする関数と、そのトリガーの宣言
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// スタック内で一意
    pub name: String,

    /// アーティファクトバケット内のバンドルのキー
    pub artifact_key: String,

    /// エントリーポイント（例: `apiHandler.handler`）
    pub entry_point: String,

    pub runtime: String,

    pub triggers: BTreeSet<TriggerKind>,

    /// 明示的なHTTPルート。`None` なら [`HttpRoute::default_for`] を使う
    pub route: Option<HttpRoute>,

    /// 関数に渡す環境変数
    pub environment: BTreeMap<String, String>,
}

impl HandlerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            artifact_key: format!("{}.zip", name),
            entry_point: format!("{}.handler", name),
            runtime: DEFAULT_RUNTIME.to_string(),
            triggers: BTreeSet::new(),
            route: None,
            environment: BTreeMap::new(),
            name,
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerKind) -> Self {
        self.triggers.insert(trigger);
        self
    }

    pub fn with_route(mut self, route: HttpRoute) -> Self {
        self.route = Some(route);
        self
    }

    pub fn has_trigger(&self, trigger: TriggerKind) -> bool {
        self.triggers.contains(&trigger)
    }

    pub fn http_route(&self) -> HttpRoute {
        self.route
            .clone()
            .unwrap_or_else(|| HttpRoute::default_for(&self.name))
    }
}
