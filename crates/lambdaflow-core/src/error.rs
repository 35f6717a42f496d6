use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("不明なトリガー種別: {0} (http-api または pubsub を指定してください)")]
    UnknownTrigger(String),

    #[error(
        "プロジェクトルートが見つかりません\n探索開始位置: {0}\nヒント: stack.kdl ファイルを含むディレクトリで実行してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// 事前検証エラー（プロバイダー呼び出しの前に発生）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ハンドラー名が重複しています: {0}")]
    DuplicateName(String),

    #[error("ハンドラー '{0}' にトリガーが指定されていません")]
    EmptyTriggerSet(String),

    #[error("必須項目が指定されていません: {0}")]
    MissingField(&'static str),

    #[error("ハンドラー名が空です")]
    EmptyName,

    #[error("HTTPルート '{route}' が重複しています（ハンドラー '{first}' と '{second}'）")]
    DuplicateRoute {
        route: String,
        first: String,
        second: String,
    },
}

pub type Result<T> = std::result::Result<T, FlowError>;
