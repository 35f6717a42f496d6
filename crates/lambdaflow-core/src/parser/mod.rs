//! KDLパーサー
//!
//! lambdaflowのスタック定義ファイル（stack.kdl）をパースします。

mod handler;

use handler::parse_handler;

use crate::error::{FlowError, Result};
use crate::model::Stack;
use kdl::{KdlDocument, KdlNode};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてStackを生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Stack> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// KDL文字列をパース
///
/// `project` ノードがない場合は `default_name` をプロジェクト名に使用します。
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<Stack> {
    let mut stack = parse_kdl_overlay(content)?;
    if stack.run.project.is_empty() {
        stack.run.project = default_name;
    }
    Ok(stack)
}

/// オーバーライド用にパース（未指定の項目は空のまま）
pub fn parse_kdl_overlay(content: &str) -> Result<Stack> {
    let doc: KdlDocument = content.parse()?;
    let mut stack = Stack::default();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(name) = first_string(node) {
                    stack.run.project = name;
                }
            }
            "bucket" | "s3-bucket" | "s3_bucket" => {
                stack.run.bucket_name = first_string(node).unwrap_or_default();
            }
            "region" => {
                stack.run.region = first_string(node).unwrap_or_default();
            }
            "execution-role" | "execution_role" | "role" => {
                stack.run.execution_role = first_string(node);
            }
            "gateway" => {
                stack.run.gateway_name = first_string(node);
            }
            "topic" => {
                stack.run.topic_name = first_string(node);
            }
            "tags" => {
                stack.run.tags.extend(parse_string_map(node));
            }
            "handler" => {
                // 重複名はここでは弾かず、validate で DuplicateName として報告する
                stack.handlers.push(parse_handler(node)?);
            }
            other => {
                return Err(FlowError::InvalidConfig(format!(
                    "不明なノード: {}",
                    other
                )));
            }
        }
    }

    Ok(stack)
}

/// ノードの最初の引数を文字列として取得
pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// 名前付きプロパティを文字列として取得（例: method="GET"）
pub(crate) fn property_string(node: &KdlNode, key: &str) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().map(|n| n.value()) == Some(key))
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// `{ KEY "value" }` 形式の子ノードをマップに変換
pub(crate) fn parse_string_map(node: &KdlNode) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if let Some(value) = first_string(child) {
                map.insert(child.name().value().to_string(), value);
            }
        }
    }
    map
}
