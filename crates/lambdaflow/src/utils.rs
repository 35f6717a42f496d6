use anyhow::Context;
use colored::Colorize;
use lambdaflow_cloud::{RunReport, StateManager};
use lambdaflow_cloud_aws::{AwsClients, AwsProvider, S3ArtifactStore};
use lambdaflow_core::{HandlerConfig, Stack, TriggerKind};
use std::path::Path;
use std::sync::Arc;

/// スタックをロードし、ユーザー設定のデフォルト値を補う
pub fn load_stack(project_root: &Path) -> anyhow::Result<Stack> {
    let mut stack = lambdaflow_core::load_stack_from_root(project_root)
        .with_context(|| format!("スタックを読み込めません: {}", project_root.display()))?;
    let settings =
        lambdaflow_config::load_settings().context("ユーザー設定を読み込めません")?;
    settings.apply_to(&mut stack.run);
    tracing::debug!(
        project = %stack.run.project,
        handlers = stack.handlers.len(),
        "Stack loaded"
    );
    Ok(stack)
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_config_files(project_root: &Path) {
    println!("📄 読み込んだ設定ファイル:");

    let files = lambdaflow_core::discover_files(project_root);
    if let Some(root) = files.root {
        println!("  • {}", root.display().to_string().cyan());
    }
    if let Some(local) = files.local_override {
        println!(
            "  • {} (ローカルオーバーライド)",
            local.display().to_string().cyan()
        );
    }
}

fn trigger_summary(handler: &HandlerConfig) -> String {
    handler
        .triggers
        .iter()
        .map(|t| match t {
            TriggerKind::HttpApi => format!("{} {}", t, handler.http_route().route_key()),
            TriggerKind::PubSub => t.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// ハンドラー一覧を表示
pub fn print_handlers(stack: &Stack) {
    println!("  ハンドラー: {}個", stack.handlers.len());
    for handler in &stack.handlers {
        println!(
            "    - {} ({}) [{}]",
            handler.name.cyan(),
            handler.runtime,
            trigger_summary(handler)
        );
    }
}

/// AWSプロバイダーとアーティファクトストアを用意
pub async fn connect_aws(
    project_root: &Path,
    region: &str,
) -> anyhow::Result<(Arc<AwsProvider>, Arc<S3ArtifactStore>)> {
    let clients = AwsClients::load(Some(region.to_string())).await;
    tracing::debug!(region = %clients.region, "AWS clients loaded");
    let store = Arc::new(S3ArtifactStore::new(clients.s3.clone()));
    let provider = AwsProvider::connect(clients, StateManager::new(project_root))
        .await
        .context("状態ファイルを読み込めません")?;
    Ok((Arc::new(provider), store))
}

/// 実行結果を表示
pub fn print_report(report: &RunReport) {
    println!();
    for outcome in &report.reconciled {
        println!("{} {}", "✓".green(), outcome.handler.cyan());
        for resource in &outcome.resources {
            let marker = if resource.created {
                "+".green()
            } else {
                "=".dimmed()
            };
            println!("    {} {} {}", marker, resource.key(), resource.id.dimmed());
        }
    }
    for failure in &report.failed {
        println!("{} {}: {}", "✗".red(), failure.handler.cyan(), failure.error);
    }
    for skipped in &report.skipped {
        println!("{} {} (スキップ)", "-".yellow(), skipped);
    }

    let created = report.created().count();
    println!();
    println!(
        "作成: {}個 / 処理したハンドラー: {}個 / 失敗: {}個 ({}ms)",
        created,
        report.reconciled.len(),
        report.failed.len(),
        report.duration_ms
    );
}
