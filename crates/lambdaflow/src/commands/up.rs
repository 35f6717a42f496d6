use crate::utils;
use anyhow::Context;
use colored::Colorize;
use lambdaflow_cloud::{CloudProvider, Reconciler, RunContext, RunOptions, StateManager};
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub async fn handle(project_root: &Path, keep_going: bool, yes: bool) -> anyhow::Result<()> {
    println!("{}", "スタックを反映します...".blue().bold());
    utils::print_loaded_config_files(project_root);

    let stack = utils::load_stack(project_root)?;
    lambdaflow_core::validate_stack(&stack)?;

    println!();
    println!("プロジェクト: {}", stack.run.project.cyan());
    println!(
        "バケット: {} ({})",
        stack.run.bucket_name.cyan(),
        stack.run.region
    );
    utils::print_handlers(&stack);

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!(
            "{}",
            "警告: AWS上にリソースを作成します。変更内容は `lambdaflow plan` で確認できます。"
                .yellow()
        );
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let lock = StateManager::new(project_root)
        .acquire_lock()
        .await
        .context("別の `lambdaflow up` が実行中の可能性があります")?;

    let (provider, store) = utils::connect_aws(project_root, &stack.run.region).await?;
    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        lock.release().await?;
        return Err(anyhow::anyhow!(
            "AWSの認証に失敗しました: {}",
            auth.error.unwrap_or_default()
        ));
    }
    println!(
        "{}: アカウント {}",
        provider.display_name(),
        auth.account_info.unwrap_or_default().cyan()
    );

    // Ctrl+C で実行中のハンドラーを終えたら停止する
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                "中断要求を受け付けました。処理中のハンドラーが終わり次第停止します...".yellow()
            );
            signal_token.cancel();
        }
    });

    let ctx = RunContext::new(stack.run.clone()).with_cancellation(cancel);
    let reconciler =
        Reconciler::new(provider, store).with_options(RunOptions { keep_going });

    let result = reconciler.run(&ctx, &stack.handlers).await;
    lock.release().await?;
    let report = result?;

    utils::print_report(&report);
    if let Some(gateway) = ctx.gateway()
        && let Some(endpoint) = &gateway.endpoint
    {
        println!("エンドポイント: {}", endpoint.cyan());
    }
    if let Some(topic) = ctx.topic() {
        println!("トピック: {}", topic.arn.cyan());
    }

    if report.cancelled {
        return Err(anyhow::anyhow!("中断されました"));
    }
    if !report.is_success() {
        return Err(anyhow::anyhow!(
            "{}個のハンドラーが失敗しました（再実行しても作成済みのリソースは重複しません）",
            report.failed.len()
        ));
    }

    println!("{}", "✓ スタックを反映しました".green().bold());
    Ok(())
}
