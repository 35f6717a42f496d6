use colored::Colorize;
use lambdaflow_cloud::StateManager;
use std::path::Path;

pub async fn handle(project_root: &Path, json: bool) -> anyhow::Result<()> {
    let manager = StateManager::new(project_root);
    let state = manager.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    if state.resources.is_empty() {
        println!("{}", "記録されたリソースはありません".yellow());
        return Ok(());
    }

    println!(
        "状態ファイル: {}",
        manager.state_path().display().to_string().cyan()
    );
    println!("リソース: {}個", state.resources.len());
    for (key, resource) in &state.resources {
        println!(
            "  • {} {} {}",
            key.cyan(),
            resource.id,
            resource
                .arn
                .as_deref()
                .unwrap_or_default()
                .dimmed()
        );
    }
    println!("最終更新: {}", state.updated_at.to_rfc3339());
    Ok(())
}
