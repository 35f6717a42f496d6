use crate::utils;
use colored::Colorize;
use lambdaflow_cloud::{ActionType, Reconciler};
use std::path::Path;

pub async fn handle(project_root: &Path) -> anyhow::Result<()> {
    println!("{}", "実行計画を作成中...".blue());
    utils::print_loaded_config_files(project_root);

    let stack = utils::load_stack(project_root)?;
    lambdaflow_core::validate_stack(&stack)?;

    let (provider, store) = utils::connect_aws(project_root, &stack.run.region).await?;
    let reconciler = Reconciler::new(provider, store);
    let plan = reconciler.plan(&stack.run, &stack.handlers).await?;

    println!();
    for action in &plan.actions {
        let marker = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::NoOp => "=".dimmed(),
        };
        println!("  {} {:<40} {}", marker, action.key.to_string(), action.description);
    }

    for warning in &plan.warnings {
        println!("{} {}", "警告:".yellow(), warning);
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
    Ok(())
}
