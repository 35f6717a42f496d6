use crate::utils;
use colored::Colorize;

pub fn handle() -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let project_root = match lambdaflow_core::find_project_root() {
        Ok(root) => root,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ プロジェクトルートが見つかりません".red().bold());
            eprintln!("  {}", e);
            eprintln!();
            eprintln!("stack.kdl が存在するディレクトリで実行してください");
            std::process::exit(1);
        }
    };
    println!(
        "プロジェクトルート: {}",
        project_root.display().to_string().cyan()
    );
    utils::print_loaded_config_files(&project_root);

    let result = utils::load_stack(&project_root).and_then(|stack| {
        lambdaflow_core::validate_stack(&stack)?;
        Ok(stack)
    });

    match result {
        Ok(stack) => {
            println!("{}", "✓ 設定ファイルは正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  プロジェクト: {}", stack.run.project.cyan());
            println!("  バケット: {}", stack.run.bucket_name);
            println!("  リージョン: {}", stack.run.region);
            utils::print_handlers(&stack);
            Ok(())
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {:#}", e);
            std::process::exit(1);
        }
    }
}
