mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lambdaflow")]
#[command(about = "宣言したハンドラーを、そのままクラウドへ。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ビルド済みのハンドラーバンドルをアップロード
    Deploy {
        /// ハンドラー名 (<dist>/<handler>.zip をアップロード)
        handler: String,
        /// アップロード先のバケット名
        #[arg(short, long, env = "S3_BUCKET_NAME")]
        bucket: Option<String>,
        /// バンドルが置かれたディレクトリ
        #[arg(short, long, default_value = "dist")]
        dist: PathBuf,
        /// リージョン（未指定時はAWSの設定から解決）
        #[arg(short, long, env = "AWS_REGION")]
        region: Option<String>,
    },
    /// スタックをクラウドに反映
    Up {
        /// 失敗したハンドラーがあっても残りを処理する
        #[arg(short, long)]
        keep_going: bool,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 作成されるリソースを表示（変更は行わない）
    Plan,
    /// 設定を検証
    Validate,
    /// 状態ファイルに記録されたリソースを表示
    State {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrへ。RUST_LOG で上書き可能
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Version => {
            println!("lambdaflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Deploy {
            handler,
            bucket,
            dist,
            region,
        } => {
            commands::deploy::handle(&handler, bucket, &dist, region).await?;
        }
        Commands::Validate => {
            commands::validate::handle()?;
        }
        Commands::Up { keep_going, yes } => {
            let project_root = lambdaflow_core::find_project_root()?;
            commands::up::handle(&project_root, keep_going, yes).await?;
        }
        Commands::Plan => {
            let project_root = lambdaflow_core::find_project_root()?;
            commands::plan::handle(&project_root).await?;
        }
        Commands::State { json } => {
            let project_root = lambdaflow_core::find_project_root()?;
            commands::state::handle(&project_root, json).await?;
        }
    }

    Ok(())
}
