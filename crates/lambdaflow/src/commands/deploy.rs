use colored::Colorize;
use lambdaflow_cloud::{ArtifactPublisher, bundle_key};
use lambdaflow_cloud_aws::{AwsClients, S3ArtifactStore};
use std::path::Path;
use std::sync::Arc;

/// バケット名を決定する
///
/// 優先順位: --bucket / S3_BUCKET_NAME → stack.kdl → ユーザー設定
fn resolve_bucket(bucket: Option<String>) -> anyhow::Result<String> {
    if let Some(bucket) = bucket.filter(|b| !b.trim().is_empty()) {
        return Ok(bucket);
    }

    if let Ok(root) = lambdaflow_core::find_project_root()
        && let Ok(stack) = crate::utils::load_stack(&root)
        && !stack.run.bucket_name.is_empty()
    {
        return Ok(stack.run.bucket_name);
    }

    if let Some(bucket) = lambdaflow_config::load_settings()?.bucket {
        return Ok(bucket);
    }

    Err(anyhow::anyhow!(
        "バケット名が指定されていません: --bucket <name> または S3_BUCKET_NAME=<name> を指定してください"
    ))
}

pub async fn handle(
    handler: &str,
    bucket: Option<String>,
    dist: &Path,
    region: Option<String>,
) -> anyhow::Result<()> {
    let bucket = resolve_bucket(bucket)?;

    let bundle = dist.join(bundle_key(handler));
    if !bundle.exists() {
        return Err(anyhow::anyhow!(
            "バンドルが見つかりません: {}",
            bundle.display()
        ));
    }

    println!(
        "{} {} → s3://{}/{}",
        "アップロード中:".blue(),
        bundle.display().to_string().cyan(),
        bucket,
        bundle_key(handler)
    );

    let clients = AwsClients::load(region).await;
    let store = Arc::new(S3ArtifactStore::new(clients.s3));
    let publisher = ArtifactPublisher::new(store, bucket, dist);

    match publisher.publish(handler).await {
        Ok(object) => {
            println!(
                "{} {} を {} にアップロードしました",
                "✓".green(),
                bundle.display(),
                object.to_string().cyan()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", "✗ アップロードに失敗しました".red().bold());
            Err(e.into())
        }
    }
}
