//! `bootstrap` binary for the SNS handler

#[tokio::main]
async fn main() -> Result<(), lambdaflow_handlers::Error> {
    lambdaflow_handlers::serve(lambdaflow_handlers::sns_handler::handle).await
}
