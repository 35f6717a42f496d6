//! `bootstrap` binary for the HTTP API handler

#[tokio::main]
async fn main() -> Result<(), lambdaflow_handlers::Error> {
    lambdaflow_handlers::serve(lambdaflow_handlers::api_handler::handle).await
}
