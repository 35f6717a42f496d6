//! Sample handlers
//!
//! Both handlers log the incoming event and answer with a fixed greeting in
//! the proxy response shape expected by API Gateway and SNS invocations.
//! Each one ships as its own binary (`api-handler`, `sns-handler`) served by
//! `lambda_runtime`, so the bundle for a handler is the binary renamed to
//! `bootstrap` and zipped as `<handler>.zip`. Declare such handlers with the
//! custom runtime:
//!
//! ```kdl
//! handler "apiHandler" {
//!     runtime "provided.al2023"
//!     entry-point "bootstrap"
//!     trigger "http-api"
//!     route "/hello" method="GET"
//! }
//! ```

pub mod api_handler;
pub mod sns_handler;

use lambda_runtime::{LambdaEvent, service_fn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

pub use lambda_runtime::Error;

/// Proxy-style response: `{"statusCode": 200, "body": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    /// JSON-encoded body
    pub body: String,
}

impl HandlerResponse {
    /// 200 response whose body is `{"message": <message>}`
    pub fn ok_message(message: &str) -> Self {
        Self {
            status_code: 200,
            body: serde_json::json!({ "message": message }).to_string(),
        }
    }
}

/// Signature shared by the handlers in this crate
pub type Handler = fn(&Value) -> HandlerResponse;

/// Run `handler` for one runtime invocation
pub async fn invoke(handler: Handler, event: LambdaEvent<Value>) -> Result<HandlerResponse, Error> {
    let (payload, context) = event.into_parts();
    tracing::debug!(request_id = %context.request_id, "Invocation received");
    Ok(handler(&payload))
}

/// Serve `handler` on the Lambda runtime API until the sandbox shuts down.
pub async fn serve(handler: Handler) -> Result<(), Error> {
    // CloudWatch adds its own timestamps
    tracing_subscriber::fmt()
        .with_target(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    lambda_runtime::run(service_fn(move |event| invoke(handler, event))).await
}
