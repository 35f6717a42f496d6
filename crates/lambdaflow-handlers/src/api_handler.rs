//! HTTP API handler

use crate::HandlerResponse;
use serde_json::Value;

pub const MESSAGE: &str = "Hello from API Gateway!";

pub fn handle(event: &Value) -> HandlerResponse {
    tracing::info!(event = %event, "API Gateway event");
    HandlerResponse::ok_message(MESSAGE)
}
