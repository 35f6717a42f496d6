//! SNS handler

use crate::HandlerResponse;
use serde_json::Value;

pub const MESSAGE: &str = "Hello from SNS!";

pub fn handle(event: &Value) -> HandlerResponse {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    tracing::info!(records, event = %event, "SNS event");
    HandlerResponse::ok_message(MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handle_sns_records() {
        let event = json!({
            "Records": [{
                "EventSource": "aws:sns",
                "Sns": {
                    "Message": "ping",
                    "TopicArn": "arn:aws:sns:eu-west-1:123456789012:snsHandler-sns"
                }
            }]
        });
        let response = handle(&event);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"message":"Hello from SNS!"}"#);
    }
}
