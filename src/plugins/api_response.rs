//! Completed API call reporting.
//!
//! Calls whose response status is outside 2xx are flagged important.

use serde_json::{json, Value};

use crate::client::Client;
use crate::command::command_type;
use crate::error::ClientError;
use crate::plugin::{arg, creator, Features, Plugin, PluginCreator};

/// API response plugin.
#[derive(Debug, Default)]
pub struct ApiResponsePlugin;

/// Creator for [`ApiResponsePlugin`].
pub fn api_response() -> PluginCreator {
    creator(|_client| ApiResponsePlugin)
}

fn is_success(response: &Value) -> bool {
    response
        .get("status")
        .and_then(Value::as_u64)
        .is_some_and(|status| (200..300).contains(&status))
}

impl Plugin for ApiResponsePlugin {
    fn name(&self) -> &str {
        "api_response"
    }

    fn features(&self) -> Features {
        Features::new().with("apiResponse", |client, args| {
            let response = arg(args, 1);
            client.send(
                command_type::API_RESPONSE,
                json!({ "request": arg(args, 0), "response": response, "duration": arg(args, 2) }),
                !is_success(response),
            );
            Ok(Value::Null)
        })
    }
}

/// Typed access to the API response feature.
pub trait ApiResponses {
    /// Report a finished request. `duration_ms` is the round-trip time.
    fn api_response(&mut self, request: Value, response: Value, duration_ms: f64) -> Result<(), ClientError>;
}

impl ApiResponses for Client {
    fn api_response(&mut self, request: Value, response: Value, duration_ms: f64) -> Result<(), ClientError> {
        self.call_feature("apiResponse", &[request, response, json!(duration_ms)])
            .map(drop)
    }
}
