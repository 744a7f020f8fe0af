//! Log lines shown in the server timeline.
//!
//! Features: `log`, `logImportant`, `debug`, `warn`, `error`. All send a `log`
//! command with a `level`; warnings and errors are always important.

use serde_json::{json, Value};

use crate::client::Client;
use crate::command::command_type;
use crate::error::ClientError;
use crate::plugin::{arg, arg_flag, creator, Features, Plugin, PluginCreator};

/// Logger plugin.
#[derive(Debug, Default)]
pub struct LoggerPlugin;

/// Creator for [`LoggerPlugin`].
pub fn logger() -> PluginCreator {
    creator(|_client| LoggerPlugin)
}

/// `log`/`logImportant` accept any number of values; one is sent bare, more as an array.
fn message_of(args: &[Value]) -> Value {
    match args {
        [single] => single.clone(),
        many => Value::Array(many.to_vec()),
    }
}

impl Plugin for LoggerPlugin {
    fn name(&self) -> &str {
        "logger"
    }

    fn features(&self) -> Features {
        Features::new()
            .with("log", |client, args| {
                client.send(
                    command_type::LOG,
                    json!({ "level": "debug", "message": message_of(args) }),
                    false,
                );
                Ok(Value::Null)
            })
            .with("logImportant", |client, args| {
                client.send(
                    command_type::LOG,
                    json!({ "level": "debug", "message": message_of(args) }),
                    true,
                );
                Ok(Value::Null)
            })
            .with("debug", |client, args| {
                client.send(
                    command_type::LOG,
                    json!({ "level": "debug", "message": arg(args, 0) }),
                    arg_flag(args, 1),
                );
                Ok(Value::Null)
            })
            .with("warn", |client, args| {
                client.send(
                    command_type::LOG,
                    json!({ "level": "warn", "message": arg(args, 0) }),
                    true,
                );
                Ok(Value::Null)
            })
            .with("error", |client, args| {
                client.send(
                    command_type::LOG,
                    json!({ "level": "error", "message": arg(args, 0), "stack": arg(args, 1) }),
                    true,
                );
                Ok(Value::Null)
            })
    }
}

/// Typed access to the logger features.
pub trait Logging {
    /// Debug-level line.
    fn log(&mut self, message: impl Into<Value>) -> Result<(), ClientError>;
    /// Debug-level line flagged important.
    fn log_important(&mut self, message: impl Into<Value>) -> Result<(), ClientError>;
    /// Debug-level line with an explicit importance flag.
    fn debug(&mut self, message: impl Into<Value>, important: bool) -> Result<(), ClientError>;
    /// Warning.
    fn warn(&mut self, message: impl Into<Value>) -> Result<(), ClientError>;
    /// Error with an optional stack trace.
    fn error(&mut self, message: impl Into<Value>, stack: Option<&str>) -> Result<(), ClientError>;
}

impl Logging for Client {
    fn log(&mut self, message: impl Into<Value>) -> Result<(), ClientError> {
        self.call_feature("log", &[message.into()]).map(drop)
    }

    fn log_important(&mut self, message: impl Into<Value>) -> Result<(), ClientError> {
        self.call_feature("logImportant", &[message.into()]).map(drop)
    }

    fn debug(&mut self, message: impl Into<Value>, important: bool) -> Result<(), ClientError> {
        self.call_feature("debug", &[message.into(), Value::Bool(important)])
            .map(drop)
    }

    fn warn(&mut self, message: impl Into<Value>) -> Result<(), ClientError> {
        self.call_feature("warn", &[message.into()]).map(drop)
    }

    fn error(&mut self, message: impl Into<Value>, stack: Option<&str>) -> Result<(), ClientError> {
        self.call_feature("error", &[message.into(), json!(stack)])
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::testing::{connected_client, last_frame};

    #[test]
    fn test_log_single_and_multiple_values() {
        let (mut client, wire) = connected_client(vec![logger()]);

        client.log("hello").unwrap();
        let frame = last_frame(&wire);
        assert_eq!(frame["type"], "log");
        assert_eq!(frame["payload"], json!({"level": "debug", "message": "hello"}));
        assert_eq!(frame["important"], false);

        client
            .call_feature("log", &[json!("a"), json!(1)])
            .unwrap();
        assert_eq!(last_frame(&wire)["payload"]["message"], json!(["a", 1]));
    }

    #[test]
    fn test_warn_and_error_are_important() {
        let (mut client, wire) = connected_client(vec![logger()]);

        client.warn("careful").unwrap();
        let frame = last_frame(&wire);
        assert_eq!(frame["payload"]["level"], "warn");
        assert_eq!(frame["important"], true);

        client.error("boom", Some("at main")).unwrap();
        let frame = last_frame(&wire);
        assert_eq!(
            frame["payload"],
            json!({"level": "error", "message": "boom", "stack": "at main"})
        );
        assert_eq!(frame["important"], true);
    }

    #[test]
    fn test_debug_importance_flag() {
        let (mut client, wire) = connected_client(vec![logger()]);
        client.debug("quiet", false).unwrap();
        assert_eq!(last_frame(&wire)["important"], false);
        client.debug("loud", true).unwrap();
        assert_eq!(last_frame(&wire)["important"], true);
        client.log_important("also loud").unwrap();
        assert_eq!(last_frame(&wire)["important"], true);
    }

    #[test]
    fn test_missing_plugin_reports_not_installed() {
        let (mut client, _wire) = connected_client(Vec::new());
        assert!(matches!(
            client.log("x"),
            Err(ClientError::FeatureNotInstalled(name)) if name == "log"
        ));
    }
}
