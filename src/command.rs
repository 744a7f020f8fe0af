//! Wire envelope shared by both directions of the connection.
//!
//! Inbound frames are `{type, payload, important?}`. Outbound frames add a
//! `date` (UTC, millisecond precision) and `deltaTime` (milliseconds since the
//! previous outbound frame) for the server's diagnostics.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Reserved command type names.
///
/// Plugins are free to use other names; these are the ones the runtime and the
/// bundled plugins know about.
pub mod command_type {
    /// First frame after the socket opens, identifying this client.
    pub const CLIENT_INTRO: &str = "client.intro";
    /// Log line (`level`, `message`, optional `stack`).
    pub const LOG: &str = "log";
    /// Image display.
    pub const IMAGE: &str = "image";
    /// Generic named value display.
    pub const DISPLAY: &str = "display";
    /// Benchmark result with timed steps.
    pub const BENCHMARK_REPORT: &str = "benchmark.report";
    /// A state action finished.
    pub const STATE_ACTION_COMPLETE: &str = "state.action.complete";
    /// Answer to a state values request.
    pub const STATE_VALUES_RESPONSE: &str = "state.values.response";
    /// Answer to a state keys request.
    pub const STATE_KEYS_RESPONSE: &str = "state.keys.response";
    /// Subscribed state paths changed.
    pub const STATE_VALUES_CHANGE: &str = "state.values.change";
    /// Full state backup.
    pub const STATE_BACKUP_RESPONSE: &str = "state.backup.response";
    /// Completed API call.
    pub const API_RESPONSE: &str = "api.response";
    /// Ask the server to clear its timeline.
    pub const CLEAR: &str = "clear";
    /// Server asks for the registered REPL names.
    pub const REPL_LS_REQUEST: &str = "repl.ls.request";
    /// Registered REPL names.
    pub const REPL_LS_RESPONSE: &str = "repl.ls.response";
    /// Server selects a REPL.
    pub const REPL_CD_REQUEST: &str = "repl.cd.request";
    /// Result of selecting a REPL.
    pub const REPL_CD_RESPONSE: &str = "repl.cd.response";
    /// Server evaluates an expression in the selected REPL.
    pub const REPL_EXECUTE_REQUEST: &str = "repl.execute.request";
    /// Result of an evaluation.
    pub const REPL_EXECUTE_RESPONSE: &str = "repl.execute.response";
    /// Server invokes a registered custom command.
    pub const CUSTOM: &str = "custom";
    /// Announce a custom command to the server.
    pub const CUSTOM_COMMAND_REGISTER: &str = "customCommand.register";
    /// Withdraw a custom command.
    pub const CUSTOM_COMMAND_UNREGISTER: &str = "customCommand.unregister";
    /// Server assigns this client a persistent id.
    pub const SET_CLIENT_ID: &str = "setClientId";
}

/// A parsed inbound command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Command {
    /// Type tag selecting the payload shape.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload.
    #[serde(default)]
    pub payload: Value,
    /// Server-side prioritization hint. Absent or `null` reads as `false`.
    #[serde(default, deserialize_with = "null_as_false")]
    pub important: bool,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Command {
    /// Build a command in memory (used by tests and synthetic dispatch).
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            important: false,
        }
    }

    /// Parse one inbound text frame.
    pub fn parse(frame: &str) -> Result<Self, ClientError> {
        serde_json::from_str(frame).map_err(|e| ClientError::malformed(frame, e))
    }

    /// Returns `true` if this command has the given type.
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

/// Outbound frame as written to the socket.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    payload: &'a Value,
    important: bool,
    date: String,
    #[serde(rename = "deltaTime")]
    delta_time: i64,
}

/// Serialize an outbound frame.
///
/// `previous` is the timestamp of the last outbound frame; `now` becomes the
/// frame's `date`.
pub fn encode(
    kind: &str,
    payload: &Value,
    important: bool,
    previous: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<String, ClientError> {
    let envelope = Envelope {
        kind,
        payload,
        important,
        date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        delta_time: (now - previous).num_milliseconds().max(0),
    };
    Ok(serde_json::to_string(&envelope)?)
}
