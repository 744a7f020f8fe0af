//! Error types for the client runtime.
//!
//! A single enum covers every failure the library can surface. Configuration
//! errors are returned synchronously from `configure`/`create_client`;
//! transport and dispatch failures are routed to the client's error reporter
//! instead of being returned to the caller.

use crate::connection::ConnectionState;

/// Errors produced by the client runtime.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No socket factory was configured.
    #[error("invalid socket factory")]
    InvalidSocketFactory,

    /// Host was empty.
    #[error("invalid host")]
    InvalidHost,

    /// Port outside `1..=65535`.
    #[error("invalid port: {0}")]
    InvalidPort(u32),

    /// No root command handler was configured.
    #[error("invalid on_command handler")]
    InvalidCommandHandler,

    /// `connect()` called outside the idle state.
    #[error("cannot connect while {0}")]
    NotIdle(ConnectionState),

    /// The socket factory failed to produce a socket.
    #[error("socket factory failed: {0}")]
    SocketFactory(String),

    /// A plugin declared a feature whose name belongs to the facade.
    #[error("{0} is a reserved feature name")]
    ReservedFeature(String),

    /// No installed plugin provides the requested feature.
    #[error("feature not installed: {0}")]
    FeatureNotInstalled(String),

    /// A feature was called with arguments it cannot use.
    #[error("invalid arguments for {feature}: {reason}")]
    InvalidFeatureArgs {
        /// Feature name.
        feature: String,
        /// What was wrong with the arguments.
        reason: String,
    },

    /// A custom command registration was rejected.
    #[error("invalid custom command: {0}")]
    InvalidCustomCommand(String),

    /// An inbound frame could not be parsed into a command.
    #[error("malformed inbound frame ({reason}): {preview}")]
    MalformedFrame {
        /// Parser error message.
        reason: String,
        /// Leading part of the offending frame.
        preview: String,
    },

    /// The underlying socket reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// REPL registration or lookup failed.
    #[error("repl error: {0}")]
    Repl(String),

    /// Outbound payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Build a [`ClientError::MalformedFrame`] keeping at most 100 bytes of the frame.
    pub(crate) fn malformed(frame: &str, reason: impl std::fmt::Display) -> Self {
        let mut end = frame.len().min(100);
        while !frame.is_char_boundary(end) {
            end -= 1;
        }
        Self::MalformedFrame {
            reason: reason.to_string(),
            preview: frame[..end].to_string(),
        }
    }

    /// Returns `true` for errors raised by option validation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidSocketFactory
                | Self::InvalidHost
                | Self::InvalidPort(_)
                | Self::InvalidCommandHandler
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_have_distinct_messages() {
        let messages = [
            ClientError::InvalidSocketFactory.to_string(),
            ClientError::InvalidHost.to_string(),
            ClientError::InvalidPort(0).to_string(),
            ClientError::InvalidCommandHandler.to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_malformed_truncates_on_char_boundary() {
        let frame = "é".repeat(80);
        let err = ClientError::malformed(&frame, "eof");
        match err {
            ClientError::MalformedFrame { preview, .. } => {
                assert!(preview.len() <= 100);
                assert!(preview.chars().all(|c| c == 'é'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_is_configuration() {
        assert!(ClientError::InvalidPort(70000).is_configuration());
        assert!(!ClientError::Transport("reset".into()).is_configuration());
    }
}
