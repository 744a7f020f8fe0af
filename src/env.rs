//! Runtime environment detection.
//!
//! Reads `DEVLINK_ENV` to label the process in the intro message sent to the
//! inspection server.
//!
//! # Environment Variable
//!
//! Set `DEVLINK_ENV` to one of:
//! - `test` - Test environment
//! - `development` or `dev` - Development environment
//! - (anything else or unset) - Production environment

/// Runtime environment of the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment (default).
    Production,
    /// Development environment.
    Development,
    /// Test environment.
    Test,
}

impl Environment {
    /// Detect the current environment from `DEVLINK_ENV`.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::var("DEVLINK_ENV").ok().as_deref())
    }

    /// Map a raw `DEVLINK_ENV` value to an environment.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("test") => Self::Test,
            Some("development" | "dev") => Self::Development,
            _ => Self::Production,
        }
    }

    /// Returns `true` if this is the test environment.
    #[must_use]
    pub fn is_test(self) -> bool {
        self == Self::Test
    }

    /// Returns `true` if this is the production environment.
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
        }
    }
}
