//! Clear the server timeline.

use serde_json::Value;

use crate::client::Client;
use crate::command::command_type;
use crate::error::ClientError;
use crate::plugin::{creator, Features, Plugin, PluginCreator};

/// Clear plugin.
#[derive(Debug, Default)]
pub struct ClearPlugin;

/// Creator for [`ClearPlugin`].
pub fn clear() -> PluginCreator {
    creator(|_client| ClearPlugin)
}

impl Plugin for ClearPlugin {
    fn name(&self) -> &str {
        "clear"
    }

    fn features(&self) -> Features {
        Features::new().with("clear", |client, _args| {
            client.send(command_type::CLEAR, Value::Null, false);
            Ok(Value::Null)
        })
    }
}

/// Typed access to the clear feature.
pub trait Clearing {
    /// Ask the server to clear its timeline.
    fn clear(&mut self) -> Result<(), ClientError>;
}

impl Clearing for Client {
    fn clear(&mut self) -> Result<(), ClientError> {
        self.call_feature("clear", &[]).map(drop)
    }
}
