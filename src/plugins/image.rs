//! Image display.

use serde::Serialize;
use serde_json::Value;

use crate::client::Client;
use crate::command::command_type;
use crate::error::ClientError;
use crate::plugin::{arg, creator, Features, Plugin, PluginCreator};

/// Image to show in the server timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImagePayload {
    /// Image URI (`data:` URIs included).
    pub uri: String,
    /// One-line summary.
    pub preview: Option<String>,
    /// Caption under the image.
    pub caption: Option<String>,
    /// Suggested file name for saving.
    pub filename: Option<String>,
    /// Pixel width.
    pub width: Option<u32>,
    /// Pixel height.
    pub height: Option<u32>,
}

impl ImagePayload {
    /// Image with only a URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }
}

/// Image plugin.
#[derive(Debug, Default)]
pub struct ImagePlugin;

/// Creator for [`ImagePlugin`].
pub fn image() -> PluginCreator {
    creator(|_client| ImagePlugin)
}

impl Plugin for ImagePlugin {
    fn name(&self) -> &str {
        "image"
    }

    fn features(&self) -> Features {
        Features::new().with("image", |client, args| {
            let payload = arg(args, 0);
            if payload.get("uri").and_then(Value::as_str).is_none() {
                return Err(ClientError::InvalidFeatureArgs {
                    feature: "image".to_string(),
                    reason: "payload needs a uri".to_string(),
                });
            }
            client.send(command_type::IMAGE, payload.clone(), false);
            Ok(Value::Null)
        })
    }
}

/// Typed access to the image feature.
pub trait Images {
    /// Show an image.
    fn image(&mut self, payload: &ImagePayload) -> Result<(), ClientError>;
}

impl Images for Client {
    fn image(&mut self, payload: &ImagePayload) -> Result<(), ClientError> {
        let value = serde_json::to_value(payload)?;
        self.call_feature("image", &[value]).map(drop)
    }
}
