//! Built-in plugins.
//!
//! Each plugin contributes features to the client's registry and, where it
//! has a typed surface, an extension trait implemented for [`Client`] that
//! calls those features by name. `ClientOptions::default()` installs all of
//! them through [`core_plugins`].
//!
//! | Plugin            | Features                                  | Trait            |
//! |-------------------|-------------------------------------------|------------------|
//! | `logger`          | log, logImportant, debug, warn, error     | [`Logging`]      |
//! | `image`           | image                                     | [`Images`]       |
//! | `benchmark`       | benchmark                                 | [`Benchmarking`] |
//! | `state_responses` | stateActionComplete, stateValuesResponse, | [`StateResponses`] |
//! |                   | stateKeysResponse, stateValuesChange,     |                  |
//! |                   | stateBackupResponse                       |                  |
//! | `api_response`    | apiResponse                               | [`ApiResponses`] |
//! | `clear`           | clear                                     | [`Clearing`]     |
//! | `repl`            | repl                                      | [`Repl`]         |
//!
//! [`Client`]: crate::client::Client

pub mod api_response;
pub mod benchmark;
pub mod clear;
pub mod image;
pub mod logger;
pub mod repl;
pub mod state_responses;

pub use api_response::{api_response, ApiResponses};
pub use benchmark::{benchmark, Benchmark, BenchmarkStep, Benchmarking};
pub use clear::{clear, Clearing};
pub use image::{image, ImagePayload, Images};
pub use logger::{logger, Logging};
pub use repl::{repl, Repl};
pub use state_responses::{state_responses, StateChange, StateResponses};

use crate::plugin::PluginCreator;

/// The default plugin set, in install order.
pub fn core_plugins() -> Vec<PluginCreator> {
    vec![
        logger(),
        image(),
        benchmark(),
        state_responses(),
        api_response(),
        clear(),
        repl(),
    ]
}
