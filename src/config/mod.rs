// Config module - CLI settings and the wiring of stores built from them

mod context;
mod settings;

pub use context::{Context, ContextError};
pub use settings::{CliConfig, ConfigError, PassphraseSource};
