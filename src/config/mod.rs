mod schema;

pub use schema::{Config, ConfigError, PromptsConfig};
