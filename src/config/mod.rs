pub mod components_config;
pub mod path_matcher;

pub use components_config::{ComponentsConfig, DefinitionTarget, CONFIG_FILE_NAME, SETTINGS_SECTION};
pub use path_matcher::PathMatcher;
