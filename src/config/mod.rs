mod paths;
mod settings;

pub use paths::default_config_path;
pub use settings::{EntriesConfig, Overrides, Settings};
