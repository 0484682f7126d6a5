mod loader;
mod schema;

pub use loader::{
    find_config_file, load_config, load_config_from_file, resolve_config, ConfigFormat,
    ResolvedConfig,
};
pub use schema::*;
