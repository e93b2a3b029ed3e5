pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, ConfigLoader, YamlConfigLoader, CONFIG_FILE};
pub use schema::{
    Config, CurrencyConfig, DetectionRule, ImportConfig, LedgerConfig, MetadataSpec, PathsConfig,
    ProviderConfig,
};
