use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Default config file name inside the ledger repository.
pub const CONFIG_FILE: &str = "import.yaml";

/// Capability seam for loading the import configuration, substitutable in
/// tests.
pub trait ConfigLoader {
    fn load(&self, repo_root: &Path) -> Result<Config, ConfigError>;
}

/// Loads `import.yaml` from the repository root.
#[derive(Debug, Default)]
pub struct YamlConfigLoader;

impl ConfigLoader for YamlConfigLoader {
    fn load(&self, repo_root: &Path) -> Result<Config, ConfigError> {
        load_config(repo_root.join(CONFIG_FILE))
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    for dir in [
        &config.paths.import,
        &config.paths.pending,
        &config.paths.rules,
    ] {
        if dir.is_empty() || Path::new(dir).is_absolute() {
            return Err(ConfigError::Validation {
                message: format!("Path '{dir}' must be a non-empty relative directory name"),
            });
        }
    }

    let mut provider_names = HashSet::new();
    for provider in &config.providers {
        if provider.name.is_empty() {
            return Err(ConfigError::Validation {
                message: "Provider name must not be empty".to_string(),
            });
        }
        if !provider_names.insert(&provider.name) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate provider name '{}'", provider.name),
            });
        }

        for rule in &provider.rules {
            if let Some(pattern) = &rule.filename_pattern {
                if let Err(e) = regex::Regex::new(pattern) {
                    return Err(ConfigError::InvalidPattern {
                        provider: provider.name.clone(),
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            if rule.currency_field.trim().is_empty() {
                return Err(ConfigError::InvalidRule {
                    provider: provider.name.clone(),
                    reason: "currency_field must not be empty".to_string(),
                });
            }

            // The CSV reader takes a single-byte delimiter.
            if !rule.delimiter.is_ascii() {
                return Err(ConfigError::InvalidRule {
                    provider: provider.name.clone(),
                    reason: format!(
                        "delimiter '{}' must be a single ASCII character",
                        rule.delimiter
                    ),
                });
            }

            if let Some(rename) = &rule.rename {
                validate_rename_template(&provider.name, rename, &rule.metadata)?;
            }
        }
    }

    Ok(())
}

/// Rename templates may only reference declared metadata fields or the
/// builtins `{provider}` and `{currency}`.
fn validate_rename_template(
    provider: &str,
    template: &str,
    metadata: &[crate::config::schema::MetadataSpec],
) -> Result<(), ConfigError> {
    let placeholder = regex::Regex::new(r"\{([^{}]+)\}").expect("static pattern");
    for caps in placeholder.captures_iter(template) {
        let field = &caps[1];
        let known = field == "provider"
            || field == "currency"
            || metadata.iter().any(|m| m.name == field);
        if !known {
            return Err(ConfigError::InvalidRule {
                provider: provider.to_string(),
                reason: format!("Rename template references unknown field '{{{field}}}'"),
            });
        }
    }
    Ok(())
}
