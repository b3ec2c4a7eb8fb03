//! Layered configuration loading
//!
//! Priority (highest to lowest):
//! 1. Command-line overrides supplied by the caller
//! 2. Environment variables (`<SERVICE>_` prefix, e.g. `CHILLERLINK_BAUD_RATE`)
//! 3. Explicit config file passed on the command line
//! 4. Service config file (`config/<service>.yaml`, `.yml`, `.toml`, `.json`)
//! 5. Built-in defaults of the config type

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Build the figment for `service_name` without extracting it
pub fn figment_for<T>(service_name: &str, explicit: Option<&Path>) -> Result<Figment>
where
    T: Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()))
        .merge(Yaml::file(format!("config/{}.yaml", service_name)))
        .merge(Yaml::file(format!("config/{}.yml", service_name)))
        .merge(Toml::file(format!("config/{}.toml", service_name)))
        .merge(Json::file(format!("config/{}.json", service_name)));

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        figment = match extension_of(path)? {
            "toml" => figment.merge(Toml::file(path)),
            "yaml" | "yml" => figment.merge(Yaml::file(path)),
            "json" => figment.merge(Json::file(path)),
            other => {
                return Err(Error::Config(format!(
                    "Unsupported config file format: {}",
                    other
                )))
            },
        };
        debug!("Config file: {}", path.display());
    }

    Ok(figment.merge(Env::prefixed(&format!("{}_", service_name.to_uppercase()))))
}

/// Load configuration for `service_name`
///
/// `overrides` is merged last; fields it skips when serializing keep the value
/// from the lower layers.
pub fn load_config<T, O>(service_name: &str, explicit: Option<&Path>, overrides: &O) -> Result<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Default,
    O: Serialize,
{
    let config = figment_for::<T>(service_name, explicit)?
        .merge(Serialized::defaults(overrides))
        .extract()
        .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))?;
    info!("Configuration loaded for {}", service_name);
    Ok(config)
}

fn extension_of(path: &Path) -> Result<&str> {
    path.extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Config("Config file must have an extension".to_string()))
}
