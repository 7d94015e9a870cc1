use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::format::NumberLocale;
use crate::loader::DEFAULT_RECORD_DIRECTORY;
use crate::resource::MissPolicy;

pub const RESOURCE_ROOT_VARIABLE: &str = "PREDIAL_RESOURCE_ROOT";
pub const DATA_ROOT_VARIABLE: &str = "PREDIAL_DATA_ROOT";
pub const MISS_POLICY_VARIABLE: &str = "PREDIAL_MISS_POLICY";
pub const USER_AGENT_VARIABLE: &str = "PREDIAL_USER_AGENT";

const DEFAULT_USER_AGENT: &str = concat!("predial/", env!("CARGO_PKG_VERSION"));

/// Where the generator finds its templates and records, and how it prints amounts.
/// Both roots are either an `http(s)` URL or a local directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub resource_root: String,
    /// Falls back to the resource root, the records are usually published next to the templates.
    #[serde(default)]
    pub data_root: Option<String>,
    #[serde(default = "default_record_directory")]
    pub record_directory: String,
    #[serde(default)]
    pub miss_policy: MissPolicy,
    #[serde(default)]
    pub number_locale: NumberLocale,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_record_directory() -> String {
    DEFAULT_RECORD_DIRECTORY.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Configuration {
    pub fn with_resource_root(resource_root: impl Into<String>) -> Self {
        Configuration {
            resource_root: resource_root.into(),
            data_root: None,
            record_directory: default_record_directory(),
            miss_policy: MissPolicy::default(),
            number_locale: NumberLocale::default(),
            user_agent: default_user_agent(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(configuration_file_path: P) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path.as_ref())
            .map_err(|error| {
                ContextError::with_error("Failed to read the configuration file", &error)
            })?;
        let configuration: Configuration = serde_json::from_str(&configuration_file_contents)
            .map_err(|error| {
                ContextError::with_error("Failed to parse the configuration file", &error)
            })?;

        Ok(configuration)
    }

    /// Reads the configuration from the environment, after loading a `.env` file if there is one.
    pub fn from_env() -> Result<Self, ContextError> {
        dotenvy::dotenv().ok();

        let resource_root = std::env::var(RESOURCE_ROOT_VARIABLE).map_err(|error| {
            ContextError::with_error(
                format!("The variable {} is required", RESOURCE_ROOT_VARIABLE),
                &error,
            )
        })?;
        let mut configuration = Configuration::with_resource_root(resource_root);

        configuration.data_root = std::env::var(DATA_ROOT_VARIABLE).ok();
        if let Ok(miss_policy) = std::env::var(MISS_POLICY_VARIABLE) {
            configuration.miss_policy = miss_policy.parse()?;
        }
        if let Ok(user_agent) = std::env::var(USER_AGENT_VARIABLE) {
            configuration.user_agent = user_agent;
        }

        Ok(configuration)
    }

    pub fn data_root(&self) -> &str {
        self.data_root.as_deref().unwrap_or(&self.resource_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_their_defaults() {
        let configuration: Configuration =
            serde_json::from_str(r#"{ "resourceRoot": "https://tributos.example.gob.pe" }"#)
                .unwrap();
        assert_eq!(
            configuration,
            Configuration::with_resource_root("https://tributos.example.gob.pe")
        );
        assert_eq!(configuration.data_root(), "https://tributos.example.gob.pe");
    }

    #[test]
    fn configuration_file_is_read() {
        let directory = tempfile::tempdir().unwrap();
        let configuration_file_path = directory.path().join("predial.json");
        std::fs::write(
            &configuration_file_path,
            r#"{
                "resourceRoot": "/srv/formatos",
                "dataRoot": "/srv/datos",
                "recordDirectory": "",
                "missPolicy": "retry",
                "numberLocale": { "thousandsSeparator": ".", "decimalSeparator": "," }
            }"#,
        )
        .unwrap();

        let configuration = Configuration::from_path(&configuration_file_path).unwrap();
        assert_eq!(configuration.data_root(), "/srv/datos");
        assert_eq!(configuration.record_directory, "");
        assert_eq!(configuration.miss_policy, MissPolicy::Retry);
        assert_eq!(configuration.number_locale.decimal_separator, ',');
    }

    #[test]
    fn unreadable_configuration_is_reported() {
        let error = Configuration::from_path("/nonexistent/predial.json").unwrap_err();
        assert_eq!(error.context, "Failed to read the configuration file");
    }
}
