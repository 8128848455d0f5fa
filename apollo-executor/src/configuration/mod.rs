//! Logic for loading configuration in to an object model
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration for the executor.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or inline in Rust code with the builder.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema, Default)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Request execution options.
    #[serde(default)]
    pub(crate) execution: Execution,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder(visibility = "pub")]
    fn new(execution: Option<Execution>) -> Self {
        Self {
            execution: execution.unwrap_or_default(),
        }
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }
}

/// Parse configuration from a string in YAML syntax
impl FromStr for Configuration {
    type Err = serde_yaml::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(s)
    }
}

const DEFAULT_MAX_DEPTH: usize = 32;

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_parallel_fields() -> bool {
    true
}

/// Limits and scheduling of a single request.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Execution {
    /// Maximum duration of a request in human-readable format, e.g. `2s`.
    /// Requests are not bounded when unset.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub(crate) deadline: Option<Duration>,

    /// Maximum nesting of selection sets; defaults to 32
    #[serde(default = "default_max_depth")]
    pub(crate) max_depth: usize,

    /// Resolve sibling fields of queries concurrently; defaults to true.
    /// Root fields of mutations always run one after another.
    #[serde(default = "default_parallel_fields")]
    pub(crate) parallel_fields: bool,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            deadline: None,
            max_depth: DEFAULT_MAX_DEPTH,
            parallel_fields: true,
        }
    }
}

#[buildstructor::buildstructor]
impl Execution {
    #[builder(visibility = "pub")]
    fn new(deadline: Option<Duration>, max_depth: Option<usize>, parallel_fields: Option<bool>) -> Self {
        Self {
            deadline,
            max_depth: max_depth.unwrap_or_else(default_max_depth),
            parallel_fields: parallel_fields.unwrap_or_else(default_parallel_fields),
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn parallel_fields(&self) -> bool {
        self.parallel_fields
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}

/// Parse and check a YAML configuration. An empty document yields the defaults.
pub fn validate_configuration(raw_yaml: &str) -> Result<Configuration, ConfigurationError> {
    if raw_yaml.trim().is_empty() {
        return Ok(Configuration::default());
    }
    let configuration = Configuration::from_str(raw_yaml).map_err(|e| {
        ConfigurationError::InvalidConfiguration {
            message: "failed to parse configuration",
            error: e.to_string(),
        }
    })?;
    if configuration.execution.max_depth == 0 {
        return Err(ConfigurationError::InvalidConfiguration {
            message: "invalid 'execution.max_depth' configuration",
            error: "must be at least 1".to_string(),
        });
    }
    if configuration.execution.deadline.is_some_and(|d| d.is_zero()) {
        return Err(ConfigurationError::InvalidConfiguration {
            message: "invalid 'execution.deadline' configuration",
            error: "must not be zero".to_string(),
        });
    }
    Ok(configuration)
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.deadline {
            Some(deadline) => write!(f, "deadline {deadline:?}")?,
            None => f.write_str("no deadline")?,
        }
        write!(
            f,
            ", max depth {}, {} fields",
            self.max_depth,
            if self.parallel_fields {
                "parallel"
            } else {
                "serial"
            }
        )
    }
}
