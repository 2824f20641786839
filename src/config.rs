use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::dialect::{create_dialect, DatabaseSrs, DialectKind, SqlDialect};
use crate::geometry::{parse_srs_name, LengthUnit};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Query compiler configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[validate(schema(function = "validate_srs_name"))]
#[serde(default)]
pub struct CompilerConfig {
    /// Target database dialect
    pub dialect: DialectKind,

    /// Oracle only: emulate pagination with ROW_NUMBER() instead of OFFSET/FETCH
    pub legacy_pagination: bool,

    /// SRID of the database SRS
    #[validate(range(min = 1, message = "SRID must be a positive EPSG code"))]
    pub srid: i32,

    /// srsName of the database SRS; derived from the SRID when omitted
    pub srs_name: Option<String>,

    /// Unit of the database SRS axes
    #[validate(custom(function = "validate_unit"))]
    pub srs_unit: String,

    /// Overrides the dialect's maximum IN-list size
    #[validate(range(
        min = 1,
        max = 65535,
        message = "Max IN-list size must be between 1 and 65535"
    ))]
    pub max_in_list_size: Option<usize>,

    /// Column holding the object class discriminator
    #[validate(length(min = 1, message = "Object class column cannot be empty"))]
    pub object_class_column: String,

    /// Database id column of every object table
    #[validate(length(min = 1, message = "Id column cannot be empty"))]
    pub id_column: String,

    /// Property matched by resource id filters
    #[validate(length(min = 1, message = "Resource id property cannot be empty"))]
    pub resource_id_property: String,

    /// Property used by spatial operators without a value reference
    #[validate(length(min = 1, message = "Envelope property cannot be empty"))]
    pub envelope_property: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Postgis,
            legacy_pagination: false,
            srid: 25832,
            srs_name: None,
            srs_unit: "metre".to_string(),
            max_in_list_size: None,
            object_class_column: "objectclass_id".to_string(),
            id_column: "id".to_string(),
            resource_id_property: "gml:id".to_string(),
            envelope_property: "gml:boundedBy".to_string(),
        }
    }
}

impl CompilerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            dialect: parse_env_var("CITYQUERY_DIALECT", "postgis")?,
            legacy_pagination: parse_env_var("CITYQUERY_LEGACY_PAGINATION", "false")?,
            srid: parse_env_var("CITYQUERY_SRID", "25832")?,
            srs_name: env::var("CITYQUERY_SRS_NAME").ok(),
            srs_unit: env::var("CITYQUERY_SRS_UNIT").unwrap_or(defaults.srs_unit),
            max_in_list_size: parse_optional_env_var("CITYQUERY_MAX_IN_LIST_SIZE")?,
            object_class_column: env::var("CITYQUERY_OBJECT_CLASS_COLUMN")
                .unwrap_or(defaults.object_class_column),
            id_column: env::var("CITYQUERY_ID_COLUMN").unwrap_or(defaults.id_column),
            resource_id_property: env::var("CITYQUERY_RESOURCE_ID_PROPERTY")
                .unwrap_or(defaults.resource_id_property),
            envelope_property: env::var("CITYQUERY_ENVELOPE_PROPERTY")
                .unwrap_or(defaults.envelope_property),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides and re-validate
    pub fn merge_cli(&mut self, cli: CliOverrides) -> Result<(), ConfigError> {
        if let Some(dialect) = cli.dialect {
            self.dialect = dialect;
        }
        if let Some(srid) = cli.srid {
            self.srid = srid;
            // A configured srsName no longer describes the new SRID
            self.srs_name = None;
        }
        self.validate()?;
        Ok(())
    }

    pub fn database_srs(&self) -> Result<DatabaseSrs, ConfigError> {
        let unit = LengthUnit::parse(&self.srs_unit).map_err(|e| ConfigError::Parse {
            field: "srs_unit".to_string(),
            value: self.srs_unit.clone(),
            source: Box::new(e),
        })?;
        Ok(DatabaseSrs {
            srid: self.srid,
            srs_name: self
                .srs_name
                .clone()
                .unwrap_or_else(|| format!("urn:ogc:def:crs:EPSG::{}", self.srid)),
            unit,
        })
    }

    /// Dialect adapter described by this configuration
    pub fn dialect(&self) -> Result<Arc<dyn SqlDialect>, ConfigError> {
        Ok(create_dialect(
            self.dialect,
            self.database_srs()?,
            self.max_in_list_size,
            self.legacy_pagination,
        ))
    }
}

/// Values given on the command line (override file and environment)
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub dialect: Option<DialectKind>,
    pub srid: Option<i32>,
}

fn validate_unit(unit: &str) -> Result<(), ValidationError> {
    LengthUnit::parse(unit)
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_unit"))
}

fn validate_srs_name(config: &CompilerConfig) -> Result<(), ValidationError> {
    match &config.srs_name {
        Some(name) => match parse_srs_name(name) {
            Ok(srid) if srid == config.srid => Ok(()),
            _ => Err(ValidationError::new("srs_name_mismatch")),
        },
        None => Ok(()),
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

fn parse_optional_env_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|e| ConfigError::Parse {
            field: key.to_string(),
            value,
            source: Box::new(e),
        }),
        Err(_) => Ok(None),
    }
}
