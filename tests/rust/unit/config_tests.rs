//! Unit tests for compiler configuration from the environment and YAML files

#[cfg(test)]
mod config_tests {
    use std::env;
    use std::io::Write;

    use cityquery::config::{CompilerConfig, ConfigError};
    use cityquery::dialect::DialectKind;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "CITYQUERY_DIALECT",
        "CITYQUERY_LEGACY_PAGINATION",
        "CITYQUERY_SRID",
        "CITYQUERY_SRS_NAME",
        "CITYQUERY_SRS_UNIT",
        "CITYQUERY_MAX_IN_LIST_SIZE",
        "CITYQUERY_OBJECT_CLASS_COLUMN",
        "CITYQUERY_ID_COLUMN",
        "CITYQUERY_RESOURCE_ID_PROPERTY",
        "CITYQUERY_ENVELOPE_PROPERTY",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = CompilerConfig::from_env().unwrap();
        assert_eq!(config.dialect, DialectKind::Postgis);
        assert_eq!(config.srid, 25832);
        assert!(!config.legacy_pagination);
        assert_eq!(config.max_in_list_size, None);
        assert_eq!(config.resource_id_property, "gml:id");
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("CITYQUERY_DIALECT", "Oracle");
        env::set_var("CITYQUERY_LEGACY_PAGINATION", "true");
        env::set_var("CITYQUERY_SRID", "31468");
        env::set_var("CITYQUERY_SRS_NAME", "urn:ogc:def:crs:EPSG::31468");
        env::set_var("CITYQUERY_MAX_IN_LIST_SIZE", "500");
        env::set_var("CITYQUERY_ID_COLUMN", "oid");

        let config = CompilerConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.dialect, DialectKind::Oracle);
        assert!(config.legacy_pagination);
        assert_eq!(config.srid, 31468);
        assert_eq!(config.id_column, "oid");
        let dialect = config.dialect().unwrap();
        assert_eq!(dialect.kind(), DialectKind::Oracle);
        assert_eq!(dialect.max_in_list_size(), 500);
        assert_eq!(dialect.database_srs().srid, 31468);
    }

    #[test]
    #[serial]
    fn test_from_env_parse_error() {
        clear_env();
        env::set_var("CITYQUERY_SRID", "not-a-number");
        let result = CompilerConfig::from_env();
        clear_env();

        match result {
            Err(ConfigError::Parse { field, value, .. }) => {
                assert_eq!(field, "CITYQUERY_SRID");
                assert_eq!(value, "not-a-number");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_dialect() {
        clear_env();
        env::set_var("CITYQUERY_DIALECT", "sqlite");
        let result = CompilerConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::Parse { field, .. }) if field == "CITYQUERY_DIALECT"));
    }

    #[test]
    #[serial]
    fn test_from_env_validation_error() {
        clear_env();
        env::set_var("CITYQUERY_SRS_UNIT", "furlong");
        let result = CompilerConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dialect: oracle").unwrap();
        writeln!(file, "srid: 4326").unwrap();
        writeln!(file, "srs_unit: degree").unwrap();
        writeln!(file, "max_in_list_size: 2").unwrap();

        let config = CompilerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.dialect, DialectKind::Oracle);
        assert_eq!(config.srid, 4326);
        assert_eq!(config.max_in_list_size, Some(2));
        // Unset fields keep their defaults
        assert_eq!(config.object_class_column, "objectclass_id");
        assert_eq!(
            config.database_srs().unwrap().srs_name,
            "urn:ogc:def:crs:EPSG::4326"
        );
    }

    #[test]
    fn test_from_yaml_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_in_list_size: 0").unwrap();

        assert!(matches!(
            CompilerConfig::from_yaml_file(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_from_yaml_file_parse_errors() {
        assert!(matches!(
            CompilerConfig::from_yaml_file("/nonexistent/cityquery.yaml"),
            Err(ConfigError::Parse { field, .. }) if field == "yaml_file"
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dialect: [postgis").unwrap();
        assert!(matches!(
            CompilerConfig::from_yaml_file(file.path()),
            Err(ConfigError::Parse { field, .. }) if field == "yaml_content"
        ));
    }
}
