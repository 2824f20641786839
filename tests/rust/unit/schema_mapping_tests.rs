//! Unit tests for loading and validating schema mappings

#[cfg(test)]
mod schema_mapping_tests {
    use std::io::Write;

    use cityquery::schema_mapping::{
        GeometryStorage, PropertyKind, SchemaMapping, SchemaMappingError, TypeKind,
    };
    use test_case::test_case;

    use crate::city_mapping;

    const SCHEMAS: &str = r#"
schemas:
  - id: core
    namespaces:
      - uri: http://www.opengis.net/citygml/2.0
        prefix: core
"#;

    fn load(types: &str) -> Result<SchemaMapping, SchemaMappingError> {
        SchemaMapping::from_yaml_str(&format!("{}{}", SCHEMAS, types))
    }

    fn validation_errors(types: &str) -> Vec<String> {
        match load(types) {
            Err(SchemaMappingError::Validation { errors }) => errors,
            other => panic!("expected validation errors, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_fixture_types_and_tables() {
        let mapping = city_mapping();

        let building = mapping.find_type("bldg:Building").unwrap();
        assert_eq!(mapping.get_type(building).object_class_id, Some(26));
        assert_eq!(mapping.table_of(building), Some("building"));
        assert_eq!(mapping.type_by_id("BuildingType"), Some(building));

        let abstract_building = mapping.find_type("bldg:AbstractBuilding").unwrap();
        assert!(mapping.get_type(abstract_building).is_abstract);
        assert_eq!(mapping.table_of(abstract_building), Some("cityobject"));

        // Address is an object type, inline types are complex types
        assert_eq!(mapping.feature_types().len(), 5);
        let address = mapping.find_type("core:Address").unwrap();
        assert_eq!(mapping.get_type(address).kind, TypeKind::ObjectType);
    }

    #[test]
    fn test_generated_namespace_prefix() {
        let mapping = city_mapping();
        let furniture = mapping
            .namespaces()
            .iter()
            .find(|ns| ns.uri.ends_with("cityfurniture/2.0"))
            .unwrap();
        assert_eq!(furniture.prefix, "ns1");
        assert_eq!(furniture.schema, "frn");

        let by_prefix = mapping.find_type("ns1:CityFurniture");
        assert!(by_prefix.is_some());
        assert_eq!(mapping.find_type("CityFurniture"), by_prefix);
        assert_eq!(mapping.find_type("frn:CityFurniture"), None);
    }

    #[test]
    fn test_common_super_type() {
        let mapping = city_mapping();
        let building = mapping.find_type("bldg:Building").unwrap();
        let part = mapping.find_type("bldg:BuildingPart").unwrap();
        let furniture = mapping.find_type("CityFurniture").unwrap();
        let address = mapping.find_type("core:Address").unwrap();

        assert_eq!(
            mapping.common_super_type(&[building, part]),
            Ok(mapping.find_type("bldg:AbstractBuilding").unwrap())
        );
        assert_eq!(
            mapping.common_super_type(&[building, furniture]),
            Ok(mapping.find_type("core:AbstractCityObject").unwrap())
        );
        assert_eq!(mapping.common_super_type(&[building]), Ok(building));
        assert!(matches!(
            mapping.common_super_type(&[building, address]),
            Err(SchemaMappingError::NoCommonSuperType { .. })
        ));
    }

    #[test]
    fn test_object_class_ids_skip_abstract_types() {
        let mapping = city_mapping();
        let city_object = mapping.find_type("core:AbstractCityObject").unwrap();
        let abstract_building = mapping.find_type("bldg:AbstractBuilding").unwrap();

        assert_eq!(mapping.object_class_ids(abstract_building), vec![25, 26]);
        assert_eq!(mapping.object_class_ids(city_object), vec![21, 25, 26]);

        let concrete = mapping.list_sub_types(city_object, true);
        assert_eq!(concrete.len(), 3);
        assert!(!concrete.contains(&abstract_building));
        assert_eq!(mapping.list_sub_types(city_object, false).len(), 4);
    }

    #[test]
    fn test_inherited_properties_come_after_own_ones() {
        let mapping = city_mapping();
        let building = mapping.find_type("bldg:Building").unwrap();
        let names: Vec<String> = mapping
            .list_properties(building, false, true)
            .into_iter()
            .map(|p| mapping.get_property(p).qualified_name())
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("bldg:function"));
        assert!(names.contains(&"gml:boundedBy".to_string()));
        assert!(names.contains(&"gen:doubleAttribute".to_string()));
        assert_eq!(mapping.list_properties(building, false, false).len(), 6);
    }

    #[test]
    fn test_inline_types_live_in_the_owner_table() {
        let mapping = city_mapping();
        let building = mapping.find_type("bldg:Building").unwrap();
        let roof = mapping.find_property(building, "bldg:roofInfo").unwrap().unwrap();
        let PropertyKind::ComplexProperty { target, inline } = mapping.get_property(roof).kind
        else {
            panic!("roofInfo is a complex property");
        };
        assert!(inline);
        assert_eq!(mapping.table_of(target), Some("building"));
        assert_eq!(mapping.get_type(target).qualified_name(), "bldg:RoofInfo");
        // Inline types cannot be looked up globally
        assert_eq!(mapping.find_type("bldg:RoofInfo"), None);
    }

    #[test]
    fn test_geometry_storage() {
        let mapping = city_mapping();
        let building = mapping.find_type("bldg:Building").unwrap();
        let solid = mapping.find_property(building, "lod2Solid").unwrap().unwrap();
        let envelope = mapping.find_property(building, "gml:boundedBy").unwrap().unwrap();

        assert!(matches!(
            &mapping.get_property(solid).kind,
            PropertyKind::GeometryProperty { storage: GeometryStorage::Decomposed { geometry_column }, .. }
                if geometry_column == "geometry"
        ));
        assert!(matches!(
            &mapping.get_property(envelope).kind,
            PropertyKind::GeometryProperty { storage: GeometryStorage::Inline { column }, .. }
                if column == "envelope"
        ));
    }

    #[test]
    fn test_property_injection() {
        let mapping = load(
            r#"
feature_types:
  - id: CityObjectType
    name: CityObject
    schema: core
    table: cityobject
    object_class_id: 1
    properties:
      - kind: simple_attribute
        name: name
        column: name
        type: string
property_injections:
  - base: CityObjectType
    join: { table: cityobject_ext, from_column: id, to_column: cityobject_id, to_role: child }
    properties:
      - kind: simple_attribute
        name: usage
        column: usage
        type: string
"#,
        )
        .unwrap();

        let city_object = mapping.type_by_id("CityObjectType").unwrap();
        let usage = mapping.find_property(city_object, "core:usage").unwrap().unwrap();
        assert_eq!(mapping.get_property(usage).injection, Some(0));
        assert_eq!(mapping.get_injection(0).join.table, "cityobject_ext");
        assert_eq!(mapping.get_injection(0).properties, vec![usage]);
    }

    #[test]
    fn test_injection_cannot_redeclare_property() {
        let errors = validation_errors(
            r#"
feature_types:
  - id: CityObjectType
    name: CityObject
    schema: core
    table: cityobject
    object_class_id: 1
    properties:
      - { kind: simple_attribute, name: name, column: name, type: string }
property_injections:
  - base: CityObjectType
    join: { table: cityobject_ext, from_column: id, to_column: cityobject_id, to_role: child }
    properties:
      - { kind: simple_attribute, name: name, column: ext_name, type: string }
"#,
        );
        assert!(errors.iter().any(|e| e.contains("redeclares existing property `core:name`")));
    }

    #[test_case(
        r#"
feature_types:
  - { id: A, name: A, schema: core, table: a, object_class_id: 1, extension: { base: Missing } }
"#,
        "extends unknown type `Missing`"; "unknown base type"
    )]
    #[test_case(
        r#"
feature_types:
  - { id: A, name: A, schema: core, object_class_id: 1 }
"#,
        "has no table"; "concrete type without table"
    )]
    #[test_case(
        r#"
feature_types:
  - { id: A, name: A, schema: core, table: a, object_class_id: 7 }
  - { id: B, name: B, schema: core, table: b, object_class_id: 7 }
"#,
        "Object class id 7 is used by both `A` and `B`"; "duplicate object class id"
    )]
    #[test_case(
        r#"
feature_types:
  - { id: A, name: A, schema: core, abstract: true, extension: { base: B } }
  - { id: B, name: B, schema: core, abstract: true, extension: { base: A } }
"#,
        "Inheritance cycle detected"; "inheritance cycle"
    )]
    #[test_case(
        r#"
feature_types:
  - { id: A, name: A, schema: unknown, table: a, object_class_id: 1 }
"#,
        "references unknown schema or namespace `unknown`"; "unknown schema"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - { kind: simple_attribute, name: x, column: x, type: string }
      - { kind: simple_attribute, name: x, column: y, type: string }
"#,
        "Property `core:x` is declared more than once"; "duplicate property"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - kind: simple_attribute
        name: x
        column: x
        type: string
        join: { table: b, from_column: id, to_column: a_id, to_role: child }
        join_table:
          table: a_to_b
          join: { table: a, from_column: a_id, to_column: id, to_role: parent }
          inverse_join: { table: b, from_column: b_id, to_column: id, to_role: parent }
"#,
        "declares both a join and a join table"; "join and join table"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - kind: simple_attribute
        name: x
        column: x
        type: string
        join_table:
          table: a_to_b
          join: { table: a, from_column: a_id, to_column: id, to_role: parent }
          inverse_join: { table: b, from_column: b_id, to_column: id, to_role: parent }
"#,
        "join tables are only allowed on type properties"; "join table on attribute"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - { kind: geometry_property, name: g, geometry_column: geometry }
"#,
        "requires a join"; "decomposed geometry without join"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - { kind: geometry_property, name: g, column: geom, geometry_column: geometry }
"#,
        "must declare exactly one of `column` and `geometry_column`"; "ambiguous geometry storage"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - kind: complex_attribute
        name: x
        join:
          table: b
          from_column: id
          to_column: a_id
          to_role: child
          conditions: [{ column: datatype, value: three, type: integer }]
        attributes: [{ name: value, column: v, type: string }]
"#,
        "is not a valid integer value"; "invalid join condition"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - kind: complex_property
        name: x
        type: { name: Inner, table: inner_table }
"#,
        "must not declare a table"; "inline type with table"
    )]
    #[test_case(
        r#"
feature_types:
  - id: A
    name: A
    schema: core
    table: a
    object_class_id: 1
    properties:
      - { kind: feature_property, name: x, target: A, join: { table: other, from_column: x_id, to_column: id, to_role: parent } }
"#,
        "joins table `other` but its target type `A` is stored in `a`"; "join to wrong table"
    )]
    fn test_validation_problem(types: &str, expected: &str) {
        let errors = validation_errors(types);
        assert!(
            errors.iter().any(|e| e.contains(expected)),
            "expected a problem containing {:?}, got {:#?}",
            expected,
            errors
        );
    }

    #[test]
    fn test_all_problems_are_reported_together() {
        let errors = validation_errors(
            r#"
feature_types:
  - { id: A, name: A, schema: core, object_class_id: 1 }
  - { id: B, name: B, schema: core, table: b, object_class_id: 2, extension: { base: Missing } }
"#,
        );
        assert_eq!(errors.len(), 2, "{:#?}", errors);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}feature_types:\n  - {{ id: A, name: A, schema: core, table: a, object_class_id: 1 }}\n",
            SCHEMAS
        )
        .unwrap();

        let mapping = SchemaMapping::from_yaml_file(file.path()).unwrap();
        assert!(mapping.find_type("core:A").is_some());
    }

    #[test]
    fn test_read_and_parse_errors() {
        assert!(matches!(
            SchemaMapping::from_yaml_file("/nonexistent/mapping.yaml"),
            Err(SchemaMappingError::ReadError { .. })
        ));
        assert!(matches!(
            SchemaMapping::from_yaml_str("feature_types: [ { name: 1"),
            Err(SchemaMappingError::ParseError { .. })
        ));
    }
}
