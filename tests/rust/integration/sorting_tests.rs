//! Integration tests for ORDER BY generation

#[cfg(test)]
mod sorting_tests {
    use cityquery::query::{BinaryComparisonKind, PathStep, Predicate, Query, SortProperty, ValueReference};
    use cityquery::sql_ast::SqlValue;
    use cityquery::QueryBuildError;
    use test_case::test_case;

    use crate::common::{compile, fixture, reference, try_compile};

    fn name_is(value: &str) -> Predicate {
        Predicate::compare(BinaryComparisonKind::EqualTo, reference("name"), value)
    }

    fn generic_value(predicate: Predicate) -> ValueReference {
        ValueReference::new(vec![
            PathStep::with_predicate("gen:doubleAttribute", predicate),
            PathStep::new("value"),
        ])
    }

    #[test]
    fn test_sorted_buildings_fixture() {
        let query = Query::from_yaml_file(fixture("queries/sorted_buildings.yaml")).unwrap();
        let rendered = compile(&query);
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM cityobject t0 \
             LEFT JOIN cityobject_genericattrib t1 ON t1.cityobject_id = t0.id \
             AND t1.datatype = 3 AND t1.attrname = ? \
             WHERE t0.objectclass_id IN (25, 26) \
             ORDER BY t0.name ASC, t1.realval DESC"
        );
        assert_eq!(
            rendered.parameters,
            vec![SqlValue::String("height".to_string())]
        );
    }

    #[test]
    fn test_sort_key_on_root_table() {
        let query = Query::new(["bldg:Building"])
            .with_sorting(vec![SortProperty::descending(reference("bldg:function"))]);
        assert_eq!(
            compile(&query).sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             WHERE t0.objectclass_id = 26 ORDER BY t0.function DESC"
        );
    }

    #[test]
    fn test_sort_key_reuses_selection_join() {
        let query = Query::new(["bldg:Building"])
            .with_selection(Predicate::compare(
                BinaryComparisonKind::EqualTo,
                reference("gml:name"),
                "Town Hall",
            ))
            .with_sorting(vec![SortProperty::ascending(reference("gml:name"))]);
        let rendered = compile(&query);
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             INNER JOIN cityobject t1 ON t1.id = t0.id \
             WHERE t0.objectclass_id = 26 AND t1.name = ? \
             ORDER BY t1.name ASC"
        );
    }

    #[test]
    fn test_sort_key_without_selection_uses_left_join() {
        let query = Query::new(["bldg:Building"])
            .with_sorting(vec![SortProperty::ascending(reference("gml:name"))]);
        assert_eq!(
            compile(&query).sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             LEFT JOIN cityobject t1 ON t1.id = t0.id \
             WHERE t0.objectclass_id = 26 ORDER BY t1.name ASC"
        );
    }

    #[test]
    fn test_duplicate_sort_key_rejected() {
        let query = Query::new(["bldg:Building"]).with_sorting(vec![
            SortProperty::ascending(reference("bldg:function")),
            SortProperty::descending(reference("bldg:function")),
        ]);
        assert!(matches!(
            try_compile(&query),
            Err(QueryBuildError::DuplicateSortKey(_))
        ));
    }

    #[test]
    fn test_disjunctive_node_predicate_rejected() {
        let operand = generic_value(Predicate::or(vec![name_is("height"), name_is("width")]));
        let query = Query::new(["bldg:Building"]).with_sorting(vec![SortProperty::ascending(operand)]);
        assert!(matches!(
            try_compile(&query),
            Err(QueryBuildError::SortKeyRequiresOr(_))
        ));
    }

    #[test_case(&["bldg:Building"], "gml:boundedBy"; "geometry")]
    #[test_case(&["bldg:Building"], "bldg:roofInfo"; "inline complex property")]
    #[test_case(&["bldg:Building", "bldg:BuildingPart"], "bldg:Building/bldg:function"; "type cast")]
    fn test_invalid_sort_key(feature_types: &[&str], path: &str) {
        let query = Query::new(feature_types.iter().copied())
            .with_sorting(vec![SortProperty::ascending(reference(path))]);
        assert!(matches!(
            try_compile(&query),
            Err(QueryBuildError::InvalidSortKey { .. })
        ));
    }
}
