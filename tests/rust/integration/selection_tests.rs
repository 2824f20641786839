//! Integration tests for comparison predicates and their logical combination

#[cfg(test)]
mod selection_tests {
    use chrono::NaiveDate;
    use cityquery::query::{
        BinaryComparison, BinaryComparisonKind, ComparisonOperator, Expression, LikeComparison,
        Literal, PathStep, Predicate, Query, SelectOperator, ValueReference,
    };
    use cityquery::sql_ast::SqlValue;
    use cityquery::QueryBuildError;

    use crate::common::{compile, reference, try_compile};

    const BUILDING_FROM: &str = "SELECT t0.id, t0.objectclass_id FROM building t0";

    fn eq(path: &str, literal: impl Into<Literal>) -> Predicate {
        Predicate::compare(BinaryComparisonKind::EqualTo, reference(path), literal)
    }

    fn buildings(selection: Predicate) -> Query {
        Query::new(["bldg:Building"]).with_selection(selection)
    }

    fn string(value: &str) -> SqlValue {
        SqlValue::String(value.to_string())
    }

    #[test]
    fn test_conjunction_reuses_extension_join() {
        let rendered = compile(&buildings(Predicate::and(vec![
            eq("gml:name", "a"),
            eq("gml:id", "b"),
        ])));
        assert_eq!(
            rendered.sql,
            format!(
                "{} INNER JOIN cityobject t1 ON t1.id = t0.id \
                 WHERE t0.objectclass_id = 26 AND t1.name = ? AND t1.gmlid = ?",
                BUILDING_FROM
            )
        );
        assert_eq!(rendered.parameters, vec![string("a"), string("b")]);
    }

    #[test]
    fn test_disjunction_uses_left_joins() {
        let rendered = compile(&buildings(Predicate::or(vec![
            eq("bldg:function", "1000"),
            eq("gml:name", "Town Hall"),
        ])));
        assert_eq!(
            rendered.sql,
            format!(
                "{} LEFT JOIN cityobject t1 ON t1.id = t0.id \
                 WHERE t0.objectclass_id = 26 AND (t0.function = ? OR t1.name = ?)",
                BUILDING_FROM
            )
        );
    }

    #[test]
    fn test_negated_conjunction_applies_de_morgan() {
        let rendered = compile(&buildings(Predicate::not(Predicate::and(vec![
            eq("bldg:function", "1000"),
            Predicate::compare(
                BinaryComparisonKind::GreaterThan,
                reference("bldg:storeysAboveGround"),
                3i64,
            ),
        ]))));
        assert_eq!(
            rendered.sql,
            format!(
                "{} WHERE t0.objectclass_id = 26 \
                 AND (t0.function <> ? OR t0.storeys_above_ground <= ?)",
                BUILDING_FROM
            )
        );
        assert_eq!(
            rendered.parameters,
            vec![string("1000"), SqlValue::Integer(3)]
        );
    }

    #[test]
    fn test_case_insensitive_comparison() {
        let rendered = compile(&buildings(Predicate::Comparison(ComparisonOperator::Binary(
            BinaryComparison {
                operator: BinaryComparisonKind::EqualTo,
                left: Expression::ValueReference(reference("bldg:function")),
                right: Expression::Literal(Literal::from("residential")),
                match_case: false,
            },
        ))));
        assert!(rendered
            .sql
            .ends_with("WHERE t0.objectclass_id = 26 AND UPPER(t0.function) = UPPER(?)"));
    }

    #[test]
    fn test_literal_on_the_left_is_flipped() {
        let rendered = compile(&buildings(Predicate::Comparison(ComparisonOperator::Binary(
            BinaryComparison {
                operator: BinaryComparisonKind::LessThan,
                left: Expression::Literal(Literal::Integer(2)),
                right: Expression::ValueReference(reference("bldg:storeysAboveGround")),
                match_case: true,
            },
        ))));
        assert!(rendered.sql.ends_with("AND t0.storeys_above_ground > ?"));
    }

    #[test]
    fn test_date_literal_truncates_timestamp() {
        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        let rendered = compile(&buildings(eq("core:creationDate", date)));
        assert!(rendered
            .sql
            .ends_with("AND date_trunc('day', t1.creation_date) = ?"));
        assert_eq!(rendered.parameters, vec![SqlValue::Date(date)]);
    }

    #[test]
    fn test_literal_type_mismatch() {
        let result = try_compile(&buildings(eq("bldg:storeysAboveGround", "three")));
        assert!(matches!(
            result,
            Err(QueryBuildError::TypeMismatch { expected, found, .. })
                if expected == "integer" && found == "string"
        ));
    }

    #[test]
    fn test_cast_to_sub_type() {
        let query = Query::new(["bldg:Building", "bldg:BuildingPart"])
            .with_selection(eq("bldg:Building/bldg:function", "1000"));
        let rendered = compile(&query);
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM cityobject t0 \
             INNER JOIN building t1 ON t1.id = t0.id \
             WHERE t0.objectclass_id IN (25, 26) AND t0.objectclass_id = 26 AND t1.function = ?"
        );
    }

    #[test]
    fn test_like_through_join_table() {
        let expected = format!(
            "{} INNER JOIN address_to_building t1 ON t1.building_id = t0.id \
             INNER JOIN address t2 ON t2.id = t1.address_id \
             WHERE t0.objectclass_id = 26 AND t2.street LIKE ? ESCAPE '\\'",
            BUILDING_FROM
        );

        for path in ["bldg:address/core:Address/core:street", "bldg:address/core:street"] {
            let like = LikeComparison::new(reference(path), "Main*");
            let rendered = compile(&buildings(Predicate::Comparison(ComparisonOperator::Like(
                like,
            ))));
            assert_eq!(rendered.sql, expected, "for {}", path);
            assert_eq!(rendered.parameters, vec![string("Main%")]);
        }
    }

    #[test]
    fn test_node_predicate_on_target_type() {
        let operand = ValueReference::new(vec![
            PathStep::new("bldg:address"),
            PathStep::with_predicate("core:Address", eq("core:city", "Berlin")),
            PathStep::new("core:street"),
        ]);
        let like = LikeComparison::new(operand, "Main*");
        let rendered = compile(&buildings(Predicate::Comparison(ComparisonOperator::Like(like))));
        assert!(rendered.sql.contains(
            "WHERE t0.objectclass_id = 26 AND t2.city = ? AND t2.street LIKE ? ESCAPE '\\'"
        ));
        assert_eq!(rendered.parameters, vec![string("Berlin"), string("Main%")]);
    }

    fn generic_value(name: &str) -> ValueReference {
        ValueReference::new(vec![
            PathStep::with_predicate("gen:doubleAttribute", eq("name", name)),
            PathStep::new("value"),
        ])
    }

    fn compare_generic(operator: BinaryComparisonKind, name: &str, value: f64) -> Predicate {
        Predicate::compare(operator, generic_value(name), value)
    }

    #[test]
    fn test_differently_filtered_attributes_get_own_joins() {
        let rendered = compile(&buildings(Predicate::and(vec![
            compare_generic(BinaryComparisonKind::GreaterThan, "height", 10.0),
            compare_generic(BinaryComparisonKind::GreaterThan, "width", 5.0),
        ])));
        assert_eq!(
            rendered.sql,
            format!(
                "{} INNER JOIN cityobject t1 ON t1.id = t0.id \
                 INNER JOIN cityobject_genericattrib t2 ON t2.cityobject_id = t1.id AND t2.datatype = 3 \
                 INNER JOIN cityobject_genericattrib t3 ON t3.cityobject_id = t1.id AND t3.datatype = 3 \
                 WHERE t0.objectclass_id = 26 \
                 AND (t2.attrname = ? AND t2.realval > ?) AND (t3.attrname = ? AND t3.realval > ?)",
                BUILDING_FROM
            )
        );
        assert_eq!(
            rendered.parameters,
            vec![
                string("height"),
                SqlValue::Double(10.0),
                string("width"),
                SqlValue::Double(5.0),
            ]
        );
    }

    #[test]
    fn test_identically_filtered_attributes_share_join() {
        let rendered = compile(&buildings(Predicate::and(vec![
            compare_generic(BinaryComparisonKind::GreaterThan, "height", 10.0),
            compare_generic(BinaryComparisonKind::LessThan, "height", 20.0),
        ])));
        assert_eq!(rendered.sql.matches("JOIN cityobject_genericattrib").count(), 1);
        assert!(rendered.sql.ends_with(
            "AND (t2.attrname = ? AND t2.realval > ?) AND (t2.attrname = ? AND t2.realval < ?)"
        ));
    }

    #[test]
    fn test_like_on_numeric_attribute_rejected() {
        let like = LikeComparison::new(reference("bldg:storeysAboveGround"), "1*");
        assert!(matches!(
            try_compile(&buildings(Predicate::Comparison(ComparisonOperator::Like(like)))),
            Err(QueryBuildError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_select_operator() {
        let rendered = compile(&buildings(Predicate::not(Predicate::Select(SelectOperator {
            sql: " SELECT cityobject_id FROM appearance ".to_string(),
        }))));
        assert!(rendered.sql.ends_with(
            "WHERE t0.objectclass_id = 26 AND t0.id NOT IN (SELECT cityobject_id FROM appearance)"
        ));
    }

    #[test]
    fn test_empty_logical_operator_rejected() {
        assert!(matches!(
            try_compile(&buildings(Predicate::or(vec![]))),
            Err(QueryBuildError::EmptyLogicalOperator(_))
        ));
    }

    #[test]
    fn test_unknown_property_rejected() {
        assert!(matches!(
            try_compile(&buildings(eq("bldg:yearOfConstruction", "2000"))),
            Err(QueryBuildError::Path(_))
        ));
    }

    #[test]
    fn test_object_type_is_not_a_feature_type() {
        assert!(matches!(
            try_compile(&Query::new(["core:Address"])),
            Err(QueryBuildError::NotAFeatureType(_))
        ));
        assert!(matches!(
            try_compile(&Query::new(["bldg:Bridge"])),
            Err(QueryBuildError::UnknownFeatureType(_))
        ));
    }
}
