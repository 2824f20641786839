//! Integration tests for resource id and database id filters

#[cfg(test)]
mod id_filter_tests {
    use cityquery::config::CompilerConfig;
    use cityquery::query::{IdOperator, Predicate, Query};
    use cityquery::sql_ast::SqlValue;
    use cityquery::QueryBuildError;
    use test_case::test_case;

    use crate::common::{compile, compile_with, try_compile};

    fn database_ids(ids: impl IntoIterator<Item = i64>) -> Predicate {
        Predicate::Id(IdOperator::DatabaseId(ids.into_iter().collect()))
    }

    fn small_lists() -> CompilerConfig {
        CompilerConfig {
            max_in_list_size: Some(2),
            ..Default::default()
        }
    }

    fn buildings(selection: Predicate) -> Query {
        Query::new(["bldg:Building"]).with_selection(selection)
    }

    #[test]
    fn test_ids_split_into_in_lists() {
        let rendered = compile_with(&buildings(database_ids(1..=5)), &small_lists());
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             WHERE t0.objectclass_id = 26 \
             AND (t0.id IN (?, ?) OR t0.id IN (?, ?) OR t0.id IN (?))"
        );
        assert_eq!(
            rendered.parameters,
            (1..=5).map(SqlValue::Integer).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_negated_ids_all_must_hold() {
        let rendered = compile_with(
            &buildings(Predicate::not(database_ids(1..=5))),
            &small_lists(),
        );
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             WHERE t0.objectclass_id = 26 \
             AND t0.id NOT IN (?, ?) AND t0.id NOT IN (?, ?) AND t0.id NOT IN (?)"
        );
    }

    #[test]
    fn test_single_id_uses_equality() {
        let rendered = compile(&buildings(database_ids([42])));
        assert!(rendered.sql.ends_with("WHERE t0.objectclass_id = 26 AND t0.id = ?"));
        assert_eq!(rendered.parameters, vec![SqlValue::Integer(42)]);

        let negated = compile(&buildings(Predicate::not(database_ids([42]))));
        assert!(negated.sql.ends_with("AND t0.id <> ?"));
    }

    #[test_case(5, 2, 3; "partial last chunk")]
    #[test_case(1001, 1000, 2; "one over the oracle limit")]
    #[test_case(2500, 1000, 3; "several chunks")]
    #[test_case(4, 2, 2; "exact multiple")]
    fn test_chunk_count(ids: i64, max: usize, expected: usize) {
        let config = CompilerConfig {
            max_in_list_size: Some(max),
            ..Default::default()
        };
        let rendered = compile_with(&buildings(database_ids(1..=ids)), &config);
        assert_eq!(rendered.sql.matches(" IN (").count(), expected);
        assert_eq!(rendered.parameters.len(), ids as usize);
    }

    #[test]
    fn test_resource_id_uses_mapped_property() {
        let query = buildings(Predicate::Id(IdOperator::ResourceId(vec![
            "BLDG_0001".to_string(),
        ])));
        let rendered = compile(&query);
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             INNER JOIN cityobject t1 ON t1.id = t0.id \
             WHERE t0.objectclass_id = 26 AND t1.gmlid = ?"
        );
        assert_eq!(
            rendered.parameters,
            vec![SqlValue::String("BLDG_0001".to_string())]
        );
    }

    #[test]
    fn test_resource_ids_or_with_comparison() {
        let query = buildings(Predicate::or(vec![
            Predicate::Id(IdOperator::ResourceId(vec!["a".to_string(), "b".to_string()])),
            database_ids([7]),
        ]));
        let rendered = compile(&query);
        assert!(rendered.sql.contains("LEFT JOIN cityobject t1 ON t1.id = t0.id"));
        assert!(rendered
            .sql
            .ends_with("AND (t1.gmlid IN (?, ?) OR t0.id = ?)"));
    }

    #[test]
    fn test_empty_id_list_rejected() {
        assert_eq!(
            try_compile(&buildings(database_ids([]))),
            Err(QueryBuildError::EmptyIdList)
        );
    }
}
