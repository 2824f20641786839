//! Integration tests for binary spatial and distance operators

#[cfg(test)]
mod spatial_query_tests {
    use cityquery::config::CompilerConfig;
    use cityquery::geometry::{Coordinate, Geometry, GeometryError, GeometryObject};
    use cityquery::query::{
        BinarySpatial, BinarySpatialKind, DistanceKind, DistanceSpatial, Predicate, Query,
        SpatialOperator,
    };
    use cityquery::sql_ast::SqlValue;
    use cityquery::QueryBuildError;
    use test_case::test_case;

    use crate::common::{
        compile, compile_with, oracle, reference, square, try_compile, try_compile_with,
    };

    const SQUARE_WKT: &str = "POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))";

    fn binary(operator: BinarySpatialKind, operand: Option<&str>) -> Predicate {
        Predicate::Spatial(SpatialOperator::Binary(BinarySpatial {
            operator,
            operand: operand.map(reference),
            geometry: square(10.0),
        }))
    }

    fn distance(operator: DistanceKind, operand: &str, value: f64, unit: Option<&str>) -> Predicate {
        Predicate::Spatial(SpatialOperator::Distance(DistanceSpatial {
            operator,
            operand: Some(reference(operand)),
            geometry: square(10.0),
            distance: value,
            unit: unit.map(str::to_string),
        }))
    }

    fn buildings(selection: Predicate) -> Query {
        Query::new(["bldg:Building"]).with_selection(selection)
    }

    #[test]
    fn test_intersects_decomposed_geometry() {
        let rendered = compile(&buildings(binary(
            BinarySpatialKind::Intersects,
            Some("bldg:lod2Solid"),
        )));
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             INNER JOIN cityobject t1 ON t1.id = t0.id \
             WHERE t0.objectclass_id = 26 \
             AND t1.envelope && ST_GeomFromText(?, 25832) \
             AND EXISTS (SELECT 1 FROM surface_geometry t2 WHERE t2.root_id = t0.id \
             AND ST_Intersects(t2.geometry, ST_GeomFromText(?, 25832)))"
        );
        assert_eq!(
            rendered.parameters,
            vec![
                SqlValue::Geometry(SQUARE_WKT.to_string()),
                SqlValue::Geometry(SQUARE_WKT.to_string()),
            ]
        );
    }

    #[test]
    fn test_intersects_on_oracle() {
        let rendered = compile_with(
            &buildings(binary(BinarySpatialKind::Intersects, Some("bldg:lod2Solid"))),
            &oracle(),
        );
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             INNER JOIN cityobject t1 ON t1.id = t0.id \
             WHERE t0.objectclass_id = 26 \
             AND SDO_FILTER(t1.envelope, SDO_GEOMETRY(?, 25832)) = 'TRUE' \
             AND EXISTS (SELECT 1 FROM surface_geometry t2 WHERE t2.root_id = t0.id \
             AND SDO_RELATE(t2.geometry, SDO_GEOMETRY(?, 25832), 'mask=ANYINTERACT') = 'TRUE')"
        );
    }

    #[test]
    fn test_bbox_defaults_to_envelope_property() {
        let rendered = compile(&buildings(binary(BinarySpatialKind::Bbox, None)));
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             INNER JOIN cityobject t1 ON t1.id = t0.id \
             WHERE t0.objectclass_id = 26 AND t1.envelope && ST_GeomFromText(?, 25832)"
        );
        assert_eq!(rendered.parameters.len(), 1);
    }

    #[test]
    fn test_disjoint_is_negated_intersects() {
        let rendered = compile(&buildings(binary(
            BinarySpatialKind::Disjoint,
            Some("bldg:lod2Solid"),
        )));
        assert!(rendered.sql.contains(
            "WHERE t0.objectclass_id = 26 AND NOT (t1.envelope && ST_GeomFromText(?, 25832) \
             AND EXISTS (SELECT 1 FROM surface_geometry t2 WHERE t2.root_id = t0.id \
             AND ST_Intersects(t2.geometry, ST_GeomFromText(?, 25832))))"
        ));
    }

    #[test_case(BinarySpatialKind::Contains; "contains")]
    #[test_case(BinarySpatialKind::Equals; "equals")]
    fn test_whole_geometry_operators_rejected_on_decomposed(kind: BinarySpatialKind) {
        assert!(matches!(
            try_compile(&buildings(binary(kind, Some("bldg:lod2Solid")))),
            Err(QueryBuildError::UnsupportedSpatialOperator { .. })
        ));
    }

    #[test]
    fn test_dwithin_converts_units_and_expands_prefilter() {
        let rendered = compile(&buildings(distance(
            DistanceKind::DWithin,
            "bldg:lod2Solid",
            0.5,
            Some("km"),
        )));
        assert!(rendered
            .sql
            .contains("ST_DWithin(t2.geometry, ST_GeomFromText(?, 25832), 500)"));
        assert_eq!(
            rendered.parameters[0],
            SqlValue::Geometry(
                "POLYGON ((-500 -500, 510 -500, 510 510, -500 510, -500 -500))".to_string()
            )
        );
        assert_eq!(
            rendered.parameters[1],
            SqlValue::Geometry(SQUARE_WKT.to_string())
        );
    }

    #[test]
    fn test_beyond_is_negated_dwithin() {
        let rendered = compile(&buildings(distance(
            DistanceKind::Beyond,
            "bldg:lod2Solid",
            25.0,
            None,
        )));
        assert!(rendered.sql.contains("AND NOT (t1.envelope && "));
        assert!(rendered
            .sql
            .contains("ST_DWithin(t2.geometry, ST_GeomFromText(?, 25832), 25)))"));
    }

    #[test]
    fn test_negative_distance_rejected() {
        assert!(matches!(
            try_compile(&buildings(distance(
                DistanceKind::DWithin,
                "bldg:lod2Solid",
                -1.0,
                None
            ))),
            Err(QueryBuildError::InvalidOperands { .. })
        ));
    }

    #[test]
    fn test_implicit_geometry_is_tested_inline() {
        let query = Query::new(["CityFurniture"]).with_selection(distance(
            DistanceKind::DWithin,
            "lod1ImplicitRepresentation",
            10.0,
            None,
        ));
        let rendered = compile(&query);
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM city_furniture t0 \
             WHERE t0.objectclass_id = 21 \
             AND ST_DWithin(t0.lod1_implicit_ref_point, ST_GeomFromText(?, 25832), 10)"
        );
    }

    #[test]
    fn test_spatial_on_attribute_rejected() {
        assert!(matches!(
            try_compile(&buildings(binary(BinarySpatialKind::Intersects, Some("gml:name")))),
            Err(QueryBuildError::NotAGeometry(_))
        ));
    }

    #[test]
    fn test_point_operand_in_3d() {
        let point = GeometryObject::new(Geometry::Point(Coordinate::new_3d(1.0, 2.0, 3.0)), 25832);
        let query = buildings(Predicate::Spatial(SpatialOperator::Binary(BinarySpatial {
            operator: BinarySpatialKind::Intersects,
            operand: Some(reference("gml:boundedBy")),
            geometry: point,
        })));
        let rendered = compile(&query);
        assert!(rendered
            .sql
            .ends_with("AND ST_Intersects(t1.envelope, ST_GeomFromText(?, 25832))"));
        assert_eq!(
            rendered.parameters,
            vec![SqlValue::Geometry("POINT Z (1 2 3)".to_string())]
        );
    }

    fn wgs84_point_query() -> Query {
        let point = GeometryObject::new(Geometry::Point(Coordinate::new(13.4, 52.5)), 4326);
        buildings(Predicate::Spatial(SpatialOperator::Binary(BinarySpatial {
            operator: BinarySpatialKind::Intersects,
            operand: Some(reference("gml:boundedBy")),
            geometry: point,
        })))
    }

    #[test]
    fn test_literal_reprojected_into_database_srs() {
        let config = CompilerConfig {
            srid: 3857,
            ..Default::default()
        };
        let rendered = compile_with(&wgs84_point_query(), &config);
        assert!(rendered
            .sql
            .ends_with("AND ST_Intersects(t1.envelope, ST_GeomFromText(?, 3857))"));

        let [SqlValue::Geometry(wkt)] = rendered.parameters.as_slice() else {
            panic!("expected one geometry parameter, got {:?}", rendered.parameters);
        };
        let coordinates: Vec<f64> = wkt
            .trim_start_matches("POINT (")
            .trim_end_matches(')')
            .split(' ')
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(coordinates.len(), 2, "unexpected WKT {}", wkt);
        assert!((coordinates[0] - 1_491_681.18).abs() < 1.0, "x in {}", wkt);
        assert!((coordinates[1] - 6_891_041.72).abs() < 1.0, "y in {}", wkt);
    }

    #[test]
    fn test_unsupported_reprojection_rejected() {
        assert_eq!(
            try_compile_with(&wgs84_point_query(), &CompilerConfig::default()),
            Err(QueryBuildError::Geometry(
                GeometryError::UnsupportedTransformation {
                    from: 4326,
                    to: 25832
                }
            ))
        );
    }
}
