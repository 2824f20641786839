//! Integration tests for the start id filter and the row window
//!
//! Native OFFSET/FETCH and the ROW_NUMBER() emulation must select the same
//! rows. The window bounds are pulled out of the rendered SQL and applied to
//! a simulated, id-ordered table.

#[cfg(test)]
mod pagination_tests {
    use cityquery::config::CompilerConfig;
    use cityquery::query::{BinaryComparisonKind, CounterFilter, Query, SortProperty, StartIdFilter};
    use regex::Regex;
    use test_case::test_case;

    use crate::common::{compile, compile_with, oracle, reference};

    const ROWS: std::ops::RangeInclusive<u64> = 1..=100;

    fn legacy_oracle() -> CompilerConfig {
        CompilerConfig {
            legacy_pagination: true,
            ..oracle()
        }
    }

    fn page(start: u64, count: u64) -> Query {
        Query::new(["bldg:Building"]).with_counter(CounterFilter::window(start, count))
    }

    fn capture(re: &str, sql: &str) -> Option<u64> {
        Regex::new(re)
            .unwrap()
            .captures(sql)
            .map(|c| c[1].parse().unwrap())
    }

    /// Rows selected by OFFSET/FETCH
    fn native_window(sql: &str) -> Vec<u64> {
        let offset = capture(r"OFFSET (\d+) ROWS", sql).unwrap_or(0) as usize;
        let fetch = capture(r"FETCH FIRST (\d+) ROWS ONLY", sql).unwrap_or(u64::MAX) as usize;
        ROWS.skip(offset).take(fetch).collect()
    }

    /// Rows selected by the row number bounds
    fn emulated_window(sql: &str) -> Vec<u64> {
        let lower = capture(r"\.rn > (\d+)", sql).unwrap_or(0);
        let upper = capture(r"\.rn <= (\d+)", sql).unwrap_or(u64::MAX);
        // Row numbers start at 1 over the same ordering
        ROWS.filter(|rn| *rn > lower && *rn <= upper).collect()
    }

    #[test]
    fn test_offset_fetch() {
        let rendered = compile(&page(10, 5));
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 WHERE t0.objectclass_id = 26 \
             ORDER BY t0.id ASC OFFSET 10 ROWS FETCH FIRST 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_zero_offset_is_omitted() {
        let rendered = compile(&page(0, 5));
        assert!(rendered.sql.ends_with("ORDER BY t0.id ASC FETCH FIRST 5 ROWS ONLY"));
        assert!(!rendered.sql.contains("OFFSET"));
    }

    #[test]
    fn test_oracle_hint() {
        let rendered = compile_with(&page(10, 5), &oracle());
        assert!(rendered.sql.starts_with("SELECT /*+ FIRST_ROWS(15) */ t0.id"));
        assert!(rendered.sql.ends_with("OFFSET 10 ROWS FETCH FIRST 5 ROWS ONLY"));
    }

    #[test]
    fn test_row_number_emulation() {
        let rendered = compile_with(&page(10, 5), &legacy_oracle());
        assert_eq!(
            rendered.sql,
            "SELECT /*+ FIRST_ROWS(15) */ t1.id, t1.objectclass_id FROM \
             (SELECT t0.id, t0.objectclass_id, ROW_NUMBER() OVER (ORDER BY t0.id ASC) AS rn \
             FROM building t0 WHERE t0.objectclass_id = 26) t1 \
             WHERE t1.rn > 10 AND t1.rn <= 15 ORDER BY t1.rn ASC"
        );
    }

    #[test_case(0, 10; "first page")]
    #[test_case(10, 5; "middle page")]
    #[test_case(95, 10; "last partial page")]
    #[test_case(120, 10; "beyond the end")]
    #[test_case(0, 1; "single row")]
    fn test_emulation_selects_same_rows(start: u64, count: u64) {
        let native = compile(&page(start, count));
        let emulated = compile_with(&page(start, count), &legacy_oracle());
        assert_eq!(
            native_window(&native.sql),
            emulated_window(&emulated.sql),
            "native: {}\nemulated: {}",
            native.sql,
            emulated.sql
        );
    }

    #[test]
    fn test_start_id_filter() {
        let query = Query::new(["bldg:Building"]).with_counter(CounterFilter {
            start_index: None,
            count: Some(10),
            start_id: Some(StartIdFilter {
                operator: BinaryComparisonKind::GreaterThan,
                value: 100,
            }),
        });
        let rendered = compile(&query);
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 \
             WHERE t0.objectclass_id = 26 AND t0.id > 100 \
             ORDER BY t0.id ASC FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_id_order_follows_sort_keys() {
        let query = page(0, 20).with_sorting(vec![SortProperty::descending(reference(
            "bldg:function",
        ))]);
        let rendered = compile(&query);
        assert!(rendered
            .sql
            .contains("ORDER BY t0.function DESC, t0.id ASC FETCH FIRST 20 ROWS ONLY"));
    }

    #[test]
    fn test_no_counter_no_fallback_order() {
        let rendered = compile(&Query::new(["bldg:Building"]));
        assert_eq!(
            rendered.sql,
            "SELECT t0.id, t0.objectclass_id FROM building t0 WHERE t0.objectclass_id = 26"
        );
    }
}
