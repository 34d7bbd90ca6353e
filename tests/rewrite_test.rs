// Index definition rewriting against catalog-backed definitions
mod common;

use common::init_tracing;
use postgrust_migrate::catalog::{MemoryCatalog, BTREE_AM};
use postgrust_migrate::core::{type_oid, DataType, MigrateConfig, MigrateError, Oid};
use postgrust_migrate::migrate::{IndexRewriter, NameToken};

fn table_with_index(definition: &str, attribute_types: Vec<DataType>) -> (MemoryCatalog, Oid, Oid) {
    init_tracing();
    let mut catalog = MemoryCatalog::with_builtin_opclasses();
    let table = catalog.create_table("public", "t", Oid(10)).unwrap();
    let index = catalog.create_index(table, "ix", definition, attribute_types).unwrap();
    (catalog, table, index)
}

#[test]
fn test_ddl_round_trip() {
    let (catalog, table, index) = table_with_index("CREATE INDEX ix ON public.t (a)", vec![DataType::Integer]);
    let token = NameToken::derive(table, index);

    let ddl =
        IndexRewriter::build_index_ddl(&catalog, &MigrateConfig::default(), index, table, None, false, &token)
            .unwrap();
    assert_eq!(ddl, format!("CREATE INDEX ix_{token} ON migrate.table_{table} USING btree (a)"));
}

#[test]
fn test_partial_index_keeps_predicate() {
    let (catalog, table, index) =
        table_with_index("CREATE INDEX ix ON public.t USING btree (a) WHERE (a > 0)", vec![DataType::Integer]);
    let token = NameToken::derive(table, index);

    let ddl =
        IndexRewriter::build_index_ddl(&catalog, &MigrateConfig::default(), index, table, None, false, &token)
            .unwrap();
    assert_eq!(ddl, format!("CREATE INDEX ix_{token} ON migrate.table_{table} USING btree (a) WHERE (a > 0)"));
}

#[test]
fn test_order_by_keeps_direction_and_nulls() {
    let (catalog, table, index) = table_with_index(
        "CREATE INDEX ix ON public.t USING btree (a DESC NULLS LAST)",
        vec![DataType::Integer],
    );
    assert_eq!(IndexRewriter::build_order_by(&catalog, index, table).unwrap(), "a DESC NULLS LAST");
}

#[test]
fn test_operator_class_resolution() {
    let (catalog, table, index) = table_with_index(
        "CREATE INDEX ix ON public.t USING btree (name text_pattern_ops, code bpchar_pattern_ops NULLS FIRST, id)",
        vec![DataType::Text, DataType::Char { length: 4 }, DataType::Integer],
    );
    let order_by = IndexRewriter::build_order_by(&catalog, index, table).unwrap();
    assert_eq!(order_by, "name USING ~<~, code USING ~<~ NULLS FIRST, id");
    assert!(!order_by.contains("_ops"));
}

#[test]
fn test_custom_operator_class() {
    let (mut catalog, table, index) = table_with_index(
        "CREATE INDEX ix ON public.t USING btree (price COLLATE \"C\" reverse_ops DESC)",
        vec![DataType::Numeric { precision: 10, scale: 2 }],
    );
    let family = Oid(91000);
    catalog.add_opclass("reverse_ops", BTREE_AM, family, type_oid::NUMERIC, false);
    catalog.add_operator(Oid(91001), ">", family, type_oid::NUMERIC, 1);

    assert_eq!(
        IndexRewriter::build_order_by(&catalog, index, table).unwrap(),
        "price COLLATE \"C\" DESC USING >"
    );
}

#[test]
fn test_expression_index() {
    let (catalog, table, index) = table_with_index(
        "CREATE UNIQUE INDEX ix ON public.t USING btree (lower((email)::text), (id + 1) DESC) WHERE (active)",
        vec![DataType::Text, DataType::Integer],
    );
    assert_eq!(
        IndexRewriter::build_order_by(&catalog, index, table).unwrap(),
        "lower((email)::text), (id + 1) DESC"
    );

    let ddl = IndexRewriter::build_index_ddl(
        &catalog,
        &MigrateConfig::default(),
        index,
        table,
        Some("fast_ssd"),
        true,
        &NameToken::from("0a1b"),
    )
    .unwrap();
    assert_eq!(
        ddl,
        "CREATE UNIQUE INDEX CONCURRENTLY ix_0a1b ON public.t USING btree (lower((email)::text), (id + 1) DESC) \
         TABLESPACE fast_ssd WHERE (active)"
    );
}

#[test]
fn test_unsupported_shape_emits_nothing() {
    let (catalog, table, index) =
        table_with_index("CREATE INDEX ix ON ONLY public.t USING btree (a)", vec![DataType::Integer]);
    let result =
        IndexRewriter::build_index_ddl(&catalog, &MigrateConfig::default(), index, table, None, false, &"x".into());
    assert!(matches!(result, Err(MigrateError::UnsupportedIndexDefinition(_))));
}

#[test]
fn test_unsupported_partial_index_emits_nothing() {
    for definition in [
        "CREATE INDEX ix ON ONLY public.t USING btree (a) WHERE (a > 0)",
        "CREATE INDEX ix ON public.t USING btree (a) WHERE ",
        "CREATE INDEX ix ON public.t USING btree (a) WHERE (a > 0",
    ] {
        let (catalog, table, index) = table_with_index(definition, vec![DataType::Integer]);
        let result = IndexRewriter::build_index_ddl(
            &catalog,
            &MigrateConfig::default(),
            index,
            table,
            Some("fast_ssd"),
            true,
            &"x".into(),
        );
        assert!(
            matches!(result, Err(MigrateError::UnsupportedIndexDefinition(ref sql)) if sql == definition),
            "{definition}: {result:?}"
        );
    }
}
