use crate::core::{MigrateConfig, Oid};
use crate::parser::quote_identifier;

/// The five statement templates one replay call works with
///
/// * `peek` takes the batch limit as its only (INT4) parameter and returns
///   `(id, pk, row)` ordered by `id`
/// * `insert` takes the new row image
/// * `delete` takes the primary-key image
/// * `update` takes the primary-key image and the new row image
/// * `pop_prefix` is completed with `<id>,<id>,...);`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStatements {
    pub peek: String,
    pub insert: String,
    pub delete: String,
    pub update: String,
    pub pop_prefix: String,
}

/// Statement texts of one table migration, in the form the driver installs them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatements {
    pub source: Oid,
    pub log_table: String,
    pub shadow_table: String,
    pub pk_type: String,
    /// Parameter of the capture trigger: `$1` old image, `$2` new image
    pub log_insert: String,
    pub replay: ReplayStatements,
}

impl MigrationStatements {
    /// `columns` are the table's columns in order, `key_columns` its primary key
    #[must_use]
    pub fn new(config: &MigrateConfig, source: Oid, columns: &[&str], key_columns: &[&str]) -> Self {
        let schema = quote_identifier(&config.schema);
        let log_table = format!("{schema}.log_{source}");
        let shadow_table = format!("{schema}.{}", config.shadow_table_name(source));
        let pk_type = format!("{schema}.pk_{source}");

        let keys: Vec<String> = key_columns.iter().map(|c| quote_identifier(c)).collect();
        let cols: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        let field_list = |param: &str, names: &[String]| {
            names.iter().map(|n| format!("{param}.{n}")).collect::<Vec<_>>().join(", ")
        };
        let key_match = format!("({}) = ({})", keys.join(", "), field_list("$1", &keys));

        let log_insert = format!(
            "INSERT INTO {log_table}(pk, row) VALUES( CASE WHEN $1 IS NULL THEN NULL ELSE (ROW({})::{pk_type}) END, $2)",
            field_list("$1", &keys)
        );

        let replay = ReplayStatements {
            peek: format!("SELECT * FROM {log_table} ORDER BY id LIMIT $1"),
            insert: format!("INSERT INTO {shadow_table} VALUES ($1.*)"),
            delete: format!("DELETE FROM {shadow_table} WHERE {key_match}"),
            update: format!(
                "UPDATE {shadow_table} SET ({}) = ({}) WHERE {key_match}",
                cols.join(", "),
                field_list("$2", &cols)
            ),
            pop_prefix: format!("DELETE FROM {log_table} WHERE id IN ("),
        };

        Self { source, log_table, shadow_table, pk_type, log_insert, replay }
    }
}
