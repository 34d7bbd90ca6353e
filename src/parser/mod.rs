// Index definition decomposition (canonical CREATE INDEX text only)
pub mod common;
pub mod index_def;
pub mod index_column;

pub use common::{quote_identifier, quote_qualified_identifier};
pub use index_def::{parse_index_definition, IndexDefinition, DEFAULT_ACCESS_METHOD};
pub use index_column::{parse_index_column, split_index_columns, IndexColumn};
