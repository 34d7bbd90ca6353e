// Module declarations
pub mod error;
pub mod oid;
pub mod value;
pub mod data_type;
pub mod row;
pub mod config;

// Re-exports for convenience
pub use error::{MigrateError, Result};
pub use oid::{type_oid, Oid, RelKind};
pub use value::Value;
pub use data_type::DataType;
pub use row::Row;
pub use config::MigrateConfig;
