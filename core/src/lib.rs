pub mod db;
pub mod describe;
pub mod error;
pub mod manager;
pub mod meta;
pub mod registry;

pub use db::DbDescriber;
pub use describe::{ColumnDesc, SchemaDescriber};
pub use error::{MetaError, Result};
pub use manager::{EntityFactory, GenericEntityFactory, GenericTable, TableHandle, TableMeta};
pub use meta::{DataType, Entity, FieldMap, FieldMeta};
pub use registry::MetaRegistry;
