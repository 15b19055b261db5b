use serde_json::Value;

use crate::error::Result;
use crate::meta::{DataType, FieldMeta};

/// Key designation a DESCRIBE-style query uses for primary key columns.
pub const KEY_PRIMARY: &str = "PRI";
/// Extra marker for auto-increment columns.
pub const EXTRA_AUTO_INCREMENT: &str = "auto_increment";

/// One row of a DESCRIBE-style schema query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnDesc {
    pub name: String,
    pub raw_type: String,
    pub key: String,
    pub extra: String,
    pub default: Option<String>,
}

impl ColumnDesc {
    /// Normalize this row into canonical field metadata.
    ///
    /// Defaults of datetime columns are discarded so that backend default
    /// expressions like `CURRENT_TIMESTAMP` or "on update current
    /// timestamp" never leak into the descriptor. `required` and enum
    /// values are not derivable from a DESCRIBE row and stay unset.
    pub fn to_field(&self) -> FieldMeta {
        let data_type = DataType::classify(&self.raw_type);
        let mut meta = FieldMeta::of(data_type);
        if self.key == KEY_PRIMARY {
            meta = meta.primary();
        }
        if self.extra == EXTRA_AUTO_INCREMENT {
            meta = meta.autocomplete();
        }
        if data_type != DataType::Datetime {
            if let Some(ref default) = self.default {
                meta = meta.default_value(Value::from(default.clone()));
            }
        }
        meta
    }
}

/// Schema-description collaborator. The single blocking operation of the
/// whole crate; implementations decide how the rows are actually fetched.
#[async_trait::async_trait]
pub trait SchemaDescriber: Send + Sync {
    /// Fetch the column rows of `table`. Fails with
    /// [`MetaError::Introspection`](crate::error::MetaError::Introspection)
    /// on query or row-shape errors.
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDesc>>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::MetaError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory describer serving canned rows and counting calls.
    pub struct StaticDescriber {
        rows: Vec<ColumnDesc>,
        fail: AtomicBool,
        pub calls: AtomicUsize,
    }

    impl StaticDescriber {
        pub fn new(rows: Vec<ColumnDesc>) -> Self {
            StaticDescriber {
                rows,
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            let describer = Self::new(Vec::new());
            describer.set_failing(true);
            describer
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl SchemaDescriber for StaticDescriber {
        async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDesc>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(MetaError::introspection(
                    table,
                    anyhow::anyhow!("connection refused"),
                ));
            }
            Ok(self.rows.clone())
        }
    }

    pub fn col(name: &str, raw_type: &str, key: &str, extra: &str, default: Option<&str>) -> ColumnDesc {
        ColumnDesc {
            name: name.to_string(),
            raw_type: raw_type.to_string(),
            key: key.to_string(),
            extra: extra.to_string(),
            default: default.map(str::to_string),
        }
    }
}
