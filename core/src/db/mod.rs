use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Statement};

use crate::describe::{ColumnDesc, SchemaDescriber};
use crate::error::{MetaError, Result};

/// [`SchemaDescriber`] backed by a live database connection.
///
/// Issues a `DESCRIBE` statement against the connection's backend and maps
/// the result rows onto [`ColumnDesc`] via the MySQL column names
/// (`Field` | `Type` | `Key` | `Extra` | `Default`).
pub struct DbDescriber {
    db: DatabaseConnection,
}

impl DbDescriber {
    pub fn new(db: DatabaseConnection) -> Self {
        DbDescriber { db }
    }
}

#[async_trait::async_trait]
impl SchemaDescriber for DbDescriber {
    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnDesc>> {
        let err = |e: DbErr| MetaError::introspection(table, e);

        let stmt = Statement::from_string(
            self.db.get_database_backend(),
            format!("DESCRIBE `{table}`"),
        );
        let rows = self.db.query_all(stmt).await.map_err(err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(ColumnDesc {
                name: row.try_get("", "Field").map_err(err)?,
                raw_type: row.try_get("", "Type").map_err(err)?,
                key: row
                    .try_get::<Option<String>>("", "Key")
                    .map_err(err)?
                    .unwrap_or_default(),
                extra: row
                    .try_get::<Option<String>>("", "Extra")
                    .map_err(err)?
                    .unwrap_or_default(),
                default: row.try_get("", "Default").map_err(err)?,
            });
        }
        Ok(out)
    }
}
