use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::describe::SchemaDescriber;
use crate::error::{MetaError, Result};
use crate::meta::{Entity, FieldMap, FieldMeta};

/// Finalized, shareable descriptor of one table. The registry owns the
/// cached `Arc`; callers only ever receive clones of it.
pub trait TableHandle: Send + Sync {
    fn table_name(&self) -> &str;
    fn field_map(&self) -> &FieldMap;
    fn entity(&self) -> &Entity;
}

/// Entity-construction collaborator: turns a finalized field map into a
/// [`TableHandle`]. Swappable so an actual ORM layer can supply its own
/// descriptor type.
pub trait EntityFactory: Send + Sync {
    fn build_entity(&self, table: &str, fields: FieldMap) -> Result<Arc<dyn TableHandle>>;
}

/// Plain data-carrying descriptor produced by [`GenericEntityFactory`].
#[derive(Debug, Clone)]
pub struct GenericTable {
    table_name: String,
    fields: FieldMap,
    entity: Entity,
}

impl TableHandle for GenericTable {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn field_map(&self) -> &FieldMap {
        &self.fields
    }

    fn entity(&self) -> &Entity {
        &self.entity
    }
}

#[derive(Debug, Default)]
pub struct GenericEntityFactory;

impl EntityFactory for GenericEntityFactory {
    fn build_entity(&self, table: &str, fields: FieldMap) -> Result<Arc<dyn TableHandle>> {
        let entity = Entity::from_fields(table, &fields);
        Ok(Arc::new(GenericTable {
            table_name: table.to_string(),
            fields,
            entity,
        }))
    }
}

/// Per-table field accumulator.
///
/// Fields come either from the typed/raw definition methods or, when none
/// were supplied, from schema introspection on first resolution. Explicit
/// definitions always win: once any field is set, the describer is never
/// consulted. The resolved map is memoized for the builder's lifetime;
/// definition methods replace it wholesale, so later mutation discards an
/// earlier introspection result.
#[derive(Debug, Clone, Default)]
pub struct TableMeta {
    table_name: String,
    fields: Option<FieldMap>,
}

impl TableMeta {
    pub fn new(table: impl Into<String>) -> Self {
        TableMeta {
            table_name: table.into(),
            fields: None,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Replace the accumulated field set with raw definitions, normalizing
    /// each entry individually. Structurally malformed definitions fail
    /// with [`MetaError::InvalidFieldDefinition`]; unknown keys in a
    /// definition blob are ignored.
    pub fn set_fields_raw(&mut self, raw: IndexMap<String, Value>) -> Result<&mut Self> {
        let mut fields = FieldMap::with_capacity(raw.len());
        for (name, def) in raw {
            fields.insert(name.clone(), normalize_raw(&name, def)?);
        }
        self.fields = Some(fields);
        Ok(self)
    }

    /// Add or overwrite a single field from a raw definition blob.
    pub fn add_field_raw(&mut self, name: impl Into<String>, def: Value) -> Result<&mut Self> {
        let name = name.into();
        let field = normalize_raw(&name, def)?;
        self.fields
            .get_or_insert_with(FieldMap::new)
            .insert(name, field);
        Ok(self)
    }

    /// Add or overwrite a single field from typed metadata.
    pub fn add_field(&mut self, name: impl Into<String>, field: FieldMeta) -> &mut Self {
        self.fields
            .get_or_insert_with(FieldMap::new)
            .insert(name.into(), field);
        self
    }

    /// Resolve the field map, introspecting the table when no fields were
    /// supplied explicitly. The result is memoized; the describer runs at
    /// most once per builder.
    pub async fn resolve_fields(&mut self, describer: &dyn SchemaDescriber) -> Result<&FieldMap> {
        if self.fields.is_none() {
            let rows = describer.describe_table(&self.table_name).await?;
            let mut fields = FieldMap::with_capacity(rows.len());
            for row in &rows {
                fields.insert(row.name.clone(), row.to_field());
            }
            self.fields = Some(fields);
        }
        Ok(self.fields.get_or_insert_with(FieldMap::new))
    }

    /// Resolve fields and hand them to the entity-construction
    /// collaborator, yielding the finalized descriptor.
    pub async fn build(
        &mut self,
        describer: &dyn SchemaDescriber,
        factory: &dyn EntityFactory,
    ) -> Result<Arc<dyn TableHandle>> {
        let fields = self.resolve_fields(describer).await?.clone();
        factory.build_entity(&self.table_name, fields)
    }
}

fn normalize_raw(name: &str, def: Value) -> Result<FieldMeta> {
    serde_json::from_value(def).map_err(|e| MetaError::invalid_field(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::test_support::{col, StaticDescriber};
    use crate::meta::DataType;
    use serde_json::json;

    fn users_describer() -> StaticDescriber {
        StaticDescriber::new(vec![
            col("id", "int(11)", "PRI", "auto_increment", None),
            col("email", "varchar(255)", "", "", None),
        ])
    }

    #[tokio::test]
    async fn introspection_builds_field_map_in_row_order() {
        let describer = users_describer();
        let mut meta = TableMeta::new("users");
        let fields = meta.resolve_fields(&describer).await.unwrap();

        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, ["id", "email"]);

        let id = &fields["id"];
        assert_eq!(id.data_type, DataType::Integer);
        assert!(id.primary);
        assert!(id.autocomplete);

        let email = &fields["email"];
        assert_eq!(email.data_type, DataType::String);
        assert!(!email.primary);
        assert!(!email.autocomplete);
    }

    #[tokio::test]
    async fn resolution_is_memoized() {
        let describer = users_describer();
        let mut meta = TableMeta::new("users");
        meta.resolve_fields(&describer).await.unwrap();
        meta.resolve_fields(&describer).await.unwrap();
        assert_eq!(describer.call_count(), 1);
    }

    #[tokio::test]
    async fn explicit_fields_skip_introspection() {
        let describer = users_describer();
        let mut meta = TableMeta::new("users");
        meta.add_field("id", FieldMeta::of(DataType::Integer).primary());
        let fields = meta.resolve_fields(&describer).await.unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(describer.call_count(), 0);
    }

    #[tokio::test]
    async fn default_suppression_end_to_end() {
        let describer = StaticDescriber::new(vec![
            col("id", "int(11)", "PRI", "auto_increment", None),
            col("created_at", "timestamp", "", "", Some("CURRENT_TIMESTAMP")),
            col("name", "varchar(64)", "", "", Some("unnamed")),
        ]);
        let mut meta = TableMeta::new("accounts");
        let fields = meta.resolve_fields(&describer).await.unwrap();

        assert_eq!(fields["id"].default_value, None);
        assert_eq!(fields["created_at"].default_value, None);
        assert_eq!(fields["name"].default_value, Some(json!("unnamed")));
    }

    #[tokio::test]
    async fn introspection_failure_propagates() {
        let describer = StaticDescriber::failing();
        let mut meta = TableMeta::new("users");
        let err = meta.resolve_fields(&describer).await.unwrap_err();
        assert!(matches!(err, MetaError::Introspection { ref table, .. } if table == "users"));
    }

    #[test]
    fn set_fields_raw_replaces_accumulated_fields() {
        let mut meta = TableMeta::new("users");
        meta.add_field("stale", FieldMeta::default());

        let mut raw = IndexMap::new();
        raw.insert(
            "id".to_string(),
            json!({"data_type": "integer", "primary": true, "autocomplete": true}),
        );
        raw.insert("email".to_string(), json!({"data_type": "string"}));
        meta.set_fields_raw(raw).unwrap();

        let fields = meta.fields.as_ref().unwrap();
        assert!(!fields.contains_key("stale"));
        assert_eq!(fields.len(), 2);
        assert!(fields["id"].primary);
    }

    #[test]
    fn add_field_raw_accepts_bitrix_shaped_blobs() {
        let mut meta = TableMeta::new("users");
        meta.add_field_raw(
            "status",
            json!({
                "data_type": "string",
                "required": true,
                "default_value": "new",
                "values": ["new", "active", "blocked"],
                "title": "ignored extra key"
            }),
        )
        .unwrap();

        let field = &meta.fields.as_ref().unwrap()["status"];
        assert!(field.required);
        assert_eq!(field.default_value, Some(json!("new")));
        assert_eq!(
            field.enum_values,
            Some(vec![json!("new"), json!("active"), json!("blocked")])
        );
    }

    #[test]
    fn malformed_raw_definition_is_rejected() {
        let mut meta = TableMeta::new("users");
        let err = meta
            .add_field_raw("id", json!({"data_type": 42}))
            .unwrap_err();
        assert!(matches!(
            err,
            MetaError::InvalidFieldDefinition { ref field, .. } if field == "id"
        ));
    }

    #[tokio::test]
    async fn build_produces_descriptor_with_entity() {
        let describer = users_describer();
        let factory = GenericEntityFactory;
        let mut meta = TableMeta::new("users");
        let handle = meta.build(&describer, &factory).await.unwrap();

        assert_eq!(handle.table_name(), "users");
        assert_eq!(handle.field_map().len(), 2);
        assert_eq!(handle.entity().primary_key(), ["id"]);
        assert_eq!(handle.entity().identity(), Some("id"));
    }
}
