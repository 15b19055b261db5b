use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// Ordered field map of a table. Iteration order is definition order,
/// either explicit-definition order or introspection order.
pub type FieldMap = IndexMap<String, FieldMeta>;

/// Logical column type a raw database type string is normalized into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Datetime,
    Boolean,
}

impl DataType {
    /// Classify a raw column type string by its leading token, i.e. the part
    /// before the first `(`: `int(11)` -> Integer, `timestamp` -> Datetime,
    /// `bool(1)` -> Boolean. Unrecognized tokens fall back to String so that
    /// backend-specific types never abort introspection.
    pub fn classify(raw: &str) -> Self {
        let token = raw.split('(').next().unwrap_or(raw).trim();
        match token {
            "int" => DataType::Integer,
            "timestamp" => DataType::Datetime,
            "bool" => DataType::Boolean,
            "varchar" | "char" | "text" | "string" => DataType::String,
            _ => {
                log::warn!("unrecognized column type `{raw}`, treating as string");
                DataType::String
            }
        }
    }
}

/// Canonical description of a single column.
///
/// The field name lives as the key of the enclosing [`FieldMap`]. The serde
/// shape matches the raw-definition format accepted by
/// [`TableMeta::add_field_raw`](crate::manager::TableMeta::add_field_raw):
/// `data_type`, `required`, `primary`, `autocomplete`, `default_value`,
/// `values`. The two optional keys are omitted entirely when unset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldMeta {
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, rename = "values", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl FieldMeta {
    pub fn of(data_type: DataType) -> Self {
        FieldMeta {
            data_type,
            ..FieldMeta::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn enum_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.enum_values = Some(values.into_iter().collect());
        self
    }
}

/// Downstream-consumable summary derived from a finalized field map:
/// ordered column names, the primary key column set and the identity
/// (auto-increment) column, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    table_name: String,
    columns: Vec<String>,
    primary: Vec<String>,
    identity: Option<String>,
}

impl Entity {
    pub fn from_fields(table: &str, fields: &FieldMap) -> Self {
        let columns: Vec<String> = fields.keys().cloned().collect();
        let primary: Vec<String> = fields
            .iter()
            .filter(|(_, f)| f.primary)
            .map(|(name, _)| name.clone())
            .collect();
        let identity = fields
            .iter()
            .find(|(_, f)| f.autocomplete)
            .map(|(name, _)| name.clone());

        if primary.is_empty() {
            log::warn!("table `{table}` has no primary key column in its field map");
        }

        Entity {
            table_name: table.to_string(),
            columns,
            primary,
            identity,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}
