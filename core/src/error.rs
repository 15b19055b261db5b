use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("introspection failed for table `{table}`: {source}")]
    Introspection {
        table: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("invalid field definition `{field}`: {reason}")]
    InvalidFieldDefinition { field: String, reason: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl MetaError {
    pub fn introspection(table: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        MetaError::Introspection {
            table: table.into(),
            source: source.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MetaError::InvalidFieldDefinition {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = MetaError> = std::result::Result<T, E>;
