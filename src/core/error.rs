use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Unknown activity: {0}")]
    UnknownActivity(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(crate::core::types::EntityId),

    #[error("No running activity has a step labelled '{0}'")]
    UnknownJumpTarget(String),

    #[error("Unknown {family} type: {type_code}")]
    UnknownType {
        family: &'static str,
        type_code: String,
    },

    #[error("Missing field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Invalid entity selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Cannot resolve {kind} code '{code}'")]
    UnresolvedStack { kind: String, code: String },

    #[error("Behavior registry has not been initialised")]
    RegistryNotInitialized,

    #[error("Behavior registry is already initialised")]
    RegistryAlreadyInitialized,

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SchedulerError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SchedulerError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
