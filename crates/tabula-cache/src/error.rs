use tabula_model::ModelError;
use thiserror::Error;

/// Push-channel payloads that do not fit the event schema.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event name {0:?} is not of the form <resource>:<kind>")]
    MalformedName(String),

    #[error(transparent)]
    Resource(#[from] ModelError),

    #[error("unsupported event kind {kind:?} for resource {resource:?}")]
    UnknownKind { resource: String, kind: String },

    #[error("{event} payload has no {field:?} field")]
    MissingField { event: String, field: String },

    #[error("{event} payload does not match its schema: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, EventError>;
