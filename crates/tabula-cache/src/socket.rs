//! Push-channel message decoding.
//!
//! Event names are `<resource>:<kind>`:
//!
//! - `product:upsert` - `{ "product": Row, "previousStatus": ..., "newStatus": ... }`
//! - `product:batch-upsert` - `{ "products": [ <upsert payload>, ... ] }`
//! - `product:remove` - `{ "id": "...", "previousStatus": ... }`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabula_model::{MutationEvent, RemoveEvent, ResourceTag, Status, UpsertEvent};

use crate::error::{EventError, Result};

/// One raw message as received from the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketMessage {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl SocketMessage {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusChange {
    #[serde(default)]
    previous_status: Option<Status>,
    new_status: Status,
}

/// Splits the event name and decodes the payload for its kind.
pub fn decode_event<R: DeserializeOwned>(
    message: SocketMessage,
) -> Result<(ResourceTag, MutationEvent<R>)> {
    let SocketMessage { event, payload } = message;
    let Some((resource, kind)) = event.split_once(':') else {
        return Err(EventError::MalformedName(event));
    };
    let resource = ResourceTag::new(resource)?;

    let decoded = match kind {
        "upsert" => MutationEvent::Upsert(decode_upsert(&event, &resource, payload)?),
        "batch-upsert" => {
            let field = resource.plural();
            let items = match payload {
                Value::Object(mut map) => map.remove(&field),
                _ => None,
            };
            let Some(Value::Array(items)) = items else {
                return Err(EventError::MissingField {
                    event: event.clone(),
                    field,
                });
            };
            let batch = items
                .into_iter()
                .map(|item| decode_upsert(&event, &resource, item))
                .collect::<Result<Vec<_>>>()?;
            MutationEvent::BatchUpsert(batch)
        }
        "remove" => {
            let remove: RemoveEvent = serde_json::from_value(payload)
                .map_err(|source| EventError::Payload {
                    event: event.clone(),
                    source,
                })?;
            MutationEvent::Remove(remove)
        }
        other => {
            return Err(EventError::UnknownKind {
                resource: resource.to_string(),
                kind: other.to_string(),
            });
        }
    };
    Ok((resource, decoded))
}

fn decode_upsert<R: DeserializeOwned>(
    event: &str,
    resource: &ResourceTag,
    mut payload: Value,
) -> Result<UpsertEvent<R>> {
    let row = payload
        .get_mut(resource.as_str())
        .map(Value::take)
        .filter(|row| !row.is_null())
        .ok_or_else(|| EventError::MissingField {
            event: event.to_string(),
            field: resource.to_string(),
        })?;
    let payload_error = |source| EventError::Payload {
        event: event.to_string(),
        source,
    };
    let row: R = serde_json::from_value(row).map_err(payload_error)?;
    let status: StatusChange = serde_json::from_value(payload).map_err(payload_error)?;
    Ok(UpsertEvent {
        row,
        previous_status: status.previous_status,
        new_status: status.new_status,
    })
}
