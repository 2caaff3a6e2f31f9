//! Lenient decoding of loader responses.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tabula_model::Page;
use tabula_query::QueryState;

use crate::error::LoaderError;

/// Decodes a `{rows, page, limit, total, totalPages}` body.
///
/// Only a non-object body is an error. Inside the object:
/// - a `rows` value that is not an array becomes an empty list (warned);
/// - rows that fail to decode are skipped (warned);
/// - missing `page` / `limit` fall back to the query's, a missing `total` to
///   the number of rows;
/// - `totalPages` is always recomputed from `total` and `limit`.
pub fn decode_page<R: DeserializeOwned>(body: Value, query: &QueryState) -> Result<Page<R>, LoaderError> {
    let Value::Object(mut object) = body else {
        return Err(LoaderError::Malformed(kind_of(&body).to_string()));
    };

    let rows = match object.remove("rows") {
        Some(Value::Array(items)) => decode_rows(items),
        Some(other) => {
            tracing::warn!(found = kind_of(&other), "page rows are not an array, using none");
            Vec::new()
        }
        None => {
            tracing::warn!("page has no rows field, using none");
            Vec::new()
        }
    };

    let page = read_count(&object, "page").filter(|&p| p > 0).unwrap_or(query.page);
    let limit = read_count(&object, "limit").filter(|&l| l > 0).unwrap_or(query.limit);
    let total = read_count(&object, "total").unwrap_or(rows.len());

    Ok(Page::new(rows, page, limit, total))
}

fn decode_rows<R: DeserializeOwned>(items: Vec<Value>) -> Vec<R> {
    let count = items.len();
    let rows: Vec<R> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(row) => Some(row),
            Err(error) => {
                tracing::warn!(index, %error, "skipping undecodable row");
                None
            }
        })
        .collect();
    if rows.len() < count {
        tracing::debug!(kept = rows.len(), dropped = count - rows.len(), "rows decoded");
    }
    rows
}

fn read_count(object: &Map<String, Value>, field: &str) -> Option<usize> {
    object
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
