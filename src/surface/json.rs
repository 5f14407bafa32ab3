//! JSON body decomposition.
//!
//! # Design Decisions
//! - Only string leaves are inspected; numbers, booleans and null pass through
//! - A leaf's field name is its nearest object key; array elements inherit
//!   the key of their array
//! - The raw document is never handed to the inspector as a whole

use serde_json::Value;

use crate::error::PipelineError;
use crate::surface::{RequestSurfaceLocation, SurfaceField, ValueInspector};

/// Parse, inspect every string leaf and re-serialize if anything changed.
pub fn rewrite_json(
    body: &[u8],
    inspector: &mut impl ValueInspector,
) -> Result<Option<Vec<u8>>, PipelineError> {
    let mut document: Value =
        serde_json::from_slice(body).map_err(|e| PipelineError::MalformedStructuredBody {
            content_type: "json".to_string(),
            reason: e.to_string(),
        })?;

    let mut changed = false;
    walk(&mut document, "", "", inspector, &mut changed);
    if !changed {
        return Ok(None);
    }

    serde_json::to_vec(&document)
        .map(Some)
        .map_err(|e| PipelineError::SanitizationFailure(format!("json: {e}")))
}

fn walk(
    value: &mut Value,
    name: &str,
    path: &str,
    inspector: &mut impl ValueInspector,
    changed: &mut bool,
) {
    match value {
        Value::String(s) => {
            let field = SurfaceField::new(RequestSurfaceLocation::JsonBody, name).with_path(path);
            let replacement = inspector.inspect(&field, s);
            if replacement != *s {
                *s = replacement;
                *changed = true;
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                walk(item, name, &format!("{path}[{i}]"), inspector, changed);
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                walk(item, key, &child, inspector, changed);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
