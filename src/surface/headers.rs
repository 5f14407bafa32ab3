//! Header inspection.
//!
//! Only allow-listed headers are inspected. A replacement that is not a
//! valid header value is reported and the original value is kept.

use hyper::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::PipelineError;
use crate::surface::{RequestSurfaceLocation, SurfaceField, ValueInspector};

/// Inspect the allow-listed headers in place.
///
/// Returns whether any header changed, plus the values that could not be
/// re-encoded.
pub fn rewrite_headers(
    headers: &mut HeaderMap,
    inspected: &[HeaderName],
    inspector: &mut impl ValueInspector,
) -> (bool, Vec<PipelineError>) {
    let mut changed = false;
    let mut errors = Vec::new();

    for name in inspected {
        let originals: Vec<HeaderValue> = headers.get_all(name).iter().cloned().collect();
        if originals.is_empty() {
            continue;
        }

        let field = SurfaceField::new(RequestSurfaceLocation::Header, name.as_str());
        let mut replacements = Vec::with_capacity(originals.len());
        let mut header_changed = false;

        for original in &originals {
            let raw = String::from_utf8_lossy(original.as_bytes());
            let replacement = inspector.inspect(&field, &raw);
            if replacement == raw && raw.as_bytes() == original.as_bytes() {
                replacements.push(original.clone());
                continue;
            }
            match HeaderValue::from_bytes(replacement.as_bytes()) {
                Ok(value) => {
                    header_changed = true;
                    replacements.push(value);
                }
                Err(e) => {
                    errors.push(PipelineError::SanitizationFailure(format!(
                        "header {name}: {e}"
                    )));
                    replacements.push(original.clone());
                }
            }
        }

        if header_changed {
            headers.remove(name);
            for value in replacements {
                headers.append(name.clone(), value);
            }
            changed = true;
        }
    }

    (changed, errors)
}
