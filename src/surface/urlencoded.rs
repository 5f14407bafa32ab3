//! Query strings and `application/x-www-form-urlencoded` bodies.
//!
//! Pairs are decoded, each value is inspected with its key as the field
//! name, and the full set is re-encoded in original order.

use url::form_urlencoded;

use crate::surface::{RequestSurfaceLocation, SurfaceField, ValueInspector};

/// Rewrite a raw query string (without the leading `?`).
pub fn rewrite_query(query: &str, inspector: &mut impl ValueInspector) -> Option<String> {
    rewrite_pairs(query, RequestSurfaceLocation::QueryParameter, inspector)
}

/// Rewrite a form body.
pub fn rewrite_form(body: &str, inspector: &mut impl ValueInspector) -> Option<String> {
    rewrite_pairs(body, RequestSurfaceLocation::FormField, inspector)
}

fn rewrite_pairs(
    input: &str,
    location: RequestSurfaceLocation,
    inspector: &mut impl ValueInspector,
) -> Option<String> {
    let mut changed = false;
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        let field = SurfaceField::new(location, key.as_ref());
        let replacement = inspector.inspect(&field, &value);
        changed |= replacement != value;
        serializer.append_pair(&key, &replacement);
    }

    changed.then(|| serializer.finish())
}
