//! XML and plain-text bodies.
//!
//! No tree is built: the whole payload is one value. XML first loses its
//! DOCTYPE, ENTITY declarations and non-predefined entity references, which
//! closes off external entity expansion before the upstream parser sees it.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::surface::{RequestSurfaceLocation, SurfaceField, ValueInspector};

/// Field name reported for whole-body values.
pub const BODY_FIELD: &str = "body";

const PREDEFINED_ENTITIES: &[&str] = &["lt", "gt", "amp", "quot", "apos"];

static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!DOCTYPE[^\[>]*(\[.*?\]\s*)?>").expect("valid regex")
});

static ENTITY_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<!ENTITY[^>]*>").expect("valid regex"));

static ENTITY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([A-Za-z_][A-Za-z0-9_.\-]*);").expect("valid regex"));

/// Remove DOCTYPE, ENTITY declarations and custom entity references.
///
/// The five predefined entities and numeric character references are kept.
pub fn strip_xml_declarations(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = DOCTYPE.replace_all(&current, "");
        let next = ENTITY_DECL.replace_all(&next, "");
        let next = ENTITY_REF
            .replace_all(&next, |caps: &Captures| {
                if PREDEFINED_ENTITIES.contains(&&caps[1]) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Rewrite an XML body.
pub fn rewrite_xml(body: &str, inspector: &mut impl ValueInspector) -> Option<String> {
    let stripped = strip_xml_declarations(body);
    let field = SurfaceField::new(RequestSurfaceLocation::XmlBody, BODY_FIELD);
    let replacement = inspector.inspect(&field, &stripped);
    (replacement != body).then_some(replacement)
}

/// Rewrite a plain-text body.
pub fn rewrite_text(body: &str, inspector: &mut impl ValueInspector) -> Option<String> {
    let field = SurfaceField::new(RequestSurfaceLocation::TextBody, BODY_FIELD);
    let replacement = inspector.inspect(&field, body);
    (replacement != body).then_some(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl ValueInspector for Identity {
        fn inspect(&mut self, _field: &SurfaceField, value: &str) -> String {
            value.to_string()
        }
    }

    #[test]
    fn test_xxe_payload_stripped() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE foo [
  <!ELEMENT foo ANY >
  <!ENTITY xxe SYSTEM "file:///etc/passwd" >
]>
<foo>&xxe;</foo>"#;
        let out = strip_xml_declarations(xml);
        assert!(!out.contains("DOCTYPE"));
        assert!(!out.contains("ENTITY"));
        assert!(!out.contains("&xxe;"));
        assert!(out.contains("<foo></foo>"));
    }

    #[test]
    fn test_predefined_and_numeric_entities_kept() {
        let xml = "<a>&lt;b&gt; &amp; &quot;&apos; &#60; &#x3C; &custom;</a>";
        assert_eq!(
            strip_xml_declarations(xml),
            "<a>&lt;b&gt; &amp; &quot;&apos; &#60; &#x3C; </a>"
        );
    }

    #[test]
    fn test_simple_doctype_stripped() {
        assert_eq!(strip_xml_declarations("<!DOCTYPE note SYSTEM \"n.dtd\"><note/>"), "<note/>");
    }

    #[test]
    fn test_rewrite_xml_reports_stripping_as_change() {
        let body = "<!DOCTYPE x><x>ok</x>";
        assert_eq!(rewrite_xml(body, &mut Identity).as_deref(), Some("<x>ok</x>"));
        assert_eq!(rewrite_xml("<x>ok</x>", &mut Identity), None);
    }

    #[test]
    fn test_rewrite_text() {
        assert_eq!(rewrite_text("plain", &mut Identity), None);
    }
}
