//! Shared XML helpers: quick-xml attribute extraction for the package parser
//! and text escaping for the part writers.

use quick_xml::events::BytesStart;

/// Extract a string attribute value by key.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
/// Entity references in the value are unescaped.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr.unescape_value().ok().map(|s| s.into_owned());
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.parse().ok())
}

/// Collect attributes as raw `(key, value)` text, skipping `skip` keys.
///
/// Values stay escaped so they can be written back unchanged.
pub fn raw_attributes(e: &BytesStart, skip: &[&[u8]]) -> Vec<(String, String)> {
    e.attributes()
        .flatten()
        .filter(|attr| !skip.iter().any(|key| *key == attr.key.as_ref()))
        .map(|attr| {
            (
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            )
        })
        .collect()
}

/// Write one attribute whose value is already escaped.
pub fn push_raw_attribute(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    // single-quoted source values may hold a bare double quote
    out.push_str(&value.replace('"', "&quot;"));
    out.push('"');
}

/// Write attributes collected by [`raw_attributes`].
pub fn push_raw_attributes(out: &mut String, attrs: &[(String, String)]) {
    for (key, value) in attrs {
        push_raw_attribute(out, key, value);
    }
}

/// Prefix (`"x:"`, or empty) an element name was written with.
pub fn element_prefix(e: &BytesStart) -> String {
    match e.name().prefix() {
        Some(prefix) => format!("{}:", String::from_utf8_lossy(prefix.as_ref())),
        None => String::new(),
    }
}

/// Escape text for use in XML content or a double-quoted attribute value.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether a `<t>` element holding `s` needs `xml:space="preserve"`.
///
/// Readers strip leading and trailing whitespace otherwise.
pub fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

/// Write a `<t>` element for `text`, adding `xml:space="preserve"` when needed.
///
/// `prefix` is the namespace prefix of the enclosing markup, `""` or `"x:"`.
pub fn push_text_element(out: &mut String, prefix: &str, text: &str) {
    if text.is_empty() {
        out.push_str(&format!("<{prefix}t/>"));
        return;
    }
    if needs_space_preserve(text) {
        out.push_str(&format!("<{prefix}t xml:space=\"preserve\">"));
    } else {
        out.push_str(&format!("<{prefix}t>"));
    }
    out.push_str(&xml_escape(text));
    out.push_str(&format!("</{prefix}t>"));
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn make_start(xml: &str) -> BytesStart<'_> {
        // Strip < and > / /> to get just the tag content
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string() {
        let e = make_start(r#"<sheet name="Q&amp;A" />"#);
        assert_eq!(attr_string(&e, b"name"), Some("Q&A".to_string()));
        assert_eq!(attr_string(&e, b"missing"), None);
    }

    #[test]
    fn test_attr_u32() {
        let e = make_start(r#"<sheet sheetId="42" bad="x" />"#);
        assert_eq!(attr_u32(&e, b"sheetId"), Some(42));
        assert_eq!(attr_u32(&e, b"bad"), None);
        assert_eq!(attr_u32(&e, b"missing"), None);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
        );
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn test_push_text_element() {
        let mut out = String::new();
        push_text_element(&mut out, "", "");
        push_text_element(&mut out, "", " padded ");
        push_text_element(&mut out, "", "a<b");
        assert_eq!(
            out,
            "<t/><t xml:space=\"preserve\"> padded </t><t>a&lt;b</t>"
        );
    }

    #[test]
    fn test_push_text_element_prefixed() {
        let mut out = String::new();
        push_text_element(&mut out, "x:", "");
        push_text_element(&mut out, "x:", "v ");
        assert_eq!(out, "<x:t/><x:t xml:space=\"preserve\">v </x:t>");
    }

    #[test]
    fn test_raw_attributes_round_trip() {
        let e = make_start(r#"<row r="2" ht="30" customHeight="1" x14ac:dyDescent="0.25" note="a&amp;b" />"#);
        let attrs = raw_attributes(&e, &[b"r"]);
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs[2], ("x14ac:dyDescent".to_string(), "0.25".to_string()));
        let mut out = String::new();
        push_raw_attributes(&mut out, &attrs);
        assert_eq!(
            out,
            r#" ht="30" customHeight="1" x14ac:dyDescent="0.25" note="a&amp;b""#
        );
    }

    #[test]
    fn test_element_prefix() {
        assert_eq!(element_prefix(&make_start("<x:sheets>")), "x:");
        assert_eq!(element_prefix(&make_start("<sheets>")), "");
    }
}
