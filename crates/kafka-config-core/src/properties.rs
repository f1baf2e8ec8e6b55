//! Composite keys and properties blobs
//!
//! A configured key may be `base` or `base:field`. With a field, the content
//! fetched for `base` is read as a properties blob (`key=value` per line) and
//! only `field` is returned.

use std::collections::HashMap;

use crate::backends::{FetchError, FetchResult};
use crate::document::Document;

/// A key split on its first `:`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeKey<'a> {
    pub base: &'a str,
    pub field: Option<&'a str>,
}

impl<'a> CompositeKey<'a> {
    pub fn parse(key: &'a str) -> Self {
        match key.split_once(':') {
            Some((base, field)) => Self {
                base,
                field: Some(field),
            },
            None => Self {
                base: key,
                field: None,
            },
        }
    }
}

/// Parse a properties blob
///
/// Each line is trimmed; blank lines and lines starting with `#` are skipped.
/// The rest split on the first `=`, so values may themselves contain `=`.
/// A later duplicate key overrides an earlier one.
pub fn parse_properties(text: &str) -> FetchResult<HashMap<String, String>> {
    let mut properties = HashMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| FetchError::MalformedProperties {
                line: index + 1,
                content: line.to_string(),
            })?;
        properties.insert(key.to_string(), value.to_string());
    }
    Ok(properties)
}

/// Fetch `key`, extracting a single properties field if `key` is composite
///
/// `fetch` receives the base key. Without a field its result is returned
/// untouched; with a field it must be text (or UTF-8 bytes) and the field must
/// exist.
pub fn get_value<F>(key: &str, fetch: F) -> FetchResult<Document>
where
    F: FnOnce(&str) -> FetchResult<Document>,
{
    let composite = CompositeKey::parse(key);
    let content = fetch(composite.base)?;
    let Some(field) = composite.field else {
        return Ok(content);
    };

    let text = match content {
        Document::Text(text) => text,
        Document::Bytes(bytes) => String::from_utf8(bytes)?,
        other => {
            return Err(FetchError::unsupported_shape(
                "properties",
                format!("expected text content for '{}', got {}", composite.base, other.kind_name()),
            ))
        }
    };

    parse_properties(&text)?
        .remove(field)
        .map(Document::Text)
        .ok_or_else(|| FetchError::FieldNotFound {
            base: composite.base.to_string(),
            field: field.to_string(),
        })
}
