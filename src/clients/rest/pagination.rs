//! Cursor pagination.
//!
//! Loyverse list endpoints answer with an envelope holding the collection
//! under a resource-specific key plus a `cursor` for the next page:
//!
//! ```text
//! {"items": [...], "cursor": "c1"}
//! {"categories": [...], "cursor": null}
//! ```
//!
//! Some endpoints return a bare array, and a few a single object. Each page
//! body is decoded once into a [`Page`], whatever its shape.

use serde_json::{Map, Value};

/// Collection key used when the caller does not name one.
pub const DEFAULT_COLLECTION_KEY: &str = "items";

/// Name of the cursor field in list envelopes and query strings.
pub const CURSOR_PARAM: &str = "cursor";

/// Name of the page size query parameter.
pub const LIMIT_PARAM: &str = "limit";

/// The shapes a page body can take.
#[derive(Debug, PartialEq)]
enum PageShape {
    /// `{<key>: [...], "cursor": ...}`
    Envelope {
        items: Vec<Value>,
        cursor: Option<String>,
    },
    /// `[...]`; never has a next page.
    Bare(Vec<Value>),
    /// Anything else, treated as one item; an object may still carry a
    /// `cursor`.
    Single(Value),
}

impl PageShape {
    fn classify(body: Value, key: &str) -> Self {
        match body {
            Value::Array(items) => Self::Bare(items),
            Value::Object(map) if map.get(key).is_some_and(Value::is_array) => {
                Self::from_envelope(map, key)
            }
            other => Self::Single(other),
        }
    }

    fn from_envelope(mut map: Map<String, Value>, key: &str) -> Self {
        let items = match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let cursor = map.remove(CURSOR_PARAM).and_then(cursor_string);
        Self::Envelope { items, cursor }
    }
}

/// Normalizes a cursor value; null and `""` both mean "no more pages".
fn cursor_string(value: Value) -> Option<String> {
    match value {
        Value::String(cursor) if !cursor.is_empty() => Some(cursor),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// One decoded page of a list endpoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// The page's items, in response order.
    pub items: Vec<Value>,
    /// Cursor of the next page, `None` on the last page.
    pub next_cursor: Option<String>,
}

impl Page {
    /// Decodes a response body, reading the collection under `key`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loyverse_api::clients::rest::Page;
    /// use serde_json::json;
    ///
    /// let page = Page::from_body(json!({"stores": [{"id": "s1"}], "cursor": "next"}), "stores");
    /// assert_eq!(page.items.len(), 1);
    /// assert_eq!(page.next_cursor.as_deref(), Some("next"));
    ///
    /// let page = Page::from_body(json!([1, 2, 3]), "items");
    /// assert_eq!(page.items.len(), 3);
    /// assert!(page.next_cursor.is_none());
    /// ```
    #[must_use]
    pub fn from_body(body: Value, key: &str) -> Self {
        PageShape::classify(body, key).into()
    }

    /// Returns `true` if another page follows.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }
}

impl From<PageShape> for Page {
    fn from(shape: PageShape) -> Self {
        match shape {
            PageShape::Envelope { items, cursor } => Self {
                items,
                next_cursor: cursor,
            },
            PageShape::Bare(items) => Self {
                items,
                next_cursor: None,
            },
            PageShape::Single(item) => {
                let next_cursor = item.get(CURSOR_PARAM).cloned().and_then(cursor_string);
                Self {
                    items: vec![item],
                    next_cursor,
                }
            }
        }
    }
}
