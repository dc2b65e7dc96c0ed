//! Lazy JSON query views.
//!
//! Update payloads vary per event kind and per platform version, so the
//! framework never deserializes them into fixed structs. Handlers query the
//! raw document through [`JsonView`]: an immutable, copyable view that
//! resolves dotted/bracketed paths on demand. Absence and type mismatch are
//! both benign - every accessor is total and falls back to a zero value,
//! pushing existence checks onto the caller.

use serde_json::Value;

/// An immutable view into a parsed JSON document.
///
/// A view either points at a node of the document or is *absent*. [`get`] on
/// a missing path returns an absent view rather than an error; every coercion
/// on an absent or mismatched view returns a zero value.
///
/// [`get`]: JsonView::get
#[derive(Debug, Clone, Copy)]
pub struct JsonView<'a> {
    node: Option<&'a Value>,
}

impl<'a> JsonView<'a> {
    /// View over a document node.
    pub fn new(node: &'a Value) -> Self {
        Self { node: Some(node) }
    }

    /// The absent view: `exists()` is false, all coercions are zero values.
    pub fn absent() -> Self {
        Self { node: None }
    }

    /// Resolve a dotted/bracketed path to a sub-view.
    ///
    /// `"a.b.c"`, `"entities.0.type"` and `"entities[0].type"` are all
    /// accepted; numeric segments index arrays. A path that leads nowhere
    /// yields the absent view.
    pub fn get(&self, path: &str) -> JsonView<'a> {
        let mut current = self.node;
        for segment in segments(path) {
            current = current.and_then(|node| step(node, segment));
            if current.is_none() {
                break;
            }
        }
        JsonView { node: current }
    }

    /// Whether the viewed node is present in the document.
    pub fn exists(&self) -> bool {
        self.node.is_some()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.node, Some(Value::Array(_)))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.node, Some(Value::Object(_)))
    }

    /// String value, or `""` when absent or not a string.
    pub fn as_str(&self) -> &'a str {
        self.node.and_then(Value::as_str).unwrap_or("")
    }

    /// Signed integer value, or `0` when absent or not an integer.
    pub fn as_i64(&self) -> i64 {
        self.node.and_then(Value::as_i64).unwrap_or(0)
    }

    /// Unsigned integer value, or `0` when absent or not an unsigned integer.
    pub fn as_u64(&self) -> u64 {
        self.node.and_then(Value::as_u64).unwrap_or(0)
    }

    /// Float value, or `0.0` when absent or not a number.
    pub fn as_f64(&self) -> f64 {
        self.node.and_then(Value::as_f64).unwrap_or(0.0)
    }

    /// Boolean value, or `false` when absent or not a boolean.
    pub fn as_bool(&self) -> bool {
        self.node.and_then(Value::as_bool).unwrap_or(false)
    }

    /// Element views of an array.
    ///
    /// Empty when absent. When the node exists but is not an array, the
    /// result contains the view itself as its single element - callers must
    /// not assume array-ness implies multiplicity.
    pub fn array(&self) -> Vec<JsonView<'a>> {
        match self.node {
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(JsonView::new).collect(),
            Some(_) => vec![*self],
        }
    }

    /// Key/view pairs of an object, in document order.
    ///
    /// Empty when absent or not an object.
    pub fn object(&self) -> Vec<(&'a str, JsonView<'a>)> {
        match self.node {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| (key.as_str(), JsonView::new(value)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The underlying document node, if present.
    pub fn value(&self) -> Option<&'a Value> {
        self.node
    }
}

/// Descend one path segment into a node.
fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Split a dotted/bracketed path into lookup segments.
///
/// `"a.b.c"` -> `["a", "b", "c"]`; `"a[0].b"` -> `["a", "0", "b"]`.
fn segments(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for part in path.split('.') {
        let mut rest = part;
        while let Some(open) = rest.find('[') {
            if open > 0 {
                out.push(&rest[..open]);
            }
            match rest[open + 1..].find(']') {
                Some(len) => {
                    out.push(&rest[open + 1..open + 1 + len]);
                    rest = &rest[open + 1 + len + 1..];
                }
                None => {
                    // Unterminated bracket: treat the remainder as a literal key.
                    out.push(&rest[open + 1..]);
                    rest = "";
                }
            }
        }
        if !rest.is_empty() {
            out.push(rest);
        }
    }
    out
}
