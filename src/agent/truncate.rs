//! Bounds the size of action results embedded into the transcript
//!
//! Large search results would otherwise dominate the context window. Only
//! array-valued top-level fields are cut; scalars and maps pass through
//! untouched, and a shrunk payload always carries a `truncated` marker so
//! the model (and ultimately the user) knows the result was abbreviated.

use serde_json::Value;

/// Shrink `value` in place if its serialized form exceeds `byte_budget`.
///
/// Every top-level array field is cut to its first `keep` entries and a
/// `count` field, if present, is recomputed to the shrunk length. Returns
/// whether anything was cut.
pub fn truncate_payload(value: &mut Value, keep: usize, byte_budget: usize) -> bool {
    let serialized_len = value.to_string().len();
    if serialized_len <= byte_budget {
        return false;
    }

    let Some(object) = value.as_object_mut() else {
        return false;
    };

    let mut shrunk_len: Option<usize> = None;
    for field in object.values_mut() {
        if let Some(items) = field.as_array_mut() {
            if items.len() > keep {
                items.truncate(keep);
                shrunk_len = Some(items.len());
            }
        }
    }

    let Some(new_len) = shrunk_len else {
        return false;
    };

    if object.contains_key("count") {
        object.insert("count".to_string(), Value::from(new_len));
    }
    object.insert("truncated".to_string(), Value::Bool(true));
    true
}
