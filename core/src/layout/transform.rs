//! Layout transformer — the single place where layout payloads are validated.
//!
//! Storage and the backend may hand back a layout as a JSON string, as an
//! object whose breakpoint values are arrays, as objects keyed by index or
//! item id (older clients), or as nothing at all. Everything in here accepts
//! any of those and returns a `GridLayout`; invalid items are dropped, never
//! reported.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PersistenceError, ValidationError};
use crate::grid::Breakpoint;
use crate::types::identity::ModuleIdentity;
use crate::types::layout::{GridLayout, LayoutItem};


/// Keys that map onto `LayoutItem` fields. Everything else is transient.
const ITEM_FIELDS: [&str; 10] = [
    "id",
    "i",
    "x",
    "y",
    "w",
    "h",
    "minW",
    "minH",
    "moduleType",
    "staticIdentifier",
];


/// Coerce every breakpoint to a list of valid items.
///
/// Missing, `null`, and non-list breakpoint values become empty lists.
/// Objects keyed by index or id are read as lists in key order.
pub fn normalize(raw: &Value) -> GridLayout {
    build_layout(raw, false)
}


/// `normalize` for an already-typed layout: re-checks every item.
pub fn normalize_layout(layout: &GridLayout) -> GridLayout {
    normalize(&serde_json::to_value(layout).unwrap_or(Value::Null))
}


/// Normalize, then keep only the persisted subset of each item's fields.
pub fn sanitize_for_storage(layout: &GridLayout) -> GridLayout {
    let mut clean = normalize_layout(layout);
    for bp in Breakpoint::ALL {
        for item in clean.get_mut(bp) {
            item.extra.clear();
        }
    }
    clean
}


/// Sanitized layout as a JSON string for storage.
pub fn to_storage_json(layout: &GridLayout) -> Result<String, PersistenceError> {
    serde_json::to_string(&sanitize_for_storage(layout))
        .map_err(|e| PersistenceError::Serialize(e.to_string()))
}


/// Rebuild a layout from whatever storage returned.
///
/// Like `normalize`, but JSON strings are decoded first, both for the whole
/// payload and for individual breakpoint values. Undecodable strings give an
/// empty layout.
pub fn hydrate(raw: &Value) -> GridLayout {
    match raw {
        Value::String(text) => hydrate_str(text),
        other => build_layout(other, true),
    }
}


/// `hydrate` for raw text.
pub fn hydrate_str(text: &str) -> GridLayout {
    match serde_json::from_str::<Value>(text) {
        // A string that decodes to another string was encoded twice.
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(value) => build_layout(&value, true),
            Err(e) => {
                debug!(error = %e, "discarding undecodable layout");
                GridLayout::default()
            }
        },
        Ok(value) => build_layout(&value, true),
        Err(e) => {
            debug!(error = %e, "discarding undecodable layout");
            GridLayout::default()
        }
    }
}


/// Whether two layouts differ in item identity or geometry at any breakpoint.
///
/// Each breakpoint is compared as a multiset of `(id, x, y, w, h)`, so item
/// order is ignored and duplicate entries count.
pub fn is_changed(a: &GridLayout, b: &GridLayout) -> bool {
    Breakpoint::ALL
        .into_iter()
        .any(|bp| geometry(a.get(bp)) != geometry(b.get(bp)))
}


fn geometry(items: &[LayoutItem]) -> Vec<(&str, u32, u32, u32, u32)> {
    let mut keys: Vec<_> = items
        .iter()
        .map(|item| (item.id.as_str(), item.x, item.y, item.w, item.h))
        .collect();
    keys.sort_unstable();
    keys
}


/// Validate one item.
pub fn item_from_value(value: &Value) -> Result<LayoutItem, ValidationError> {
    let Value::Object(obj) = value else {
        return Err(ValidationError::NotAnObject);
    };
    let id = obj
        .get("id")
        .or_else(|| obj.get("i"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::EmptyId)?;

    let mut item = LayoutItem::new(
        id,
        number(obj, "x")?,
        number(obj, "y")?,
        number(obj, "w")?,
        number(obj, "h")?,
    );
    item.min_w = number(obj, "minW").ok();
    item.min_h = number(obj, "minH").ok();
    item.module_type = string(obj, "moduleType");
    item.static_identifier = string(obj, "staticIdentifier");

    if item.module_type.is_none() || item.static_identifier.is_none() {
        if let Ok(identity) = ModuleIdentity::parse(id) {
            item.module_type
                .get_or_insert_with(|| identity.module_type.as_str().to_string());
            item.static_identifier
                .get_or_insert_with(|| identity.static_identifier.clone());
        }
    }

    item.extra = obj
        .iter()
        .filter(|(key, _)| !ITEM_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Ok(item)
}


// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_layout(raw: &Value, decode_strings: bool) -> GridLayout {
    let mut layout = GridLayout::default();
    let Value::Object(map) = raw else {
        return layout;
    };
    for bp in Breakpoint::ALL {
        if let Some(value) = map.get(bp.as_str()) {
            *layout.get_mut(bp) = coerce_items(value, decode_strings);
        }
    }
    layout
}


fn coerce_items(value: &Value, decode_strings: bool) -> Vec<LayoutItem> {
    match value {
        Value::Array(items) => items.iter().filter_map(valid_item).collect(),
        Value::Object(map) => keyed_items(map),
        Value::String(text) if decode_strings => match serde_json::from_str::<Value>(text) {
            Ok(inner) => coerce_items(&inner, false),
            Err(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}


fn valid_item(value: &Value) -> Option<LayoutItem> {
    match item_from_value(value) {
        Ok(item) => Some(item),
        Err(e) => {
            debug!(error = %e, "dropping invalid layout item");
            None
        }
    }
}


/// Items of an object keyed by index (`"0"`, `"1"`, …) or by item id.
/// Numeric keys come first in numeric order, then the rest alphabetically.
fn keyed_items(map: &Map<String, Value>) -> Vec<LayoutItem> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    entries
        .into_iter()
        .filter_map(|(key, value)| {
            let keyed_by_id = key.parse::<u64>().is_err();
            match value {
                Value::Object(obj) if keyed_by_id && !obj.contains_key("id") && !obj.contains_key("i") => {
                    let mut obj = obj.clone();
                    obj.insert("id".to_string(), Value::String(key.clone()));
                    valid_item(&Value::Object(obj))
                }
                other => valid_item(other),
            }
        })
        .collect()
}


fn number(obj: &Map<String, Value>, field: &'static str) -> Result<u32, ValidationError> {
    obj.get(field)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n.round() as u32)
        .ok_or(ValidationError::NotANumber(field))
}


fn string(obj: &Map<String, Value>, field: &str) -> Option<String> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn valid(id: &str, x: u32) -> Value {
        json!({ "id": id, "x": x, "y": 0, "w": 4, "h": 4 })
    }

    #[test]
    fn normalize_always_yields_five_lists() {
        for raw in [json!({}), Value::Null, json!({ "lg": [valid("a", 0)] }), json!(42)] {
            let layout = normalize(&raw);
            let value = serde_json::to_value(&layout).unwrap();
            let obj = value.as_object().unwrap();
            assert_eq!(obj.len(), 5);
            for bp in Breakpoint::ALL {
                assert!(obj[bp.as_str()].is_array());
            }
        }
    }

    #[test]
    fn normalize_keeps_partial_breakpoints() {
        let layout = normalize(&json!({ "md": [valid("a", 0)], "xs": null, "sm": "nope" }));
        assert_eq!(layout.md.len(), 1);
        assert!(layout.lg.is_empty());
        assert!(layout.sm.is_empty());
        assert!(layout.xs.is_empty());
    }

    #[test]
    fn invalid_items_are_filtered() {
        let raw = json!({ "lg": [
            valid("good", 0),
            { "id": "", "x": 0, "y": 0, "w": 1, "h": 1 },
            { "id": "no-x", "y": 0, "w": 1, "h": 1 },
            { "id": "str-x", "x": "3", "y": 0, "w": 1, "h": 1 },
            { "id": "neg", "x": -1, "y": 0, "w": 1, "h": 1 },
            7,
            null
        ]});
        let layout = normalize(&raw);
        let ids: Vec<&str> = layout.lg.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[test]
    fn fractional_coordinates_are_rounded() {
        let item = item_from_value(&json!({ "id": "a", "x": 2.6, "y": 0.2, "w": 4.0, "h": 3 })).unwrap();
        assert_eq!((item.x, item.y, item.w, item.h), (3, 0, 4, 3));
    }

    #[test]
    fn legacy_i_key_is_accepted_as_id() {
        let item = item_from_value(&json!({ "i": "USER-NotesPane-a", "x": 0, "y": 0, "w": 4, "h": 4 })).unwrap();
        assert_eq!(item.id, "USER-NotesPane-a");
        assert!(!item.extra.contains_key("i"));
    }

    #[test]
    fn type_and_static_identifier_are_derived_from_id() {
        let item = item_from_value(&valid("SERVICE-NvidiaPane-9f3k2l", 0)).unwrap();
        assert_eq!(item.module_type.as_deref(), Some("SERVICE"));
        assert_eq!(item.static_identifier.as_deref(), Some("NvidiaPane"));
    }

    #[test]
    fn sanitize_strips_transient_fields() {
        let raw = json!({ "lg": [{ "id": "a", "x": 0, "y": 0, "w": 4, "h": 4, "moved": true, "static": false, "minW": 2 }]});
        let normalized = normalize(&raw);
        assert!(normalized.lg[0].extra.contains_key("moved"));

        let clean = sanitize_for_storage(&normalized);
        assert!(clean.lg[0].extra.is_empty());
        assert_eq!(clean.lg[0].min_w, Some(2));
        let text = serde_json::to_string(&clean).unwrap();
        assert!(!text.contains("moved"));
    }

    #[test]
    fn hydrate_accepts_json_string() {
        let text = serde_json::to_string(&json!({ "lg": [valid("a", 0)] })).unwrap();
        let layout = hydrate(&Value::String(text));
        assert_eq!(layout.lg.len(), 1);
    }

    #[test]
    fn hydrate_accepts_double_encoded_string() {
        let once = serde_json::to_string(&json!({ "sm": [valid("a", 0)] })).unwrap();
        let twice = serde_json::to_string(&once).unwrap();
        assert_eq!(hydrate_str(&twice).sm.len(), 1);
    }

    #[test]
    fn hydrate_decodes_string_breakpoints() {
        let inner = serde_json::to_string(&json!([valid("a", 0)])).unwrap();
        let layout = hydrate(&json!({ "xs": inner }));
        assert_eq!(layout.xs.len(), 1);
        // normalize does not decode
        assert!(normalize(&json!({ "xs": inner })).xs.is_empty());
    }

    #[test]
    fn hydrate_reads_index_keyed_objects_in_numeric_order() {
        let layout = hydrate(&json!({ "lg": { "10": valid("c", 8), "2": valid("b", 4), "0": valid("a", 0) } }));
        let ids: Vec<&str> = layout.lg.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn hydrate_reads_id_keyed_objects() {
        let layout = hydrate(&json!({ "md": { "USER-NotesPane-a": { "x": 0, "y": 0, "w": 4, "h": 4 } } }));
        assert_eq!(layout.md[0].id, "USER-NotesPane-a");
        assert_eq!(layout.md[0].static_identifier.as_deref(), Some("NotesPane"));
    }

    #[test]
    fn malformed_json_gives_empty_layout() {
        assert_eq!(hydrate_str("{not json"), GridLayout::default());
        assert_eq!(hydrate_str(""), GridLayout::default());
        assert_eq!(hydrate(&Value::String("[[[".into())), GridLayout::default());
    }

    #[test]
    fn is_changed_ignores_order_and_transient_fields() {
        let a = normalize(&json!({ "lg": [valid("a", 0), valid("b", 4)] }));
        let mut b = normalize(&json!({ "lg": [valid("b", 4), valid("a", 0)] }));
        b.lg[0].extra.insert("moved".into(), json!(true));
        b.lg[0].min_w = Some(1);
        assert!(!is_changed(&a, &b));
    }

    #[test]
    fn is_changed_detects_geometry_and_membership() {
        let a = normalize(&json!({ "lg": [valid("a", 0)] }));
        let moved = normalize(&json!({ "lg": [valid("a", 1)] }));
        let renamed = normalize(&json!({ "lg": [valid("z", 0)] }));
        let other_bp = normalize(&json!({ "lg": [valid("a", 0)], "xs": [valid("a", 0)] }));
        assert!(is_changed(&a, &moved));
        assert!(is_changed(&a, &renamed));
        assert!(is_changed(&a, &other_bp));
    }

    #[test]
    fn is_changed_counts_duplicates_in_both_directions() {
        let doubled = normalize(&json!({ "lg": [valid("a", 0), valid("a", 0)] }));
        let split = normalize(&json!({ "lg": [valid("a", 0), valid("b", 8)] }));
        assert!(is_changed(&doubled, &split));
        assert!(is_changed(&split, &doubled));
        assert!(!is_changed(&doubled, &doubled.clone()));
    }

    fn arb_item() -> impl Strategy<Value = LayoutItem> {
        (
            prop_oneof![
                Just("SYSTEM-SupervisorPane-a".to_string()),
                "[a-z]{1,8}",
                "(USER|SERVICE)-[A-Z][a-z]{2,6}Pane-[a-z0-9]{6}",
            ],
            0u32..48,
            0u32..100,
            1u32..24,
            1u32..12,
            proptest::option::of(1u32..6),
        )
            .prop_map(|(id, x, y, w, h, min_w)| {
                let mut item = LayoutItem::new(id, x, y, w, h);
                item.min_w = min_w;
                item
            })
    }

    fn arb_layout() -> impl Strategy<Value = GridLayout> {
        proptest::collection::vec(proptest::collection::vec(arb_item(), 0..6), 5).prop_map(|mut lists| {
            let mut layout = GridLayout::default();
            for bp in Breakpoint::ALL.into_iter().rev() {
                *layout.get_mut(bp) = lists.pop().unwrap_or_default();
            }
            layout
        })
    }

    proptest! {
        #[test]
        fn storage_round_trip_preserves_layout(layout in arb_layout()) {
            let stored = to_storage_json(&layout).unwrap();
            let back = normalize_layout(&hydrate_str(&stored));
            prop_assert_eq!(back, normalize_layout(&layout));
        }

        #[test]
        fn sanitize_is_idempotent(layout in arb_layout()) {
            let once = sanitize_for_storage(&layout);
            let twice = sanitize_for_storage(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
