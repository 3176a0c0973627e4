//! Reading category records out of an API payload.
//!
//! Endpoints answer either with a bare array of items or with an object
//! wrapping that array under `data` (sometimes `rows`). Anything else is
//! treated as carrying no items.

use crate::extraction::normalize::{normalize, FieldMapping, NormalizedRecord};
use serde_json::Value;

const WRAPPER_KEYS: &[&str] = &["data", "rows"];

/// The item array inside a payload, or an empty slice.
pub fn items_of(payload: &Value) -> &[Value] {
    match payload {
        Value::Array(items) => items,
        Value::Object(map) => WRAPPER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Normalize every object item of `payload`; non-object items are dropped.
pub fn records_from_payload(
    payload: &Value,
    mapping: &FieldMapping,
    symbol: &str,
) -> Vec<NormalizedRecord> {
    items_of(payload)
        .iter()
        .filter(|item| item.is_object())
        .map(|item| normalize(item, mapping, symbol))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CORPORATE_ACTIONS, EVENT_CALENDAR};
    use serde_json::json;

    #[test]
    fn test_payload_shapes() {
        assert_eq!(items_of(&json!([1, 2])).len(), 2);
        assert_eq!(items_of(&json!({"data": [1]})).len(), 1);
        assert_eq!(items_of(&json!({"rows": [1, 2, 3]})).len(), 3);
        assert!(items_of(&json!({"data": "none"})).is_empty());
        assert!(items_of(&json!({"msg": "no records"})).is_empty());
        assert!(items_of(&json!(null)).is_empty());
    }

    #[test]
    fn test_event_calendar_record_is_verbatim() {
        let payload = json!([{
            "symbol": "RELIANCE",
            "company": "Reliance Industries Limited",
            "purpose": "Financial Results",
            "details": "To consider and approve the financial results",
            "date": "19-Jul-2024"
        }]);
        let mapping = EVENT_CALENDAR.mapping.unwrap();
        let records = records_from_payload(&payload, &mapping, "RELIANCE");
        assert_eq!(records.len(), 1);
        let expected = json!({
            "symbol": "RELIANCE",
            "company": "Reliance Industries Limited",
            "purpose": "Financial Results",
            "details": "To consider and approve the financial results",
            "date": "19-Jul-2024"
        });
        assert_eq!(serde_json::to_value(&records[0]).unwrap(), expected);
    }

    #[test]
    fn test_non_object_items_are_dropped() {
        let payload = json!({"data": [{"symbol": "TCS", "faceVal": 1}, "noise", 7]});
        let mapping = CORPORATE_ACTIONS.mapping.unwrap();
        let records = records_from_payload(&payload, &mapping, "TCS");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("face_value"), Some("1"));
        assert_eq!(records[0].get("ex_date"), Some(""));
    }
}
