//! Well-known entries in the free-form `flags` map of layers and images.
//!
//! containers-storage keeps an untyped JSON object next to each layer and
//! image record. Lookups here never fail: a missing key, a value of the wrong
//! type and an explicit `false` all read as "not set".

use serde_json::{Map, Value};

/// Flags map as stored in `layers.json` and `images.json`.
pub type Flags = Map<String, Value>;

/// Set on a layer whose creation or deletion was interrupted.
pub const INCOMPLETE_FLAG: &str = "incomplete";

/// Returns true if `flags` contains [`INCOMPLETE_FLAG`] set to boolean `true`.
pub fn contains_incomplete_flag(flags: Option<&Flags>) -> bool {
    let Some(flags) = flags else {
        return false;
    };
    match flags.get(INCOMPLETE_FLAG) {
        Some(Value::Bool(set)) => *set,
        Some(Value::Null)
        | Some(Value::Number(_))
        | Some(Value::String(_))
        | Some(Value::Array(_))
        | Some(Value::Object(_))
        | None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flags(value: Value) -> Flags {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_absent_map() {
        assert!(!contains_incomplete_flag(None));
        assert!(!contains_incomplete_flag(Some(&Flags::new())));
    }

    #[test]
    fn test_true_flag() {
        let f = flags(json!({"incomplete": true, "other": 1}));
        assert!(contains_incomplete_flag(Some(&f)));
    }

    #[test]
    fn test_not_set() {
        for value in [
            json!(false),
            json!("true"),
            json!(1),
            json!(null),
            json!([true]),
            json!({"incomplete": true}),
        ] {
            let f = flags(json!({ "incomplete": value }));
            assert!(!contains_incomplete_flag(Some(&f)), "{f:?}");
        }
    }

    #[test]
    fn test_from_layers_json() {
        let f: Flags = serde_json::from_str(r#"{"incomplete":true}"#).unwrap();
        assert!(contains_incomplete_flag(Some(&f)));
    }
}
