use serde_json::{Map, Value};

/// Structural merge used by partial updates.
///
/// Objects merge key by key, recursing into keys present on both sides. Any
/// other combination (arrays, scalars, null, mismatched types) takes `patch`
/// wholesale. Arrays are never merged element-wise, so the operation is not
/// associative once arrays are involved.
pub fn merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_obj), Value::Object(patch_obj)) => {
            let mut merged: Map<String, Value> = base_obj.clone();
            for (key, patch_value) in patch_obj {
                let value = match base_obj.get(key) {
                    Some(base_value) => merge(base_value, patch_value),
                    None => patch_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        _ => patch.clone(),
    }
}
