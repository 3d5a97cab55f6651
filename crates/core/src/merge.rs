//! The single shallow-merge rule shared by the profile store and the state
//! reducer: later value wins per key, one level deep, nested values replaced
//! wholesale.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Merge `patch` into `target` in place. Non-object operands are left alone.
pub fn shallow_merge(target: &mut Value, patch: &Value) {
    let (Value::Object(target_map), Value::Object(patch_map)) = (target, patch) else {
        return;
    };
    for (key, value) in patch_map {
        target_map.insert(key.clone(), value.clone());
    }
}

/// Apply a typed patch to a typed target through the shallow-merge rule.
///
/// Patch structs skip `None` fields during serialization, so absent fields
/// never touch the target. Fails only if the merged value no longer
/// deserializes into `T`.
pub fn apply_patch<T, P>(target: &T, patch: &P) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
    P: Serialize,
{
    let mut value = serde_json::to_value(target)?;
    let patch_value = serde_json::to_value(patch)?;
    shallow_merge(&mut value, &patch_value);
    serde_json::from_value(value)
}
