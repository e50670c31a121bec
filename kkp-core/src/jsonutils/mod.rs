use serde_json as json;

pub use json_patch::merge as apply_merge_patch;

// Server-populated metadata that never participates in desired-state comparisons
const SERVER_MANAGED_METADATA: [&str; 7] = [
    "creationTimestamp",
    "generation",
    "managedFields",
    "resourceVersion",
    "selfLink",
    "uid",
    "deletionGracePeriodSeconds",
];

// Compute an RFC 7386 merge patch that turns `before` into `after`.  Keys removed in `after` are
// nulled out; arrays are replaced wholesale, as merge patch has no way to address elements.
pub fn merge_patch_diff(before: &json::Value, after: &json::Value) -> json::Value {
    match (before, after) {
        (json::Value::Object(b), json::Value::Object(a)) => {
            let mut patch = json::Map::new();
            for (k, bv) in b {
                match a.get(k) {
                    None => {
                        patch.insert(k.clone(), json::Value::Null);
                    },
                    Some(av) if av != bv => {
                        patch.insert(k.clone(), merge_patch_diff(bv, av));
                    },
                    _ => (),
                }
            }
            for (k, av) in a {
                if !b.contains_key(k) {
                    patch.insert(k.clone(), av.clone());
                }
            }
            json::Value::Object(patch)
        },
        _ => after.clone(),
    }
}

pub fn is_empty_patch(patch: &json::Value) -> bool {
    match patch {
        json::Value::Object(o) => o.is_empty(),
        json::Value::Null => true,
        _ => false,
    }
}

// True if every field that is set in `desired` has the same value in `existing`.  Fields the
// desired object leaves unset (null) are ignored, which lets the apiserver default them without
// us seeing a difference on the next pass.
pub fn is_derivative(desired: &json::Value, existing: &json::Value) -> bool {
    match (desired, existing) {
        (json::Value::Null, _) => true,
        (json::Value::Object(d), json::Value::Object(e)) => d
            .iter()
            .all(|(k, dv)| dv.is_null() || e.get(k).is_some_and(|ev| is_derivative(dv, ev))),
        (json::Value::Object(d), json::Value::Null) => d.values().all(json::Value::is_null),
        (json::Value::Array(d), json::Value::Array(e)) => {
            d.len() == e.len() && d.iter().zip(e.iter()).all(|(dv, ev)| is_derivative(dv, ev))
        },
        (d, e) => d == e,
    }
}

// Drop status and the server-managed metadata from a serialized object
pub fn strip_server_fields(obj: &mut json::Value) {
    if let Some(o) = obj.as_object_mut() {
        o.remove("status");
        if let Some(meta) = o.get_mut("metadata").and_then(|m| m.as_object_mut()) {
            for field in SERVER_MANAGED_METADATA {
                meta.remove(field);
            }
        }
    }
}

#[cfg(test)]
mod tests;
