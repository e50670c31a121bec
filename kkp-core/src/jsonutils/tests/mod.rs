use rstest::*;
use serde_json::json;

use super::*;

#[rstest]
fn test_merge_patch_diff_no_change() {
    let obj = json!({"spec": {"replicas": 3}, "metadata": {"name": "foo"}});
    assert!(is_empty_patch(&merge_patch_diff(&obj, &obj)));
}

#[rstest]
fn test_merge_patch_diff_nested() {
    let before = json!({
        "metadata": {"name": "foo", "finalizers": ["a"]},
        "status": {"namespaceName": "", "address": {"ip": "", "port": 0}},
    });
    let after = json!({
        "metadata": {"name": "foo", "finalizers": ["a", "b"]},
        "status": {"namespaceName": "cluster-foo", "address": {"ip": "1.2.3.4", "port": 0}},
    });

    assert_eq!(
        merge_patch_diff(&before, &after),
        json!({
            "metadata": {"finalizers": ["a", "b"]},
            "status": {"namespaceName": "cluster-foo", "address": {"ip": "1.2.3.4"}},
        })
    );
}

#[rstest]
fn test_merge_patch_diff_removed_key() {
    let before = json!({"metadata": {"labels": {"worker-name": "alice", "foo": "bar"}}});
    let after = json!({"metadata": {"labels": {"foo": "bar"}}});
    assert_eq!(merge_patch_diff(&before, &after), json!({"metadata": {"labels": {"worker-name": null}}}));
}

#[rstest]
fn test_merge_patch_diff_applies_cleanly() {
    let before = json!({"a": {"b": 1, "c": [1, 2]}, "d": "x"});
    let after = json!({"a": {"b": 2, "c": [3]}, "e": true});

    let mut doc = before.clone();
    apply_merge_patch(&mut doc, &merge_patch_diff(&before, &after));
    assert_eq!(doc, after);
}

#[rstest]
#[case::identical(json!({"a": 1}), json!({"a": 1}), true)]
#[case::defaulted_field(json!({"a": 1}), json!({"a": 1, "b": 2}), true)]
#[case::null_desired(json!({"a": null}), json!({"a": 7}), true)]
#[case::changed_value(json!({"a": 1}), json!({"a": 2}), false)]
#[case::missing_field(json!({"a": 1, "b": 2}), json!({"a": 1}), false)]
#[case::array_length(json!({"a": [1, 2]}), json!({"a": [1]}), false)]
#[case::array_element_defaulted(
    json!({"ports": [{"port": 443}]}),
    json!({"ports": [{"port": 443, "protocol": "TCP"}]}),
    true
)]
#[case::empty_object_vs_null(json!({"a": {}}), json!({"a": null}), true)]
fn test_is_derivative(#[case] desired: json::Value, #[case] existing: json::Value, #[case] expected: bool) {
    assert_eq!(is_derivative(&desired, &existing), expected);
}

#[rstest]
fn test_strip_server_fields() {
    let mut obj = json!({
        "metadata": {"name": "foo", "resourceVersion": "42", "uid": "abc", "labels": {"app": "etcd"}},
        "spec": {"replicas": 3},
        "status": {"readyReplicas": 3},
    });
    strip_server_fields(&mut obj);
    assert_eq!(
        obj,
        json!({
            "metadata": {"name": "foo", "labels": {"app": "etcd"}},
            "spec": {"replicas": 3},
        })
    );
}
