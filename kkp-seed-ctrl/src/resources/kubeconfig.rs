use k8s_openapi::ByteString;
use serde_json::json;

// A kubeconfig with a single cluster, user and context, authenticating with a bearer token.
// Without a CA bundle the client is told to skip verification of the serving certificate.
pub fn build_kubeconfig(
    cluster_name: &str,
    server: &str,
    username: &str,
    token: &str,
    ca_bundle: Option<&[u8]>,
) -> anyhow::Result<String> {
    let mut cluster = json!({ "server": server });
    match ca_bundle {
        Some(ca) => cluster["certificate-authority-data"] = serde_json::to_value(ByteString(ca.to_vec()))?,
        None => cluster["insecure-skip-tls-verify"] = json!(true),
    }

    let config = json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{ "name": cluster_name, "cluster": cluster }],
        "contexts": [{ "name": "default", "context": { "cluster": cluster_name, "user": username } }],
        "current-context": "default",
        "preferences": {},
        "users": [{ "name": username, "user": { "token": token } }],
    });
    Ok(serde_yaml::to_string(&config)?)
}
