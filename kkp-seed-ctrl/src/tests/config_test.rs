use std::io::Write;

use assertables::*;
use clap::Parser;

use super::*;
use crate::Options;
use crate::config::FeatureGates;

fn parse_options(extra: &[&str]) -> Options {
    let mut args = vec![
        "kkp-seed-ctrl",
        "--seed-name",
        TEST_SEED,
        "--external-url",
        TEST_EXTERNAL_URL,
    ];
    args.extend_from_slice(extra);
    Options::parse_from(args)
}

#[rstest]
#[case::empty("", FeatureGates::default())]
#[case::vpa("VPA=true", FeatureGates { vpa: true, ..Default::default() })]
#[case::several(
    "VPA=false, EtcdDataCorruptionChecks=true,KubernetesOIDCAuthentication=true",
    FeatureGates { vpa: false, etcd_data_corruption_checks: true, kubernetes_oidc_authentication: true }
)]
fn test_parse_feature_gates(#[case] input: &str, #[case] expected: FeatureGates) {
    assert_eq!(input.parse::<FeatureGates>().unwrap(), expected);
}

#[rstest]
#[case::no_value("VPA")]
#[case::not_a_bool("VPA=yes")]
#[case::unknown_gate("Teleportation=true")]
fn test_parse_feature_gates_invalid(#[case] input: &str) {
    assert_err!(input.parse::<FeatureGates>());
}

#[rstest]
fn test_config_from_options() {
    let opts = parse_options(&["--feature-gates", "VPA=true", "--worker-name", TEST_WORKER]);
    let config = ControllerConfig::from_options(&opts).unwrap();

    assert_eq!(config.seed_name, TEST_SEED);
    assert_eq!(config.namespace, TEST_SEED_NAMESPACE);
    assert_eq!(config.worker_name, TEST_WORKER);
    assert!(config.feature_gates.vpa);
    assert!(!config.feature_gates.etcd_data_corruption_checks);
    assert_none!(config.docker_pull_config_json);
    assert_none!(config.oidc.ca);
}

#[rstest]
fn test_config_reads_files() {
    let dir = std::env::temp_dir().join(format!("kkp-seed-ctrl-config-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let ca_path = dir.join("ca.crt");
    std::fs::File::create(&ca_path)
        .unwrap()
        .write_all(b"-----BEGIN CERTIFICATE-----")
        .unwrap();

    let opts = parse_options(&["--oidc-ca-file", ca_path.to_str().unwrap()]);
    let config = ControllerConfig::from_options(&opts).unwrap();
    assert_eq!(config.oidc.ca.as_deref(), Some("-----BEGIN CERTIFICATE-----"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[rstest]
fn test_config_missing_file() {
    let opts = parse_options(&["--docker-pull-config-json-file", "/does/not/exist.json"]);
    let err = ControllerConfig::from_options(&opts).unwrap_err();
    assert_contains!(err.to_string(), "/does/not/exist.json");
    assert!(err.chain().any(|e| e.is::<std::io::Error>()));
}

#[rstest]
fn test_config_requires_seed_name() {
    let opts = Options::parse_from(["kkp-seed-ctrl", "--external-url", TEST_EXTERNAL_URL]);
    assert_err!(ControllerConfig::from_options(&opts));
}
