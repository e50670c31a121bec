use super::*;

#[rstest]
#[case::no_overwrite(None, "europe-west3-c")]
#[case::empty_overwrite(Some(""), "europe-west3-c")]
#[case::overwrite(Some("alias"), "alias")]
fn test_dns_subdomain(#[case] overwrite: Option<&str>, #[case] expected: &str) {
    let seed = Seed::new(
        "europe-west3-c",
        SeedSpec {
            seed_dns_overwrite: overwrite.map(String::from),
            ..Default::default()
        },
    );
    assert_eq!(seed.dns_subdomain(), expected);
}

#[rstest]
fn test_datacenter_lookup() {
    let seed = Seed::new(
        "seed",
        SeedSpec {
            datacenters: [("my-dc".to_string(), Datacenter::default())].into(),
            ..Default::default()
        },
    );
    assert!(seed.datacenter("my-dc").is_some());
    assert!(seed.datacenter("other-dc").is_none());
}
