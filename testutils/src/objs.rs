use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use kkp_api::v1::*;
use rstest::fixture;

use crate::constants::*;

#[fixture]
pub fn test_cluster(#[default(TEST_CLUSTER)] name: &str) -> Cluster {
    Cluster {
        metadata: metav1::ObjectMeta {
            name: Some(name.into()),
            uid: Some(TEST_CLUSTER_UID.into()),
            ..Default::default()
        },
        spec: ClusterSpec {
            cloud: CloudSpec {
                datacenter_name: TEST_DC.into(),
                fake: Some(FakeCloudSpec { token: "very-secret".into() }),
                ..Default::default()
            },
            version: TEST_VERSION.into(),
            human_readable_name: "the test cluster".into(),
            ..Default::default()
        },
        status: None,
    }
}

#[fixture]
pub fn test_openshift_cluster(#[from(test_cluster)] mut cluster: Cluster) -> Cluster {
    cluster
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(OPENSHIFT_ANNOTATION_KEY.into(), "true".into());
    cluster.spec.openshift = Some(OpenshiftSpec { image_pull_secret: "{}".into() });
    cluster
}

#[fixture]
pub fn test_seed() -> Seed {
    let dc = Datacenter {
        country: "DE".into(),
        location: "Frankfurt".into(),
        spec: DatacenterSpec {
            fake: Some(DatacenterSpecFake {}),
            ..Default::default()
        },
    };
    Seed {
        metadata: metav1::ObjectMeta {
            name: Some(TEST_SEED.into()),
            namespace: Some(TEST_SEED_NAMESPACE.into()),
            ..Default::default()
        },
        spec: SeedSpec {
            country: "DE".into(),
            location: "Frankfurt".into(),
            datacenters: BTreeMap::from([(TEST_DC.into(), dc)]),
            seed_dns_overwrite: None,
        },
    }
}
