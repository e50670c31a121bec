pub mod cluster;
pub mod constants;
pub mod errors;
pub mod jsonutils;
pub mod k8s;
pub mod logging;
pub mod macros;
pub mod reconciling;

pub mod prelude {
    pub use k8s_openapi::api::core::v1 as corev1;
    pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
    pub use kkp_api::v1::{
        Cluster,
        Seed,
    };
    pub use kube::ResourceExt;

    pub use crate::constants::*;
    pub use crate::errors::EmptyResult;
    pub use crate::k8s::{
        KubeResourceExt,
        ObjectClient,
    };
    #[cfg(any(test, feature = "testutils"))]
    pub use crate::k8s::testutils::*;
}
