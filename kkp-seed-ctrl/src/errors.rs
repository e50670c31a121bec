use std::ops::Deref;

use kkp_core::errors::*;

// anyhow::Error doesn't implement std::error::Error, but the kube-rs reconcile functions require
// an error type that does.  So we wrap the anyhow error and deref back to it wherever we care.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct AnyhowError(#[from] anyhow::Error);

impl Deref for AnyhowError {
    type Target = anyhow::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Problems with the cluster or seed objects themselves.  The seed isn't watched, so these are still
// retried, just less often.
err_impl! {ClusterControllerError,
    #[error("couldn't find datacenter {0}")]
    DatacenterNotFound(String),

    #[error("seed {0} not found")]
    SeedNotFound(String),

    #[error("openshift cluster but .Spec.Openshift is unset")]
    OpenshiftSpecUnset(String),

    #[error("malformed cluster version {0:?}")]
    MalformedVersion(String),
}
