use std::sync::Arc;

use clockabilly::{
    Clockable,
    UtcClock,
};
use kkp_core::prelude::*;

use crate::address::{
    Resolver,
    SystemResolver,
};
use crate::config::ControllerConfig;
use crate::flavor::ClusterFlavor;
use crate::userclient::{
    KubeconfigConnectionProvider,
    UserClusterConnectionProvider,
};

// Shared by every reconcile of one flavor's controller.  All the collaborators are behind traits
// so that tests can swap in fakes.
pub struct SeedContext<C: ObjectClient> {
    pub client: C,
    pub config: Arc<ControllerConfig>,
    pub flavor: Arc<dyn ClusterFlavor>,
    pub resolver: Arc<dyn Resolver>,
    pub user_clusters: Arc<dyn UserClusterConnectionProvider>,
    pub clock: Arc<dyn Clockable + Send + Sync>,
}

impl<C: ObjectClient> SeedContext<C> {
    pub fn new(client: C, config: Arc<ControllerConfig>, flavor: Arc<dyn ClusterFlavor>) -> SeedContext<C> {
        SeedContext {
            client,
            config,
            flavor,
            resolver: Arc::new(SystemResolver),
            user_clusters: Arc::new(KubeconfigConnectionProvider),
            clock: Arc::new(UtcClock),
        }
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> SeedContext<C> {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_user_clusters(mut self, provider: impl UserClusterConnectionProvider + 'static) -> SeedContext<C> {
        self.user_clusters = Arc::new(provider);
        self
    }

    pub fn with_clock(mut self, clock: impl Clockable + Send + Sync + 'static) -> SeedContext<C> {
        self.clock = Arc::new(clock);
        self
    }
}
