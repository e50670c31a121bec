mod address_test;

use kkp_core::prelude::*;
use kkp_testutils::*;
use rstest::*;

use super::*;
use crate::tests::{
    TEST_ADMIN_TOKEN,
    TEST_LB_IP,
    TEST_NODE_IP,
    apiserver_external_service,
    front_loadbalancer_service,
    resolved_cluster,
};
