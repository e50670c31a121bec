mod resources_test;

use kkp_core::prelude::*;
use kkp_testutils::*;
use rstest::*;

use super::*;
use crate::config::ControllerConfig;
use crate::tests::{
    resolved_cluster,
    test_config,
};
