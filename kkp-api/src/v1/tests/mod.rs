mod seeds_test;

use rstest::*;

use super::*;
