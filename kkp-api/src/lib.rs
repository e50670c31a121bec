pub mod autoscaling;
pub mod v1;
