//! Administrative operations against a cache daemon

pub mod provision;

pub use provision::{provision_bucket, ProvisionReport};
