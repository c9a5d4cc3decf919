//! Common utilities and types shared across bucketctl

pub mod config;
pub mod error;
pub mod utils;

pub use config::{EngineTuning, ProvisionConfig, ENGINE_PATH_SUFFIX, INIT_FILE_SUFFIX, NUM_VBUCKETS};
pub use error::{Error, Result};
pub use utils::parse_duration;
