//! # bucketctl
//!
//! A provisioning CLI for membase-compatible cache daemons:
//! - authenticates over the memcached binary protocol (SASL PLAIN)
//! - selects the named bucket, creating it on a "not found" answer
//! - activates all 1024 vbuckets of the bucket
//!
//! ## Flow
//!
//! ```text
//! bucketctl                      cache daemon
//!     │  SASL_AUTH (PLAIN)           │
//!     ├──────────────────────────────▶
//!     │  SELECT_BUCKET <name>        │
//!     ├──────────────────────────────▶
//!     │      ◀── KEY_ENOENT ─────────┤
//!     │  CREATE_BUCKET <engine\0cfg> │
//!     ├──────────────────────────────▶
//!     │  SELECT_BUCKET <name>        │
//!     ├──────────────────────────────▶
//!     │  SET_VBUCKET_STATE 0..1023   │
//!     ├──────────────────────────────▶  (sequential, ascending)
//! ```
//!
//! ## Usage
//!
//! ```bash
//! bucketctl 127.0.0.1 11211 Administrator secret /srv /data mybucket
//!
//! # Bounded retry budget and legacy create-on-any-failure parity
//! bucketctl 127.0.0.1 11211 Administrator secret /srv /data mybucket \
//!   --max-attempts 10 --retry-delay 250ms --create-on-any-error
//! ```

pub mod common;
pub mod ops;
pub mod protocol;

// Re-export commonly used types
pub use common::{EngineTuning, Error, ProvisionConfig, Result, NUM_VBUCKETS};
pub use ops::{provision_bucket, ProvisionReport};
pub use protocol::{AdminClient, McClient, VbucketState};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build info
pub const BUILD_INFO: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");
