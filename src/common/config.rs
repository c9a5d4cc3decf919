//! Configuration for bucketctl

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relative path (under the base install dir) of the bucket engine module.
pub const ENGINE_PATH_SUFFIX: &str = "/install/lib/memcached/ep.so";

/// Relative path (under the base install dir) of the engine init script.
pub const INIT_FILE_SUFFIX: &str = "/install/etc/membase/init.sql";

/// Number of vbuckets every bucket is partitioned into.
pub const NUM_VBUCKETS: u16 = 1024;

/// One provisioning run: where the daemon is, how to authenticate, and which
/// bucket to bring up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// Daemon host
    pub host: String,

    /// Daemon port
    pub port: u16,

    /// Admin username (SASL PLAIN)
    pub username: String,

    /// Admin password (SASL PLAIN)
    pub password: String,

    /// Base install directory of the daemon (engine and init script live here)
    pub base_dir: String,

    /// Data directory the bucket's database files go under
    pub data_dir: String,

    /// Bucket name
    pub bucket: String,

    /// Select-or-create attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay before retrying a transient selection failure (doubles per retry)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Treat every selection failure as "bucket missing" and answer it with a
    /// creation request, as the original tooling did
    #[serde(default)]
    pub create_on_any_error: bool,
}

fn default_max_attempts() -> usize {
    5
}
fn default_retry_delay_ms() -> u64 {
    500
}

impl ProvisionConfig {
    /// Absolute path of the engine module handed to the daemon at creation.
    pub fn engine_path(&self) -> String {
        format!("{}{}", self.base_dir, ENGINE_PATH_SUFFIX)
    }

    /// Absolute path of the engine init script.
    pub fn init_file(&self) -> String {
        format!("{}{}", self.base_dir, INIT_FILE_SUFFIX)
    }

    /// Database file path for the bucket: `<data>/<bucket>-data/<bucket>`.
    pub fn db_file(&self) -> String {
        format!("{}/{}-data/{}", self.data_dir, self.bucket, self.bucket)
    }

    /// Build the semicolon-delimited creation config string. Field order is
    /// part of the daemon's parser contract and must not change.
    pub fn config_string(&self, tuning: &EngineTuning) -> String {
        format!(
            "initfile={};dbname={};{}",
            self.init_file(),
            self.db_file(),
            tuning.to_config_fragment()
        )
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Engine tuning parameters baked into every creation request.
///
/// The defaults reproduce the values the daemon's config parser has always
/// been handed; `load` lets a non-standard deployment override individual
/// fields from a TOML file without touching the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTuning {
    #[serde(default = "default_ht_size")]
    pub ht_size: u32,
    #[serde(default = "default_ht_locks")]
    pub ht_locks: u32,
    #[serde(default = "default_db_shards")]
    pub db_shards: u32,
    #[serde(default = "default_tap_noop_interval")]
    pub tap_noop_interval: u32,
    #[serde(default = "default_max_txn_size")]
    pub max_txn_size: u32,
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    #[serde(default = "default_tap_keepalive")]
    pub tap_keepalive: u32,
    #[serde(default)]
    pub vb0: bool,
    #[serde(default)]
    pub waitforwarmup: bool,
    #[serde(default)]
    pub failpartialwarmup: bool,
    #[serde(default = "default_shardpattern")]
    pub shardpattern: String,
    #[serde(default = "default_db_strategy")]
    pub db_strategy: String,
}

fn default_ht_size() -> u32 {
    3079
}
fn default_ht_locks() -> u32 {
    5
}
fn default_db_shards() -> u32 {
    4
}
fn default_tap_noop_interval() -> u32 {
    20
}
fn default_max_txn_size() -> u32 {
    1000
}
fn default_max_size() -> u64 {
    1_048_576_000
}
fn default_tap_keepalive() -> u32 {
    300
}
fn default_shardpattern() -> String {
    "%d/%b-%i.mb".to_string()
}
fn default_db_strategy() -> String {
    "multiMTVBDB".to_string()
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            ht_size: default_ht_size(),
            ht_locks: default_ht_locks(),
            db_shards: default_db_shards(),
            tap_noop_interval: default_tap_noop_interval(),
            max_txn_size: default_max_txn_size(),
            max_size: default_max_size(),
            tap_keepalive: default_tap_keepalive(),
            vb0: false,
            waitforwarmup: false,
            failpartialwarmup: false,
            shardpattern: default_shardpattern(),
            db_strategy: default_db_strategy(),
        }
    }
}

impl EngineTuning {
    /// Load tuning values from a TOML file; fields absent from the file keep
    /// their defaults.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| crate::Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;

        settings
            .try_deserialize()
            .map_err(|e| crate::Error::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// The tuning tail of the creation config string, trailing semicolon
    /// included.
    pub fn to_config_fragment(&self) -> String {
        format!(
            "ht_size={};ht_locks={};db_shards={};tap_noop_interval={};\
             max_txn_size={};max_size={};tap_keepalive={};vb0={};\
             waitforwarmup={};failpartialwarmup={};shardpattern={};db_strategy={};",
            self.ht_size,
            self.ht_locks,
            self.db_shards,
            self.tap_noop_interval,
            self.max_txn_size,
            self.max_size,
            self.tap_keepalive,
            self.vb0,
            self.waitforwarmup,
            self.failpartialwarmup,
            self.shardpattern,
            self.db_strategy
        )
    }
}
