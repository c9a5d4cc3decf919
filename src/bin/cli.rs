//! CLI for bucket provisioning

use bucketctl::common::parse_duration;
use bucketctl::{provision_bucket, EngineTuning, McClient, ProvisionConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bucketctl")]
#[command(about = "Provision a bucket on a membase-compatible cache daemon")]
#[command(version)]
struct Cli {
    /// Daemon host
    host: String,

    /// Daemon port
    port: u16,

    /// Admin username
    user: String,

    /// Admin password
    passwd: String,

    /// Base install path of the daemon
    base: String,

    /// Data directory for the bucket's database files
    data: String,

    /// Bucket name
    bucket: String,

    /// Select-or-create attempts before giving up
    #[arg(long, default_value = "5")]
    max_attempts: usize,

    /// Delay before retrying a transient failure, doubling per retry
    #[arg(long, default_value = "500ms", value_parser = parse_delay)]
    retry_delay: Duration,

    /// Issue a creation request on any selection failure, as the original
    /// tooling did, instead of only on a "bucket not found" answer
    #[arg(long)]
    create_on_any_error: bool,

    /// TOML file overriding individual engine tuning values
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_delay(s: &str) -> Result<Duration, bucketctl::Error> {
    parse_duration(s)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let tuning = match &cli.tuning {
        Some(path) => EngineTuning::load(path)?,
        None => EngineTuning::default(),
    };

    let cfg = ProvisionConfig {
        host: cli.host,
        port: cli.port,
        username: cli.user,
        password: cli.passwd,
        base_dir: cli.base,
        data_dir: cli.data,
        bucket: cli.bucket,
        max_attempts: cli.max_attempts,
        retry_delay_ms: cli.retry_delay.as_millis() as u64,
        create_on_any_error: cli.create_on_any_error,
    };

    let mut client = McClient::connect(&cfg.host, cfg.port).await?;
    client.sasl_auth_plain(&cfg.username, &cfg.password).await?;

    let report = provision_bucket(&mut client, &cfg, &tuning).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Provisioning report:");
        println!("  Bucket: {}", report.bucket);
        println!("  Created: {}", report.created);
        println!("  Select attempts: {}", report.select_attempts);
        println!("  Create requests: {}", report.create_requests);
        println!("  Vbuckets activated: {}", report.vbuckets_activated);
    }

    Ok(())
}
