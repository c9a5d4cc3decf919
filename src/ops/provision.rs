//! Bucket provisioning: select-or-create, then vbucket activation

use crate::common::{EngineTuning, Error, ProvisionConfig, Result, NUM_VBUCKETS};
use crate::protocol::{AdminClient, VbucketState};
use serde::Serialize;

/// Outcome of one provisioning run.
#[derive(Debug, Serialize)]
pub struct ProvisionReport {
    pub bucket: String,
    pub created: bool,
    pub select_attempts: usize,
    pub create_requests: usize,
    pub vbuckets_activated: usize,
}

/// Provision a bucket on an authenticated connection.
///
/// Selection and creation are mutually exclusive outcomes of each attempt: a
/// selectable bucket is never re-created. Activation runs unconditionally
/// afterwards, so re-running against an already-provisioned bucket converges
/// on the same end state.
pub async fn provision_bucket<C: AdminClient>(
    client: &mut C,
    cfg: &ProvisionConfig,
    tuning: &EngineTuning,
) -> Result<ProvisionReport> {
    let mut report = ProvisionReport {
        bucket: cfg.bucket.clone(),
        created: false,
        select_attempts: 0,
        create_requests: 0,
        vbuckets_activated: 0,
    };

    select_or_create(client, cfg, tuning, &mut report).await?;
    activate_all(client, &mut report).await?;

    Ok(report)
}

/// Bounded select-or-create loop.
///
/// A missing bucket gets exactly one creation request per observation, then an
/// immediate re-select. Transient transport failures back off with a doubling
/// delay. Any other failure is fatal unless `create_on_any_error` widens the
/// creation path to every selection failure.
async fn select_or_create<C: AdminClient>(
    client: &mut C,
    cfg: &ProvisionConfig,
    tuning: &EngineTuning,
    report: &mut ProvisionReport,
) -> Result<()> {
    let mut delay = cfg.retry_delay();
    let mut last_error = String::new();

    for attempt in 1..=cfg.max_attempts.max(1) {
        report.select_attempts = attempt;

        match client.select_bucket(&cfg.bucket).await {
            Ok(()) => {
                tracing::info!(bucket = %cfg.bucket, attempt, "bucket selected");
                return Ok(());
            }
            Err(e) if e.is_bucket_missing() || cfg.create_on_any_error => {
                tracing::info!(
                    bucket = %cfg.bucket,
                    error = %e,
                    "bucket not selectable, issuing creation request"
                );
                let config = cfg.config_string(tuning);
                client
                    .create_bucket(&cfg.bucket, &cfg.engine_path(), &config)
                    .await?;
                report.create_requests += 1;
                report.created = true;
                last_error = e.to_string();
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    bucket = %cfg.bucket,
                    attempt,
                    error = %e,
                    ?delay,
                    "selection failed, retrying"
                );
                last_error = e.to_string();
                if attempt < cfg.max_attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::ProvisioningFailed {
        attempts: cfg.max_attempts.max(1),
        last: last_error,
    })
}

/// Activate every vbucket, indices ascending, one request at a time. The
/// first failure aborts and reports the failing index.
async fn activate_all<C: AdminClient>(
    client: &mut C,
    report: &mut ProvisionReport,
) -> Result<()> {
    for vbucket in 0..NUM_VBUCKETS {
        client
            .set_vbucket_state(vbucket, VbucketState::Active)
            .await
            .map_err(|e| Error::ActivationFailed {
                vbucket,
                source: Box::new(e),
            })?;
        report.vbuckets_activated += 1;
    }

    tracing::info!(
        bucket = %report.bucket,
        count = report.vbuckets_activated,
        "all vbuckets active"
    );
    Ok(())
}
