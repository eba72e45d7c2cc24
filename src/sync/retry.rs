//! Write retry policy.
//!
//! A patch is first committed as a whole. If that keeps failing with a
//! transient error, each op is committed on its own. That is only sound for
//! patches whose ops stand alone, such as a submission or a slot creation,
//! where re-running the operation rewrites the same values. Patches that
//! read and bump state (scores, verdicts, the cursor) are marked
//! indivisible and never split: a failed write lands nothing, so the caller
//! can recompute from a fresh snapshot.

use super::SyncChannel;
use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::patch::Patch;

/// Commit `patch`, retrying transient failures per [`RetryConfig`]
pub async fn commit_with_fallback<C>(
    channel: &C,
    document: &str,
    patch: &Patch,
    config: &RetryConfig,
) -> SyncResult<()>
where
    C: SyncChannel + ?Sized,
{
    if patch.is_empty() {
        return Ok(());
    }

    match write_with_retries(channel, document, patch, config).await {
        Ok(_) => return Ok(()),
        Err(e) if !e.is_retryable() => return Err(e),
        Err(e) if patch.len() == 1 || patch.is_indivisible() => {
            tracing::error!("Write to {} failed: {}", document, e);
            return Err(SyncError::Exhausted {
                attempts: config.attempts,
            });
        }
        Err(e) => {
            tracing::warn!(
                "Patch of {} ops to {} failed ({}), falling back to single writes",
                patch.len(),
                document,
                e
            );
        }
    }

    for single in patch.split() {
        match write_with_retries(channel, document, &single, config).await {
            Ok(_) => {}
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::error!("Single write to {} failed: {}", document, e);
                return Err(SyncError::Exhausted {
                    attempts: config.attempts,
                });
            }
        }
    }
    Ok(())
}

async fn write_with_retries<C>(
    channel: &C,
    document: &str,
    patch: &Patch,
    config: &RetryConfig,
) -> SyncResult<u64>
where
    C: SyncChannel + ?Sized,
{
    let attempts = config.attempts.max(1);
    let mut attempt = 1;
    loop {
        match channel.write(document, patch).await {
            Ok(version) => return Ok(version),
            Err(e) if e.is_retryable() && attempt < attempts => {
                tracing::debug!(
                    "Write attempt {}/{} via {} failed: {}",
                    attempt,
                    attempts,
                    channel.name(),
                    e
                );
                if !config.backoff.is_zero() {
                    tokio::time::sleep(config.backoff * attempt).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
