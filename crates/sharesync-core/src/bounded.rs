// SPDX-FileCopyrightText: 2026 Sharesync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded waits on external calls.
//!
//! Every network or storage call the engine makes goes through [`bounded`].
//! An elapsed wait surfaces as [`SyncError::Timeout`]; the pending future is
//! dropped, so a late result can never write into engine state.

use std::future::Future;
use std::time::Duration;

use crate::error::SyncError;

/// Await `fut` for at most `duration`.
pub async fn bounded<T, F>(duration: Duration, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout { duration }),
    }
}

/// Distinct wait limits for remote and local calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub network: Duration,
    pub local: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            network: Duration::from_secs(30),
            local: Duration::from_secs(15),
        }
    }
}

impl Timeouts {
    pub async fn network<T, F>(&self, fut: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, SyncError>>,
    {
        bounded(self.network, fut).await
    }

    pub async fn local<T, F>(&self, fut: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, SyncError>>,
    {
        bounded(self.local, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapsed_wait_yields_typed_timeout() {
        let result: Result<(), SyncError> = bounded(Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        match result {
            Err(SyncError::Timeout { duration }) => assert_eq!(duration, Duration::from_secs(2)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let timeouts = Timeouts::default();
        let result: Result<(), SyncError> = timeouts
            .network(async { Err(SyncError::remote("refused")) })
            .await;
        assert!(matches!(result, Err(SyncError::Remote { .. })));
    }
}
