// ── Bulk actions ──
//
// Fire one request per id concurrently and tally the outcome. Never
// all-or-nothing: successes stay applied, failures are reported with a
// reason. Ids that vanished from the authoritative result set are soft
// failures and are not sent to the service at all.

use std::future::Future;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::EntityId;

/// Reason recorded for ids that no longer exist.
pub const VANISHED_REASON: &str = "no longer exists";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: EntityId,
    pub reason: String,
}

/// Tally of a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub succeeded: Vec<EntityId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkReport {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// "2 succeeded, 1 failed"
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.succeeded_count(),
            self.failed_count()
        )
    }
}

/// Run `op` for every id in `ids` concurrently.
///
/// `exists` validates each id against fresh data first; ids it rejects are
/// recorded as [`VANISHED_REASON`] failures. A `NotFound` from the service
/// is reported the same way.
pub async fn run_bulk<E, F, Fut>(ids: &[EntityId], exists: E, op: F) -> BulkReport
where
    E: Fn(&EntityId) -> bool,
    F: Fn(EntityId) -> Fut,
    Fut: Future<Output = Result<(), CoreError>>,
{
    let mut report = BulkReport::default();
    let mut live = Vec::with_capacity(ids.len());
    for id in ids {
        if exists(id) {
            live.push(id.clone());
        } else {
            debug!(%id, "skipping vanished id");
            report.failed.push(BulkFailure {
                id: id.clone(),
                reason: VANISHED_REASON.into(),
            });
        }
    }

    let results = join_all(live.iter().cloned().map(&op)).await;

    for (id, result) in live.into_iter().zip(results) {
        match result {
            Ok(()) => report.succeeded.push(id),
            Err(e) => {
                warn!(%id, error = %e, "bulk item failed");
                let reason = if e.is_not_found() {
                    VANISHED_REASON.to_owned()
                } else {
                    e.to_string()
                };
                report.failed.push(BulkFailure { id, reason });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId::Int).collect()
    }

    #[tokio::test]
    async fn partial_failure_is_tallied() {
        let report = run_bulk(
            &ids(&[1, 2, 3]),
            |_| true,
            |id| async move {
                if id == EntityId::Int(2) {
                    Err(CoreError::Api {
                        message: "locked".into(),
                        status: Some(409),
                    })
                } else {
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(report.succeeded, ids(&[1, 3]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, EntityId::Int(2));
        assert!(report.failed[0].reason.contains("locked"));
        assert_eq!(report.summary(), "2 succeeded, 1 failed");
    }

    #[tokio::test]
    async fn vanished_ids_are_soft_failures_and_not_sent() {
        let sent = std::sync::Mutex::new(Vec::new());
        let report = run_bulk(
            &ids(&[1, 7]),
            |id| *id != EntityId::Int(7),
            |id| {
                sent.lock().map(|mut s| s.push(id)).ok();
                async { Ok(()) }
            },
        )
        .await;

        assert_eq!(report.succeeded, ids(&[1]));
        assert_eq!(report.failed[0].reason, VANISHED_REASON);
        assert_eq!(*sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner), ids(&[1]));
    }

    #[tokio::test]
    async fn not_found_from_service_reads_as_vanished() {
        let report = run_bulk(&ids(&[4]), |_| true, |id| async move {
            Err(CoreError::NotFound {
                entity_type: "tag".into(),
                identifier: id.to_string(),
            })
        })
        .await;
        assert_eq!(report.failed[0].reason, VANISHED_REASON);
    }
}
