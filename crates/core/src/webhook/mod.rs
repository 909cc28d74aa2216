//! Provider webhook ingestion.
//!
//! Each delivery is stored once per provider event id, handed to its
//! category handler on first receipt, and then marked processed whether or
//! not the handler succeeded. Failed events are not retried.

pub mod dispatch;
pub mod intake;
pub mod payload;

use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::clock::Clock;
use crate::store::{JobPublicationStore, StoreError, WebhookEventStore};
use crate::types::{WebhookCategory, WebhookEvent};

pub use dispatch::{DispatchOutcome, WebhookDispatcher};
pub use intake::WebhookIntake;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("webhook body must be a JSON object")]
    NotAnObject,
    #[error("webhook event {0} not found")]
    UnknownEvent(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("payload is missing {0}")]
    MissingField(&'static str),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of one delivery as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub event: WebhookEvent,
    /// False for a redelivery of an already stored event.
    pub created: bool,
}

#[derive(Clone)]
pub struct WebhookService {
    intake: WebhookIntake,
    dispatcher: WebhookDispatcher,
}

impl WebhookService {
    pub fn new(
        events: Arc<dyn WebhookEventStore>,
        jobs: Arc<dyn JobPublicationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            intake: WebhookIntake::new(events, clock),
            dispatcher: WebhookDispatcher::new(jobs),
        }
    }

    /// Store, dispatch and mark one delivery.
    ///
    /// Only storage failures are returned. A handler failure is recorded on
    /// the event and the delivery still counts as received.
    pub async fn ingest(
        &self,
        category: WebhookCategory,
        payload: Value,
    ) -> Result<Ingested, IntakeError> {
        let receipt = self.intake.receive(category, payload).await?;
        if !receipt.created {
            return Ok(Ingested {
                event: receipt.event,
                created: false,
            });
        }

        let mut event = receipt.event;
        let outcome = self.dispatcher.dispatch(&event).await;
        let marked = self
            .intake
            .mark_processed(&event.id, outcome.error.as_deref())
            .await;
        match marked {
            Ok(()) => {
                event.processed = true;
                if outcome.error.is_some() {
                    event.processing_error = outcome.error;
                }
            }
            Err(err) => {
                warn!(webhook_id = %event.id, error = %err, "failed to mark webhook processed");
            }
        }

        Ok(Ingested {
            event,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::MemoryStore;
    use crate::store::StoreResult;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
        ))
    }

    /// Counts calls and fails every one of them.
    #[derive(Default)]
    struct BrokenJobs {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobPublicationStore for BrokenJobs {
        async fn unpublish_for_account(&self, _account_id: &str) -> StoreResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database("jobs table locked".to_string()))
        }
    }

    #[tokio::test]
    async fn test_disconnect_unpublishes_once_across_redeliveries() {
        let store = Arc::new(MemoryStore::new());
        store.insert_job("job_1", "Backend engineer", Some("acct_42"), true).await;
        store.insert_job("job_2", "Data engineer", Some("acct_42"), true).await;
        let service = WebhookService::new(store.clone(), store.clone(), clock());
        let body = json!({"id": "evt_disc_1", "event_type": "account.disconnected", "account_id": "acct_42"});

        let first = service
            .ingest(WebhookCategory::AccountStatus, body.clone())
            .await
            .unwrap();
        assert!(first.created);
        assert!(first.event.processed);
        assert!(first.event.processing_error.is_none());
        assert!(store.jobs().await.iter().all(|job| !job.posted_to_linkedin));

        // Republish one job; a redelivery must not touch it again.
        store.insert_job("job_1", "Backend engineer", Some("acct_42"), true).await;
        let second = service
            .ingest(WebhookCategory::AccountStatus, body)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.event.id, first.event.id);
        assert_eq!(store.webhook_event_count().await, 1);

        let job_1 = store
            .jobs()
            .await
            .into_iter()
            .find(|job| job.id == "job_1")
            .unwrap();
        assert!(job_1.posted_to_linkedin);
    }

    #[tokio::test]
    async fn test_handler_failure_is_recorded_and_not_retried() {
        let store = Arc::new(MemoryStore::new());
        let jobs = Arc::new(BrokenJobs::default());
        let service = WebhookService::new(store.clone(), jobs.clone(), clock());
        let body = json!({"id": "evt_disc_2", "event_type": "account.disconnected", "account_id": "acct_7"});

        let first = service
            .ingest(WebhookCategory::AccountStatus, body.clone())
            .await
            .unwrap();
        assert!(first.created);

        let stored = WebhookEventStore::get(store.as_ref(), &first.event.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.processed);
        assert!(stored.processed_at.is_some());
        assert_eq!(
            stored.processing_error.as_deref(),
            Some("store error: database error: jobs table locked")
        );

        let again = service
            .ingest(WebhookCategory::AccountStatus, body)
            .await
            .unwrap();
        assert!(!again.created);
        assert_eq!(jobs.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_deliveries_store_once() {
        let store = Arc::new(MemoryStore::new());
        let service = WebhookService::new(store.clone(), store.clone(), clock());
        let body = json!({"id": "evt_dup", "event_type": "message.received"});

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let body = body.clone();
            handles.push(tokio::spawn(async move {
                service.ingest(WebhookCategory::Messaging, body).await.unwrap()
            }));
        }

        let mut created = 0;
        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            let ingested = handle.await.unwrap();
            if ingested.created {
                created += 1;
            }
            ids.insert(ingested.event.id);
        }
        assert_eq!(created, 1);
        assert_eq!(ids.len(), 1);
        assert_eq!(store.webhook_event_count().await, 1);
    }

    #[tokio::test]
    async fn test_non_object_body_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = WebhookService::new(store.clone(), store.clone(), clock());
        let err = service
            .ingest(WebhookCategory::Mailing, json!("evt"))
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::NotAnObject));
    }

    #[tokio::test]
    async fn test_idless_disconnects_in_same_instant_both_run() {
        let store = Arc::new(MemoryStore::new());
        store.insert_job("job_1", "Backend engineer", Some("acct_1"), true).await;
        store.insert_job("job_9", "Data engineer", Some("acct_9"), true).await;
        let service = WebhookService::new(store.clone(), store.clone(), clock());

        let first = service
            .ingest(
                WebhookCategory::AccountStatus,
                json!({"event_type": "account.disconnected", "account_id": "acct_1"}),
            )
            .await
            .unwrap();
        let second = service
            .ingest(
                WebhookCategory::AccountStatus,
                json!({"event_type": "account.disconnected", "account_id": "acct_9"}),
            )
            .await
            .unwrap();

        assert!(first.created);
        assert!(second.created);
        assert_ne!(first.event.id, second.event.id);
        assert_eq!(store.webhook_event_count().await, 2);
        assert!(store.jobs().await.iter().all(|job| !job.posted_to_linkedin));
    }
}
