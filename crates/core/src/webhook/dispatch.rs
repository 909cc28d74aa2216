use std::sync::Arc;
use tracing::{error, info};

use super::payload::CategoryPayload;
use super::HandlerError;
use crate::store::JobPublicationStore;
use crate::types::{WebhookCategory, WebhookEvent};

const ACCOUNT_DISCONNECTED: &str = "account.disconnected";
const MESSAGE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub handled: bool,
    pub error: Option<String>,
}

impl DispatchOutcome {
    fn ok() -> Self {
        Self {
            handled: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            handled: true,
            error: Some(error),
        }
    }

    fn rejected(error: String) -> Self {
        Self {
            handled: false,
            error: Some(error),
        }
    }
}

/// Routes stored events to their category handler.
#[derive(Clone)]
pub struct WebhookDispatcher {
    jobs: Arc<dyn JobPublicationStore>,
}

impl WebhookDispatcher {
    pub fn new(jobs: Arc<dyn JobPublicationStore>) -> Self {
        Self { jobs }
    }

    /// Run the handler for `event`. Handler failures come back in the
    /// outcome; this never returns an error.
    pub async fn dispatch(&self, event: &WebhookEvent) -> DispatchOutcome {
        let payload = CategoryPayload::parse(event.category, &event.payload);
        match self.handle(&payload).await {
            Ok(()) => DispatchOutcome::ok(),
            Err(err) => {
                error!(
                    webhook_id = %event.id,
                    category = %event.category,
                    event_type = %payload.event_type(),
                    error = %err,
                    "webhook handler failed"
                );
                DispatchOutcome::failed(err.to_string())
            }
        }
    }

    /// Dispatch by URL slug; unknown slugs are rejected without raising.
    pub async fn dispatch_slug(&self, slug: &str, event: &WebhookEvent) -> DispatchOutcome {
        match WebhookCategory::from_slug(slug) {
            Some(category) if category == event.category => self.dispatch(event).await,
            Some(category) => DispatchOutcome::rejected(format!(
                "event {} belongs to {}, not {}",
                event.id, event.category, category
            )),
            None => {
                info!(slug = %slug, "unknown webhook category");
                DispatchOutcome::rejected(format!("unknown webhook category: {slug}"))
            }
        }
    }

    async fn handle(&self, payload: &CategoryPayload) -> Result<(), HandlerError> {
        match payload {
            CategoryPayload::AccountStatus {
                event_type,
                account_id,
            } => {
                info!(event_type = %event_type, account_id = %account_id, "account status update");
                if event_type == ACCOUNT_DISCONNECTED {
                    if account_id.is_empty() {
                        return Err(HandlerError::MissingField("account_id"));
                    }
                    let updated = self.jobs.unpublish_for_account(account_id).await?;
                    info!(
                        account_id = %account_id,
                        jobs = updated,
                        "jobs unpublished after account disconnection"
                    );
                }
            }
            CategoryPayload::Messaging {
                event_type,
                content,
            } => {
                info!(event_type = %event_type, "messaging event");
                if event_type == "message.received" {
                    let preview: String = content
                        .as_deref()
                        .unwrap_or_default()
                        .chars()
                        .take(MESSAGE_PREVIEW_CHARS)
                        .collect();
                    info!(preview = %preview, "message received");
                }
            }
            CategoryPayload::Mailing {
                event_type,
                email_id,
            } => {
                info!(event_type = %event_type, "mailing event");
                if matches!(
                    event_type.as_str(),
                    "email.delivered" | "email.failed" | "email.bounced"
                ) {
                    info!(email_id = ?email_id, status = %event_type, "email status");
                }
            }
            CategoryPayload::MailTracking {
                event_type,
                email_id,
                link_url,
            } => {
                info!(event_type = %event_type, "mail tracking event");
                match event_type.as_str() {
                    "email.opened" => info!(email_id = ?email_id, "email opened"),
                    "email.clicked" => info!(link_url = ?link_url, "email link clicked"),
                    _ => {}
                }
            }
            CategoryPayload::UsersRelations {
                event_type,
                connection_name,
            } => {
                info!(event_type = %event_type, "users relations event");
                if event_type == "connection.added" {
                    info!(connection = ?connection_name, "new connection added");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::{StoreError, StoreResult};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn event(category: WebhookCategory, payload: Value) -> WebhookEvent {
        WebhookEvent {
            id: "whe_test".to_string(),
            category,
            event_id: "evt_test".to_string(),
            account_id: String::new(),
            event_type: String::new(),
            payload,
            processed: false,
            processing_error: None,
            related_job_id: None,
            related_user_id: None,
            received_at: Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
            processed_at: None,
        }
    }

    struct FailingJobs;

    #[async_trait]
    impl JobPublicationStore for FailingJobs {
        async fn unpublish_for_account(&self, _account_id: &str) -> StoreResult<u64> {
            Err(StoreError::Database("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn test_account_disconnected_unpublishes_jobs() {
        let store = Arc::new(MemoryStore::new());
        store.insert_job("job_1", "Rust engineer", Some("acct_9"), true).await;
        store.insert_job("job_2", "SRE", Some("acct_9"), true).await;
        store.insert_job("job_3", "Designer", Some("acct_1"), true).await;
        let dispatcher = WebhookDispatcher::new(store.clone());

        let outcome = dispatcher
            .dispatch(&event(
                WebhookCategory::AccountStatus,
                json!({"event_type": "account.disconnected", "account_id": "acct_9"}),
            ))
            .await;

        assert_eq!(outcome, DispatchOutcome::ok());
        let jobs = store.jobs().await;
        let published: Vec<_> = jobs
            .iter()
            .filter(|job| job.posted_to_linkedin)
            .map(|job| job.id.as_str())
            .collect();
        assert_eq!(published, vec!["job_3"]);
    }

    #[tokio::test]
    async fn test_other_account_events_leave_jobs_alone() {
        let store = Arc::new(MemoryStore::new());
        store.insert_job("job_1", "Rust engineer", Some("acct_9"), true).await;
        let dispatcher = WebhookDispatcher::new(store.clone());

        let outcome = dispatcher
            .dispatch(&event(
                WebhookCategory::AccountStatus,
                json!({"event_type": "account.connected", "account_id": "acct_9"}),
            ))
            .await;

        assert_eq!(outcome, DispatchOutcome::ok());
        assert!(store.jobs().await[0].posted_to_linkedin);
    }

    #[tokio::test]
    async fn test_handler_failure_is_captured() {
        let dispatcher = WebhookDispatcher::new(Arc::new(FailingJobs));
        let outcome = dispatcher
            .dispatch(&event(
                WebhookCategory::AccountStatus,
                json!({"event_type": "account.disconnected", "account_id": "acct_9"}),
            ))
            .await;

        assert!(outcome.handled);
        assert_eq!(
            outcome.error.as_deref(),
            Some("store error: database error: connection reset")
        );
    }

    #[tokio::test]
    async fn test_disconnect_without_account_fails() {
        let dispatcher = WebhookDispatcher::new(Arc::new(MemoryStore::new()));
        let outcome = dispatcher
            .dispatch(&event(
                WebhookCategory::AccountStatus,
                json!({"event_type": "account.disconnected"}),
            ))
            .await;
        assert_eq!(
            outcome.error.as_deref(),
            Some("payload is missing account_id")
        );
    }

    #[tokio::test]
    async fn test_observational_categories_succeed() {
        let dispatcher = WebhookDispatcher::new(Arc::new(FailingJobs));
        let cases = [
            (WebhookCategory::Messaging, json!({"event_type": "message.received", "data": {"content": "hi"}})),
            (WebhookCategory::Mailing, json!({"event_type": "email.bounced", "data": {"email_id": "em_1"}})),
            (WebhookCategory::MailTracking, json!({"event_type": "email.clicked", "data": {"link_url": "https://x.test"}})),
            (WebhookCategory::UsersRelations, json!({"event_type": "connection.added", "data": {"connection": {"name": "Ada"}}})),
            (WebhookCategory::Messaging, json!({})),
        ];
        for (category, payload) in cases {
            assert_eq!(
                dispatcher.dispatch(&event(category, payload)).await,
                DispatchOutcome::ok()
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_slug_rejected() {
        let dispatcher = WebhookDispatcher::new(Arc::new(MemoryStore::new()));
        let ev = event(WebhookCategory::Messaging, json!({}));

        let outcome = dispatcher.dispatch_slug("billing", &ev).await;
        assert!(!outcome.handled);
        assert!(outcome.error.is_some());

        let outcome = dispatcher.dispatch_slug("mailing", &ev).await;
        assert!(!outcome.handled);

        let outcome = dispatcher.dispatch_slug("messaging", &ev).await;
        assert_eq!(outcome, DispatchOutcome::ok());
    }
}
