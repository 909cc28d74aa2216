use nanoid::nanoid;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::payload::WebhookEnvelope;
use super::IntakeError;
use crate::clock::Clock;
use crate::store::{Receipt, WebhookEventStore};
use crate::types::{NewWebhookEvent, WebhookCategory};

/// Durable, idempotent receipt of provider events.
#[derive(Clone)]
pub struct WebhookIntake {
    store: Arc<dyn WebhookEventStore>,
    clock: Arc<dyn Clock>,
}

impl WebhookIntake {
    pub fn new(store: Arc<dyn WebhookEventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Store `payload` once per provider event id.
    ///
    /// Payloads without an id get a synthesized one, so their retries are
    /// stored again.
    pub async fn receive(
        &self,
        category: WebhookCategory,
        payload: Value,
    ) -> Result<Receipt, IntakeError> {
        if !payload.is_object() {
            return Err(IntakeError::NotAnObject);
        }

        let received_at = self.clock.now();
        let envelope = WebhookEnvelope::from_value(&payload);
        let event_id = envelope.event_id().unwrap_or_else(|| {
            format!(
                "webhook_{}_{}_{}",
                category.as_str(),
                received_at.timestamp_micros(),
                nanoid!(8)
            )
        });

        let new = NewWebhookEvent {
            category,
            event_id,
            account_id: envelope.account_id(),
            event_type: envelope.event_type(),
            payload,
            received_at,
        };

        let receipt = self.store.insert_if_absent(&new).await?;
        if receipt.created {
            info!(
                webhook_id = %receipt.event.id,
                category = %category,
                event_id = %receipt.event.event_id,
                event_type = %receipt.event.event_type,
                "webhook stored"
            );
        } else {
            info!(
                webhook_id = %receipt.event.id,
                category = %category,
                event_id = %receipt.event.event_id,
                "duplicate webhook delivery ignored"
            );
        }
        Ok(receipt)
    }

    /// Mark an event as done. Calling it again only restamps it.
    pub async fn mark_processed(
        &self,
        webhook_id: &str,
        error: Option<&str>,
    ) -> Result<(), IntakeError> {
        self.store
            .mark_processed(webhook_id, error, self.clock.now())
            .await?
            .ok_or_else(|| IntakeError::UnknownEvent(webhook_id.to_string()))?;
        Ok(())
    }
}
