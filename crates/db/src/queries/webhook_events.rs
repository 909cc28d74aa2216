use crate::models::{WebhookCategory, WebhookEvent};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct InsertWebhookEvent<'a> {
    pub id: &'a str,
    pub category: WebhookCategory,
    pub event_id: &'a str,
    pub account_id: &'a str,
    pub event_type: &'a str,
    pub payload: &'a serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// Insert unless the provider event id is already stored. `None` means the
/// row already existed and nothing was written.
pub async fn insert_if_absent(
    pool: &PgPool,
    event: &InsertWebhookEvent<'_>,
) -> Result<Option<WebhookEvent>, sqlx::Error> {
    sqlx::query_as::<_, WebhookEvent>(
        r#"
        INSERT INTO webhook_events (id, category, event_id, account_id, event_type,
                                    payload, received_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (event_id) DO NOTHING
        RETURNING id, category, event_id, account_id, event_type, payload,
                  processed, processing_error, related_job_id, related_user_id,
                  received_at, processed_at
        "#,
    )
    .bind(event.id)
    .bind(event.category)
    .bind(event.event_id)
    .bind(event.account_id)
    .bind(event.event_type)
    .bind(event.payload)
    .bind(event.received_at)
    .fetch_optional(pool)
    .await
}

pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<WebhookEvent>, sqlx::Error> {
    sqlx::query_as::<_, WebhookEvent>(
        r#"
        SELECT id, category, event_id, account_id, event_type, payload,
               processed, processing_error, related_job_id, related_user_id,
               received_at, processed_at
        FROM webhook_events
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn get_by_event_id(
    pool: &PgPool,
    event_id: &str,
) -> Result<Option<WebhookEvent>, sqlx::Error> {
    sqlx::query_as::<_, WebhookEvent>(
        r#"
        SELECT id, category, event_id, account_id, event_type, payload,
               processed, processing_error, related_job_id, related_user_id,
               received_at, processed_at
        FROM webhook_events
        WHERE event_id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_processed(
    pool: &PgPool,
    id: &str,
    error: Option<&str>,
    at: DateTime<Utc>,
) -> Result<Option<WebhookEvent>, sqlx::Error> {
    sqlx::query_as::<_, WebhookEvent>(
        r#"
        UPDATE webhook_events
        SET processed = TRUE,
            processed_at = $2,
            processing_error = COALESCE($3, processing_error)
        WHERE id = $1
        RETURNING id, category, event_id, account_id, event_type, payload,
                  processed, processing_error, related_job_id, related_user_id,
                  received_at, processed_at
        "#,
    )
    .bind(id)
    .bind(at)
    .bind(error)
    .fetch_optional(pool)
    .await
}
