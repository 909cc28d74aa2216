//! Persistence seams.
//!
//! The entitlement evaluator and the webhook pipeline only talk to storage
//! through these traits. `hirewire-db` implements them on Postgres and
//! [`crate::memory::MemoryStore`] implements them in process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{
    NewPricingPlan, NewSubscription, NewWebhookEvent, PlanTier, PricingPlan, Subscription,
    SubscriptionStatus, UsageCounters, WebhookEvent,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PlanCatalog: Send + Sync {
    async fn list_active_plans(&self) -> StoreResult<Vec<PricingPlan>>;

    async fn plan_by_tier(&self, tier: PlanTier) -> StoreResult<Option<PricingPlan>>;

    /// Insert or update the plan for `plan.tier`.
    async fn upsert_plan(&self, plan: &NewPricingPlan) -> StoreResult<PricingPlan>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Start a trial subscription on the plan for `new.plan_tier`.
    async fn provision(&self, new: &NewSubscription) -> StoreResult<Subscription>;

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>>;

    /// Most recently created subscription of a customer.
    async fn current_for_customer(&self, customer_id: &str) -> StoreResult<Option<Subscription>>;

    /// Consume one job-post credit if the subscription may post.
    ///
    /// The gate check and the increment are a single atomic step: `None` means
    /// the subscription was missing or not allowed to post, and nothing
    /// changed.
    async fn record_job_post(
        &self,
        id: &str,
        trial_limit: i32,
    ) -> StoreResult<Option<UsageCounters>>;

    /// Zero the consumed counter and restore the plan quota.
    async fn reset_usage(&self, id: &str) -> StoreResult<Option<UsageCounters>>;

    async fn update_status(
        &self,
        id: &str,
        status: SubscriptionStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Subscription>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub event: WebhookEvent,
    /// False when the event id was already stored.
    pub created: bool,
}

#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Insert unless `event.event_id` already exists; never stores twice.
    async fn insert_if_absent(&self, event: &NewWebhookEvent) -> StoreResult<Receipt>;

    async fn get(&self, id: &str) -> StoreResult<Option<WebhookEvent>>;

    async fn mark_processed(
        &self,
        id: &str,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<WebhookEvent>>;
}

#[async_trait]
pub trait JobPublicationStore: Send + Sync {
    /// Clear the published flag on every job posted through `account_id`.
    /// Returns the number of jobs changed.
    async fn unpublish_for_account(&self, account_id: &str) -> StoreResult<u64>;
}
