use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hirewire_core::store::{
    JobPublicationStore, PlanCatalog, Receipt, StoreError, StoreResult, SubscriptionStore,
    WebhookEventStore,
};
use hirewire_core::types::{
    NewPricingPlan, NewSubscription, NewWebhookEvent, PlanTier, PricingPlan, Subscription,
    SubscriptionStatus, UsageCounters, WebhookEvent,
};
use nanoid::nanoid;
use sqlx::PgPool;
use tracing::error;

use crate::queries;

/// Postgres-backed implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    error!(error = %err, "database error");
    StoreError::Database(err.to_string())
}

#[async_trait]
impl PlanCatalog for PgStore {
    async fn list_active_plans(&self) -> StoreResult<Vec<PricingPlan>> {
        let rows = queries::plans::list_active(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn plan_by_tier(&self, tier: PlanTier) -> StoreResult<Option<PricingPlan>> {
        let row = queries::plans::get_by_tier(&self.pool, tier.into())
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn upsert_plan(&self, plan: &NewPricingPlan) -> StoreResult<PricingPlan> {
        let id = format!("plan_{}", nanoid!(12));
        let row = queries::plans::upsert(
            &self.pool,
            &queries::plans::UpsertPlan {
                id: &id,
                name: &plan.name,
                tier: plan.tier.into(),
                description: &plan.description,
                monthly_price_cents: plan.monthly_price_cents,
                yearly_price_cents: plan.yearly_price_cents,
                job_posts_per_year: plan.job_posts_per_year,
                trial_days: plan.trial_days,
                support_level: &plan.support_level,
                features: &plan.features,
                is_popular: plan.is_popular,
            },
        )
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn provision(&self, new: &NewSubscription) -> StoreResult<Subscription> {
        let id = format!("sub_{}", nanoid!(12));
        let row = queries::subscriptions::create_trial(
            &self.pool,
            &id,
            &new.customer_id,
            new.plan_tier.into(),
            new.billing_interval.into(),
            new.now,
            new.billing_interval.period_end(new.now),
        )
        .await
        .map_err(db_error)?
        .ok_or_else(|| StoreError::NotFound(format!("plan {}", new.plan_tier.as_str())))?;
        Ok(row.into())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>> {
        let row = queries::subscriptions::get_by_id(&self.pool, id)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn current_for_customer(&self, customer_id: &str) -> StoreResult<Option<Subscription>> {
        let row = queries::subscriptions::get_current_for_customer(&self.pool, customer_id)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn record_job_post(
        &self,
        id: &str,
        trial_limit: i32,
    ) -> StoreResult<Option<UsageCounters>> {
        let usage = queries::subscriptions::record_job_post(&self.pool, id, trial_limit)
            .await
            .map_err(db_error)?;
        Ok(usage.map(Into::into))
    }

    async fn reset_usage(&self, id: &str) -> StoreResult<Option<UsageCounters>> {
        let usage = queries::subscriptions::reset_usage(&self.pool, id)
            .await
            .map_err(db_error)?;
        Ok(usage.map(Into::into))
    }

    async fn update_status(
        &self,
        id: &str,
        status: SubscriptionStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Subscription>> {
        let canceled_at = (status == SubscriptionStatus::Canceled).then_some(at);
        let row = queries::subscriptions::update_status(&self.pool, id, status.into(), at, canceled_at)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl WebhookEventStore for PgStore {
    async fn insert_if_absent(&self, event: &NewWebhookEvent) -> StoreResult<Receipt> {
        let id = format!("whe_{}", nanoid!(12));
        let inserted = queries::webhook_events::insert_if_absent(
            &self.pool,
            &queries::webhook_events::InsertWebhookEvent {
                id: &id,
                category: event.category.into(),
                event_id: &event.event_id,
                account_id: &event.account_id,
                event_type: &event.event_type,
                payload: &event.payload,
                received_at: event.received_at,
            },
        )
        .await
        .map_err(db_error)?;

        if let Some(row) = inserted {
            return Ok(Receipt {
                event: row.into(),
                created: true,
            });
        }

        let existing = queries::webhook_events::get_by_event_id(&self.pool, &event.event_id)
            .await
            .map_err(db_error)?
            .ok_or_else(|| StoreError::NotFound(format!("webhook event {}", event.event_id)))?;
        Ok(Receipt {
            event: existing.into(),
            created: false,
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Option<WebhookEvent>> {
        let row = queries::webhook_events::get_by_id(&self.pool, id)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn mark_processed(
        &self,
        id: &str,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<WebhookEvent>> {
        let row = queries::webhook_events::mark_processed(&self.pool, id, error, at)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl JobPublicationStore for PgStore {
    async fn unpublish_for_account(&self, account_id: &str) -> StoreResult<u64> {
        queries::jobs::unpublish_for_account(&self.pool, account_id)
            .await
            .map_err(db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirewire_core::catalog::seed_default_plans;
    use hirewire_core::entitlement::TRIAL_JOB_POST_LIMIT;
    use hirewire_core::types::BillingInterval;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    async fn store() -> Arc<PgStore> {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        crate::MIGRATOR.run(&pool).await.unwrap();
        let store = Arc::new(PgStore::new(pool));
        let catalog: Arc<dyn PlanCatalog> = store.clone();
        seed_default_plans(&catalog).await.unwrap();
        store
    }

    async fn race(store: &PgStore, id: &str) -> usize {
        let (a, b) = tokio::join!(
            store.record_job_post(id, TRIAL_JOB_POST_LIMIT),
            store.record_job_post(id, TRIAL_JOB_POST_LIMIT),
        );
        [a.unwrap(), b.unwrap()].iter().filter(|usage| usage.is_some()).count()
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_concurrent_posts_race_for_last_credit() {
        let store = store().await;
        let sub = store
            .provision(&NewSubscription {
                customer_id: format!("cus_{}", nanoid!(10)),
                plan_tier: PlanTier::Starter,
                billing_interval: BillingInterval::Monthly,
                now: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(race(&store, &sub.id).await, 1, "trial credit consumed twice");
        let trial = SubscriptionStore::get(store.as_ref(), &sub.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trial.job_posts_used, 1);

        store
            .update_status(&sub.id, SubscriptionStatus::Active, Utc::now())
            .await
            .unwrap();
        let quota = trial.plan.job_posts_per_year;
        sqlx::query("UPDATE subscriptions SET job_posts_used = $2, job_posts_remaining = 1 WHERE id = $1")
            .bind(&sub.id)
            .bind(quota - 1)
            .execute(&store.pool)
            .await
            .unwrap();

        assert_eq!(race(&store, &sub.id).await, 1, "last credit consumed twice");
        let active = SubscriptionStore::get(store.as_ref(), &sub.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.job_posts_used, quota);
        assert_eq!(active.job_posts_remaining, 0);
    }
}
