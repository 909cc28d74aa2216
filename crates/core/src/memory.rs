//! In-process store used by tests and local tooling.
//!
//! One mutex guards all tables, so every trait method is atomic with
//! respect to the others, matching the single-statement guarantees of the
//! Postgres store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use nanoid::nanoid;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::catalog::default_plans;
use crate::entitlement::remaining_for;
use crate::store::{
    JobPublicationStore, PlanCatalog, Receipt, StoreError, StoreResult, SubscriptionStore,
    WebhookEventStore,
};
use crate::types::{
    JobPublication, NewPricingPlan, NewSubscription, NewWebhookEvent, PlanTier, PricingPlan,
    Subscription, SubscriptionStatus, UsageCounters, WebhookEvent,
};

#[derive(Default)]
struct Tables {
    plans: HashMap<PlanTier, PricingPlan>,
    /// Creation order; the last match for a customer is the current one.
    subscriptions: Vec<Subscription>,
    /// Keyed by provider event id.
    events: HashMap<String, WebhookEvent>,
    jobs: BTreeMap<String, JobPublication>,
}

impl Tables {
    fn hydrate(&self, mut subscription: Subscription) -> Subscription {
        if let Some(plan) = self.plans.get(&subscription.plan.tier) {
            subscription.plan = plan.clone();
        }
        subscription
    }

    fn subscription_mut(&mut self, id: &str) -> Option<&mut Subscription> {
        self.subscriptions.iter_mut().find(|s| s.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.subscriptions.iter().position(|s| s.id == id)
    }

    /// Current quota of the plan behind the subscription at `index`.
    fn quota(&self, index: usize) -> i32 {
        let plan = &self.subscriptions[index].plan;
        self.plans
            .get(&plan.tier)
            .map_or(plan.job_posts_per_year, |current| current.job_posts_per_year)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the default pricing catalog.
    pub fn with_default_catalog(now: DateTime<Utc>) -> Self {
        let plans = default_plans()
            .into_iter()
            .map(|plan| (plan.tier, plan_from_new(&plan, now)))
            .collect();
        Self {
            tables: Mutex::new(Tables {
                plans,
                ..Tables::default()
            }),
        }
    }

    /// Overwrite the usage counters of a subscription.
    pub async fn set_usage(&self, id: &str, used: i32, remaining: i32) {
        let mut tables = self.tables.lock().await;
        if let Some(subscription) = tables.subscription_mut(id) {
            subscription.job_posts_used = used;
            subscription.job_posts_remaining = remaining;
        }
    }

    /// Insert or replace a job by id.
    pub async fn insert_job(
        &self,
        id: &str,
        title: &str,
        account_id: Option<&str>,
        posted_to_linkedin: bool,
    ) {
        let job = JobPublication {
            id: id.to_string(),
            title: title.to_string(),
            unipile_account_id: account_id.map(str::to_string),
            unipile_post_id: None,
            posted_to_linkedin,
            linkedin_posted_at: None,
        };
        self.tables.lock().await.jobs.insert(job.id.clone(), job);
    }

    /// Jobs ordered by id.
    pub async fn jobs(&self) -> Vec<JobPublication> {
        self.tables.lock().await.jobs.values().cloned().collect()
    }

    pub async fn webhook_event_count(&self) -> usize {
        self.tables.lock().await.events.len()
    }

    pub async fn webhook_event_by_event_id(&self, event_id: &str) -> Option<WebhookEvent> {
        self.tables.lock().await.events.get(event_id).cloned()
    }
}

fn plan_from_new(plan: &NewPricingPlan, now: DateTime<Utc>) -> PricingPlan {
    PricingPlan {
        id: format!("plan_{}", nanoid!(12)),
        name: plan.name.clone(),
        tier: plan.tier,
        description: plan.description.clone(),
        monthly_price_cents: plan.monthly_price_cents,
        yearly_price_cents: plan.yearly_price_cents,
        job_posts_per_year: plan.job_posts_per_year,
        trial_days: plan.trial_days,
        support_level: plan.support_level.clone(),
        features: plan.features.clone(),
        is_active: true,
        is_popular: plan.is_popular,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl PlanCatalog for MemoryStore {
    async fn list_active_plans(&self) -> StoreResult<Vec<PricingPlan>> {
        let tables = self.tables.lock().await;
        let mut plans: Vec<_> = tables
            .plans
            .values()
            .filter(|plan| plan.is_active)
            .cloned()
            .collect();
        plans.sort_by_key(|plan| plan.monthly_price_cents);
        Ok(plans)
    }

    async fn plan_by_tier(&self, tier: PlanTier) -> StoreResult<Option<PricingPlan>> {
        Ok(self.tables.lock().await.plans.get(&tier).cloned())
    }

    async fn upsert_plan(&self, plan: &NewPricingPlan) -> StoreResult<PricingPlan> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let stored = match tables.plans.get(&plan.tier) {
            Some(existing) => PricingPlan {
                id: existing.id.clone(),
                created_at: existing.created_at,
                ..plan_from_new(plan, now)
            },
            None => plan_from_new(plan, now),
        };
        tables.plans.insert(plan.tier, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn provision(&self, new: &NewSubscription) -> StoreResult<Subscription> {
        let mut tables = self.tables.lock().await;
        let plan = tables
            .plans
            .get(&new.plan_tier)
            .filter(|plan| plan.is_active)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("plan {}", new.plan_tier.as_str())))?;

        let subscription = Subscription {
            id: format!("sub_{}", nanoid!(12)),
            customer_id: new.customer_id.clone(),
            status: SubscriptionStatus::Trialing,
            billing_interval: new.billing_interval,
            current_period_start: new.now,
            current_period_end: new.billing_interval.period_end(new.now),
            trial_start: Some(new.now),
            trial_end: Some(new.now + Duration::days(i64::from(plan.trial_days))),
            job_posts_used: 0,
            job_posts_remaining: plan.job_posts_per_year,
            cancel_at_period_end: false,
            canceled_at: None,
            created_at: new.now,
            updated_at: new.now,
            plan,
        };
        tables.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .map(|s| tables.hydrate(s)))
    }

    async fn current_for_customer(&self, customer_id: &str) -> StoreResult<Option<Subscription>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .rev()
            .find(|s| s.customer_id == customer_id)
            .cloned()
            .map(|s| tables.hydrate(s)))
    }

    async fn record_job_post(
        &self,
        id: &str,
        trial_limit: i32,
    ) -> StoreResult<Option<UsageCounters>> {
        let mut tables = self.tables.lock().await;
        let Some(index) = tables.position(id) else {
            return Ok(None);
        };
        let quota = tables.quota(index);
        let subscription = &mut tables.subscriptions[index];
        let allowed = match subscription.status {
            SubscriptionStatus::Trialing => subscription.job_posts_used < trial_limit,
            SubscriptionStatus::Active => subscription.job_posts_remaining > 0,
            _ => false,
        };
        if !allowed {
            return Ok(None);
        }
        subscription.job_posts_used += 1;
        subscription.job_posts_remaining = remaining_for(quota, subscription.job_posts_used);
        Ok(Some(subscription.usage()))
    }

    async fn reset_usage(&self, id: &str) -> StoreResult<Option<UsageCounters>> {
        let mut tables = self.tables.lock().await;
        let Some(index) = tables.position(id) else {
            return Ok(None);
        };
        let quota = tables.quota(index);
        let subscription = &mut tables.subscriptions[index];
        subscription.job_posts_used = 0;
        subscription.job_posts_remaining = quota;
        Ok(Some(subscription.usage()))
    }

    async fn update_status(
        &self,
        id: &str,
        status: SubscriptionStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Subscription>> {
        let mut tables = self.tables.lock().await;
        let Some(subscription) = tables.subscription_mut(id) else {
            return Ok(None);
        };
        subscription.status = status;
        subscription.updated_at = at;
        if status == SubscriptionStatus::Canceled {
            subscription.canceled_at = Some(at);
        }
        let updated = subscription.clone();
        Ok(Some(tables.hydrate(updated)))
    }
}

#[async_trait]
impl WebhookEventStore for MemoryStore {
    async fn insert_if_absent(&self, event: &NewWebhookEvent) -> StoreResult<Receipt> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.events.get(&event.event_id) {
            return Ok(Receipt {
                event: existing.clone(),
                created: false,
            });
        }
        let stored = WebhookEvent {
            id: format!("whe_{}", nanoid!(12)),
            category: event.category,
            event_id: event.event_id.clone(),
            account_id: event.account_id.clone(),
            event_type: event.event_type.clone(),
            payload: event.payload.clone(),
            processed: false,
            processing_error: None,
            related_job_id: None,
            related_user_id: None,
            received_at: event.received_at,
            processed_at: None,
        };
        tables.events.insert(stored.event_id.clone(), stored.clone());
        Ok(Receipt {
            event: stored,
            created: true,
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Option<WebhookEvent>> {
        let tables = self.tables.lock().await;
        Ok(tables.events.values().find(|e| e.id == id).cloned())
    }

    async fn mark_processed(
        &self,
        id: &str,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<WebhookEvent>> {
        let mut tables = self.tables.lock().await;
        let Some(event) = tables.events.values_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        event.processed = true;
        event.processed_at = Some(at);
        if let Some(error) = error {
            event.processing_error = Some(error.to_string());
        }
        Ok(Some(event.clone()))
    }
}

#[async_trait]
impl JobPublicationStore for MemoryStore {
    async fn unpublish_for_account(&self, account_id: &str) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut updated = 0;
        for job in tables.jobs.values_mut() {
            if job.posted_to_linkedin && job.unipile_account_id.as_deref() == Some(account_id) {
                job.posted_to_linkedin = false;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::TRIAL_JOB_POST_LIMIT;
    use crate::types::BillingInterval;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_provision_requires_plan() {
        let store = MemoryStore::new();
        let err = store
            .provision(&NewSubscription {
                customer_id: "cus_1".to_string(),
                plan_tier: PlanTier::Starter,
                billing_interval: BillingInterval::Monthly,
                now: now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_provision_starts_trial() {
        let store = MemoryStore::with_default_catalog(now());
        let sub = store
            .provision(&NewSubscription {
                customer_id: "cus_1".to_string(),
                plan_tier: PlanTier::Standard,
                billing_interval: BillingInterval::Yearly,
                now: now(),
            })
            .await
            .unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert_eq!(sub.trial_start, Some(now()));
        assert_eq!(sub.trial_end, Some(now() + Duration::days(7)));
        assert_eq!(
            sub.current_period_end,
            Utc.with_ymd_and_hms(2027, 3, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(sub.job_posts_used, 0);
        assert_eq!(sub.job_posts_remaining, 120);
    }

    #[tokio::test]
    async fn test_current_is_latest_subscription() {
        let store = MemoryStore::with_default_catalog(now());
        for tier in [PlanTier::Starter, PlanTier::Enterprise] {
            store
                .provision(&NewSubscription {
                    customer_id: "cus_1".to_string(),
                    plan_tier: tier,
                    billing_interval: BillingInterval::Monthly,
                    now: now(),
                })
                .await
                .unwrap();
        }
        let current = store.current_for_customer("cus_1").await.unwrap().unwrap();
        assert_eq!(current.plan.tier, PlanTier::Enterprise);
        assert!(store.current_for_customer("cus_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_job_post_gate() {
        let store = MemoryStore::with_default_catalog(now());
        let sub = store
            .provision(&NewSubscription {
                customer_id: "cus_1".to_string(),
                plan_tier: PlanTier::Starter,
                billing_interval: BillingInterval::Monthly,
                now: now(),
            })
            .await
            .unwrap();

        let usage = store.record_job_post(&sub.id, TRIAL_JOB_POST_LIMIT).await.unwrap();
        assert_eq!(
            usage,
            Some(UsageCounters {
                job_posts_used: 1,
                job_posts_remaining: 35
            })
        );
        assert_eq!(store.record_job_post(&sub.id, TRIAL_JOB_POST_LIMIT).await.unwrap(), None);
        assert_eq!(store.record_job_post("sub_missing", TRIAL_JOB_POST_LIMIT).await.unwrap(), None);

        store
            .update_status(&sub.id, SubscriptionStatus::Active, now())
            .await
            .unwrap();
        store.set_usage(&sub.id, 36, 0).await;
        assert_eq!(store.record_job_post(&sub.id, TRIAL_JOB_POST_LIMIT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cancel_stamps_canceled_at() {
        let store = MemoryStore::with_default_catalog(now());
        let sub = store
            .provision(&NewSubscription {
                customer_id: "cus_1".to_string(),
                plan_tier: PlanTier::Starter,
                billing_interval: BillingInterval::Monthly,
                now: now(),
            })
            .await
            .unwrap();
        let later = now() + Duration::days(2);

        let paused = store
            .update_status(&sub.id, SubscriptionStatus::Paused, later)
            .await
            .unwrap()
            .unwrap();
        assert!(paused.canceled_at.is_none());

        let canceled = store
            .update_status(&sub.id, SubscriptionStatus::Canceled, later)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(canceled.canceled_at, Some(later));
        assert_eq!(canceled.updated_at, later);
    }

    #[tokio::test]
    async fn test_upsert_plan_keeps_identity() {
        let store = MemoryStore::with_default_catalog(now());
        let before = store.plan_by_tier(PlanTier::Starter).await.unwrap().unwrap();

        let mut changed = default_plans().remove(0);
        changed.job_posts_per_year = 40;
        let after = store.upsert_plan(&changed).await.unwrap();

        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.job_posts_per_year, 40);
        assert_eq!(store.list_active_plans().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unpublish_only_touches_account() {
        let store = MemoryStore::new();
        store.insert_job("job_a", "A", Some("acct_1"), true).await;
        store.insert_job("job_b", "B", Some("acct_1"), false).await;
        store.insert_job("job_c", "C", None, true).await;

        assert_eq!(store.unpublish_for_account("acct_1").await.unwrap(), 1);
        assert_eq!(store.unpublish_for_account("acct_1").await.unwrap(), 0);
        let published: Vec<_> = store
            .jobs()
            .await
            .into_iter()
            .filter(|job| job.posted_to_linkedin)
            .map(|job| job.id)
            .collect();
        assert_eq!(published, vec!["job_c".to_string()]);
    }
}
