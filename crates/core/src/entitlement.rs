//! Entitlement and job-post usage metering.
//!
//! A subscription is entitled while it is `trialing` or `active`. Trialing
//! subscriptions get exactly one job post regardless of the plan quota;
//! active subscriptions may post while credits remain.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::store::{StoreError, StoreResult, SubscriptionStore};
use crate::types::{
    BillingInterval, NewSubscription, PlanTier, Subscription, SubscriptionStatus, UsageCounters,
};

/// Job posts available while trialing.
pub const TRIAL_JOB_POST_LIMIT: i32 = 1;

const COMMIT_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DenialReason {
    NotEntitled { status: SubscriptionStatus },
    TrialExhausted,
    QuotaExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOutcome {
    Consumed(UsageCounters),
    Denied(DenialReason),
}

impl UsageOutcome {
    pub fn is_consumed(&self) -> bool {
        matches!(self, UsageOutcome::Consumed(_))
    }
}

pub fn is_entitled(subscription: &Subscription) -> bool {
    subscription.status.is_entitled()
}

pub fn denial_reason(subscription: &Subscription) -> Option<DenialReason> {
    match subscription.status {
        SubscriptionStatus::Trialing => {
            if subscription.job_posts_used < TRIAL_JOB_POST_LIMIT {
                None
            } else {
                Some(DenialReason::TrialExhausted)
            }
        }
        SubscriptionStatus::Active => {
            if subscription.job_posts_remaining > 0 {
                None
            } else {
                Some(DenialReason::QuotaExhausted)
            }
        }
        status => Some(DenialReason::NotEntitled { status }),
    }
}

pub fn can_post_job(subscription: &Subscription) -> bool {
    denial_reason(subscription).is_none()
}

pub fn remaining_for(quota: i32, used: i32) -> i32 {
    (quota - used).max(0)
}

pub fn days_remaining_in_trial(subscription: &Subscription, now: DateTime<Utc>) -> i64 {
    if !subscription.is_trial() {
        return 0;
    }
    match subscription.trial_end {
        Some(trial_end) => (trial_end - now).num_days().max(0),
        None => 0,
    }
}

/// Read-only view of a customer's entitlement, shaped for API consumers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntitlementStatus {
    pub has_subscription: bool,
    pub entitled: bool,
    pub status: Option<SubscriptionStatus>,
    pub plan: Option<String>,
    pub plan_type: Option<PlanTier>,
    pub trial: bool,
    pub trial_days_remaining: i64,
    pub job_posts_remaining: i32,
    pub job_posts_used: i32,
    pub job_posts_limit: i32,
    pub can_post: bool,
    pub billing_interval: Option<BillingInterval>,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl EntitlementStatus {
    pub fn none() -> Self {
        Self {
            has_subscription: false,
            entitled: false,
            status: None,
            plan: None,
            plan_type: None,
            trial: false,
            trial_days_remaining: 0,
            job_posts_remaining: 0,
            job_posts_used: 0,
            job_posts_limit: 0,
            can_post: false,
            billing_interval: None,
            current_period_end: None,
        }
    }
}

pub fn status(subscription: &Subscription, now: DateTime<Utc>) -> EntitlementStatus {
    EntitlementStatus {
        has_subscription: true,
        entitled: is_entitled(subscription),
        status: Some(subscription.status),
        plan: Some(subscription.plan.name.clone()),
        plan_type: Some(subscription.plan.tier),
        trial: subscription.is_trial(),
        trial_days_remaining: days_remaining_in_trial(subscription, now),
        job_posts_remaining: subscription.job_posts_remaining,
        job_posts_used: subscription.job_posts_used,
        job_posts_limit: subscription.plan.job_posts_per_year,
        can_post: can_post_job(subscription),
        billing_interval: Some(subscription.billing_interval),
        current_period_end: Some(subscription.current_period_end),
    }
}

/// Entitlement operations bound to a store and a clock.
#[derive(Clone)]
pub struct EntitlementService {
    store: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
}

impl EntitlementService {
    pub fn new(store: Arc<dyn SubscriptionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn provision(
        &self,
        customer_id: &str,
        plan_tier: PlanTier,
        billing_interval: BillingInterval,
    ) -> StoreResult<Subscription> {
        let new = NewSubscription {
            customer_id: customer_id.to_string(),
            plan_tier,
            billing_interval,
            now: self.clock.now(),
        };
        let subscription = self.store.provision(&new).await?;
        info!(
            subscription_id = %subscription.id,
            customer_id = %subscription.customer_id,
            plan = %plan_tier.as_str(),
            "trial subscription provisioned"
        );
        Ok(subscription)
    }

    pub async fn current_for_customer(
        &self,
        customer_id: &str,
    ) -> StoreResult<Option<Subscription>> {
        self.store.current_for_customer(customer_id).await
    }

    pub async fn status_for_customer(&self, customer_id: &str) -> StoreResult<EntitlementStatus> {
        let subscription = self.store.current_for_customer(customer_id).await?;
        Ok(match subscription {
            Some(subscription) => status(&subscription, self.clock.now()),
            None => EntitlementStatus::none(),
        })
    }

    /// Consume one job-post credit, or report why not.
    ///
    /// When the store gate rejects a post that the re-read row allows again,
    /// the commit is retried once with the fresh row.
    pub async fn consume_job_post(&self, subscription: &Subscription) -> StoreResult<UsageOutcome> {
        let mut current = subscription.clone();
        for attempt in 1..=COMMIT_ATTEMPTS {
            if let Some(reason) = denial_reason(&current) {
                if attempt > 1 {
                    warn!(
                        subscription_id = %current.id,
                        reason = ?reason,
                        "job post credit denied at commit"
                    );
                }
                return Ok(UsageOutcome::Denied(reason));
            }

            if let Some(usage) = self
                .store
                .record_job_post(&current.id, TRIAL_JOB_POST_LIMIT)
                .await?
            {
                info!(
                    subscription_id = %current.id,
                    used = usage.job_posts_used,
                    remaining = usage.job_posts_remaining,
                    "job post credit consumed"
                );
                return Ok(UsageOutcome::Consumed(usage));
            }

            // Lost a race with another consumer, or the row changed under us.
            current = self
                .store
                .get(&current.id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("subscription {}", current.id)))?;
        }

        let reason = denial_reason(&current).unwrap_or(match current.status {
            SubscriptionStatus::Trialing => DenialReason::TrialExhausted,
            _ => DenialReason::QuotaExhausted,
        });
        warn!(
            subscription_id = %current.id,
            reason = ?reason,
            "job post credit still contended after retry"
        );
        Ok(UsageOutcome::Denied(reason))
    }

    pub async fn use_job_post(&self, subscription: &Subscription) -> StoreResult<bool> {
        Ok(self.consume_job_post(subscription).await?.is_consumed())
    }

    pub async fn reset_usage(&self, subscription_id: &str) -> StoreResult<UsageCounters> {
        let usage = self
            .store
            .reset_usage(subscription_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("subscription {subscription_id}")))?;
        info!(
            subscription_id = %subscription_id,
            remaining = usage.job_posts_remaining,
            "job post usage reset"
        );
        Ok(usage)
    }

    pub async fn update_status(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<Subscription> {
        let subscription = self
            .store
            .update_status(subscription_id, status, self.clock.now())
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("subscription {subscription_id}")))?;
        info!(
            subscription_id = %subscription_id,
            status = %status,
            "subscription status updated"
        );
        Ok(subscription)
    }
}
