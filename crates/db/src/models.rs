use chrono::{DateTime, Utc};
use hirewire_core::types as domain;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Standard,
    Enterprise,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "billing_interval", rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "webhook_category", rename_all = "snake_case")]
pub enum WebhookCategory {
    AccountStatus,
    Messaging,
    Mailing,
    MailTracking,
    UsersRelations,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PricingPlan {
    pub id: String,
    pub name: String,
    pub tier: PlanTier,
    pub description: String,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    pub job_posts_per_year: i32,
    pub trial_days: i32,
    pub support_level: String,
    pub features: Json<Vec<String>>,
    pub is_active: bool,
    pub is_popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A subscription joined with its plan; plan columns carry a `plan_` prefix.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub billing_interval: BillingInterval,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub trial_start: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub job_posts_used: i32,
    pub job_posts_remaining: i32,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub plan_id: String,
    pub plan_name: String,
    pub plan_tier: PlanTier,
    pub plan_description: String,
    pub plan_monthly_price_cents: i64,
    pub plan_yearly_price_cents: i64,
    pub plan_job_posts_per_year: i32,
    pub plan_trial_days: i32,
    pub plan_support_level: String,
    pub plan_features: Json<Vec<String>>,
    pub plan_is_active: bool,
    pub plan_is_popular: bool,
    pub plan_created_at: DateTime<Utc>,
    pub plan_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
pub struct Usage {
    pub job_posts_used: i32,
    pub job_posts_remaining: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WebhookEvent {
    pub id: String,
    pub category: WebhookCategory,
    pub event_id: String,
    pub account_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub processing_error: Option<String>,
    pub related_job_id: Option<String>,
    pub related_user_id: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<domain::PlanTier> for PlanTier {
    fn from(tier: domain::PlanTier) -> Self {
        match tier {
            domain::PlanTier::Starter => PlanTier::Starter,
            domain::PlanTier::Standard => PlanTier::Standard,
            domain::PlanTier::Enterprise => PlanTier::Enterprise,
        }
    }
}

impl From<PlanTier> for domain::PlanTier {
    fn from(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Starter => domain::PlanTier::Starter,
            PlanTier::Standard => domain::PlanTier::Standard,
            PlanTier::Enterprise => domain::PlanTier::Enterprise,
        }
    }
}

impl From<domain::BillingInterval> for BillingInterval {
    fn from(interval: domain::BillingInterval) -> Self {
        match interval {
            domain::BillingInterval::Monthly => BillingInterval::Monthly,
            domain::BillingInterval::Yearly => BillingInterval::Yearly,
        }
    }
}

impl From<BillingInterval> for domain::BillingInterval {
    fn from(interval: BillingInterval) -> Self {
        match interval {
            BillingInterval::Monthly => domain::BillingInterval::Monthly,
            BillingInterval::Yearly => domain::BillingInterval::Yearly,
        }
    }
}

impl From<domain::SubscriptionStatus> for SubscriptionStatus {
    fn from(status: domain::SubscriptionStatus) -> Self {
        match status {
            domain::SubscriptionStatus::Trialing => SubscriptionStatus::Trialing,
            domain::SubscriptionStatus::Active => SubscriptionStatus::Active,
            domain::SubscriptionStatus::PastDue => SubscriptionStatus::PastDue,
            domain::SubscriptionStatus::Canceled => SubscriptionStatus::Canceled,
            domain::SubscriptionStatus::Unpaid => SubscriptionStatus::Unpaid,
            domain::SubscriptionStatus::Incomplete => SubscriptionStatus::Incomplete,
            domain::SubscriptionStatus::IncompleteExpired => SubscriptionStatus::IncompleteExpired,
            domain::SubscriptionStatus::Paused => SubscriptionStatus::Paused,
        }
    }
}

impl From<SubscriptionStatus> for domain::SubscriptionStatus {
    fn from(status: SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Trialing => domain::SubscriptionStatus::Trialing,
            SubscriptionStatus::Active => domain::SubscriptionStatus::Active,
            SubscriptionStatus::PastDue => domain::SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled => domain::SubscriptionStatus::Canceled,
            SubscriptionStatus::Unpaid => domain::SubscriptionStatus::Unpaid,
            SubscriptionStatus::Incomplete => domain::SubscriptionStatus::Incomplete,
            SubscriptionStatus::IncompleteExpired => domain::SubscriptionStatus::IncompleteExpired,
            SubscriptionStatus::Paused => domain::SubscriptionStatus::Paused,
        }
    }
}

impl From<domain::WebhookCategory> for WebhookCategory {
    fn from(category: domain::WebhookCategory) -> Self {
        match category {
            domain::WebhookCategory::AccountStatus => WebhookCategory::AccountStatus,
            domain::WebhookCategory::Messaging => WebhookCategory::Messaging,
            domain::WebhookCategory::Mailing => WebhookCategory::Mailing,
            domain::WebhookCategory::MailTracking => WebhookCategory::MailTracking,
            domain::WebhookCategory::UsersRelations => WebhookCategory::UsersRelations,
        }
    }
}

impl From<WebhookCategory> for domain::WebhookCategory {
    fn from(category: WebhookCategory) -> Self {
        match category {
            WebhookCategory::AccountStatus => domain::WebhookCategory::AccountStatus,
            WebhookCategory::Messaging => domain::WebhookCategory::Messaging,
            WebhookCategory::Mailing => domain::WebhookCategory::Mailing,
            WebhookCategory::MailTracking => domain::WebhookCategory::MailTracking,
            WebhookCategory::UsersRelations => domain::WebhookCategory::UsersRelations,
        }
    }
}

impl From<PricingPlan> for domain::PricingPlan {
    fn from(row: PricingPlan) -> Self {
        Self {
            id: row.id,
            name: row.name,
            tier: row.tier.into(),
            description: row.description,
            monthly_price_cents: row.monthly_price_cents,
            yearly_price_cents: row.yearly_price_cents,
            job_posts_per_year: row.job_posts_per_year,
            trial_days: row.trial_days,
            support_level: row.support_level,
            features: row.features.0,
            is_active: row.is_active,
            is_popular: row.is_popular,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<Subscription> for domain::Subscription {
    fn from(row: Subscription) -> Self {
        let plan = domain::PricingPlan {
            id: row.plan_id,
            name: row.plan_name,
            tier: row.plan_tier.into(),
            description: row.plan_description,
            monthly_price_cents: row.plan_monthly_price_cents,
            yearly_price_cents: row.plan_yearly_price_cents,
            job_posts_per_year: row.plan_job_posts_per_year,
            trial_days: row.plan_trial_days,
            support_level: row.plan_support_level,
            features: row.plan_features.0,
            is_active: row.plan_is_active,
            is_popular: row.plan_is_popular,
            created_at: row.plan_created_at,
            updated_at: row.plan_updated_at,
        };
        Self {
            id: row.id,
            customer_id: row.customer_id,
            plan,
            status: row.status.into(),
            billing_interval: row.billing_interval.into(),
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            trial_start: row.trial_start,
            trial_end: row.trial_end,
            job_posts_used: row.job_posts_used,
            job_posts_remaining: row.job_posts_remaining,
            cancel_at_period_end: row.cancel_at_period_end,
            canceled_at: row.canceled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<Usage> for domain::UsageCounters {
    fn from(row: Usage) -> Self {
        Self {
            job_posts_used: row.job_posts_used,
            job_posts_remaining: row.job_posts_remaining,
        }
    }
}

impl From<WebhookEvent> for domain::WebhookEvent {
    fn from(row: WebhookEvent) -> Self {
        Self {
            id: row.id,
            category: row.category.into(),
            event_id: row.event_id,
            account_id: row.account_id,
            event_type: row.event_type,
            payload: row.payload,
            processed: row.processed,
            processing_error: row.processing_error,
            related_job_id: row.related_job_id,
            related_user_id: row.related_user_id,
            received_at: row.received_at,
            processed_at: row.processed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_round_trips() {
        for status in [
            domain::SubscriptionStatus::Trialing,
            domain::SubscriptionStatus::Active,
            domain::SubscriptionStatus::PastDue,
            domain::SubscriptionStatus::Canceled,
            domain::SubscriptionStatus::Unpaid,
            domain::SubscriptionStatus::Incomplete,
            domain::SubscriptionStatus::IncompleteExpired,
            domain::SubscriptionStatus::Paused,
        ] {
            let row: SubscriptionStatus = status.into();
            assert_eq!(domain::SubscriptionStatus::from(row), status);
        }
    }

    #[test]
    fn test_category_mapping_round_trips() {
        for category in domain::WebhookCategory::ALL {
            let row: WebhookCategory = category.into();
            assert_eq!(domain::WebhookCategory::from(row), category);
        }
    }
}
