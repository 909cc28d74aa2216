use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Standard,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Starter => "starter",
            PlanTier::Standard => "standard",
            PlanTier::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }

    /// Length of one billing period starting at `start`.
    pub fn period_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            BillingInterval::Monthly => 1,
            BillingInterval::Yearly => 12,
        };
        start
            .checked_add_months(chrono::Months::new(months))
            .unwrap_or(start)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
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

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Unpaid => "unpaid",
            SubscriptionStatus::Incomplete => "incomplete",
            SubscriptionStatus::IncompleteExpired => "incomplete_expired",
            SubscriptionStatus::Paused => "paused",
        }
    }

    /// Only trialing and active subscriptions may use the product.
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Trialing | SubscriptionStatus::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WebhookCategory {
    AccountStatus,
    Messaging,
    Mailing,
    MailTracking,
    UsersRelations,
}

impl WebhookCategory {
    pub const ALL: [WebhookCategory; 5] = [
        WebhookCategory::AccountStatus,
        WebhookCategory::Messaging,
        WebhookCategory::Mailing,
        WebhookCategory::MailTracking,
        WebhookCategory::UsersRelations,
    ];

    /// Storage name, e.g. `account_status`.
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookCategory::AccountStatus => "account_status",
            WebhookCategory::Messaging => "messaging",
            WebhookCategory::Mailing => "mailing",
            WebhookCategory::MailTracking => "mail_tracking",
            WebhookCategory::UsersRelations => "users_relations",
        }
    }

    /// URL path segment, e.g. `account-status`.
    pub fn slug(&self) -> &'static str {
        match self {
            WebhookCategory::AccountStatus => "account-status",
            WebhookCategory::Messaging => "messaging",
            WebhookCategory::Mailing => "mailing",
            WebhookCategory::MailTracking => "mail-tracking",
            WebhookCategory::UsersRelations => "users-relations",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.slug() == slug)
    }
}

impl fmt::Display for WebhookCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
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
    pub features: Vec<String>,
    pub is_active: bool,
    pub is_popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog entry as written by the seeding routine; the store assigns ids
/// and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPricingPlan {
    pub name: String,
    pub tier: PlanTier,
    pub description: String,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    pub job_posts_per_year: i32,
    pub trial_days: i32,
    pub support_level: String,
    pub features: Vec<String>,
    pub is_popular: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub plan: PricingPlan,
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
}

impl Subscription {
    pub fn is_trial(&self) -> bool {
        self.status == SubscriptionStatus::Trialing
    }

    pub fn usage(&self) -> UsageCounters {
        UsageCounters {
            job_posts_used: self.job_posts_used,
            job_posts_remaining: self.job_posts_remaining,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub customer_id: String,
    pub plan_tier: PlanTier,
    pub billing_interval: BillingInterval,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageCounters {
    pub job_posts_used: i32,
    pub job_posts_remaining: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
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

#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookEvent {
    pub category: WebhookCategory,
    pub event_id: String,
    pub account_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// The part of a job posting that external publishing touches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPublication {
    pub id: String,
    pub title: String,
    pub unipile_account_id: Option<String>,
    pub unipile_post_id: Option<String>,
    pub posted_to_linkedin: bool,
    pub linkedin_posted_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_entitled_statuses() {
        assert!(SubscriptionStatus::Trialing.is_entitled());
        assert!(SubscriptionStatus::Active.is_entitled());
        for status in [
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Unpaid,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::IncompleteExpired,
            SubscriptionStatus::Paused,
        ] {
            assert!(!status.is_entitled(), "{status} should not be entitled");
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::IncompleteExpired).unwrap();
        assert_eq!(json, "\"incomplete_expired\"");
    }

    #[test]
    fn test_category_slugs_round_trip() {
        for category in WebhookCategory::ALL {
            assert_eq!(WebhookCategory::from_slug(category.slug()), Some(category));
        }
        assert_eq!(
            WebhookCategory::from_slug("mail-tracking"),
            Some(WebhookCategory::MailTracking)
        );
        assert_eq!(WebhookCategory::from_slug("mail_tracking"), None);
        assert_eq!(WebhookCategory::from_slug("billing"), None);
    }

    #[test]
    fn test_billing_period_end() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            BillingInterval::Monthly.period_end(start),
            Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap()
        );
        assert_eq!(
            BillingInterval::Yearly.period_end(start),
            Utc.with_ymd_and_hms(2027, 1, 31, 12, 0, 0).unwrap()
        );
    }
}
