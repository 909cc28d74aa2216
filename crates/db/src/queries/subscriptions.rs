use crate::models::{BillingInterval, PlanTier, Subscription, SubscriptionStatus, Usage};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Select list for a subscription `s` joined with its plan `p`.
const SUBSCRIPTION_COLUMNS: &str = r#"
    s.id, s.customer_id, s.status, s.billing_interval,
    s.current_period_start, s.current_period_end, s.trial_start, s.trial_end,
    s.job_posts_used, s.job_posts_remaining, s.cancel_at_period_end, s.canceled_at,
    s.created_at, s.updated_at,
    p.id AS plan_id, p.name AS plan_name, p.tier AS plan_tier,
    p.description AS plan_description,
    p.monthly_price_cents AS plan_monthly_price_cents,
    p.yearly_price_cents AS plan_yearly_price_cents,
    p.job_posts_per_year AS plan_job_posts_per_year,
    p.trial_days AS plan_trial_days, p.support_level AS plan_support_level,
    p.features AS plan_features, p.is_active AS plan_is_active,
    p.is_popular AS plan_is_popular, p.created_at AS plan_created_at,
    p.updated_at AS plan_updated_at
"#;

/// Start a trial on the active plan of `tier`. Returns `None` when no such
/// plan exists.
pub async fn create_trial(
    pool: &PgPool,
    id: &str,
    customer_id: &str,
    tier: PlanTier,
    billing_interval: BillingInterval,
    now: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        r#"
        WITH s AS (
            INSERT INTO subscriptions (id, customer_id, plan_id, status, billing_interval,
                                       current_period_start, current_period_end,
                                       trial_start, trial_end,
                                       job_posts_used, job_posts_remaining,
                                       created_at, updated_at)
            SELECT $1, $2, plan.id, 'trialing'::subscription_status, $4, $5, $6,
                   $5, $5 + make_interval(days => plan.trial_days),
                   0, plan.job_posts_per_year, $5, $5
            FROM pricing_plans plan
            WHERE plan.tier = $3 AND plan.is_active = TRUE
            RETURNING *
        )
        SELECT {SUBSCRIPTION_COLUMNS}
        FROM s
        JOIN pricing_plans p ON p.id = s.plan_id
        "#
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(id)
        .bind(customer_id)
        .bind(tier)
        .bind(billing_interval)
        .bind(now)
        .bind(period_end)
        .fetch_optional(pool)
        .await
}

pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {SUBSCRIPTION_COLUMNS}
        FROM subscriptions s
        JOIN pricing_plans p ON p.id = s.plan_id
        WHERE s.id = $1
        "#
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_current_for_customer(
    pool: &PgPool,
    customer_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {SUBSCRIPTION_COLUMNS}
        FROM subscriptions s
        JOIN pricing_plans p ON p.id = s.plan_id
        WHERE s.customer_id = $1
        ORDER BY s.created_at DESC, s.id DESC
        LIMIT 1
        "#
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(customer_id)
        .fetch_optional(pool)
        .await
}

/// Gate and increment in one statement. Concurrent callers serialize on the
/// row lock and the loser re-evaluates the gate against the new counters.
pub async fn record_job_post(
    pool: &PgPool,
    id: &str,
    trial_limit: i32,
) -> Result<Option<Usage>, sqlx::Error> {
    sqlx::query_as::<_, Usage>(
        r#"
        UPDATE subscriptions s
        SET job_posts_used = s.job_posts_used + 1,
            job_posts_remaining = GREATEST(p.job_posts_per_year - (s.job_posts_used + 1), 0),
            updated_at = now()
        FROM pricing_plans p
        WHERE p.id = s.plan_id
          AND s.id = $1
          AND ((s.status = 'trialing' AND s.job_posts_used < $2)
               OR (s.status = 'active' AND s.job_posts_remaining > 0))
        RETURNING s.job_posts_used, s.job_posts_remaining
        "#,
    )
    .bind(id)
    .bind(trial_limit)
    .fetch_optional(pool)
    .await
}

pub async fn reset_usage(pool: &PgPool, id: &str) -> Result<Option<Usage>, sqlx::Error> {
    sqlx::query_as::<_, Usage>(
        r#"
        UPDATE subscriptions s
        SET job_posts_used = 0,
            job_posts_remaining = p.job_posts_per_year,
            updated_at = now()
        FROM pricing_plans p
        WHERE p.id = s.plan_id AND s.id = $1
        RETURNING s.job_posts_used, s.job_posts_remaining
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// `canceled_at` is only written when given.
pub async fn update_status(
    pool: &PgPool,
    id: &str,
    status: SubscriptionStatus,
    at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
) -> Result<Option<Subscription>, sqlx::Error> {
    let sql = format!(
        r#"
        WITH s AS (
            UPDATE subscriptions
            SET status = $2,
                updated_at = $3,
                canceled_at = COALESCE($4, canceled_at)
            WHERE id = $1
            RETURNING *
        )
        SELECT {SUBSCRIPTION_COLUMNS}
        FROM s
        JOIN pricing_plans p ON p.id = s.plan_id
        "#
    );
    sqlx::query_as::<_, Subscription>(&sql)
        .bind(id)
        .bind(status)
        .bind(at)
        .bind(canceled_at)
        .fetch_optional(pool)
        .await
}
