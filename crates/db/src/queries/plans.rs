use crate::models::{PlanTier, PricingPlan};
use sqlx::types::Json;
use sqlx::PgPool;

pub struct UpsertPlan<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub tier: PlanTier,
    pub description: &'a str,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    pub job_posts_per_year: i32,
    pub trial_days: i32,
    pub support_level: &'a str,
    pub features: &'a [String],
    pub is_popular: bool,
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<PricingPlan>, sqlx::Error> {
    sqlx::query_as::<_, PricingPlan>(
        r#"
        SELECT id, name, tier, description, monthly_price_cents, yearly_price_cents,
               job_posts_per_year, trial_days, support_level, features,
               is_active, is_popular, created_at, updated_at
        FROM pricing_plans
        WHERE is_active = TRUE
        ORDER BY monthly_price_cents
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_by_tier(pool: &PgPool, tier: PlanTier) -> Result<Option<PricingPlan>, sqlx::Error> {
    sqlx::query_as::<_, PricingPlan>(
        r#"
        SELECT id, name, tier, description, monthly_price_cents, yearly_price_cents,
               job_posts_per_year, trial_days, support_level, features,
               is_active, is_popular, created_at, updated_at
        FROM pricing_plans
        WHERE tier = $1
        "#,
    )
    .bind(tier)
    .fetch_optional(pool)
    .await
}

/// Insert the plan, or update the existing plan of the same tier in place.
/// `id` is only used for a fresh insert.
pub async fn upsert(pool: &PgPool, plan: &UpsertPlan<'_>) -> Result<PricingPlan, sqlx::Error> {
    sqlx::query_as::<_, PricingPlan>(
        r#"
        INSERT INTO pricing_plans (id, name, tier, description, monthly_price_cents,
                                   yearly_price_cents, job_posts_per_year, trial_days,
                                   support_level, features, is_popular)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (tier) DO UPDATE
        SET name = EXCLUDED.name,
            description = EXCLUDED.description,
            monthly_price_cents = EXCLUDED.monthly_price_cents,
            yearly_price_cents = EXCLUDED.yearly_price_cents,
            job_posts_per_year = EXCLUDED.job_posts_per_year,
            trial_days = EXCLUDED.trial_days,
            support_level = EXCLUDED.support_level,
            features = EXCLUDED.features,
            is_popular = EXCLUDED.is_popular,
            is_active = TRUE,
            updated_at = now()
        RETURNING id, name, tier, description, monthly_price_cents, yearly_price_cents,
                  job_posts_per_year, trial_days, support_level, features,
                  is_active, is_popular, created_at, updated_at
        "#,
    )
    .bind(plan.id)
    .bind(plan.name)
    .bind(plan.tier)
    .bind(plan.description)
    .bind(plan.monthly_price_cents)
    .bind(plan.yearly_price_cents)
    .bind(plan.job_posts_per_year)
    .bind(plan.trial_days)
    .bind(plan.support_level)
    .bind(Json(plan.features))
    .bind(plan.is_popular)
    .fetch_one(pool)
    .await
}
