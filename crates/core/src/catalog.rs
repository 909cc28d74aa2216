use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::store::{PlanCatalog, StoreResult};
use crate::types::{NewPricingPlan, PlanTier, PricingPlan};

/// The three plans the product ships with. Prices are in cents.
pub fn default_plans() -> Vec<NewPricingPlan> {
    vec![
        NewPricingPlan {
            name: "Starter".to_string(),
            tier: PlanTier::Starter,
            description: "Perfect for small businesses".to_string(),
            monthly_price_cents: 18231,
            yearly_price_cents: 218777,
            job_posts_per_year: 36,
            trial_days: 7,
            support_level: "email".to_string(),
            features: features(&[
                "36 job posts per year",
                "Priority email support",
                "Advanced analytics",
                "7-day free trial (1 job post)",
            ]),
            is_popular: false,
        },
        NewPricingPlan {
            name: "Standard".to_string(),
            tier: PlanTier::Standard,
            description: "Perfect for growing teams".to_string(),
            monthly_price_cents: 24666,
            yearly_price_cents: 295992,
            job_posts_per_year: 120,
            trial_days: 7,
            support_level: "email".to_string(),
            features: features(&[
                "120 job posts per year",
                "Priority email support",
                "Advanced analytics",
                "Team collaboration tools",
                "7-day free trial (1 job post)",
            ]),
            is_popular: true,
        },
        NewPricingPlan {
            name: "Enterprise".to_string(),
            tier: PlanTier::Enterprise,
            description: "Perfect for large organizations".to_string(),
            monthly_price_cents: 34318,
            yearly_price_cents: 411815,
            job_posts_per_year: 360,
            trial_days: 7,
            support_level: "email".to_string(),
            features: features(&[
                "360 job posts per year",
                "Priority email support",
                "Advanced analytics",
                "Team collaboration tools",
                "7-day free trial (1 job post)",
            ]),
            is_popular: false,
        },
    ]
}

fn features(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Upsert the default plans, keyed by tier.
pub async fn seed_default_plans(catalog: &Arc<dyn PlanCatalog>) -> StoreResult<Vec<PricingPlan>> {
    let mut plans = Vec::new();
    for plan in default_plans() {
        plans.push(catalog.upsert_plan(&plan).await?);
    }
    info!(count = plans.len(), "pricing catalog seeded");
    Ok(plans)
}

pub fn yearly_savings_cents(monthly_price_cents: i64, yearly_price_cents: i64) -> i64 {
    monthly_price_cents * 12 - yearly_price_cents
}

/// Whole-percent savings of paying yearly over twelve monthly payments.
pub fn yearly_savings_percentage(monthly_price_cents: i64, yearly_price_cents: i64) -> i64 {
    let twelve_months = monthly_price_cents * 12;
    if twelve_months <= 0 {
        return 0;
    }
    let savings = yearly_savings_cents(monthly_price_cents, yearly_price_cents) as f64;
    (savings / twelve_months as f64 * 100.0).round() as i64
}

/// `18231` -> `"$182.31"`, `218777` -> `"$2,187.77"`.
pub fn format_usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanOffer {
    pub id: String,
    pub name: String,
    pub plan_type: PlanTier,
    pub description: String,
    pub monthly_price: f64,
    pub yearly_price: f64,
    pub monthly_price_formatted: String,
    pub yearly_price_formatted: String,
    pub yearly_savings: String,
    pub yearly_savings_amount: f64,
    pub job_posts_per_year: i32,
    pub trial_days: i32,
    pub support_level: String,
    pub features: Vec<String>,
    pub is_popular: bool,
}

impl From<&PricingPlan> for PlanOffer {
    fn from(plan: &PricingPlan) -> Self {
        let savings_pct = yearly_savings_percentage(plan.monthly_price_cents, plan.yearly_price_cents);
        let savings = yearly_savings_cents(plan.monthly_price_cents, plan.yearly_price_cents);
        Self {
            id: plan.id.clone(),
            name: plan.name.clone(),
            plan_type: plan.tier,
            description: plan.description.clone(),
            monthly_price: plan.monthly_price_cents as f64 / 100.0,
            yearly_price: plan.yearly_price_cents as f64 / 100.0,
            monthly_price_formatted: format!("{}/month", format_usd(plan.monthly_price_cents)),
            yearly_price_formatted: format!("{} a year", format_usd(plan.yearly_price_cents)),
            yearly_savings: format!("Save {savings_pct}%"),
            yearly_savings_amount: savings as f64 / 100.0,
            job_posts_per_year: plan.job_posts_per_year,
            trial_days: plan.trial_days,
            support_level: plan.support_level.clone(),
            features: plan.features.clone(),
            is_popular: plan.is_popular,
        }
    }
}
