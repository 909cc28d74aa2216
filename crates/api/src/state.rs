use hirewire_core::clock::Clock;
use hirewire_core::config::Settings;
use hirewire_core::entitlement::EntitlementService;
use hirewire_core::store::{JobPublicationStore, PlanCatalog, SubscriptionStore, WebhookEventStore};
use hirewire_core::webhook::WebhookService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub plans: Arc<dyn PlanCatalog>,
    pub entitlements: EntitlementService,
    pub webhooks: WebhookService,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        plans: Arc<dyn PlanCatalog>,
        subscriptions: Arc<dyn SubscriptionStore>,
        events: Arc<dyn WebhookEventStore>,
        jobs: Arc<dyn JobPublicationStore>,
        clock: Arc<dyn Clock>,
        settings: Settings,
    ) -> Self {
        Self {
            plans,
            entitlements: EntitlementService::new(subscriptions, clock.clone()),
            webhooks: WebhookService::new(events, jobs, clock),
            settings: Arc::new(settings),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestId(pub String);
