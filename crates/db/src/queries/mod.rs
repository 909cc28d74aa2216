pub mod jobs;
pub mod plans;
pub mod subscriptions;
pub mod webhook_events;
