pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod entitlement;
pub mod memory;
pub mod store;
pub mod types;
pub mod webhook;
