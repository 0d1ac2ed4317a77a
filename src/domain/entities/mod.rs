pub mod account;
pub mod billing_event;
pub mod entitlement;
pub mod subscription_status;
pub mod tier;
