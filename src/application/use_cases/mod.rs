pub mod account;
pub mod entitlement;
pub mod registration;
pub mod webhook;
