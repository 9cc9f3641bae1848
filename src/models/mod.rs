//! Data models representing stored entities and their wire views.

/// Account entity and profile views
pub mod account;
/// Immutable transfer ledger records
pub mod transfer;
