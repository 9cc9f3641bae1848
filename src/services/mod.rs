//! Business logic, one module per protocol area.

/// Account lifecycle, credentials, sessions, deposits
pub mod account_service;
/// Funds movement and statements
pub mod transfer_service;

use crate::AppState;
use crate::error::AppError;

/// Resolve a bearer token to its account identifier.
///
/// An unknown or revoked token is an authentication failure, never a
/// fault.
pub(crate) fn resolve_session(state: &AppState, token: &str) -> Result<String, AppError> {
    state
        .sessions
        .resolve(token)
        .ok_or(AppError::InvalidSession)
}
