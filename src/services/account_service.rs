//! Account service - lifecycle, credentials, and deposits.
//!
//! Balance changes go through the store's atomic deposit primitive; this
//! layer never writes a balance field directly.

use rust_decimal::Decimal;

use crate::AppState;
use crate::error::AppError;
use crate::models::account::{Account, AccountView};

use super::resolve_session;

/// Create a new account with a zero balance.
///
/// # Errors
///
/// - `DuplicateAccount`: the CPF already exists. The store's uniqueness
///   constraint is the existence check, so two concurrent creations of
///   the same CPF cannot both succeed.
pub async fn create_account(
    state: &AppState,
    nome: &str,
    cpf: &str,
    senha: &str,
) -> Result<(), AppError> {
    state
        .store
        .insert_account(Account::new(nome, cpf, senha))
        .await?;
    tracing::info!(cpf, "account created");
    Ok(())
}

/// Check credentials and return the account.
///
/// # Errors
///
/// - `InvalidCredentials`: unknown CPF or wrong password. The failure is
///   identical in both cases so the caller cannot probe which one it was.
pub async fn authenticate(state: &AppState, cpf: &str, senha: &str) -> Result<Account, AppError> {
    match state.store.find_account(cpf).await? {
        Some(account) if account.secret == senha => Ok(account),
        _ => Err(AppError::InvalidCredentials),
    }
}

/// Authenticate and open a session, returning the bearer token.
pub async fn login(state: &AppState, cpf: &str, senha: &str) -> Result<String, AppError> {
    let account = authenticate(state, cpf, senha).await?;
    let token = state.sessions.create_session(&account.cpf);
    tracing::info!(cpf = account.cpf, live = state.sessions.live_count(), "login");
    Ok(token)
}

/// Close a session. Always succeeds; revoking an already-dead token is a
/// no-op, matching the authority's idempotent revoke.
pub fn logout(state: &AppState, token: &str) {
    state.sessions.revoke(token);
}

/// Read the authenticated account's profile and balance.
///
/// # Errors
///
/// - `InvalidSession`: token does not resolve
/// - `AccountNotFound`: the backing record vanished between session
///   creation and this read (e.g., concurrently deleted)
pub async fn read_account(state: &AppState, token: &str) -> Result<AccountView, AppError> {
    let cpf = resolve_session(state, token)?;
    state
        .store
        .find_account(&cpf)
        .await?
        .map(AccountView::from)
        .ok_or(AppError::AccountNotFound)
}

/// Deposit `amount` into the authenticated account.
///
/// # Errors
///
/// - `InvalidSession`: token does not resolve
/// - `InvalidAmount`: amount is zero or negative
/// - `AccountNotFound`: the backing record vanished
pub async fn deposit(state: &AppState, token: &str, amount: Decimal) -> Result<(), AppError> {
    let cpf = resolve_session(state, token)?;
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidAmount);
    }
    let balance = state.store.deposit(&cpf, amount).await?;
    tracing::info!(cpf, %amount, %balance, "deposit applied");
    Ok(())
}

/// Apply the provided profile fields, leaving balance and CPF untouched.
///
/// # Errors
///
/// - `InvalidSession`: token does not resolve
/// - `NoFieldsProvided`: neither name nor password was given
/// - `Validation`: a provided field is empty
/// - `AccountNotFound`: the backing record vanished
pub async fn update_account(
    state: &AppState,
    token: &str,
    nome: Option<&str>,
    senha: Option<&str>,
) -> Result<(), AppError> {
    let cpf = resolve_session(state, token)?;
    if nome.is_none() && senha.is_none() {
        return Err(AppError::NoFieldsProvided);
    }
    for (field, value) in [("nome", nome), ("senha", senha)] {
        if value.is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "o campo {field} não pode ser vazio"
            )));
        }
    }
    if state.store.update_profile(&cpf, nome, senha).await? {
        Ok(())
    } else {
        Err(AppError::AccountNotFound)
    }
}

/// Delete the authenticated account and revoke all of its sessions.
///
/// Transfer history is retained: the ledger is an immutable log and may
/// reference accounts that no longer exist.
pub async fn delete_account(state: &AppState, token: &str) -> Result<(), AppError> {
    let cpf = resolve_session(state, token)?;
    if !state.store.delete_account(&cpf).await? {
        return Err(AppError::AccountNotFound);
    }
    state.sessions.revoke_account(&cpf);
    tracing::info!(cpf, "account deleted");
    Ok(())
}
