//! Transfer service - funds movement and statement assembly.
//!
//! A transfer request moves through resolve -> validate -> execute; the
//! debit, credit, and ledger append are one atomic unit inside the store,
//! so a failure at any point leaves both balances untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::AppState;
use crate::error::AppError;
use crate::models::transfer::TransferView;

use super::resolve_session;

/// Move `valor` from the authenticated account to `cpf_destino`.
///
/// # Errors
///
/// - `InvalidSession`: token does not resolve
/// - `SelfTransfer`: destination equals the sender
/// - `InvalidAmount`: amount is zero or negative
/// - `AccountNotFound` / `DestinationNotFound`: a party is missing
/// - `InsufficientFunds`: sender balance below the amount
pub async fn transfer(
    state: &AppState,
    token: &str,
    cpf_destino: &str,
    valor: Decimal,
) -> Result<(), AppError> {
    let sender_cpf = resolve_session(state, token)?;
    if sender_cpf == cpf_destino {
        return Err(AppError::SelfTransfer);
    }
    if valor <= Decimal::ZERO {
        return Err(AppError::InvalidAmount);
    }

    let record = state.store.transfer(&sender_cpf, cpf_destino, valor).await?;
    tracing::info!(
        record_id = record.id,
        sender = sender_cpf,
        receiver = cpf_destino,
        %valor,
        "transfer recorded"
    );
    Ok(())
}

/// The authenticated account's statement: every record where it is sender
/// or receiver, in insertion order.
///
/// The closed interval `[start, end]` on the record timestamp is applied
/// only when both bounds are present; otherwise the full history is
/// returned, matching the original protocol's behavior.
pub async fn list_transfers(
    state: &AppState,
    token: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<TransferView>, AppError> {
    let cpf = resolve_session(state, token)?;
    let account = state
        .store
        .find_account(&cpf)
        .await?
        .ok_or(AppError::AccountNotFound)?;

    let mut records = state.store.transfers_for(&cpf).await?;
    if let (Some(start), Some(end)) = (start, end) {
        records.retain(|r| r.created_at >= start && r.created_at <= end);
    }

    for record in &records {
        tracing::debug!(
            cpf = account.cpf,
            record_id = record.id,
            kind = ?record.kind_for(&account.cpf),
            "statement row"
        );
    }

    Ok(records.into_iter().map(TransferView::from).collect())
}
