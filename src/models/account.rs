//! Account data model and wire views.
//!
//! This module defines:
//! - `Account`: stored entity keyed by CPF
//! - `AccountView`: the `usuario{nome,cpf,saldo}` object returned by
//!   `usuario_ler`

use rust_decimal::Decimal;
use serde::Serialize;

/// Represents an account record from the store.
///
/// # Invariants
///
/// - `cpf` is the immutable natural key
/// - `balance` is never negative at any observable point; it is only
///   mutated through the store's deposit and transfer operations, never
///   written directly by the service layer
///
/// # Balance Storage
///
/// Balances are `rust_decimal::Decimal` (NUMERIC in Postgres) so that
/// deposit/transfer arithmetic is exact. The wire carries plain JSON
/// numbers, matching the original protocol.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    /// Natural key identifying this account (unique, stable)
    pub cpf: String,

    /// Display name, mutable via `usuario_atualizar`
    pub name: String,

    /// Credential secret. Stored plaintext, as the original protocol
    /// defines; a known weakness outside the tested contract.
    pub secret: String,

    /// Current balance, non-negative
    pub balance: Decimal,
}

impl Account {
    /// A fresh account with a zero balance.
    pub fn new(name: impl Into<String>, cpf: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            cpf: cpf.into(),
            name: name.into(),
            secret: secret.into(),
            balance: Decimal::ZERO,
        }
    }
}

/// The `usuario` object embedded in the `usuario_ler` response.
///
/// The credential secret is deliberately absent. `saldo` goes out as a
/// plain JSON number, not the decimal's default string form; console
/// clients read it with a float parser.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub nome: String,
    pub cpf: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub saldo: Decimal,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            nome: account.name,
            cpf: account.cpf,
            saldo: account.balance,
        }
    }
}

/// One party of a transfer as rendered inside `transacoes[]` elements.
#[derive(Debug, Clone, Serialize)]
pub struct PartyView {
    pub nome: String,
    pub cpf: String,
}
