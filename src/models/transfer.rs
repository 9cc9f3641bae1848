//! Transfer ledger records and statement views.
//!
//! This module defines:
//! - `TransferRecord`: one immutable funds movement between two accounts
//! - `TransferView`: the `transacoes[]` element of `transacao_ler`
//! - `TransferKind`: how a record reads from one account's point of view

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::account::PartyView;

/// One funds movement, appended to the ledger and never edited or deleted.
///
/// A deposit is a transfer where sender == receiver, which is how
/// statements distinguish it from peer-to-peer movements.
///
/// Both parties' display names are captured at execution time. Account
/// deletion does not cascade into the ledger, so a statement must still
/// render both sides after one party is gone.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransferRecord {
    /// Store-assigned identifier, ascending in insertion order
    pub id: i64,
    pub sender_cpf: String,
    pub sender_name: String,
    pub receiver_cpf: String,
    pub receiver_name: String,
    /// Positive amount moved
    pub amount: Decimal,
    /// Execution timestamp, UTC
    pub created_at: DateTime<Utc>,
}

/// How a transfer reads relative to one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// sender == receiver
    Deposit,
    /// the account is the receiver of someone else's funds
    Received,
    /// the account is the sender
    Sent,
}

impl TransferRecord {
    /// Classify this record from `cpf`'s point of view.
    ///
    /// Callers are expected to pass a CPF that is one of the two parties;
    /// anything else reads as `Received` only when it matches the receiver,
    /// which cannot happen for statement rows.
    pub fn kind_for(&self, cpf: &str) -> TransferKind {
        if self.sender_cpf == self.receiver_cpf {
            TransferKind::Deposit
        } else if self.sender_cpf == cpf {
            TransferKind::Sent
        } else {
            TransferKind::Received
        }
    }
}

/// One `transacoes[]` element:
/// `{id, valor_enviado, criado_em, usuario_enviador{nome,cpf},
/// usuario_recebedor{nome,cpf}}`.
///
/// `valor_enviado` serializes as a JSON number, same as `saldo`.
#[derive(Debug, Serialize)]
pub struct TransferView {
    pub id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor_enviado: Decimal,
    pub criado_em: DateTime<Utc>,
    pub usuario_enviador: PartyView,
    pub usuario_recebedor: PartyView,
}

impl From<TransferRecord> for TransferView {
    fn from(record: TransferRecord) -> Self {
        Self {
            id: record.id,
            valor_enviado: record.amount,
            criado_em: record.created_at,
            usuario_enviador: PartyView {
                nome: record.sender_name,
                cpf: record.sender_cpf,
            },
            usuario_recebedor: PartyView {
                nome: record.receiver_name,
                cpf: record.receiver_cpf,
            },
        }
    }
}
