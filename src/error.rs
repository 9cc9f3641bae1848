//! Error types and response-envelope conversion.
//!
//! This module defines all application errors and how they are converted
//! into wire response envelopes with `status:false` and a descriptive `info`.

use crate::protocol::Response;

/// Application-wide error type.
///
/// Each variant corresponds to one failure class of the protocol:
///
/// - **Protocol / Validation**: the line never reached a service
/// - **Authentication / Session**: bad credentials or dead token
/// - **Not found / Conflict**: missing accounts, duplicates, self-transfer
/// - **Business rules**: invalid amounts, insufficient funds
/// - **Persistence**: the backing store failed; details are logged, never
///   sent to the client
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Peer sent a line that is not a JSON object at all.
    #[error("Requisição não é um JSON válido: {0}")]
    Protocol(String),

    /// Message is valid JSON but fails the per-operation schema
    /// (missing field, wrong type, bad date format).
    #[error("Requisição malformada: {0}")]
    Validation(String),

    /// The `operacao` value is not one of the recognized operations.
    #[error("Operação do cliente desconhecida ou não suportada: {0}")]
    UnsupportedOperation(String),

    /// CPF or password is wrong. Constant shape on purpose: the client
    /// cannot tell which of the two failed.
    #[error("CPF ou senha inválidos.")]
    InvalidCredentials,

    /// Token is missing from the session map (never issued or revoked).
    #[error("Token inválido ou sessão expirada.")]
    InvalidSession,

    /// The authenticated account's backing record is gone.
    #[error("Usuário não encontrado.")]
    AccountNotFound,

    /// Transfer destination does not exist.
    #[error("Usuário de destino não encontrado.")]
    DestinationNotFound,

    /// `usuario_criar` with a CPF that already exists.
    #[error("CPF já cadastrado.")]
    DuplicateAccount,

    /// Transfer where sender and destination are the same account.
    #[error("Não é possível enviar dinheiro para si mesmo.")]
    SelfTransfer,

    /// Deposit or transfer amount is zero or negative.
    #[error("O valor deve ser positivo.")]
    InvalidAmount,

    /// Sender balance is below the transfer amount.
    #[error("Saldo insuficiente.")]
    InsufficientFunds,

    /// `usuario_atualizar` with neither a new name nor a new password.
    #[error("Nenhum campo para atualizar.")]
    NoFieldsProvided,

    /// Store unreachable or a write failed. Wraps any sqlx::Error via
    /// `#[from]`; surfaced to the client as a generic failure.
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl AppError {
    /// Whether this error is an internal fault that should be logged at
    /// error level with full detail.
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Persistence(_))
    }

    /// The `info` string sent to the client, in the protocol's Portuguese.
    /// Internal errors are replaced by a generic message so store details
    /// never leak onto the wire.
    pub fn client_info(&self) -> String {
        match self {
            AppError::Persistence(_) => "Erro interno do servidor.".to_string(),
            other => other.to_string(),
        }
    }

    /// Convert this error into a `status:false` envelope echoing `operacao`.
    pub fn into_response(self, operation: &str) -> Response {
        Response::failure(operation, self.client_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_detail_never_reaches_the_client() {
        let err = AppError::Persistence(sqlx::Error::PoolClosed);
        assert!(err.is_internal());
        assert_eq!(err.client_info(), "Erro interno do servidor.");
    }

    #[test]
    fn domain_errors_speak_the_protocols_portuguese() {
        assert_eq!(AppError::InsufficientFunds.client_info(), "Saldo insuficiente.");
        assert_eq!(
            AppError::InvalidSession.client_info(),
            "Token inválido ou sessão expirada."
        );
        assert!(!AppError::InvalidSession.is_internal());
    }
}
