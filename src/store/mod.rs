//! Persistence port and its backends.
//!
//! `BankStore` is the narrow repository interface the services talk to:
//! find/insert/update/delete by primary key, plus the two operations that
//! must be atomic units (deposit and transfer). Each backend provides its
//! own serialization mechanism for balances: row locks inside a SQL
//! transaction for Postgres, an exclusive in-process critical section for
//! the memory backend. Callers never see a lost update or a transient
//! negative balance.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::AppError;
use crate::models::account::Account;
use crate::models::transfer::TransferRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage abstraction shared by every connection task.
#[async_trait]
pub trait BankStore: Send + Sync {
    /// Fetch one account by its CPF.
    async fn find_account(&self, cpf: &str) -> Result<Option<Account>, AppError>;

    /// Insert a new account.
    ///
    /// Uniqueness of the CPF is enforced inside the store, so two
    /// concurrent inserts of the same identifier cannot both succeed;
    /// the loser gets `DuplicateAccount`.
    async fn insert_account(&self, account: Account) -> Result<(), AppError>;

    /// Apply the provided profile fields, leaving the balance untouched.
    /// Returns false if the account does not exist.
    async fn update_profile(
        &self,
        cpf: &str,
        name: Option<&str>,
        secret: Option<&str>,
    ) -> Result<bool, AppError>;

    /// Remove the account record. Transfer history is retained.
    /// Returns false if the account does not exist.
    async fn delete_account(&self, cpf: &str) -> Result<bool, AppError>;

    /// Atomically increase the balance, returning the new balance.
    ///
    /// The read-modify-write is serialized per account, so concurrent
    /// deposits never lose updates. The caller has already validated that
    /// `amount` is positive. Fails with `AccountNotFound` if the account
    /// vanished.
    async fn deposit(&self, cpf: &str, amount: Decimal) -> Result<Decimal, AppError>;

    /// Atomically debit the sender, credit the receiver, and append the
    /// ledger record: either all three persist or none do.
    ///
    /// Fails with `AccountNotFound` / `DestinationNotFound` for a missing
    /// party and `InsufficientFunds` when the sender cannot cover the
    /// amount; in every failure case both balances are untouched and
    /// nothing is appended.
    async fn transfer(
        &self,
        sender_cpf: &str,
        receiver_cpf: &str,
        amount: Decimal,
    ) -> Result<TransferRecord, AppError>;

    /// Every ledger record where `cpf` is sender or receiver, in insertion
    /// order (store-assigned id ascending).
    async fn transfers_for(&self, cpf: &str) -> Result<Vec<TransferRecord>, AppError>;
}
