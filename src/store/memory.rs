//! Volatile in-memory backend.
//!
//! Used when no `DATABASE_URL` is configured and throughout the test
//! suite. The whole account map sits behind one `tokio::sync::RwLock`
//! write guard during balance mutations; that single critical section is
//! the per-account serialization mechanism, so concurrent deposits and
//! transfers can never interleave mid-update. Lock order is always
//! accounts before ledger.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::account::Account;
use crate::models::transfer::TransferRecord;

use super::BankStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Account>>,
    ledger: RwLock<Vec<TransferRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BankStore for MemoryStore {
    async fn find_account(&self, cpf: &str) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.read().await.get(cpf).cloned())
    }

    async fn insert_account(&self, account: Account) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        match accounts.entry(account.cpf.clone()) {
            Entry::Occupied(_) => Err(AppError::DuplicateAccount),
            Entry::Vacant(slot) => {
                slot.insert(account);
                Ok(())
            }
        }
    }

    async fn update_profile(
        &self,
        cpf: &str,
        name: Option<&str>,
        secret: Option<&str>,
    ) -> Result<bool, AppError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(cpf) else {
            return Ok(false);
        };
        if let Some(name) = name {
            account.name = name.to_string();
        }
        if let Some(secret) = secret {
            account.secret = secret.to_string();
        }
        Ok(true)
    }

    async fn delete_account(&self, cpf: &str) -> Result<bool, AppError> {
        Ok(self.accounts.write().await.remove(cpf).is_some())
    }

    async fn deposit(&self, cpf: &str, amount: Decimal) -> Result<Decimal, AppError> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(cpf) else {
            return Err(AppError::AccountNotFound);
        };
        account.balance += amount;
        Ok(account.balance)
    }

    async fn transfer(
        &self,
        sender_cpf: &str,
        receiver_cpf: &str,
        amount: Decimal,
    ) -> Result<TransferRecord, AppError> {
        let mut accounts = self.accounts.write().await;
        let sender = accounts
            .get(sender_cpf)
            .cloned()
            .ok_or(AppError::AccountNotFound)?;
        let receiver = accounts
            .get(receiver_cpf)
            .cloned()
            .ok_or(AppError::DestinationNotFound)?;
        if sender.balance < amount {
            return Err(AppError::InsufficientFunds);
        }

        // Both parties exist and the sender is funded; apply both sides
        // before the write guard is released.
        if let Some(s) = accounts.get_mut(sender_cpf) {
            s.balance -= amount;
        }
        if let Some(r) = accounts.get_mut(receiver_cpf) {
            r.balance += amount;
        }

        let mut ledger = self.ledger.write().await;
        let record = TransferRecord {
            id: ledger.len() as i64 + 1,
            sender_cpf: sender.cpf,
            sender_name: sender.name,
            receiver_cpf: receiver.cpf,
            receiver_name: receiver.name,
            amount,
            created_at: Utc::now(),
        };
        ledger.push(record.clone());
        Ok(record)
    }

    async fn transfers_for(&self, cpf: &str) -> Result<Vec<TransferRecord>, AppError> {
        Ok(self
            .ledger
            .read()
            .await
            .iter()
            .filter(|r| r.sender_cpf == cpf || r.receiver_cpf == cpf)
            .cloned()
            .collect())
    }
}
