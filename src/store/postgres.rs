//! Durable PostgreSQL backend.
//!
//! All balance mutations run inside SQL transactions with `SELECT ... FOR
//! UPDATE` row locks, so the database ensures all-or-nothing execution of
//! the debit + credit + ledger append unit. Rows are locked in sorted CPF
//! order; two opposite transfers between the same pair then queue instead
//! of deadlocking.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Postgres;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::account::Account;
use crate::models::transfer::TransferRecord;

use super::BankStore;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Lock one account row for the rest of the enclosing transaction,
/// returning its display name and balance.
async fn lock_account(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    cpf: &str,
) -> Result<Option<(String, Decimal)>, sqlx::Error> {
    sqlx::query_as::<_, (String, Decimal)>(
        "SELECT name, balance FROM accounts WHERE cpf = $1 FOR UPDATE",
    )
    .bind(cpf)
    .fetch_optional(&mut **tx)
    .await
}

#[async_trait]
impl BankStore for PgStore {
    async fn find_account(&self, cpf: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT cpf, name, secret, balance FROM accounts WHERE cpf = $1",
        )
        .bind(cpf)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn insert_account(&self, account: Account) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT INTO accounts (cpf, name, secret, balance) VALUES ($1, $2, $3, $4)",
        )
        .bind(&account.cpf)
        .bind(&account.name)
        .bind(&account.secret)
        .bind(account.balance)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // The primary key is the atomic existence check: concurrent
            // creations of one CPF serialize on the unique constraint.
            Err(err)
                if err
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                Err(AppError::DuplicateAccount)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update_profile(
        &self,
        cpf: &str,
        name: Option<&str>,
        secret: Option<&str>,
    ) -> Result<bool, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET name = COALESCE($1, name),
                secret = COALESCE($2, secret)
            WHERE cpf = $3
            "#,
        )
        .bind(name)
        .bind(secret)
        .bind(cpf)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn delete_account(&self, cpf: &str) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM accounts WHERE cpf = $1")
            .bind(cpf)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn deposit(&self, cpf: &str, amount: Decimal) -> Result<Decimal, AppError> {
        // A single UPDATE is the serialized read-modify-write; concurrent
        // deposits queue on the row lock and none are lost.
        let balance: Option<Decimal> = sqlx::query_scalar(
            "UPDATE accounts SET balance = balance + $1 WHERE cpf = $2 RETURNING balance",
        )
        .bind(amount)
        .bind(cpf)
        .fetch_optional(&self.pool)
        .await?;

        balance.ok_or(AppError::AccountNotFound)
    }

    async fn transfer(
        &self,
        sender_cpf: &str,
        receiver_cpf: &str,
        amount: Decimal,
    ) -> Result<TransferRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock both rows in sorted key order regardless of direction.
        let (sender_row, receiver_row) = if sender_cpf <= receiver_cpf {
            let s = lock_account(&mut tx, sender_cpf).await?;
            let r = lock_account(&mut tx, receiver_cpf).await?;
            (s, r)
        } else {
            let r = lock_account(&mut tx, receiver_cpf).await?;
            let s = lock_account(&mut tx, sender_cpf).await?;
            (s, r)
        };

        let Some((sender_name, sender_balance)) = sender_row else {
            tx.rollback().await?;
            return Err(AppError::AccountNotFound);
        };
        let Some((receiver_name, _)) = receiver_row else {
            tx.rollback().await?;
            return Err(AppError::DestinationNotFound);
        };
        if sender_balance < amount {
            tx.rollback().await?;
            return Err(AppError::InsufficientFunds);
        }

        sqlx::query("UPDATE accounts SET balance = balance - $1 WHERE cpf = $2")
            .bind(amount)
            .bind(sender_cpf)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE cpf = $2")
            .bind(amount)
            .bind(receiver_cpf)
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, TransferRecord>(
            r#"
            INSERT INTO transfers (sender_cpf, sender_name, receiver_cpf, receiver_name, amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, sender_cpf, sender_name, receiver_cpf, receiver_name, amount, created_at
            "#,
        )
        .bind(sender_cpf)
        .bind(&sender_name)
        .bind(receiver_cpf)
        .bind(&receiver_name)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        // Both balance updates and the ledger append land together or
        // not at all.
        tx.commit().await?;

        Ok(record)
    }

    async fn transfers_for(&self, cpf: &str) -> Result<Vec<TransferRecord>, AppError> {
        let records = sqlx::query_as::<_, TransferRecord>(
            r#"
            SELECT id, sender_cpf, sender_name, receiver_cpf, receiver_name, amount, created_at
            FROM transfers
            WHERE sender_cpf = $1 OR receiver_cpf = $1
            ORDER BY id ASC
            "#,
        )
        .bind(cpf)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
