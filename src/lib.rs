//! linebank - a line-delimited JSON banking server.
//!
//! Clients hold a persistent TCP connection, authenticate with CPF and
//! password, and issue operations (create account, deposit, transfer,
//! read statement) as one JSON object per line; every request is answered
//! with exactly one envelope line.
//!
//! # Architecture
//!
//! - **Transport**: tokio TCP, one task per connection, strict
//!   request/response alternation
//! - **Routing**: a tagged `Request` enum is the schema gate; the router
//!   is a pure dispatch table
//! - **State**: session tokens in a concurrent map, balances behind the
//!   `BankStore` port (PostgreSQL via sqlx, or in-memory)
//! - **Money**: exact `Decimal` arithmetic; debit + credit + ledger append
//!   execute as one atomic unit

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod protocol;
pub mod router;
pub mod server;
pub mod services;
pub mod session;
pub mod store;

use std::sync::Arc;

use crate::session::SessionAuthority;
use crate::store::BankStore;

/// Shared handles reachable from every connection task.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BankStore>,
    pub sessions: Arc<SessionAuthority>,
}

impl AppState {
    pub fn new(store: Arc<dyn BankStore>) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionAuthority::new()),
        }
    }
}
