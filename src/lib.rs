//! # Sessiongate: Database Session Gateway
//!
//! Sessiongate is a thin layer over Diesel and r2d2 that turns a connection string into
//! a pooled engine, hands out sessions with a guaranteed release, and wraps batches of
//! work in a begin/commit/rollback envelope.
//!
//! ## Features
//!
//! - **Explicit gateway**: no global engine; a [`Gateway`] is built once and passed around
//! - **Scoped sessions**: [`SessionFactory::get_db`] guard and [`SessionFactory::scoped`]
//!   close the session on every exit path
//! - **Atomic processing**: [`AtomicProcessor`] commits all operations or none and
//!   returns the failing operation's error unchanged
//! - **Configuration**: `DATABASE_URL` plus optional pool tuning from the environment,
//!   `.env`, or a YAML file
//!
//! ## Example
//!
//! ```ignore
//! use sessiongate::{Gateway, GatewayError, Statement};
//!
//! let gateway: Gateway = Gateway::from_env()?;
//!
//! gateway.process_atomically::<_, _, GatewayError>(vec![
//!     Statement::new("INSERT INTO accounts (id, balance) VALUES (1, 100)"),
//!     Statement::new("INSERT INTO ledger (account_id, delta) VALUES (1, 100)"),
//! ])?;
//!
//! gateway.shutdown();
//! ```

// Core modules
pub mod config;
pub mod error;

// Engine, sessions and transactions
pub mod gateway;

// Re-export key types
pub use config::{PoolConfig, Settings};
pub use error::{ConfigError, GatewayError};
pub use gateway::{
    AtomicProcessor, DbConnection, Engine, Gateway, Operation, PoolStatus, ScopedSession, Session,
    SessionFactory, Statement, Transactional,
};
