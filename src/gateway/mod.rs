//! Session gateway
//!
//! Pooled engine, session factory, scoped session acquisition and the atomic
//! begin/commit/rollback envelope, all on Diesel with r2d2 pooling.
//!
//! # Features
//!
//! - `sqlite` (default): bundled SQLite backend
//! - `postgres` / `mysql`: server backends; when several are enabled `DbConnection`
//!   resolves to postgres, then mysql

pub mod context;
pub mod engine;
pub mod processor;
pub mod scope;
pub mod session;

// Re-export key types
pub use context::Gateway;
pub use engine::{redact_url, DbConnection, Engine, Pool, PoolStatus, PooledConnection};
pub use processor::{AtomicProcessor, Operation, Statement, Transactional};
pub use scope::{ScopedSession, SessionFactory};
pub use session::Session;
