//! Session: one pooled connection used as a unit of work.
//!
//! Sessions start outside of any transaction (autocommit off at the gateway level:
//! nothing is grouped until [`Session::begin`] is called). At most one transaction is
//! active per session. Closing a session rolls back an open transaction and returns
//! the connection to the pool.

use diesel::connection::TransactionManager;
use diesel::r2d2::R2D2Connection;
use diesel::Connection;
use uuid::Uuid;

use super::engine::{DbConnection, PooledConnection};
use super::processor::Transactional;
use crate::error::GatewayError;

pub struct Session<C = DbConnection>
where
    C: R2D2Connection + Send + 'static,
{
    id: Uuid,
    conn: Option<PooledConnection<C>>,
    in_transaction: bool,
}

impl<C> Session<C>
where
    C: R2D2Connection + Send + 'static,
{
    /// Wrap a connection checked out of an engine's pool
    pub fn from_connection(conn: PooledConnection<C>) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session_id = %id, "Session opened");
        Session {
            id,
            conn: Some(conn),
            in_transaction: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// Mutable access to the underlying Diesel connection
    pub fn connection(&mut self) -> Result<&mut C, GatewayError> {
        self.conn.as_deref_mut().ok_or(GatewayError::SessionClosed)
    }

    /// Execute one or more raw SQL statements
    pub fn batch_execute(&mut self, sql: &str) -> Result<(), GatewayError> {
        self.connection()?.batch_execute(sql)?;
        Ok(())
    }

    pub fn begin(&mut self) -> Result<(), GatewayError> {
        if self.in_transaction {
            return Err(GatewayError::TransactionAlreadyActive);
        }
        let conn = self.connection()?;
        <C::TransactionManager as TransactionManager<C>>::begin_transaction(conn)?;
        self.in_transaction = true;
        tracing::debug!(session_id = %self.id, "Transaction started");
        Ok(())
    }

    pub fn commit(&mut self) -> Result<(), GatewayError> {
        if !self.in_transaction {
            return Err(GatewayError::NoActiveTransaction);
        }
        let conn = self.connection()?;
        let result = <C::TransactionManager as TransactionManager<C>>::commit_transaction(conn);
        self.in_transaction = match result {
            Ok(()) => false,
            Err(_) => backend_in_transaction(conn),
        };
        result?;
        tracing::debug!(session_id = %self.id, "Transaction committed");
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<(), GatewayError> {
        if !self.in_transaction {
            return Err(GatewayError::NoActiveTransaction);
        }
        let conn = self.connection()?;
        // A failed commit may already have ended the transaction on the backend
        if !backend_in_transaction(conn) {
            self.in_transaction = false;
            tracing::debug!(session_id = %self.id, "Transaction already ended by backend");
            return Ok(());
        }
        let result = <C::TransactionManager as TransactionManager<C>>::rollback_transaction(conn);
        self.in_transaction = match result {
            Ok(()) => false,
            Err(_) => backend_in_transaction(conn),
        };
        result?;
        tracing::debug!(session_id = %self.id, "Transaction rolled back");
        Ok(())
    }

    /// Release the session.
    ///
    /// An open transaction is rolled back first. The connection goes back to the pool
    /// even when that rollback fails. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), GatewayError> {
        if self.conn.is_none() {
            return Ok(());
        }
        let rollback = if self.in_transaction {
            self.rollback()
        } else {
            Ok(())
        };
        self.in_transaction = false;
        self.conn = None;
        tracing::debug!(session_id = %self.id, "Session closed");
        rollback
    }
}

impl<C> Drop for Session<C>
where
    C: R2D2Connection + Send + 'static,
{
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(session_id = %self.id, "Failed to close session cleanly: {}", e);
        }
    }
}

impl<C> Transactional for Session<C>
where
    C: R2D2Connection + Send + 'static,
{
    type Error = GatewayError;

    fn begin(&mut self) -> Result<(), GatewayError> {
        Session::begin(self)
    }

    fn commit(&mut self) -> Result<(), GatewayError> {
        Session::commit(self)
    }

    fn rollback(&mut self) -> Result<(), GatewayError> {
        Session::rollback(self)
    }
}

fn backend_in_transaction<C: Connection>(conn: &mut C) -> bool {
    matches!(
        <C::TransactionManager as TransactionManager<C>>::transaction_manager_status_mut(conn)
            .transaction_depth(),
        Ok(Some(_))
    )
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::gateway::Engine;
    use diesel::sqlite::SqliteConnection;

    fn memory_session() -> Session<SqliteConnection> {
        let config = PoolConfig {
            max_connections: 1,
            min_idle: 0,
            ..PoolConfig::default()
        };
        let engine = Engine::<SqliteConnection>::new_with_config(":memory:", &config).unwrap();
        Session::from_connection(engine.checkout().unwrap())
    }

    #[test]
    fn test_begin_commit_cycle() {
        let mut session = memory_session();
        assert!(!session.in_transaction());

        session.begin().unwrap();
        assert!(session.in_transaction());
        session.batch_execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();
        session.commit().unwrap();
        assert!(!session.in_transaction());
    }

    #[test]
    fn test_single_active_transaction() {
        let mut session = memory_session();
        session.begin().unwrap();

        let err = session.begin().unwrap_err();
        assert!(matches!(err, GatewayError::TransactionAlreadyActive));
        assert!(session.in_transaction());

        session.rollback().unwrap();
        session.begin().unwrap();
        session.commit().unwrap();
    }

    #[test]
    fn test_commit_and_rollback_require_transaction() {
        let mut session = memory_session();
        assert!(matches!(session.commit().unwrap_err(), GatewayError::NoActiveTransaction));
        assert!(matches!(session.rollback().unwrap_err(), GatewayError::NoActiveTransaction));
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let mut session = memory_session();
        session.begin().unwrap();
        session.close().unwrap();

        assert!(session.is_closed());
        assert!(!session.in_transaction());
        assert!(matches!(session.begin().unwrap_err(), GatewayError::SessionClosed));
        assert!(matches!(session.batch_execute("SELECT 1").unwrap_err(), GatewayError::SessionClosed));
        session.close().unwrap();
    }
}
