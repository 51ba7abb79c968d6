//! Gateway: the explicitly owned engine + session factory pair.
//!
//! Build one at startup and hand it (or clones of it) to the code that needs database
//! access. Dropping the last clone, or calling [`Gateway::shutdown`], tears the pool down.

use diesel::r2d2::R2D2Connection;

use super::engine::{DbConnection, Engine, PoolStatus};
use super::processor::{AtomicProcessor, Operation, Statement};
use super::scope::{ScopedSession, SessionFactory};
use super::session::Session;
use crate::config::Settings;
use crate::error::GatewayError;

pub struct Gateway<C = DbConnection>
where
    C: R2D2Connection + Send + 'static,
{
    sessions: SessionFactory<C>,
}

impl<C> Gateway<C>
where
    C: R2D2Connection + Send + 'static,
{
    /// Build the engine from `settings`
    pub fn connect(settings: &Settings) -> Result<Self, GatewayError> {
        let engine = Engine::from_settings(settings)?;
        Ok(Self::with_engine(engine))
    }

    /// Load settings from the environment (and `.env`) and connect
    pub fn from_env() -> Result<Self, GatewayError> {
        let settings = Settings::from_env()?;
        Self::connect(&settings)
    }

    pub fn with_engine(engine: Engine<C>) -> Self {
        Gateway {
            sessions: SessionFactory::new(engine),
        }
    }

    pub fn engine(&self) -> &Engine<C> {
        self.sessions.engine()
    }

    pub fn sessions(&self) -> &SessionFactory<C> {
        &self.sessions
    }

    pub fn get_db(&self) -> Result<ScopedSession<C>, GatewayError> {
        self.sessions.get_db()
    }

    pub fn scoped<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session<C>) -> Result<T, E>,
        E: From<GatewayError>,
    {
        self.sessions.scoped(f)
    }

    /// Apply `operations` atomically on a fresh scoped session
    pub fn process_atomically<I, O, E>(&self, operations: I) -> Result<bool, E>
    where
        I: IntoIterator<Item = O>,
        O: Operation<Session<C>, Error = E>,
        E: From<GatewayError> + std::fmt::Display,
    {
        self.scoped(|session| AtomicProcessor::new(session).process_with_rollback(operations))
    }

    /// Probe connectivity and report the pool state
    pub fn check(&self) -> Result<PoolStatus, GatewayError> {
        self.engine().test_connection()?;
        Ok(self.engine().state())
    }

    /// Apply a SQL script in one transaction.
    ///
    /// A blank script commits without doing anything.
    pub fn apply_script(&self, script: &str) -> Result<bool, GatewayError> {
        let statements = if script.trim().is_empty() {
            Vec::new()
        } else {
            vec![Statement::new(script)]
        };
        self.process_atomically(statements)
    }

    /// Release this handle on the pool.
    ///
    /// Connections close once every clone of the gateway and every open session is gone.
    pub fn shutdown(self) {
        let state = self.engine().state();
        tracing::info!(
            "Shutting down gateway for {} ({} connections, {} idle)",
            self.engine().url(),
            state.connections,
            state.idle_connections
        );
    }
}

impl<C> Clone for Gateway<C>
where
    C: R2D2Connection + Send + 'static,
{
    fn clone(&self) -> Self {
        Gateway {
            sessions: self.sessions.clone(),
        }
    }
}
