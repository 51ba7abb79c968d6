//! Session factory and scoped session acquisition.

use diesel::r2d2::R2D2Connection;
use std::ops::{Deref, DerefMut};

use super::engine::{DbConnection, Engine};
use super::session::Session;
use crate::error::GatewayError;

/// Creates sessions bound to one engine
pub struct SessionFactory<C = DbConnection>
where
    C: R2D2Connection + Send + 'static,
{
    engine: Engine<C>,
}

impl<C> SessionFactory<C>
where
    C: R2D2Connection + Send + 'static,
{
    pub fn new(engine: Engine<C>) -> Self {
        SessionFactory { engine }
    }

    pub fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    /// Open a new session; the caller owns its lifetime
    pub fn open(&self) -> Result<Session<C>, GatewayError> {
        let conn = self.engine.checkout()?;
        Ok(Session::from_connection(conn))
    }

    /// Acquire a session that is closed when the returned guard goes out of scope.
    ///
    /// # Example
    /// ```ignore
    /// let mut db = factory.get_db()?;
    /// db.batch_execute("INSERT INTO audit (event) VALUES ('login')")?;
    /// // session closed here, also when `?` returns early
    /// ```
    pub fn get_db(&self) -> Result<ScopedSession<C>, GatewayError> {
        Ok(ScopedSession {
            session: self.open()?,
        })
    }

    /// Run `f` with a fresh session and close the session afterwards.
    ///
    /// The result of `f` is returned unchanged. If `f` succeeds but closing fails, the
    /// close error is returned; if both fail, `f`'s error wins.
    pub fn scoped<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session<C>) -> Result<T, E>,
        E: From<GatewayError>,
    {
        let mut session = self.open()?;
        let result = f(&mut session);
        let closed = session.close();

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(session_id = %session.id(), "Failed to close session: {}", close_err);
                Err(e)
            }
        }
    }
}

impl<C> Clone for SessionFactory<C>
where
    C: R2D2Connection + Send + 'static,
{
    fn clone(&self) -> Self {
        SessionFactory {
            engine: self.engine.clone(),
        }
    }
}

/// A session tied to a scope
///
/// Dereferences to [`Session`]. The session is closed when the guard is dropped,
/// including during unwinding; call [`ScopedSession::finish`] to observe close errors.
pub struct ScopedSession<C = DbConnection>
where
    C: R2D2Connection + Send + 'static,
{
    session: Session<C>,
}

impl<C> ScopedSession<C>
where
    C: R2D2Connection + Send + 'static,
{
    /// Close the session now and report any failure
    pub fn finish(mut self) -> Result<(), GatewayError> {
        self.session.close()
    }
}

impl<C> Deref for ScopedSession<C>
where
    C: R2D2Connection + Send + 'static,
{
    type Target = Session<C>;

    fn deref(&self) -> &Session<C> {
        &self.session
    }
}

impl<C> DerefMut for ScopedSession<C>
where
    C: R2D2Connection + Send + 'static,
{
    fn deref_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }
}

impl<C> Drop for ScopedSession<C>
where
    C: R2D2Connection + Send + 'static,
{
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            tracing::warn!(session_id = %self.session.id(), "Failed to close scoped session: {}", e);
        }
    }
}
