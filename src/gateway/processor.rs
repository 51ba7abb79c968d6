//! Atomic processing of a batch of operations inside one transaction.

/// Begin/commit/rollback on a unit of work
pub trait Transactional {
    type Error;

    fn begin(&mut self) -> Result<(), Self::Error>;
    fn commit(&mut self) -> Result<(), Self::Error>;
    fn rollback(&mut self) -> Result<(), Self::Error>;
}

/// A unit of work applied to a session inside a transaction.
///
/// Closures of the form `Fn(&mut S) -> Result<(), E>` are operations.
pub trait Operation<S: ?Sized> {
    type Error;

    fn apply(&self, session: &mut S) -> Result<(), Self::Error>;
}

impl<S, E, F> Operation<S> for F
where
    S: ?Sized,
    F: Fn(&mut S) -> Result<(), E>,
{
    type Error = E;

    fn apply(&self, session: &mut S) -> Result<(), E> {
        self(session)
    }
}

/// Raw SQL executed on the session
///
/// The text may hold several `;`-separated statements; it is sent to the backend as one
/// batch, so the database's own parser decides where statements end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Statement { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl<C> Operation<super::Session<C>> for Statement
where
    C: diesel::r2d2::R2D2Connection + Send + 'static,
{
    type Error = crate::error::GatewayError;

    fn apply(&self, session: &mut super::Session<C>) -> Result<(), Self::Error> {
        session.batch_execute(&self.sql)
    }
}

/// Runs operations in an all-or-nothing transaction on one session
pub struct AtomicProcessor<'s, S: Transactional + ?Sized> {
    db: &'s mut S,
}

impl<'s, S: Transactional + ?Sized> AtomicProcessor<'s, S> {
    pub fn new(db: &'s mut S) -> Self {
        AtomicProcessor { db }
    }

    /// Apply `operations` in order inside one transaction.
    ///
    /// Commits and returns `Ok(true)` when every operation succeeds. On the first
    /// failing operation (or a failed commit) the transaction is rolled back and that
    /// error is returned as-is; the remaining operations are not applied. A failure to
    /// begin is returned without a rollback attempt.
    pub fn process_with_rollback<I, O, E>(&mut self, operations: I) -> Result<bool, E>
    where
        I: IntoIterator<Item = O>,
        O: Operation<S, Error = E>,
        E: From<S::Error> + std::fmt::Display,
        S::Error: std::fmt::Display,
    {
        self.db.begin()?;

        let outcome = operations
            .into_iter()
            .enumerate()
            .try_for_each(|(index, operation)| {
                operation.apply(self.db).map_err(|e| {
                    tracing::debug!("Operation {} failed: {}", index, e);
                    e
                })
            })
            .and_then(|()| self.db.commit().map_err(E::from));

        match outcome {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Err(rollback_err) = self.db.rollback() {
                    tracing::warn!("Rollback after failure did not complete: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}
