//! Units of work and their outcomes.

/// One input registered on the pool, together with its correlation key.
///
/// The key is empty when no key generator was configured at the time the
/// inputs were set. Keys are not required to be unique.
#[derive(Debug, Clone)]
pub struct Task<T> {
    key: String,
    payload: T,
}

impl<T> Task<T> {
    pub(crate) fn new(key: String, payload: T) -> Task<T> {
        Task { key, payload }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }
}

/// The result of executing one [`Task`].
///
/// Normally exactly one of `output` and `error` is present. An execution
/// function installed with
/// [`set_partial_execution_function`](crate::ConcurrentPool::set_partial_execution_function)
/// may report a partial output alongside an error, in which case both are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<R, E> {
    key: String,
    output: Option<R>,
    error: Option<E>,
}

impl<R, E> Outcome<R, E> {
    pub(crate) fn new(key: String, output: Option<R>, error: Option<E>) -> Outcome<R, E> {
        Outcome { key, output, error }
    }

    /// The key of the task this outcome belongs to.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn output(&self) -> Option<&R> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    /// Returns `true` if the execution function did not report an error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_parts(self) -> (String, Option<R>, Option<E>) {
        (self.key, self.output, self.error)
    }
}
