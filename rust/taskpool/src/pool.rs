//! The pool: configuration surface and result accessors.

use std::time::Duration;

use log::{debug, warn};
use taskpool_common::{Result, error::Error};

use crate::{
    config::PoolConfig,
    engine::{Completion, Engine, Execution},
    task::{Outcome, Task},
};

type KeyFn<T> = Box<dyn Fn(&T) -> String + Send + Sync>;

/// Executes a function over a list of inputs on a fixed number of worker
/// threads.
///
/// The pool is configured through chained setters, executed once with
/// [`execute`](Self::execute), and then exposes the collected outcomes and the
/// wall-clock execution time. The worker count is fixed at construction.
///
/// # Lifecycle
///
/// 1. **Configuring**: inputs, key generator and execution function may be set
///    any number of times.
/// 2. **Finished**: after a successful [`execute`](Self::execute) the pool is
///    read-only. [`results`](Self::results) and
///    [`execution_time`](Self::execution_time) become available, further
///    `execute` calls return the cached outcomes, and configuration calls are
///    ignored.
///
/// A failed `execute` (see [`ErrorKind::ExecutionFault`](crate::ErrorKind::ExecutionFault))
/// leaves the pool in the configuring state.
///
/// # Keys
///
/// Keys are computed when the inputs are set, using the key generator installed
/// at that time. Installing a key generator afterwards does not re-key the
/// existing inputs. Keys are advisory: empty and duplicate keys are allowed.
///
/// ```
/// use taskpool::ConcurrentPool;
///
/// let mut pool = ConcurrentPool::new(4)?
///     .set_inputs(vec!["a", "bb", "ccc"])
///     .set_execution_function(|s: &&str| Ok::<_, ()>(s.len()));
///
/// assert!(pool.results().unwrap_err().is_not_finished());
/// let mut lengths: Vec<_> = pool.execute()?.iter().map(|o| *o.output().unwrap()).collect();
/// lengths.sort();
/// assert_eq!(lengths, vec![1, 2, 3]);
/// # Ok::<(), taskpool::Error>(())
/// ```
pub struct ConcurrentPool<T, R, E> {
    config: PoolConfig,
    tasks: Vec<Task<T>>,
    key_fn: Option<KeyFn<T>>,
    execution: Option<Execution<T, R, E>>,
    completion: Option<Completion<R, E>>,
}

impl<T, R, E> ConcurrentPool<T, R, E> {
    /// Creates a pool with `worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument)
    /// if `worker_count` is 0 or exceeds
    /// [`PoolConfig::MAX_WORKER_COUNT`].
    pub fn new(worker_count: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(worker_count))
    }

    /// Creates a pool from a validated configuration.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(ConcurrentPool {
            config,
            tasks: Vec::new(),
            key_fn: None,
            execution: None,
            completion: None,
        })
    }

    /// Replaces the inputs.
    ///
    /// Each item becomes a [`Task`]. If a key generator is installed, every
    /// task is keyed now; otherwise the keys stay empty.
    pub fn set_inputs(mut self, items: impl IntoIterator<Item = T>) -> Self {
        if self.ignore_when_finished("set_inputs") {
            return self;
        }
        let key_fn = self.key_fn.as_deref();
        self.tasks = items
            .into_iter()
            .map(|payload| {
                let key = key_fn.map(|f| f(&payload)).unwrap_or_default();
                Task::new(key, payload)
            })
            .collect();
        self
    }

    /// Installs the function used to key inputs set after this call.
    pub fn set_key_generator<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        if self.ignore_when_finished("set_key_generator") {
            return self;
        }
        self.key_fn = Some(Box::new(f));
        self
    }

    /// Installs the execution function.
    ///
    /// The function is invoked concurrently from up to `worker_count` threads;
    /// any shared state it touches must be synchronized by the caller. An
    /// `Err` is recorded in the outcome of that input only.
    pub fn set_execution_function<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        if self.ignore_when_finished("set_execution_function") {
            return self;
        }
        self.execution = Some(Execution::Complete(Box::new(f)));
        self
    }

    /// Installs an execution function that may return a partial output
    /// together with an error.
    pub fn set_partial_execution_function<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> (Option<R>, Option<E>) + Send + Sync + 'static,
    {
        if self.ignore_when_finished("set_partial_execution_function") {
            return self;
        }
        self.execution = Some(Execution::Partial(Box::new(f)));
        self
    }

    /// Returns the outcomes, in completion order.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFinished`](crate::ErrorKind::NotFinished) if the
    /// pool has not finished executing.
    pub fn results(&self) -> Result<&[Outcome<R, E>]> {
        self.completion
            .as_ref()
            .map(|c| c.outcomes.as_slice())
            .ok_or_else(Error::not_finished)
    }

    /// Consumes the pool and returns the owned outcomes.
    pub fn into_results(self) -> Result<Vec<Outcome<R, E>>> {
        self.completion
            .map(|c| c.outcomes)
            .ok_or_else(Error::not_finished)
    }

    /// Returns the wall-clock duration of the execution.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotFinished`](crate::ErrorKind::NotFinished) if the
    /// pool has not finished executing.
    pub fn execution_time(&self) -> Result<Duration> {
        self.completion
            .as_ref()
            .map(|c| c.elapsed)
            .ok_or_else(Error::not_finished)
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_some()
    }

    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn tasks(&self) -> &[Task<T>] {
        &self.tasks
    }

    fn ignore_when_finished(&self, operation: &str) -> bool {
        if self.is_finished() {
            warn!("{operation} ignored: the pool has already finished");
        }
        self.is_finished()
    }
}

impl<T, R, E> ConcurrentPool<T, R, E>
where
    T: Sync,
    R: Send,
    E: Send,
{
    /// Runs the execution function over every input and returns the outcomes
    /// in completion order.
    ///
    /// With a single worker the outcomes follow the input order; with more
    /// workers they are a permutation of it. Once the pool has finished, this
    /// returns the cached outcomes without running anything.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::InvalidOperation`](crate::ErrorKind::InvalidOperation) if
    ///   no execution function is installed.
    /// - [`ErrorKind::ExecutionFault`](crate::ErrorKind::ExecutionFault) if a
    ///   panic occurred anywhere during execution.
    /// - [`ErrorKind::Io`](crate::ErrorKind::Io) if a thread could not be
    ///   spawned.
    ///
    /// In every error case the pool stays unfinished.
    pub fn execute(&mut self) -> Result<&[Outcome<R, E>]> {
        if self.completion.is_some() {
            debug!("pool already finished, returning cached outcomes");
            return self.results();
        }

        let execution = self
            .execution
            .as_ref()
            .ok_or_else(|| Error::invalid_operation("execute: no execution function"))?;
        let completion = Engine {
            config: &self.config,
            tasks: &self.tasks,
            execution,
        }
        .run()?;

        self.completion = Some(completion);
        self.results()
    }
}

impl<T, R, E> std::fmt::Debug for ConcurrentPool<T, R, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentPool")
            .field("config", &self.config)
            .field("tasks", &self.tasks.len())
            .field("has_key_generator", &self.key_fn.is_some())
            .field("has_execution_function", &self.execution.is_some())
            .field("finished", &self.is_finished())
            .finish()
    }
}
