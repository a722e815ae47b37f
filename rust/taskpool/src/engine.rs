//! The execution pipeline: one producer, `worker_count` workers and one
//! collector, connected by two bounded channels.
//!
//! All threads are scoped to a single [`Engine::run`] call, so tasks and the
//! execution function are borrowed from the pool rather than cloned into the
//! threads. A panic in any stage is turned into an
//! [`ErrorKind::ExecutionFault`](taskpool_common::error::ErrorKind::ExecutionFault).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;

use log::{debug, trace, warn};
use taskpool_common::{Result, error::Error};
use taskpool_workflow::{
    channel::{self, ChannelStats, Receiver, Sender},
    stopwatch::Stopwatch,
};

use crate::{
    config::PoolConfig,
    task::{Outcome, Task},
};

/// The user-supplied execution function, in either of its two shapes.
pub(crate) enum Execution<T, R, E> {
    /// Reports either an output or an error.
    Complete(Box<dyn Fn(&T) -> std::result::Result<R, E> + Send + Sync>),
    /// May report a partial output alongside an error.
    Partial(Box<dyn Fn(&T) -> (Option<R>, Option<E>) + Send + Sync>),
}

impl<T, R, E> Execution<T, R, E> {
    fn invoke(&self, payload: &T) -> (Option<R>, Option<E>) {
        match self {
            Execution::Complete(f) => match f(payload) {
                Ok(output) => (Some(output), None),
                Err(error) => (None, Some(error)),
            },
            Execution::Partial(f) => f(payload),
        }
    }
}

/// Outcomes of a successful run, in completion order.
pub(crate) struct Completion<R, E> {
    pub outcomes: Vec<Outcome<R, E>>,
    pub elapsed: Duration,
}

/// A single execution of the pipeline over borrowed pool state.
pub(crate) struct Engine<'a, T, R, E> {
    pub config: &'a PoolConfig,
    pub tasks: &'a [Task<T>],
    pub execution: &'a Execution<T, R, E>,
}

impl<'a, T, R, E> Engine<'a, T, R, E>
where
    T: Sync,
    R: Send,
    E: Send,
{
    /// Runs every task to completion and returns the collected outcomes.
    ///
    /// This is the error boundary of the pipeline: panics raised by the
    /// producer, a worker, the collector or the orchestration itself are
    /// reported as execution faults and never propagate to the caller.
    pub fn run(self) -> Result<Completion<R, E>> {
        debug!(
            "executing {} tasks on {} workers",
            self.tasks.len(),
            self.config.worker_count
        );
        let mut stopwatch = Stopwatch::start_new();

        let outcomes = match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch())) {
            Ok(outcomes) => outcomes?,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("execution aborted by a panic: {message}");
                return Err(Error::execution_fault("execute", message));
            }
        };

        stopwatch.stop();
        debug!(
            "execution finished: {} outcomes in {:?}",
            outcomes.len(),
            stopwatch.elapsed()
        );
        Ok(Completion {
            outcomes,
            elapsed: stopwatch.elapsed(),
        })
    }

    fn dispatch(&self) -> Result<Vec<Outcome<R, E>>> {
        let capacity = self.config.queue_capacity();
        let tasks = self.tasks;
        let execution = self.execution;

        type Collected<R, E> = (Vec<Outcome<R, E>>, Option<ChannelStats>, ChannelStats);

        let collected = thread::scope(|scope| -> Result<Collected<R, E>> {
            let (task_tx, task_rx) = channel::bounded::<&'a Task<T>>(capacity);
            let (outcome_tx, outcome_rx) = channel::bounded::<Outcome<R, E>>(capacity);

            // An early return drops the local channel ends, which unblocks and
            // winds down any thread spawned so far.
            let producer =
                self.spawn(scope, "producer".to_string(), move || produce(tasks, task_tx))?;

            let mut workers = Vec::with_capacity(self.config.worker_count);
            for index in 0..self.config.worker_count {
                let task_rx = task_rx.clone();
                let outcome_tx = outcome_tx.clone();
                let role = format!("worker-{index}");
                let worker =
                    self.spawn(scope, role.clone(), move || work(execution, task_rx, outcome_tx))?;
                workers.push((role, worker));
            }

            let collector = self.spawn(scope, "collector".to_string(), move || {
                collect(outcome_rx, tasks.len())
            })?;

            // From here on the spawned threads own all channel ends.
            drop(task_rx);
            drop(outcome_tx);

            let mut fault = None;
            for (role, worker) in workers {
                if let Some(processed) = join(&role, worker, &mut fault) {
                    trace!("{role} processed {processed} tasks");
                }
            }
            let task_stats = join("producer", producer, &mut fault);
            let collected = join("collector", collector, &mut fault);

            match (fault, collected) {
                (Some(fault), _) => Err(fault),
                (None, Some((outcomes, outcome_stats))) => {
                    Ok((outcomes, task_stats, outcome_stats))
                }
                (None, None) => unreachable!("collector join failure is always recorded"),
            }
        });
        let (outcomes, task_stats, outcome_stats) = collected?;

        if let Some(stats) = task_stats {
            trace!("work queue: {stats:?}");
        }
        trace!("results queue: {outcome_stats:?}");

        if outcomes.len() != tasks.len() {
            return Err(Error::execution_fault(
                "collector",
                format!(
                    "collected {} outcomes for {} tasks",
                    outcomes.len(),
                    tasks.len()
                ),
            ));
        }
        Ok(outcomes)
    }

    fn spawn<'scope, 'env, F, X>(
        &self,
        scope: &'scope Scope<'scope, 'env>,
        role: String,
        f: F,
    ) -> Result<ScopedJoinHandle<'scope, X>>
    where
        F: FnOnce() -> X + Send + 'scope,
        X: Send + 'scope,
    {
        let mut builder = thread::Builder::new();
        if let Some(name) = self.config.thread_name(&role) {
            builder = builder.name(name);
        }
        builder
            .spawn_scoped(scope, f)
            .map_err(|e| Error::io(format!("spawn {role} thread"), e))
    }
}

/// Streams the tasks into the work queue in input order.
///
/// Dropping `tx` on return half-closes the work queue, which lets the workers
/// exit once it is drained.
fn produce<'a, T>(tasks: &'a [Task<T>], tx: Sender<&'a Task<T>>) -> ChannelStats {
    for (sent, task) in tasks.iter().enumerate() {
        if tx.send(task).is_err() {
            warn!(
                "work queue closed after {sent} of {} tasks: no workers left",
                tasks.len()
            );
            break;
        }
    }
    tx.stats()
}

/// Pulls tasks until the work queue is drained and closed, returning the
/// number of tasks processed.
fn work<T, R, E>(
    execution: &Execution<T, R, E>,
    tasks: Receiver<&Task<T>>,
    outcomes: Sender<Outcome<R, E>>,
) -> usize {
    let mut processed = 0;
    for task in tasks.iter() {
        trace!("executing task '{}'", task.key());
        let (output, error) = execution.invoke(task.payload());
        if outcomes
            .send(Outcome::new(task.key().to_string(), output, error))
            .is_err()
        {
            warn!("results queue closed: collector is gone");
            break;
        }
        processed += 1;
    }
    processed
}

/// Drains the results queue in completion order.
fn collect<R, E>(
    rx: Receiver<Outcome<R, E>>,
    expected: usize,
) -> (Vec<Outcome<R, E>>, ChannelStats) {
    let mut outcomes = Vec::with_capacity(expected);
    outcomes.extend(rx.iter());
    (outcomes, rx.stats())
}

/// Joins a pipeline thread, recording the first panic as an execution fault.
fn join<X>(role: &str, handle: ScopedJoinHandle<'_, X>, fault: &mut Option<Error>) -> Option<X> {
    match handle.join() {
        Ok(value) => Some(value),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("{role} thread panicked: {message}");
            if fault.is_none() {
                *fault = Some(Error::execution_fault(role, message));
            }
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
