//! Bounded-concurrency execution of a function over a list of inputs.
//!
//! A [`ConcurrentPool`] is configured with a fixed number of workers, a list of
//! inputs, an optional key generator and an execution function. Calling
//! [`ConcurrentPool::execute`] runs the function over every input on
//! `worker_count` threads and collects one [`Outcome`] per input.
//!
//! # Pipeline
//!
//! ```text
//! producer --(work queue)--> worker x N --(results queue)--> collector
//! ```
//!
//! Both queues are bounded by the worker count, so the producer cannot run far
//! ahead of the workers and the workers cannot run far ahead of the collector.
//! Outcomes are listed in completion order, which matches the input order only
//! when the pool has a single worker.
//!
//! # Failures
//!
//! An error returned by the execution function is recorded in the outcome of
//! that input and does not affect other inputs. A panic anywhere in the pipeline
//! is caught and reported as [`ErrorKind::ExecutionFault`]; the pool then stays
//! unfinished and its results remain unavailable.
//!
//! # Example
//!
//! ```
//! use taskpool::ConcurrentPool;
//!
//! let mut pool = ConcurrentPool::new(2)?
//!     .set_key_generator(|n: &u32| format!("n{n}"))
//!     .set_inputs([1u32, 2, 3])
//!     .set_execution_function(|n: &u32| n.checked_mul(10).ok_or("overflow"));
//!
//! let outcomes = pool.execute()?;
//! assert_eq!(outcomes.len(), 3);
//! assert!(outcomes.iter().all(|o| o.is_ok()));
//! # Ok::<(), taskpool::Error>(())
//! ```

pub mod config;
mod engine;
pub mod pool;
pub mod task;

pub use config::PoolConfig;
pub use pool::ConcurrentPool;
pub use task::{Outcome, Task};
pub use taskpool_common::Result;
pub use taskpool_common::error::{Error, ErrorKind};
