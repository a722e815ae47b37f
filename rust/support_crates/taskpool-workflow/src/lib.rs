//! Concurrency building blocks for the task pool.
//!
//! # Key Components
//!
//! - [`channel`] - A bounded, blocking multi-producer, multi-consumer channel. The
//!   bound provides backpressure: senders block while the buffer is full and
//!   receivers block while it is empty and at least one sender is alive.
//! - [`stopwatch`] - A wall-clock stopwatch used to measure execution time.

pub mod channel;
pub mod stopwatch;
