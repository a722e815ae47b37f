//! A bounded, blocking multi-producer, multi-consumer (MPMC) channel.
//!
//! The channel is the only synchronization point between the stages of a pool
//! execution: the producer feeds tasks to the workers through one channel and the
//! workers hand outcomes to the collector through another.
//!
//! Both halves are reference counted. When the last [`Sender`] is dropped the
//! channel is *half-closed*: receivers drain the buffered messages and then get
//! [`RecvError`]. When the last [`Receiver`] is dropped the channel is *closed*:
//! buffered messages are discarded and every send fails, returning the message
//! back to the caller.

use std::collections::VecDeque;
use std::sync::mpsc::{RecvError, SendError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Creates a bounded channel holding at most `capacity` buffered messages.
///
/// Messages are received in the order in which they were sent. [`Sender::send`]
/// blocks while the buffer is full, [`Receiver::recv`] blocks while the buffer
/// is empty and at least one sender is still alive.
///
/// # Panics
///
/// Panics if `capacity` is 0; rendezvous channels are not supported.
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    assert_ne!(capacity, 0, "bounded channel requires a non-zero capacity");
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            buf: VecDeque::new(),
            capacity,
            senders: 1,
            receivers: 1,
            peak_len: 0,
            total_sent: 0,
        }),
        readable: Condvar::new(),
        writable: Condvar::new(),
    });
    (
        Sender {
            shared: shared.clone(),
        },
        Receiver { shared },
    )
}

/// A point-in-time view of the channel counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    pub capacity: usize,
    /// Messages currently buffered.
    pub len: usize,
    /// Largest number of messages buffered at once.
    pub peak_len: usize,
    /// Messages accepted by the channel since creation.
    pub total_sent: u64,
}

/// The sending half of a [`bounded`] channel.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Sends a message, blocking while the channel is full.
    ///
    /// Fails with the original message if all receivers are gone, including
    /// when the last receiver disappears while this call is blocked.
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        let mut state = self.shared.lock();
        loop {
            if state.receivers == 0 {
                return Err(SendError(msg));
            }
            if state.buf.len() < state.capacity {
                break;
            }
            state = self
                .shared
                .writable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.push(msg);
        drop(state);
        self.shared.readable.notify_one();
        Ok(())
    }

    pub fn stats(&self) -> ChannelStats {
        self.shared.stats()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.lock().senders += 1;
        Sender {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.senders -= 1;
        if state.senders == 0 {
            drop(state);
            // Blocked receivers must observe the half-closed state.
            self.shared.readable.notify_all();
        }
    }
}

/// The receiving half of a [`bounded`] channel.
///
/// Receivers can be cloned to let several threads compete for messages; each
/// message is delivered to exactly one receiver.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Receives a message, blocking while the channel is empty and open.
    ///
    /// Returns [`RecvError`] once the channel is empty and every sender has
    /// been dropped. Messages buffered before the last sender went away are
    /// still delivered.
    pub fn recv(&self) -> Result<T, RecvError> {
        let mut state = self.shared.lock();
        loop {
            if let Some(msg) = state.buf.pop_front() {
                drop(state);
                self.shared.writable.notify_one();
                return Ok(msg);
            }
            if state.senders == 0 {
                return Err(RecvError);
            }
            state = self
                .shared
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns a blocking iterator that yields messages until the channel is
    /// drained and half-closed.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { receiver: self }
    }

    pub fn stats(&self) -> ChannelStats {
        self.shared.stats()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.shared.lock().receivers += 1;
        Receiver {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.receivers -= 1;
        if state.receivers == 0 {
            let discarded = std::mem::take(&mut state.buf);
            drop(state);
            // Blocked senders must observe the closed state.
            self.shared.writable.notify_all();
            drop(discarded);
        }
    }
}

/// Blocking iterator over the messages of a [`Receiver`].
pub struct Iter<'a, T> {
    receiver: &'a Receiver<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

/// Owning blocking iterator over the messages of a [`Receiver`].
pub struct IntoIter<T> {
    receiver: Receiver<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.recv().ok()
    }
}

impl<T> IntoIterator for Receiver<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { receiver: self }
    }
}

impl<'a, T> IntoIterator for &'a Receiver<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    readable: Condvar,
    writable: Condvar,
}

impl<T> Shared<T> {
    /// Locks the state, ignoring poisoning: no user code runs under the lock,
    /// so a panicking holder cannot leave the state half-updated.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats(&self) -> ChannelStats {
        let state = self.lock();
        ChannelStats {
            capacity: state.capacity,
            len: state.buf.len(),
            peak_len: state.peak_len,
            total_sent: state.total_sent,
        }
    }
}

struct State<T> {
    buf: VecDeque<T>,
    capacity: usize,
    senders: usize,
    receivers: usize,
    peak_len: usize,
    total_sent: u64,
}

impl<T> State<T> {
    fn push(&mut self, msg: T) {
        self.buf.push_back(msg);
        self.peak_len = self.peak_len.max(self.buf.len());
        self.total_sent += 1;
    }
}
