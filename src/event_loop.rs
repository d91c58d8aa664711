//! Single-threaded virtual event loop.
//!
//! The site runs on one UI thread: timers, animation frames and promise
//! continuations are all callbacks on the same queue. This module reproduces
//! that model deterministically so the orchestration core can be driven from
//! tests and from the CLI simulation without a browser.
//!
//! # Pieces
//!
//! - [`Scheduler`]: cloneable handle every component holds. Timers
//!   (`set_timeout` / `clear_timeout`), animation frames (`request_frame` /
//!   `cancel_frame`), `sleep` futures and `spawn` for detached tasks.
//! - [`EventLoop`]: owns the local task pool and moves virtual time forward.
//!   Time only advances when the loop fires a timer or a frame; nothing ever
//!   waits on the wall clock.
//!
//! # Ordering
//!
//! Pending callbacks are ordered by due time, then by registration order.
//! Animation frames are aligned to a fixed frame interval, so every frame
//! requested during the same tick fires together on the next frame boundary,
//! exactly like `requestAnimationFrame`. Spawned tasks run to quiescence
//! between two callbacks.

use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::{LocalSpawnExt, noop_waker};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::{Pin, pin};
use std::rc::Rc;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::warn;

/// Milliseconds of virtual time since the loop started.
pub type Millis = u64;

/// Default animation-frame interval (~60 fps).
pub const DEFAULT_FRAME_INTERVAL: Millis = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventLoopError {
    #[error("future cannot make progress: no pending timers or frames at {at}ms")]
    Stalled { at: Millis },
}

/// Handle returned by [`Scheduler::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Handle returned by [`Scheduler::request_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

enum Callback {
    Timeout(Box<dyn FnOnce()>),
    Frame(Box<dyn FnOnce(Millis)>),
}

struct Queue {
    now: Millis,
    next_seq: u64,
    frame_interval: Millis,
    pending: BTreeMap<(Millis, u64), Callback>,
    /// seq → due time, for O(log n) cancellation.
    due_by_seq: HashMap<u64, Millis>,
}

impl Queue {
    fn insert(&mut self, due: Millis, callback: Callback) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert((due, seq), callback);
        self.due_by_seq.insert(seq, due);
        seq
    }

    fn remove(&mut self, seq: u64) -> bool {
        match self.due_by_seq.remove(&seq) {
            Some(due) => self.pending.remove(&(due, seq)).is_some(),
            None => false,
        }
    }

    fn next_frame_boundary(&self) -> Millis {
        (self.now / self.frame_interval + 1) * self.frame_interval
    }
}

/// Cloneable handle to the event loop's timer queue and task spawner.
#[derive(Clone)]
pub struct Scheduler {
    queue: Rc<RefCell<Queue>>,
    spawner: LocalSpawner,
}

impl Scheduler {
    /// Current virtual time.
    pub fn now(&self) -> Millis {
        self.queue.borrow().now
    }

    /// Run `callback` once after `delay` milliseconds.
    pub fn set_timeout(&self, delay: Millis, callback: impl FnOnce() + 'static) -> TimerId {
        let mut queue = self.queue.borrow_mut();
        let due = queue.now + delay;
        TimerId(queue.insert(due, Callback::Timeout(Box::new(callback))))
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was cleared.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.queue.borrow_mut().remove(id.0)
    }

    /// Run `callback` on the next animation frame with the frame timestamp.
    pub fn request_frame(&self, callback: impl FnOnce(Millis) + 'static) -> FrameId {
        let mut queue = self.queue.borrow_mut();
        let due = queue.next_frame_boundary();
        FrameId(queue.insert(due, Callback::Frame(Box::new(callback))))
    }

    /// Cancel a pending animation frame.
    pub fn cancel_frame(&self, id: FrameId) -> bool {
        self.queue.borrow_mut().remove(id.0)
    }

    /// Future that completes after `delay` milliseconds of virtual time.
    pub fn sleep(&self, delay: Millis) -> Sleep {
        let (tx, rx) = oneshot::channel();
        self.set_timeout(delay, move || {
            let _ = tx.send(());
        });
        Sleep { rx }
    }

    /// Spawn a detached task onto the loop's local pool.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        if let Err(err) = self.spawner.spawn_local(task) {
            warn!(error = %err, "event loop is shut down; task dropped");
        }
    }

    /// Number of pending timers and frames.
    pub fn pending(&self) -> usize {
        self.queue.borrow().pending.len()
    }

    /// Number of pending animation frames.
    pub fn pending_frames(&self) -> usize {
        self.queue
            .borrow()
            .pending
            .values()
            .filter(|cb| matches!(cb, Callback::Frame(_)))
            .count()
    }

    /// Pop and run the earliest pending callback, if it is due at or before
    /// `limit`. Moves virtual time to the callback's due time.
    fn fire_next(&self, limit: Option<Millis>) -> bool {
        let (due, callback) = {
            let mut queue = self.queue.borrow_mut();
            let Some((&(due, seq), _)) = queue.pending.first_key_value() else {
                return false;
            };
            if limit.is_some_and(|limit| due > limit) {
                return false;
            }
            let callback = queue.pending.remove(&(due, seq));
            queue.due_by_seq.remove(&seq);
            queue.now = queue.now.max(due);
            match callback {
                Some(cb) => (due, cb),
                None => return false,
            }
        };
        match callback {
            Callback::Timeout(f) => f(),
            Callback::Frame(f) => f(due),
        }
        true
    }

    fn set_now(&self, now: Millis) {
        let mut queue = self.queue.borrow_mut();
        queue.now = queue.now.max(now);
    }
}

/// Future returned by [`Scheduler::sleep`].
pub struct Sleep {
    rx: oneshot::Receiver<()>,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // A dropped sender means the loop went away; treat it as elapsed.
        Pin::new(&mut self.get_mut().rx).poll(cx).map(|_| ())
    }
}

/// Owner of the task pool; drives virtual time.
pub struct EventLoop {
    pool: LocalPool,
    scheduler: Scheduler,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self::with_frame_interval(DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_frame_interval(frame_interval: Millis) -> Self {
        let pool = LocalPool::new();
        let scheduler = Scheduler {
            queue: Rc::new(RefCell::new(Queue {
                now: 0,
                next_seq: 0,
                frame_interval: frame_interval.max(1),
                pending: BTreeMap::new(),
                due_by_seq: HashMap::new(),
            })),
            spawner: pool.spawner(),
        };
        Self { pool, scheduler }
    }

    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    /// Run spawned tasks until none can make progress. Time does not move.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Move virtual time forward by `delta`, firing every timer and frame
    /// that falls due on the way.
    pub fn advance(&mut self, delta: Millis) {
        let target = self.now() + delta;
        self.advance_to(target);
    }

    /// Move virtual time forward to the absolute instant `target`.
    pub fn advance_to(&mut self, target: Millis) {
        loop {
            self.pool.run_until_stalled();
            if !self.scheduler.fire_next(Some(target)) {
                break;
            }
        }
        self.scheduler.set_now(target);
        self.pool.run_until_stalled();
    }

    /// Drive `future` to completion, jumping virtual time to the next pending
    /// callback whenever everything is idle.
    pub fn block_on<F: Future>(&mut self, future: F) -> Result<F::Output, EventLoopError> {
        let mut future = pin!(future);
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        loop {
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return Ok(output);
            }
            self.pool.run_until_stalled();
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return Ok(output);
            }
            if !self.scheduler.fire_next(None) {
                return Err(EventLoopError::Stalled { at: self.now() });
            }
        }
    }
}
