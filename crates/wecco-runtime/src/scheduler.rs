#![forbid(unsafe_code)]

//! Deferred task execution.
//!
//! Components never render from inside `set_data` directly; they hand a
//! render task to a [`Scheduler`]. Which scheduler is used decides whether
//! updates coalesce:
//!
//! - [`ImmediateScheduler`] runs every task inline. Each `set_data` renders.
//! - [`TickScheduler`] queues tasks until the host calls [`TickScheduler::tick`],
//!   so all `set_data` calls between two ticks produce a single render.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use tracing::{trace, warn};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks, now or later.
pub trait Scheduler {
    fn schedule(&self, task: Task);
}

/// Runs every task as soon as it is scheduled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, task: Task) {
        task();
    }
}

/// Upper bound on rounds in [`TickScheduler::run_until_idle`].
const MAX_IDLE_ROUNDS: usize = 10_000;

/// Queues tasks until the host drives it.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use wecco_runtime::{Scheduler, TickScheduler};
///
/// let scheduler = TickScheduler::new();
/// let runs = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&runs);
/// scheduler.schedule(Box::new(move || counter.set(counter.get() + 1)));
///
/// assert_eq!(scheduler.pending(), 1);
/// assert_eq!(scheduler.tick(), 1);
/// assert_eq!(runs.get(), 1);
/// ```
#[derive(Default)]
pub struct TickScheduler {
    queue: RefCell<VecDeque<Task>>,
}

impl TickScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run the tasks queued before this call. Tasks they schedule wait for
    /// the next tick. Returns the number of tasks run.
    pub fn tick(&self) -> usize {
        let batch = std::mem::take(&mut *self.queue.borrow_mut());
        let count = batch.len();
        if count > 0 {
            trace!(tasks = count, "scheduler tick");
        }
        for task in batch {
            task();
        }
        count
    }

    /// Tick until no tasks are left. Returns the total number run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_IDLE_ROUNDS {
            if self.pending() == 0 {
                return total;
            }
            total += self.tick();
        }
        warn!(
            rounds = MAX_IDLE_ROUNDS,
            pending = self.pending(),
            "scheduler did not become idle; tasks keep rescheduling"
        );
        total
    }
}

impl Scheduler for TickScheduler {
    fn schedule(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Task) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let make = move |n: u32| -> Task {
            let sink = Rc::clone(&sink);
            Box::new(move || sink.borrow_mut().push(n))
        };
        (log, make)
    }

    #[test]
    fn immediate_runs_inline() {
        let (log, task) = recorder();
        ImmediateScheduler.schedule(task(1));
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn tick_runs_in_fifo_order() {
        let (log, task) = recorder();
        let scheduler = TickScheduler::new();
        scheduler.schedule(task(1));
        scheduler.schedule(task(2));
        assert!(log.borrow().is_empty());
        assert_eq!(scheduler.tick(), 2);
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(scheduler.tick(), 0);
    }

    #[test]
    fn tasks_scheduled_during_tick_wait() {
        let (log, task) = recorder();
        let scheduler = Rc::new(TickScheduler::new());
        let inner = Rc::clone(&scheduler);
        let later = task(2);
        scheduler.schedule(Box::new(move || inner.schedule(later)));
        scheduler.schedule(task(1));

        assert_eq!(scheduler.tick(), 2);
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.run_until_idle(), 1);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }
}
