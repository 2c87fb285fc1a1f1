//! A fixed-size pool of worker threads running named, cancelable tasks
//!
//! Tasks are identified by name. Enqueueing a name that is already pending
//! or running cancels the previous instance in the same lock acquisition as
//! the push, which is what guarantees at most one in-flight evaluation per
//! name. Cancellation is cooperative: a running task keeps executing, but
//! its result is reported as canceled instead of finished.

use crate::expr::Expression;
use log::debug;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// Callbacks observing the lifecycle of pool tasks
///
/// Every call is made with the pool's mutex held; implementations must do
/// only fast bookkeeping, such as pushing onto their own queue, and must not
/// re-enter the pool. For each task, `task_starting` strictly precedes the
/// terminal `task_canceled` or `task_finished` call. No ordering holds
/// across distinct tasks.
pub trait PoolListener: Send + Sync {
    fn task_starting(&self, worker: usize, name: &str);
    fn task_canceled(&self, worker: usize, name: &str);
    fn task_finished(&self, worker: usize, name: &str, result: Expression);
}

/// A task lifecycle notification, as buffered by [`MessageQueue`]
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEvent {
    Starting {
        worker: usize,
        name: String,
    },
    Canceled {
        worker: usize,
        name: String,
    },
    Finished {
        worker: usize,
        name: String,
        result: Expression,
    },
}

/// A listener that buffers events behind its own mutex
///
/// Clones share the same buffer, so one clone can be handed to the pool
/// while another is drained on the consumer's thread.
#[derive(Clone, Default)]
pub struct MessageQueue {
    events: Arc<Mutex<VecDeque<PoolEvent>>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest buffered event, if any
    pub fn next(&self) -> Option<PoolEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn push(&self, event: PoolEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }
}

impl PoolListener for MessageQueue {
    fn task_starting(&self, worker: usize, name: &str) {
        self.push(PoolEvent::Starting {
            worker,
            name: name.to_string(),
        });
    }

    fn task_canceled(&self, worker: usize, name: &str) {
        self.push(PoolEvent::Canceled {
            worker,
            name: name.to_string(),
        });
    }

    fn task_finished(&self, worker: usize, name: &str, result: Expression) {
        self.push(PoolEvent::Finished {
            worker,
            name: name.to_string(),
            result,
        });
    }
}

type RunFn = Box<dyn FnOnce(&AtomicBool) -> Expression + Send>;

struct Task {
    name: String,
    canceled: Arc<AtomicBool>,
    run: RunFn,
}

struct Running {
    name: String,
    canceled: Arc<AtomicBool>,
}

#[derive(Default)]
struct PoolState {
    pending: VecDeque<Task>,
    running: Vec<Running>,
    stop: bool,
}

struct PoolShared {
    state: Mutex<PoolState>,
    available: Condvar,
    listener: Option<Arc<dyn PoolListener>>,
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A fixed set of worker threads sharing a pending queue and a running list
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// A pool with the given number of workers and no listener
    pub fn new(num_workers: usize) -> Self {
        Self::build(num_workers, None)
    }

    /// A pool whose task lifecycle is reported to the given listener
    pub fn with_listener(num_workers: usize, listener: Arc<dyn PoolListener>) -> Self {
        Self::build(num_workers, Some(listener))
    }

    fn build(num_workers: usize, listener: Option<Arc<dyn PoolListener>>) -> Self {
        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState::default()),
            available: Condvar::new(),
            listener,
        });

        let threads = (0..num_workers)
            .map(|id| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(&shared, id))
            })
            .collect();

        Self { shared, threads }
    }

    /// Submit a named task, canceling any previous pending or running task
    /// with the same name
    ///
    /// The dedup scan is O(pending + running). The run closure receives the
    /// task's cancellation flag; observing it is optional, since a set flag
    /// only means the result will be reported as canceled.
    pub fn enqueue<F>(&self, name: impl Into<String>, run: F)
    where
        F: FnOnce(&AtomicBool) -> Expression + Send + 'static,
    {
        let name = name.into();
        let mut state = self.shared.lock();

        // cancel-previous must be atomic with the push, so both happen
        // under the same lock acquisition
        if let Some(pos) = state.pending.iter().position(|t| t.name == name) {
            state.pending.remove(pos);
            debug!("task '{}' replaced while pending", name);
        }
        if let Some(running) = state.running.iter().find(|r| r.name == name) {
            running.canceled.store(true, Ordering::SeqCst);
            debug!("task '{}' canceled while running", name);
        }

        state.pending.push_back(Task {
            name,
            canceled: Arc::new(AtomicBool::new(false)),
            run: Box::new(run),
        });
        drop(state);
        self.shared.available.notify_one();
    }

    /// Cancel the named task: a pending task is removed before it ever
    /// starts, a running task has its flag set; otherwise a no-op
    pub fn cancel(&self, name: &str) {
        let mut state = self.shared.lock();

        if let Some(pos) = state.pending.iter().position(|t| t.name == name) {
            state.pending.remove(pos);
        } else if let Some(running) = state.running.iter().find(|r| r.name == name) {
            running.canceled.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.shared.lock().pending.iter().any(|t| t.name == name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.shared.lock().running.iter().any(|r| r.name == name)
    }

    pub fn is_submitted(&self, name: &str) -> bool {
        let state = self.shared.lock();
        state.pending.iter().any(|t| t.name == name)
            || state.running.iter().any(|r| r.name == name)
    }

    /// Stop the workers and join them; queued tasks are drained before the
    /// workers return
    pub fn stop_all(&mut self) {
        {
            let mut state = self.shared.lock();
            if state.stop {
                return;
            }
            state.stop = true;
        }
        self.shared.available.notify_all();

        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn worker_loop(shared: &PoolShared, id: usize) {
    loop {
        let task = {
            let mut state = shared.lock();
            while !state.stop && state.pending.is_empty() {
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            let Some(task) = state.pending.pop_front() else {
                return;
            };
            state.running.push(Running {
                name: task.name.clone(),
                canceled: Arc::clone(&task.canceled),
            });
            if let Some(listener) = &shared.listener {
                listener.task_starting(id, &task.name);
            }
            task
        };

        debug!("task '{}' running on worker {}", task.name, id);

        // a panicking task must not take its worker down; it reports as
        // finished with an empty expression
        let flag = Arc::clone(&task.canceled);
        let result = catch_unwind(AssertUnwindSafe(move || (task.run)(&flag)))
            .unwrap_or_else(|_| Expression::none());

        let mut state = shared.lock();
        let canceled = task.canceled.load(Ordering::SeqCst);
        if let Some(listener) = &shared.listener {
            if canceled {
                listener.task_canceled(id, &task.name);
            } else {
                listener.task_finished(id, &task.name, result);
            }
        }
        if let Some(pos) = state
            .running
            .iter()
            .position(|r| Arc::ptr_eq(&r.canceled, &task.canceled))
        {
            state.running.remove(pos);
        }
    }
}
