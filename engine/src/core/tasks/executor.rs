use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use crossbeam::channel::{Receiver, Sender, unbounded};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size worker pool fed over a crossbeam channel.
///
/// Tasks run in FIFO submission order with non-deterministic completion
/// order. The pool can be shut down explicitly with [`shutdown`]
/// (subsequent submissions fail with [`PoolClosed`]) and always shuts down
/// on drop.
///
/// [`shutdown`]: Executor::shutdown
pub struct Executor {
    sender: Sender<Message>,
    workers: Vec<Worker>,
    closed: AtomicBool,
}

enum Message {
    Task(Task),
    Shutdown,
}

struct Worker {
    handle: Option<thread::JoinHandle<()>>,
}

/// Error returned when submitting work to a pool that has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolClosed;

impl fmt::Display for PoolClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker pool has shut down")
    }
}

impl std::error::Error for PoolClosed {}

impl Executor {
    /// Create a pool with the given number of worker threads.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "Thread pool size must be greater than 0");

        let (sender, receiver) = unbounded();
        let mut workers = Vec::with_capacity(size);

        for _ in 0..size {
            workers.push(Worker::new(receiver.clone()));
        }

        Executor {
            sender,
            workers,
            closed: AtomicBool::new(false),
        }
    }

    /// Submit a task to the pool.
    pub fn execute<F>(&self, f: F) -> Result<(), PoolClosed>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolClosed);
        }
        self.sender
            .send(Message::Task(Box::new(f)))
            .map_err(|_| PoolClosed)
    }

    /// The number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Returns `true` if the pool has been shut down.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Shut the pool down: running tasks finish, queued tasks drain, new
    /// submissions fail with [`PoolClosed`].
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for _ in &self.workers {
            let _ = self.sender.send(Message::Shutdown);
        }
    }

    /// Create a scope for tasks that borrow non-`'static` data. Every task
    /// spawned inside the scope completes before the scope returns.
    ///
    /// ```ignore
    /// let mut data = vec![1, 2, 3, 4];
    /// executor.scope(|scope| {
    ///     for item in &mut data {
    ///         let _ = scope.spawn(|| *item *= 2);
    ///     }
    /// });
    /// assert_eq!(data, vec![2, 4, 6, 8]);
    /// ```
    pub fn scope<'env, F, R>(&'env self, f: F) -> R
    where
        F: FnOnce(&Scope<'env>) -> R,
    {
        let (done_tx, done_rx) = unbounded();
        let scope = Scope {
            executor: self,
            spawned: std::cell::Cell::new(0),
            done_tx,
            done_rx,
        };
        f(&scope)
    }
}

/// A scope for spawning tasks that borrow from the environment.
///
/// All tasks spawned within the scope are awaited when the scope drops.
pub struct Scope<'env> {
    executor: &'env Executor,

    /// Tasks successfully handed to the pool.
    spawned: std::cell::Cell<usize>,

    /// Completion signals, one per finished task.
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl<'env> Scope<'env> {
    /// Spawn a scoped task.
    pub fn spawn<F>(&self, f: F) -> Result<(), PoolClosed>
    where
        F: FnOnce() + Send + 'env,
    {
        if self.executor.closed.load(Ordering::Acquire) {
            return Err(PoolClosed);
        }

        let done = self.done_tx.clone();
        let task: Box<dyn FnOnce() + Send + 'env> = Box::new(move || {
            f();
            let _ = done.send(());
        });

        // SAFETY: The task's lifetime is extended to 'static for storage in
        // the worker channel. Sound because the Scope's Drop impl blocks
        // until every spawned task has signalled completion (or been dropped
        // unrun), so no task outlives the borrows it captures.
        let static_task: Box<dyn FnOnce() + Send + 'static> = unsafe { std::mem::transmute(task) };

        self.executor
            .sender
            .send(Message::Task(static_task))
            .map_err(|_| PoolClosed)?;
        self.spawned.set(self.spawned.get() + 1);
        Ok(())
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        // Barrier: every spawned task either signals completion or drops its
        // sender unrun. Once all senders are gone the channel disconnects,
        // so this cannot wait on a task that will never run.
        let (done_tx, _) = crossbeam::channel::unbounded();
        let own_tx = std::mem::replace(&mut self.done_tx, done_tx);
        drop(own_tx);

        for _ in 0..self.spawned.get() {
            if self.done_rx.recv().is_err() {
                break;
            }
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Worker {
    fn new(receiver: Receiver<Message>) -> Self {
        let handle = thread::spawn(move || {
            loop {
                match receiver.recv() {
                    Ok(Message::Task(task)) => task(),
                    Ok(Message::Shutdown) => break,
                    Err(_) => break,
                }
            }
        });

        Worker {
            handle: Some(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Mutex,
            atomic::{AtomicU32, Ordering},
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn executes_submitted_tasks() {
        let executor = Executor::new(4);
        let counter = Arc::new(AtomicU32::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            executor
                .execute(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        // Drop waits for workers to drain
        drop(executor);

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn shutdown_rejects_new_work() {
        let executor = Executor::new(2);

        executor.shutdown();

        assert!(executor.is_closed());
        assert_eq!(executor.execute(|| {}), Err(PoolClosed));
    }

    #[test]
    fn scope_waits_for_borrowing_tasks() {
        let executor = Executor::new(4);
        let mut data = vec![1, 2, 3, 4, 5];

        executor.scope(|scope| {
            for item in &mut data {
                scope
                    .spawn(move || {
                        *item *= 2;
                    })
                    .unwrap();
            }
        });

        assert_eq!(data, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn scope_tasks_complete_even_when_slow() {
        let executor = Executor::new(1);
        let completed = Arc::new(Mutex::new(Vec::new()));

        executor.scope(|scope| {
            for i in 0..5 {
                let completed = Arc::clone(&completed);
                scope
                    .spawn(move || {
                        thread::sleep(Duration::from_millis(5));
                        completed.lock().unwrap().push(i);
                    })
                    .unwrap();
            }
        });

        assert_eq!(completed.lock().unwrap().len(), 5);
    }

    #[test]
    fn scope_spawn_fails_after_shutdown() {
        let executor = Executor::new(2);
        executor.shutdown();

        executor.scope(|scope| {
            assert_eq!(scope.spawn(|| {}), Err(PoolClosed));
        });
    }
}
