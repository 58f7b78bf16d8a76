/*!
 * Worker Threads
 * Tracked OS threads, joined in spawn order at teardown
 */

use std::io;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

struct Worker {
    name: String,
    handle: JoinHandle<()>,
}

/// Ordered collection of worker threads owned by the virtual machine
#[derive(Default)]
pub(super) struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    pub(super) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Start a named OS thread and track its handle
    pub(super) fn spawn<F>(&mut self, name: String, task: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name.clone()).spawn(task)?;
        debug!(worker = %name, "worker thread spawned");
        self.workers.push(Worker { name, handle });
        Ok(())
    }

    /// Hand every tracked worker over for joining
    pub(super) fn take(&mut self) -> WorkerPool {
        WorkerPool {
            workers: std::mem::take(&mut self.workers),
        }
    }

    /// Join every worker, first spawned first joined
    ///
    /// A worker cannot join itself; if teardown runs on one of the tracked
    /// threads, that thread is skipped and finishes on its own. Returns the
    /// names of the joined threads in join order.
    pub(super) fn join_all(self) -> Vec<String> {
        let current = thread::current().id();
        let mut joined = Vec::with_capacity(self.workers.len());

        for worker in self.workers {
            if worker.handle.thread().id() == current {
                warn!(worker = %worker.name, "teardown running on a tracked worker; not joining itself");
                continue;
            }

            match worker.handle.join() {
                Ok(()) => debug!(worker = %worker.name, "joined worker thread"),
                Err(_) => warn!(worker = %worker.name, "worker thread panicked"),
            }
            joined.push(worker.name);
        }

        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    #[test]
    fn test_join_all_in_spawn_order() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let mut pool = WorkerPool::default();

        // later workers finish first
        for i in 0..4u64 {
            let finished = Arc::clone(&finished);
            pool.spawn(format!("w{}", i), move || {
                thread::sleep(Duration::from_millis(160 - i * 40));
                finished.lock().push(i);
            })
            .unwrap();
        }

        assert_eq!(pool.len(), 4);
        assert_eq!(pool.take().join_all(), vec!["w0", "w1", "w2", "w3"]);
        assert_eq!(*finished.lock(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_join_skips_current_thread() {
        let pool = Arc::new(Mutex::new(WorkerPool::default()));
        let inner = Arc::clone(&pool);
        let (tx, rx) = mpsc::channel();

        // the lock is held until the handle is tracked
        pool.lock()
            .spawn("self-join".into(), move || {
                let workers = inner.lock().take();
                tx.send(workers.join_all()).unwrap();
            })
            .unwrap();

        let joined = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(joined.is_empty());
    }

    #[test]
    fn test_panicking_worker_is_still_joined() {
        let mut pool = WorkerPool::default();
        pool.spawn("boom".into(), || panic!("worker failure")).unwrap();
        assert_eq!(pool.join_all(), vec!["boom"]);
    }
}
