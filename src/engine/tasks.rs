use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskMode {
    /// Each job runs on its own worker thread.
    Threaded,
    /// Jobs run immediately on the caller; outcomes are still only seen on `drain`.
    Inline,
}

/// Owned handle to an in-flight job. Cancelling (or dropping) it guarantees
/// the job's outcome is never delivered.
#[derive(Debug)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Envelope<T> {
    cancelled: Option<Arc<AtomicBool>>,
    outcome: T,
}

/// Runs blocking jobs off the event loop and queues their outcomes back to it.
pub struct TaskRunner<T> {
    mode: TaskMode,
    tx: mpsc::Sender<Envelope<T>>,
    rx: mpsc::Receiver<Envelope<T>>,
    detached: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> TaskRunner<T> {
    pub fn new(mode: TaskMode) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            mode,
            tx,
            rx,
            detached: Vec::new(),
        }
    }

    pub fn spawn<F>(&self, job: F) -> TaskHandle
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.dispatch(Some(Arc::clone(&cancelled)), job);
        TaskHandle { cancelled }
    }

    /// Fire-and-forget: the outcome is always delivered. The worker is kept
    /// so [`join_detached`](Self::join_detached) can wait for it on teardown.
    pub fn spawn_detached<F>(&mut self, job: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.detached.retain(|handle| !handle.is_finished());
        if let Some(handle) = self.dispatch(None, job) {
            self.detached.push(handle);
        }
    }

    /// Wait up to `timeout` for detached jobs. Returns how many were still
    /// running when time ran out.
    pub fn join_detached(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        while self.detached.iter().any(|h| !h.is_finished()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        let (finished, running): (Vec<_>, Vec<_>) =
            self.detached.drain(..).partition(|h| h.is_finished());
        for handle in finished {
            // A panicking job already lost its outcome; nothing left to report.
            let _ = handle.join();
        }
        running.len()
    }

    fn dispatch<F>(&self, cancelled: Option<Arc<AtomicBool>>, job: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let tx = self.tx.clone();
        let run = move || {
            let outcome = job();
            // Receiver gone means the runner was torn down.
            let _ = tx.send(Envelope { cancelled, outcome });
        };

        match self.mode {
            TaskMode::Threaded => Some(thread::spawn(run)),
            TaskMode::Inline => {
                run();
                None
            }
        }
    }

    /// Outcomes that arrived since the last call, skipping cancelled jobs.
    pub fn drain(&self) -> Vec<T> {
        self.rx
            .try_iter()
            .filter(|env| {
                env.cancelled
                    .as_ref()
                    .is_none_or(|flag| !flag.load(Ordering::SeqCst))
            })
            .map(|env| env.outcome)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_outcome_waits_for_drain() {
        let runner: TaskRunner<u32> = TaskRunner::new(TaskMode::Inline);
        let _handle = runner.spawn(|| 7);
        assert_eq!(runner.drain(), vec![7]);
        assert!(runner.drain().is_empty());
    }

    #[test]
    fn test_cancelled_outcome_is_discarded() {
        let runner: TaskRunner<u32> = TaskRunner::new(TaskMode::Inline);
        let handle = runner.spawn(|| 1);
        handle.cancel();
        let _kept = runner.spawn(|| 2);
        assert_eq!(runner.drain(), vec![2]);
    }

    #[test]
    fn test_dropping_handle_cancels() {
        let mut runner: TaskRunner<u32> = TaskRunner::new(TaskMode::Inline);
        drop(runner.spawn(|| 1));
        runner.spawn_detached(|| 3);
        assert_eq!(runner.drain(), vec![3]);
    }

    #[test]
    fn test_threaded_outcome_arrives() {
        let runner: TaskRunner<u32> = TaskRunner::new(TaskMode::Threaded);
        let _handle = runner.spawn(|| 42);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        while seen.is_empty() && Instant::now() < deadline {
            seen = runner.drain();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(seen, vec![42]);
    }

    #[test]
    fn test_join_detached_waits_for_running_save() {
        let mut runner: TaskRunner<u32> = TaskRunner::new(TaskMode::Threaded);
        runner.spawn_detached(|| {
            std::thread::sleep(Duration::from_millis(50));
            9
        });
        assert_eq!(runner.join_detached(Duration::from_secs(5)), 0);
        assert_eq!(runner.drain(), vec![9]);
    }

    #[test]
    fn test_join_detached_reports_abandoned_jobs() {
        let mut runner: TaskRunner<u32> = TaskRunner::new(TaskMode::Threaded);
        runner.spawn_detached(|| {
            std::thread::sleep(Duration::from_secs(2));
            1
        });
        assert_eq!(runner.join_detached(Duration::from_millis(20)), 1);
        assert_eq!(runner.join_detached(Duration::ZERO), 0);
    }

    #[test]
    fn test_inline_detached_jobs_need_no_join() {
        let mut runner: TaskRunner<u32> = TaskRunner::new(TaskMode::Inline);
        runner.spawn_detached(|| 4);
        assert_eq!(runner.join_detached(Duration::ZERO), 0);
        assert_eq!(runner.drain(), vec![4]);
    }
}
