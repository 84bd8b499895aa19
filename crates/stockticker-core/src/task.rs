use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Handle to a scheduled piece of work (a debounce timer, a poll loop, an
/// in-flight fetch). Cancelling, or dropping the handle, aborts the task at
/// its next await point.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    inner: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Run `fut` on the runtime.
    pub fn spawn<F>(name: &'static str, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            inner: Some(tokio::spawn(fut)),
        }
    }

    /// Run `fut` once `delay` has elapsed without the handle being cancelled.
    pub fn schedule<F>(name: &'static str, delay: Duration, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(name, async move {
            tokio::time::sleep(delay).await;
            fut.await;
        })
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.inner.take() {
            if !handle.is_finished() {
                trace!("cancelling task: {}", self.name);
            }
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A slot holding at most one live task; putting a new task in cancels the
/// previous one. This is the "last scheduled wins" rule of the components.
#[derive(Debug, Default)]
pub struct TaskSlot {
    current: Option<TaskHandle>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, task: TaskHandle) {
        self.cancel();
        self.current = Some(task);
    }

    pub fn cancel(&mut self) {
        if let Some(mut task) = self.current.take() {
            task.cancel();
        }
    }

    pub fn is_idle(&self) -> bool {
        self.current.as_ref().map_or(true, TaskHandle::is_finished)
    }
}
